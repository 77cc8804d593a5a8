use crate::adapter::{AdapterHandle, AdapterManager, ObjectAdapter, OidGenerator, Version};
use crate::core::{MetaError, Result};
use crate::storage::{CommandContext, StoredRecord};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandKind {
    Create,
    Save,
    Destroy,
}

/// How a command affects the stored state of its object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionMode {
    Create,
    Update,
    NonUpdate,
}

impl fmt::Display for CommandKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommandKind::Create => write!(f, "create"),
            CommandKind::Save => write!(f, "save"),
            CommandKind::Destroy => write!(f, "destroy"),
        }
    }
}

/// Everything a command needs besides its adapter.
pub struct CommandEnv<'a> {
    pub context: &'a mut dyn CommandContext,
    pub generator: &'a dyn OidGenerator,
    pub user: &'a str,
}

/// A pending change to one object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistenceCommand {
    kind: CommandKind,
    target: AdapterHandle,
}

impl PersistenceCommand {
    pub fn create(adapters: &AdapterManager, target: AdapterHandle) -> Result<Self> {
        check_create(adapters.get(target)?)?;
        Ok(Self {
            kind: CommandKind::Create,
            target,
        })
    }

    pub fn save(adapters: &AdapterManager, target: AdapterHandle) -> Result<Self> {
        check_persistent(adapters.get(target)?, CommandKind::Save)?;
        Ok(Self {
            kind: CommandKind::Save,
            target,
        })
    }

    pub fn destroy(adapters: &AdapterManager, target: AdapterHandle) -> Result<Self> {
        check_persistent(adapters.get(target)?, CommandKind::Destroy)?;
        Ok(Self {
            kind: CommandKind::Destroy,
            target,
        })
    }

    pub fn kind(&self) -> CommandKind {
        self.kind
    }

    pub fn target(&self) -> AdapterHandle {
        self.target
    }

    pub fn mode(&self) -> ExecutionMode {
        match self.kind {
            CommandKind::Create => ExecutionMode::Create,
            CommandKind::Save => ExecutionMode::Update,
            CommandKind::Destroy => ExecutionMode::NonUpdate,
        }
    }

    /// Apply the command. Preconditions are checked again here since the
    /// adapter may have changed since the command was queued.
    pub async fn execute(&self, adapters: &mut AdapterManager, env: &mut CommandEnv<'_>) -> Result<()> {
        match self.kind {
            CommandKind::Create => self.execute_create(adapters, env).await,
            CommandKind::Save => self.execute_save(adapters, env).await,
            CommandKind::Destroy => self.execute_destroy(adapters, env).await,
        }
    }

    async fn execute_create(&self, adapters: &mut AdapterManager, env: &mut CommandEnv<'_>) -> Result<()> {
        let adapter = adapters.get(self.target)?;
        check_create(adapter)?;

        let spec_id = adapter.spec_id().to_string();
        let key = env.generator.next_persistent_id(&spec_id)?;
        let version = Version::initial(env.user);
        let record = StoredRecord::new(&spec_id, &key, version.clone(), adapter.pojo().clone());

        env.context.insert(record).await?;
        let oid = adapters.remap_as_persistent(self.target, &key)?;
        adapters.get_mut(self.target)?.set_version(version);
        tracing::debug!(oid = %oid, "object created");
        Ok(())
    }

    async fn execute_save(&self, adapters: &mut AdapterManager, env: &mut CommandEnv<'_>) -> Result<()> {
        let adapter = adapters.get(self.target)?;
        let (spec_id, key) = check_persistent(adapter, self.kind)?;
        let current = current_version(adapter)?;
        let next = current.next(env.user);
        let record = StoredRecord::new(spec_id, key, next.clone(), adapter.pojo().clone());

        env.context.update(record, &current.sequence_string()).await?;
        adapters.get_mut(self.target)?.set_version(next);
        Ok(())
    }

    async fn execute_destroy(&self, adapters: &mut AdapterManager, env: &mut CommandEnv<'_>) -> Result<()> {
        let adapter = adapters.get(self.target)?;
        let (spec_id, key) = check_persistent(adapter, self.kind)?;
        let version = current_version(adapter)?.sequence_string();

        env.context.delete(&spec_id, &key, &version).await?;
        let removed = adapters.remove(self.target)?;
        tracing::debug!(oid = %removed.oid(), version = %version, "object destroyed");
        Ok(())
    }
}

fn check_create(adapter: &ObjectAdapter) -> Result<()> {
    if adapter.is_aggregated() {
        return Err(MetaError::IllegalArgument(format!(
            "Aggregated object '{}' is stored with its parent",
            adapter.oid()
        )));
    }
    if !adapter.is_transient() {
        return Err(MetaError::IllegalArgument(format!(
            "Cannot create '{}': object is already persistent",
            adapter.oid()
        )));
    }
    Ok(())
}

/// The store coordinates of a persistent root adapter.
fn check_persistent(adapter: &ObjectAdapter, kind: CommandKind) -> Result<(String, String)> {
    match adapter.oid().as_root() {
        Some(root) if !root.is_transient() => {
            Ok((root.spec_id().to_string(), root.identifier().to_string()))
        }
        Some(_) => Err(MetaError::IllegalArgument(format!(
            "Cannot {} '{}': object is not persistent",
            kind,
            adapter.oid()
        ))),
        None => Err(MetaError::IllegalArgument(format!(
            "Cannot {} aggregated object '{}' on its own",
            kind,
            adapter.oid()
        ))),
    }
}

fn current_version(adapter: &ObjectAdapter) -> Result<&Version> {
    adapter.version().ok_or_else(|| {
        MetaError::IllegalState(format!(
            "Persistent object '{}' has no version; resolve it first",
            adapter.oid()
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::{DomainObject, Oid, SequenceOidGenerator};
    use async_trait::async_trait;

    /// Records every call instead of storing anything.
    #[derive(Default)]
    struct RecordingContext {
        calls: Vec<String>,
    }

    #[async_trait]
    impl CommandContext for RecordingContext {
        async fn insert(&mut self, record: StoredRecord) -> Result<()> {
            self.calls.push(format!("insert {}", record.store_key()));
            Ok(())
        }

        async fn update(&mut self, record: StoredRecord, expected: &str) -> Result<()> {
            self.calls.push(format!("update {} {}", record.store_key(), expected));
            Ok(())
        }

        async fn delete(&mut self, spec_id: &str, key: &str, version: &str) -> Result<()> {
            self.calls.push(format!("delete {} {} {}", spec_id, key, version));
            Ok(())
        }

        async fn flush(&mut self) -> Result<()> {
            self.calls.push("flush".to_string());
            Ok(())
        }
    }

    fn persistent(adapters: &mut AdapterManager) -> AdapterHandle {
        adapters
            .bind_loaded(
                &Oid::persistent("Order", "7").unwrap(),
                DomainObject::new().with_field("total", 3),
                Version::initial("alice"),
            )
            .unwrap()
    }

    #[tokio::test]
    async fn test_create_assigns_key_and_version() {
        let mut adapters = AdapterManager::new();
        let handle = adapters
            .adapt_transient(Oid::transient("Order", "t9").unwrap(), DomainObject::new())
            .unwrap();
        let command = PersistenceCommand::create(&adapters, handle).unwrap();
        assert_eq!(command.mode(), ExecutionMode::Create);

        let mut context = RecordingContext::default();
        let generator = SequenceOidGenerator::new();
        let mut env = CommandEnv {
            context: &mut context,
            generator: &generator,
            user: "bob",
        };
        command.execute(&mut adapters, &mut env).await.unwrap();

        let adapter = adapters.get(handle).unwrap();
        assert_eq!(adapter.oid().to_string(), "Order@1");
        assert_eq!(adapter.version().unwrap().user(), "bob");
        assert_eq!(context.calls, vec!["insert Order|1"]);
    }

    #[tokio::test]
    async fn test_destroy_issues_exactly_one_delete() {
        let mut adapters = AdapterManager::new();
        let handle = persistent(&mut adapters);
        let command = PersistenceCommand::destroy(&adapters, handle).unwrap();
        assert_eq!(command.mode(), ExecutionMode::NonUpdate);

        let mut context = RecordingContext::default();
        let generator = SequenceOidGenerator::new();
        let mut env = CommandEnv {
            context: &mut context,
            generator: &generator,
            user: "bob",
        };
        command.execute(&mut adapters, &mut env).await.unwrap();

        assert_eq!(context.calls, vec!["delete Order 7 1"]);
        assert!(adapters.is_empty());
    }

    #[tokio::test]
    async fn test_save_sends_expected_version() {
        let mut adapters = AdapterManager::new();
        let handle = persistent(&mut adapters);
        let command = PersistenceCommand::save(&adapters, handle).unwrap();

        let mut context = RecordingContext::default();
        let generator = SequenceOidGenerator::new();
        let mut env = CommandEnv {
            context: &mut context,
            generator: &generator,
            user: "bob",
        };
        command.execute(&mut adapters, &mut env).await.unwrap();

        assert_eq!(context.calls, vec!["update Order|7 1"]);
        assert_eq!(adapters.get(handle).unwrap().version().unwrap().sequence(), 2);
    }

    #[test]
    fn test_state_preconditions() {
        let mut adapters = AdapterManager::new();
        let stored = persistent(&mut adapters);
        let fresh = adapters
            .adapt_transient(Oid::transient("Order", "t10").unwrap(), DomainObject::new())
            .unwrap();

        assert!(matches!(
            PersistenceCommand::create(&adapters, stored),
            Err(MetaError::IllegalArgument(_))
        ));
        assert!(matches!(
            PersistenceCommand::save(&adapters, fresh),
            Err(MetaError::IllegalArgument(_))
        ));
        assert!(matches!(
            PersistenceCommand::destroy(&adapters, fresh),
            Err(MetaError::IllegalArgument(_))
        ));
    }
}
