use super::command::{CommandEnv, PersistenceCommand};
use super::query::{QueryProcessor, QueryProcessorRegistry, QuerySpec};
use crate::adapter::{AdapterHandle, AdapterManager, DomainObject, Oid, OidGenerator};
use crate::config::ConfigurationSnapshot;
use crate::core::{MetaError, Result};
use crate::metamodel::ObjectSpecification;
use crate::storage::{BackingStore, RecordReader, StoreTransaction};
use crate::transaction::{Transaction, TransactionId, TransactionMode};
use std::sync::Arc;
use tracing::Instrument;

/// Executes persistence commands and queries against a backing store,
/// inside store transactions.
///
/// The store must be opened before use. In [`TransactionMode::Chained`]
/// executing commands starts a transaction when none is active; in
/// [`TransactionMode::Unchained`] the caller must begin one explicitly.
/// Reads outside a transaction see committed state only.
pub struct ObjectStore {
    backing: Arc<dyn BackingStore>,
    queries: QueryProcessorRegistry,
    mode: TransactionMode,
    user: String,
    open: bool,
    transaction: Option<(Transaction, Box<dyn StoreTransaction>)>,
}

impl ObjectStore {
    pub fn new(backing: Arc<dyn BackingStore>, config: &ConfigurationSnapshot) -> Result<Self> {
        Ok(Self {
            backing,
            queries: QueryProcessorRegistry::with_default_processors(),
            mode: config.transaction_mode()?,
            user: config.persistor_user().to_string(),
            open: false,
            transaction: None,
        })
    }

    pub fn with_transaction_mode(mut self, mode: TransactionMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_query_registry(mut self, queries: QueryProcessorRegistry) -> Self {
        self.queries = queries;
        self
    }

    pub fn register_query_processor<Q: QuerySpec>(&mut self, processor: Box<dyn QueryProcessor>) {
        self.queries.register::<Q>(processor);
    }

    pub fn backing_store(&self) -> &Arc<dyn BackingStore> {
        &self.backing
    }

    pub fn oid_generator(&self) -> &dyn OidGenerator {
        self.backing.oid_generator()
    }

    pub fn transaction_mode(&self) -> TransactionMode {
        self.mode
    }

    pub fn user(&self) -> &str {
        &self.user
    }

    // ------------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------------

    pub fn open(&mut self) -> Result<()> {
        if self.open {
            return Err(MetaError::IllegalState("Object store is already open".into()));
        }
        self.open = true;
        tracing::info!(store = self.backing.name(), mode = %self.mode, "object store opened");
        Ok(())
    }

    /// Close the store, aborting any transaction still active.
    pub async fn close(&mut self) -> Result<()> {
        self.ensure_open()?;
        if self.transaction.is_some() {
            tracing::warn!("closing object store with an active transaction; aborting it");
            self.abort_transaction().await?;
        }
        self.open = false;
        tracing::info!(store = self.backing.name(), "object store closed");
        Ok(())
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    // ------------------------------------------------------------------------
    // Transactions
    // ------------------------------------------------------------------------

    pub fn in_transaction(&self) -> bool {
        self.transaction.is_some()
    }

    pub fn transaction(&self) -> Option<&Transaction> {
        self.transaction.as_ref().map(|(state, _)| state)
    }

    pub async fn begin_transaction(&mut self) -> Result<TransactionId> {
        self.ensure_open()?;
        if self.transaction.is_some() {
            return Err(MetaError::IllegalState("A transaction is already active".into()));
        }
        self.start_transaction(false).await
    }

    async fn start_transaction(&mut self, auto_started: bool) -> Result<TransactionId> {
        let txn = self.backing.begin().await?;
        let state = Transaction::new(auto_started);
        let id = state.id();
        tracing::debug!(txn = %id, auto_started, "transaction started");
        self.transaction = Some((state, txn));
        Ok(id)
    }

    pub async fn commit_transaction(&mut self) -> Result<()> {
        self.ensure_open()?;
        let (mut state, txn) = self
            .transaction
            .take()
            .ok_or_else(|| MetaError::IllegalState("No active transaction to commit".into()))?;

        let span = tracing::info_span!("object_store.commit", txn = %state.id());
        async move {
            match txn.commit().await {
                Ok(()) => {
                    state.commit()?;
                    let elapsed_ms = state.duration().as_millis() as u64;
                    tracing::info!(
                        commands = state.commands_executed(),
                        flushes = state.flushes(),
                        elapsed_ms,
                        "transaction committed"
                    );
                    Ok(())
                }
                Err(err) => {
                    state.abort()?;
                    tracing::warn!(error = %err, "transaction commit failed");
                    Err(err)
                }
            }
        }
        .instrument(span)
        .await
    }

    pub async fn abort_transaction(&mut self) -> Result<()> {
        self.ensure_open()?;
        let (mut state, txn) = self
            .transaction
            .take()
            .ok_or_else(|| MetaError::IllegalState("No active transaction to abort".into()))?;
        txn.abort().await?;
        state.abort()?;
        tracing::info!(txn = %state.id(), "transaction aborted");
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Commands
    // ------------------------------------------------------------------------

    pub fn create_create_object_command(
        &self,
        adapters: &AdapterManager,
        handle: AdapterHandle,
    ) -> Result<PersistenceCommand> {
        self.ensure_open()?;
        PersistenceCommand::create(adapters, handle)
    }

    pub fn create_save_object_command(
        &self,
        adapters: &AdapterManager,
        handle: AdapterHandle,
    ) -> Result<PersistenceCommand> {
        self.ensure_open()?;
        PersistenceCommand::save(adapters, handle)
    }

    pub fn create_destroy_object_command(
        &self,
        adapters: &AdapterManager,
        handle: AdapterHandle,
    ) -> Result<PersistenceCommand> {
        self.ensure_open()?;
        PersistenceCommand::destroy(adapters, handle)
    }

    /// Execute commands in order, then flush once. The first failure is
    /// returned as is; the enclosing transaction should then be aborted.
    pub async fn execute(
        &mut self,
        adapters: &mut AdapterManager,
        commands: &[PersistenceCommand],
    ) -> Result<()> {
        self.ensure_open()?;
        if self.transaction.is_none() {
            match self.mode {
                TransactionMode::Chained => {
                    self.start_transaction(true).await?;
                }
                TransactionMode::Unchained => {
                    return Err(MetaError::IllegalState(
                        "Unchained transaction mode: begin a transaction before executing commands"
                            .into(),
                    ));
                }
            }
        }

        let Some((state, txn)) = self.transaction.as_mut() else {
            return Err(MetaError::IllegalState("No active transaction".into()));
        };
        let span = tracing::info_span!(
            "object_store.execute",
            txn = %state.id(),
            commands = commands.len()
        );
        let generator = self.backing.oid_generator();
        let user = self.user.as_str();

        async move {
            let mut env = CommandEnv {
                context: txn.as_context(),
                generator,
                user,
            };
            for command in commands {
                tracing::debug!(kind = %command.kind(), target = command.target().index(), "executing command");
                command.execute(adapters, &mut env).await?;
            }
            env.context.flush().await?;
            state.record_batch(commands.len())
        }
        .instrument(span)
        .await
    }

    // ------------------------------------------------------------------------
    // Loading and queries
    // ------------------------------------------------------------------------

    /// Load a persistent root object and bind it into its adapter, creating
    /// the adapter only if none exists for the oid.
    pub async fn load_instance_and_adapt(
        &self,
        adapters: &mut AdapterManager,
        oid: &Oid,
    ) -> Result<AdapterHandle> {
        self.ensure_open()?;
        let root = oid.as_root().ok_or_else(|| {
            MetaError::IllegalArgument(format!(
                "Aggregated object '{}' can only be loaded through its parent",
                oid
            ))
        })?;
        let key = root.store_key()?;
        let record = self
            .reader()
            .load(&key)
            .await?
            .ok_or_else(|| MetaError::ObjectNotFound(oid.to_string()))?;
        adapters.bind_loaded(oid, record.state, record.version)
    }

    pub async fn load_instances_and_adapt(
        &self,
        adapters: &mut AdapterManager,
        query: &dyn QuerySpec,
    ) -> Result<Vec<AdapterHandle>> {
        self.ensure_open()?;
        let records = self.queries.process(query, self.reader()).await?;
        tracing::debug!(query = ?query, found = records.len(), "query processed");

        records
            .into_iter()
            .map(|record| -> Result<AdapterHandle> {
                let oid = record.oid()?;
                adapters.bind_loaded(&oid, record.state, record.version)
            })
            .collect()
    }

    /// Whether any instance of the type is stored. Types that cannot be
    /// persisted have none, and the backing store is not consulted.
    pub async fn has_instances(&self, spec: &ObjectSpecification) -> Result<bool> {
        if !spec.persistability().is_persistable() {
            return Ok(false);
        }
        self.ensure_open()?;
        match &self.transaction {
            Some((_, txn)) => Ok(!txn.scan(spec.id()).await?.is_empty()),
            None => self.backing.has_instances(spec.id()).await,
        }
    }

    /// Load the state behind a ghost adapter.
    ///
    /// Resolved and transient adapters are left alone. An aggregated part
    /// is resolved by resolving its root and reading the part's state from
    /// its parent's field named after the part's local id.
    pub async fn resolve_immediately(
        &self,
        adapters: &mut AdapterManager,
        handle: AdapterHandle,
    ) -> Result<()> {
        let adapter = adapters.get(handle)?;
        if adapter.is_resolved() || adapter.is_transient() {
            return Ok(());
        }
        let oid = adapter.oid().clone();
        tracing::debug!(oid = %oid, "resolving");

        let mut chain = vec![oid.clone()];
        let mut current = oid.parent();
        while let Some(parent) = current {
            chain.push(parent.clone());
            current = parent.parent();
        }
        chain.reverse();

        self.load_instance_and_adapt(adapters, &chain[0]).await?;

        for pair in chain.windows(2) {
            let (parent, part) = (&pair[0], &pair[1]);
            let part_handle = adapters.adapter_for_oid(part)?;
            if adapters.get(part_handle)?.is_resolved() {
                continue;
            }
            let Oid::Aggregated(aggregated) = part else {
                return Err(MetaError::IllegalState(format!("'{}' is not aggregated", part)));
            };
            let parent_handle = adapters.adapter_for_oid(parent)?;
            let value = adapters
                .get(parent_handle)?
                .pojo()
                .get(aggregated.local_id())
                .cloned()
                .ok_or_else(|| MetaError::ObjectNotFound(part.to_string()))?;
            adapters
                .get_mut(part_handle)?
                .bind(DomainObject::from_value(value)?, None)?;
        }
        Ok(())
    }

    fn reader(&self) -> &dyn RecordReader {
        match &self.transaction {
            Some((_, txn)) => txn.as_reader(),
            None => self.backing.as_reader(),
        }
    }

    fn ensure_open(&self) -> Result<()> {
        if !self.open {
            return Err(MetaError::IllegalState("Object store is not open".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TRANSACTION_MODE_KEY;
    use crate::storage::InMemoryBackingStore;
    use serde_json::json;

    fn open_store(mode: &str) -> ObjectStore {
        let config = ConfigurationSnapshot::from_pairs([(TRANSACTION_MODE_KEY, mode)]);
        let mut store = ObjectStore::new(Arc::new(InMemoryBackingStore::new()), &config).unwrap();
        store.open().unwrap();
        store
    }

    fn transient(adapters: &mut AdapterManager, pojo: DomainObject) -> AdapterHandle {
        let key = crate::adapter::SequenceOidGenerator::new()
            .next_transient_id("Customer")
            .unwrap();
        adapters
            .adapt_transient(Oid::transient("Customer", key).unwrap(), pojo)
            .unwrap()
    }

    #[tokio::test]
    async fn test_closed_store_rejects_work() {
        let store = ObjectStore::new(
            Arc::new(InMemoryBackingStore::new()),
            &ConfigurationSnapshot::empty(),
        )
        .unwrap();
        let mut adapters = AdapterManager::new();
        let handle = transient(&mut adapters, DomainObject::new());

        assert!(!store.is_open());
        assert!(matches!(
            store.create_create_object_command(&adapters, handle),
            Err(MetaError::IllegalState(_))
        ));
    }

    #[tokio::test]
    async fn test_chained_mode_auto_begins() {
        let mut store = open_store("chained");
        let mut adapters = AdapterManager::new();
        let handle = transient(&mut adapters, DomainObject::new().with_field("name", "Ann"));

        let create = store.create_create_object_command(&adapters, handle).unwrap();
        store.execute(&mut adapters, &[create]).await.unwrap();
        assert!(store.in_transaction());
        assert!(store.transaction().unwrap().is_auto_started());
        store.commit_transaction().await.unwrap();
        assert!(!store.in_transaction());
    }

    #[tokio::test]
    async fn test_unchained_mode_requires_explicit_begin() {
        let mut store = open_store("unchained");
        let mut adapters = AdapterManager::new();
        let handle = transient(&mut adapters, DomainObject::new());
        let create = store.create_create_object_command(&adapters, handle).unwrap();

        let err = store.execute(&mut adapters, &[create.clone()]).await.unwrap_err();
        assert!(matches!(err, MetaError::IllegalState(_)));
        assert!(adapters.get(handle).unwrap().is_transient());

        store.begin_transaction().await.unwrap();
        store.execute(&mut adapters, &[create]).await.unwrap();
        store.commit_transaction().await.unwrap();
        assert!(adapters.get(handle).unwrap().is_persistent());
    }

    #[tokio::test]
    async fn test_load_missing_is_not_found() {
        let store = open_store("chained");
        let mut adapters = AdapterManager::new();
        let err = store
            .load_instance_and_adapt(&mut adapters, &Oid::persistent("Customer", "404").unwrap())
            .await
            .unwrap_err();
        assert!(err.is_not_found());
        assert!(adapters.is_empty());
    }

    #[tokio::test]
    async fn test_resolve_aggregated_resolves_root_first() {
        let mut store = open_store("chained");
        let mut adapters = AdapterManager::new();
        let customer = transient(
            &mut adapters,
            DomainObject::new()
                .with_field("name", "Ann")
                .with_field("home", json!({"city": "Lyon"})),
        );
        let create = store.create_create_object_command(&adapters, customer).unwrap();
        store.execute(&mut adapters, &[create]).await.unwrap();
        store.commit_transaction().await.unwrap();
        let root_oid = adapters.get(customer).unwrap().oid().clone();

        // a fresh session only knows the oid of the embedded part
        let mut fresh = AdapterManager::new();
        let part_oid = Oid::aggregated(root_oid.clone(), "Address", "home").unwrap();
        let part = fresh.adapter_for_oid(&part_oid).unwrap();
        assert!(fresh.get(part).unwrap().is_ghost());

        store.resolve_immediately(&mut fresh, part).await.unwrap();
        assert_eq!(
            fresh.get(part).unwrap().pojo().get("city"),
            Some(&json!("Lyon"))
        );
        let root = fresh.handle_for(&root_oid).unwrap();
        assert!(fresh.get(root).unwrap().is_resolved());

        // already resolved: no-op
        store.resolve_immediately(&mut fresh, part).await.unwrap();
    }
}
