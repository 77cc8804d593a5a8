use super::command::{CommandKind, PersistenceCommand};
use super::query::QuerySpec;
use super::store::ObjectStore;
use crate::adapter::{
    AdapterHandle, AdapterManager, AdapterSnapshot, DomainObject, ObjectAdapter, Oid,
};
use crate::core::{MetaError, Result};
use crate::metamodel::Metamodel;
use crate::storage::BackingStore;
use crate::transaction::TransactionId;
use std::sync::Arc;

/// A unit of work over domain objects.
///
/// The session owns the identity map and the queue of pending commands.
/// Changes are queued as they are reported and executed in order on
/// [`flush`](Self::flush) or [`commit`](Self::commit). One session serves
/// one task; sessions sharing a backing store are isolated by the store's
/// transactions and by object versions.
///
/// Executed commands change adapter oids and versions before the store
/// commits. If the transaction is aborted, or its commit fails, those
/// adapters get their previous identity and version back, and destroyed
/// objects are re-adapted.
pub struct PersistenceSession {
    metamodel: Arc<Metamodel>,
    store: ObjectStore,
    adapters: AdapterManager,
    pending: Vec<PersistenceCommand>,
    executed: Vec<AdapterSnapshot>,
}

impl PersistenceSession {
    /// Open a session over `backing`, configured from the metamodel's
    /// configuration snapshot.
    pub fn open(metamodel: Arc<Metamodel>, backing: Arc<dyn BackingStore>) -> Result<Self> {
        let store = ObjectStore::new(backing, metamodel.config())?;
        Self::with_store(metamodel, store)
    }

    pub fn with_store(metamodel: Arc<Metamodel>, mut store: ObjectStore) -> Result<Self> {
        if !store.is_open() {
            store.open()?;
        }
        Ok(Self {
            metamodel,
            store,
            adapters: AdapterManager::new(),
            pending: Vec::new(),
            executed: Vec::new(),
        })
    }

    pub fn metamodel(&self) -> &Metamodel {
        &self.metamodel
    }

    pub fn store(&self) -> &ObjectStore {
        &self.store
    }

    pub fn adapters(&self) -> &AdapterManager {
        &self.adapters
    }

    pub fn adapter(&self, handle: AdapterHandle) -> Result<&ObjectAdapter> {
        self.adapters.get(handle)
    }

    pub fn adapter_mut(&mut self, handle: AdapterHandle) -> Result<&mut ObjectAdapter> {
        self.adapters.get_mut(handle)
    }

    pub fn pending(&self) -> &[PersistenceCommand] {
        &self.pending
    }

    // ------------------------------------------------------------------------
    // Object lifecycle
    // ------------------------------------------------------------------------

    /// Adapt a new, not yet persisted object of a known type.
    pub fn create_transient(&mut self, spec_id: &str, pojo: DomainObject) -> Result<AdapterHandle> {
        let spec = self.metamodel.expect_specification(spec_id)?;
        let key = self.store.oid_generator().next_transient_id(spec.id())?;
        self.adapters.adapt_transient(Oid::transient(spec.id(), key)?, pojo)
    }

    /// Queue a transient object for creation.
    pub fn make_persistent(&mut self, handle: AdapterHandle) -> Result<()> {
        let adapter = self.adapters.get(handle)?;
        let spec = self.metamodel.expect_specification(adapter.spec_id())?;
        if !spec.persistability().is_persistable() {
            return Err(MetaError::IllegalArgument(format!(
                "Objects of type '{}' cannot be persisted",
                spec.id()
            )));
        }
        if self.is_pending(handle, CommandKind::Create) {
            return Ok(());
        }
        let command = self.store.create_create_object_command(&self.adapters, handle)?;
        self.pending.push(command);
        Ok(())
    }

    /// Record that a persistent object's state changed.
    ///
    /// Transient objects are ignored: their state is written when they are
    /// created. Repeated changes queue a single save.
    pub fn object_changed(&mut self, handle: AdapterHandle) -> Result<()> {
        let adapter = self.adapters.get(handle)?;
        if adapter.is_transient() {
            return Ok(());
        }
        if self.is_pending(handle, CommandKind::Destroy) {
            return Err(MetaError::IllegalState(format!(
                "'{}' is already queued for destruction",
                adapter.oid()
            )));
        }
        if self.is_pending(handle, CommandKind::Save) {
            return Ok(());
        }
        let command = self.store.create_save_object_command(&self.adapters, handle)?;
        self.pending.push(command);
        Ok(())
    }

    /// Queue an object for destruction. A transient object whose creation
    /// is still pending is simply forgotten.
    pub fn destroy_object(&mut self, handle: AdapterHandle) -> Result<()> {
        if self.adapters.get(handle)?.is_transient() {
            self.pending.retain(|c| c.target() != handle);
            self.adapters.remove(handle)?;
            return Ok(());
        }
        let command = self.store.create_destroy_object_command(&self.adapters, handle)?;
        self.pending
            .retain(|c| !(c.target() == handle && c.kind() == CommandKind::Save));
        self.pending.push(command);
        Ok(())
    }

    fn is_pending(&self, handle: AdapterHandle, kind: CommandKind) -> bool {
        self.pending
            .iter()
            .any(|c| c.target() == handle && c.kind() == kind)
    }

    // ------------------------------------------------------------------------
    // Transactions
    // ------------------------------------------------------------------------

    pub async fn begin(&mut self) -> Result<TransactionId> {
        self.store.begin_transaction().await
    }

    /// Execute every pending command.
    pub async fn flush(&mut self) -> Result<()> {
        if self.pending.is_empty() {
            return Ok(());
        }
        let commands = std::mem::take(&mut self.pending);
        self.executed.extend(
            commands
                .iter()
                .filter_map(|c| self.adapters.snapshot(c.target()).ok()),
        );
        self.store.execute(&mut self.adapters, &commands).await
    }

    /// Flush and commit. On any failure the transaction is aborted, the
    /// adapters are rolled back and the original error returned.
    pub async fn commit(&mut self) -> Result<()> {
        if self.pending.is_empty() && !self.store.in_transaction() {
            return Ok(());
        }
        let result = match self.flush().await {
            Ok(()) => self.store.commit_transaction().await,
            Err(err) => Err(err),
        };
        match result {
            Ok(()) => {
                self.executed.clear();
                Ok(())
            }
            Err(err) => {
                self.pending.clear();
                if self.store.in_transaction() {
                    if let Err(abort_err) = self.store.abort_transaction().await {
                        tracing::error!(error = %abort_err, cause = %err, "abort after failed commit failed");
                    }
                }
                if let Err(restore_err) = self.roll_back_adapters() {
                    tracing::error!(error = %restore_err, cause = %err, "adapter rollback failed");
                }
                Err(err)
            }
        }
    }

    /// Discard pending commands, abort the active transaction, if any, and
    /// roll back the adapters its commands touched.
    pub async fn abort(&mut self) -> Result<()> {
        self.pending.clear();
        let aborted = if self.store.in_transaction() {
            self.store.abort_transaction().await
        } else {
            Ok(())
        };
        let restored = self.roll_back_adapters();
        aborted.and(restored)
    }

    /// Restore snapshots newest first, so each adapter ends up as it was
    /// before its first command in the transaction.
    fn roll_back_adapters(&mut self) -> Result<()> {
        let mut first_err = None;
        while let Some(snapshot) = self.executed.pop() {
            if let Err(err) = self.adapters.restore(snapshot) {
                first_err.get_or_insert(err);
            }
        }
        match first_err {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// Abort outstanding work and close the store.
    pub async fn close(mut self) -> Result<()> {
        self.pending.clear();
        self.executed.clear();
        self.store.close().await
    }

    // ------------------------------------------------------------------------
    // Reads
    // ------------------------------------------------------------------------

    pub async fn load_object(&mut self, oid: &Oid) -> Result<AdapterHandle> {
        self.store.load_instance_and_adapt(&mut self.adapters, oid).await
    }

    pub async fn find(&mut self, query: &dyn QuerySpec) -> Result<Vec<AdapterHandle>> {
        self.metamodel.expect_specification(query.spec_id())?;
        self.store
            .load_instances_and_adapt(&mut self.adapters, query)
            .await
    }

    pub async fn has_instances(&self, spec_id: &str) -> Result<bool> {
        let spec = self.metamodel.expect_specification(spec_id)?;
        self.store.has_instances(&spec).await
    }

    pub async fn resolve(&mut self, handle: AdapterHandle) -> Result<()> {
        self.store.resolve_immediately(&mut self.adapters, handle).await
    }
}
