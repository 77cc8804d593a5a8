use super::record::StoredRecord;
use crate::adapter::{OidGenerator, StoreKey};
use crate::core::Result;
use async_trait::async_trait;

/// Read access to stored records.
#[async_trait]
pub trait RecordReader: Send + Sync {
    async fn load(&self, key: &StoreKey) -> Result<Option<StoredRecord>>;

    async fn scan(&self, spec_id: &str) -> Result<Vec<StoredRecord>>;
}

/// Write side of a backing store transaction, as seen by persistence
/// commands.
///
/// Versions are compared when a write is issued: `update` and `delete`
/// fail with a concurrency conflict when the stored version differs from the
/// expected one, and with not-found when there is nothing to change.
#[async_trait]
pub trait CommandContext: Send + Sync {
    async fn insert(&mut self, record: StoredRecord) -> Result<()>;

    async fn update(&mut self, record: StoredRecord, expected_version: &str) -> Result<()>;

    async fn delete(&mut self, spec_id: &str, key: &str, version: &str) -> Result<()>;

    /// Push buffered writes to the store. Called once per executed batch.
    async fn flush(&mut self) -> Result<()>;
}

/// A unit of work against a backing store. Reads see the transaction's own
/// writes.
#[async_trait]
pub trait StoreTransaction: CommandContext + RecordReader {
    fn as_reader(&self) -> &dyn RecordReader;

    fn as_context(&mut self) -> &mut dyn CommandContext;

    /// Revalidate every write against the committed state and apply them
    /// atomically.
    async fn commit(self: Box<Self>) -> Result<()>;

    async fn abort(self: Box<Self>) -> Result<()>;
}

/// A pluggable store holding committed records.
#[async_trait]
pub trait BackingStore: RecordReader {
    fn name(&self) -> &str;

    fn as_reader(&self) -> &dyn RecordReader;

    fn oid_generator(&self) -> &dyn OidGenerator;

    async fn begin(&self) -> Result<Box<dyn StoreTransaction>>;

    async fn has_instances(&self, spec_id: &str) -> Result<bool> {
        Ok(!self.scan(spec_id).await?.is_empty())
    }
}
