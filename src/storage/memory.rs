use super::context::{BackingStore, CommandContext, RecordReader, StoreTransaction};
use super::record::StoredRecord;
use super::write_set::WriteSet;
use crate::adapter::{OidGenerator, SequenceOidGenerator, StoreKey};
use crate::core::Result;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;

type Records = Arc<RwLock<BTreeMap<StoreKey, StoredRecord>>>;

/// Backing store holding committed records in process memory.
///
/// Keys come from per-type sequences. Commits take the write lock, so
/// concurrent transactions are serialized at commit time.
pub struct InMemoryBackingStore {
    name: String,
    records: Records,
    generator: SequenceOidGenerator,
}

impl InMemoryBackingStore {
    pub fn new() -> Self {
        Self::with_name("memory")
    }

    pub fn with_name(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            records: Arc::new(RwLock::new(BTreeMap::new())),
            generator: SequenceOidGenerator::new(),
        }
    }

    pub async fn record_count(&self) -> usize {
        self.records.read().await.len()
    }
}

impl Default for InMemoryBackingStore {
    fn default() -> Self {
        Self::new()
    }
}

async fn committed(records: &Records, key: &StoreKey) -> Option<StoredRecord> {
    records.read().await.get(key).cloned()
}

async fn scan_committed(records: &Records, spec_id: &str) -> Vec<StoredRecord> {
    records
        .read()
        .await
        .values()
        .filter(|r| r.spec_id == spec_id)
        .cloned()
        .collect()
}

#[async_trait]
impl RecordReader for InMemoryBackingStore {
    async fn load(&self, key: &StoreKey) -> Result<Option<StoredRecord>> {
        Ok(committed(&self.records, key).await)
    }

    async fn scan(&self, spec_id: &str) -> Result<Vec<StoredRecord>> {
        Ok(scan_committed(&self.records, spec_id).await)
    }
}

#[async_trait]
impl BackingStore for InMemoryBackingStore {
    fn name(&self) -> &str {
        &self.name
    }

    fn as_reader(&self) -> &dyn RecordReader {
        self
    }

    fn oid_generator(&self) -> &dyn OidGenerator {
        &self.generator
    }

    async fn begin(&self) -> Result<Box<dyn StoreTransaction>> {
        Ok(Box::new(InMemoryTransaction {
            records: self.records.clone(),
            writes: WriteSet::new(),
        }))
    }

    async fn has_instances(&self, spec_id: &str) -> Result<bool> {
        Ok(self
            .records
            .read()
            .await
            .keys()
            .any(|k| k.spec_id() == spec_id))
    }
}

struct InMemoryTransaction {
    records: Records,
    writes: WriteSet,
}

#[async_trait]
impl RecordReader for InMemoryTransaction {
    async fn load(&self, key: &StoreKey) -> Result<Option<StoredRecord>> {
        Ok(self.writes.view(key, committed(&self.records, key).await))
    }

    async fn scan(&self, spec_id: &str) -> Result<Vec<StoredRecord>> {
        let records = scan_committed(&self.records, spec_id).await;
        Ok(self.writes.overlay_scan(spec_id, records))
    }
}

#[async_trait]
impl CommandContext for InMemoryTransaction {
    async fn insert(&mut self, record: StoredRecord) -> Result<()> {
        let current = committed(&self.records, &record.store_key()).await;
        self.writes.stage_insert(record, current)
    }

    async fn update(&mut self, record: StoredRecord, expected_version: &str) -> Result<()> {
        let current = committed(&self.records, &record.store_key()).await;
        self.writes.stage_update(record, expected_version, current)
    }

    async fn delete(&mut self, spec_id: &str, key: &str, version: &str) -> Result<()> {
        let key = StoreKey::new(spec_id, key);
        let current = committed(&self.records, &key).await;
        self.writes.stage_delete(key, version, current)
    }

    async fn flush(&mut self) -> Result<()> {
        // writes are applied at commit
        Ok(())
    }
}

#[async_trait]
impl StoreTransaction for InMemoryTransaction {
    fn as_reader(&self) -> &dyn RecordReader {
        self
    }

    fn as_context(&mut self) -> &mut dyn CommandContext {
        self
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        let InMemoryTransaction { records, writes } = *self;
        let mut records = records.write().await;
        writes.validate(|key| Ok(records.get(key).map(|r| r.version.sequence())))?;
        for (key, write) in writes.into_writes() {
            match write {
                Some(record) => {
                    records.insert(key, record);
                }
                None => {
                    records.remove(&key);
                }
            }
        }
        Ok(())
    }

    async fn abort(self: Box<Self>) -> Result<()> {
        Ok(())
    }
}
