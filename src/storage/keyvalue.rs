// ============================================================================
// Key/Value Backing Store
// ============================================================================
//
// Records are encoded with MessagePack and stored under `<type>|<key>`.
// The store only needs point reads, prefix scans and atomic batches from the
// underlying database.
//
// ============================================================================

use super::context::{BackingStore, CommandContext, RecordReader, StoreTransaction};
use super::record::StoredRecord;
use super::write_set::WriteSet;
use crate::adapter::{OidGenerator, StoreKey, UuidOidGenerator};
use crate::core::{MetaError, Result};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};

/// One write of a batch: `Some` puts, `None` deletes.
pub type KeyValueWrite = (String, Option<Vec<u8>>);

/// Minimal key/value database.
#[async_trait]
pub trait KeyValueDb: Send + Sync + 'static {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    async fn scan_prefix(&self, prefix: &str) -> Result<Vec<(String, Vec<u8>)>>;

    /// Apply every write or none.
    async fn apply(&self, batch: Vec<KeyValueWrite>) -> Result<()>;
}

fn scan_map(map: &BTreeMap<String, Vec<u8>>, prefix: &str) -> Vec<(String, Vec<u8>)> {
    map.range(prefix.to_string()..)
        .take_while(|(k, _)| k.starts_with(prefix))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect()
}

fn apply_to_map(map: &mut BTreeMap<String, Vec<u8>>, batch: Vec<KeyValueWrite>) {
    for (key, value) in batch {
        match value {
            Some(bytes) => {
                map.insert(key, bytes);
            }
            None => {
                map.remove(&key);
            }
        }
    }
}

/// Volatile key/value database.
#[derive(Debug, Default)]
pub struct MemoryKeyValueDb {
    entries: RwLock<BTreeMap<String, Vec<u8>>>,
}

impl MemoryKeyValueDb {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KeyValueDb for MemoryKeyValueDb {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn scan_prefix(&self, prefix: &str) -> Result<Vec<(String, Vec<u8>)>> {
        Ok(scan_map(&*self.entries.read().await, prefix))
    }

    async fn apply(&self, batch: Vec<KeyValueWrite>) -> Result<()> {
        apply_to_map(&mut *self.entries.write().await, batch);
        Ok(())
    }
}

/// Key/value database persisted as a single snapshot file.
///
/// Every applied batch rewrites the snapshot through a temporary file in
/// the same directory followed by a rename, so readers of the file only
/// ever see a complete snapshot.
#[derive(Debug)]
pub struct FileKeyValueDb {
    path: PathBuf,
    entries: RwLock<BTreeMap<String, Vec<u8>>>,
}

impl FileKeyValueDb {
    /// Open the snapshot at `path`, starting empty if there is none.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let entries = Self::read_snapshot(&path)?;
        tracing::info!(path = %path.display(), entries = entries.len(), "key/value snapshot opened");
        Ok(Self {
            path,
            entries: RwLock::new(entries),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_snapshot(path: &Path) -> Result<BTreeMap<String, Vec<u8>>> {
        if !path.exists() {
            return Ok(BTreeMap::new());
        }
        let mut data = Vec::new();
        File::open(path)?.read_to_end(&mut data)?;
        Ok(rmp_serde::from_slice(&data)?)
    }

    fn write_snapshot(&self, entries: &BTreeMap<String, Vec<u8>>) -> Result<()> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&dir)?;

        let serialized = rmp_serde::to_vec(entries)?;
        let temp = tempfile::NamedTempFile::new_in(&dir)?;
        {
            let mut writer = BufWriter::new(temp.as_file());
            writer.write_all(&serialized)?;
            writer.flush()?;
        }
        temp.as_file().sync_all()?;
        temp.persist(&self.path)
            .map_err(|e| MetaError::IoError(format!("Failed to replace snapshot: {}", e)))?;
        Ok(())
    }
}

#[async_trait]
impl KeyValueDb for FileKeyValueDb {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn scan_prefix(&self, prefix: &str) -> Result<Vec<(String, Vec<u8>)>> {
        Ok(scan_map(&*self.entries.read().await, prefix))
    }

    async fn apply(&self, batch: Vec<KeyValueWrite>) -> Result<()> {
        let mut entries = self.entries.write().await;
        let mut next = entries.clone();
        apply_to_map(&mut next, batch);
        self.write_snapshot(&next)?;
        *entries = next;
        Ok(())
    }
}

/// Backing store over any [`KeyValueDb`], with uuid keys.
pub struct KeyValueBackingStore<D: KeyValueDb> {
    name: String,
    db: Arc<D>,
    commit_lock: Arc<Mutex<()>>,
    generator: UuidOidGenerator,
}

impl<D: KeyValueDb> KeyValueBackingStore<D> {
    pub fn new(name: impl Into<String>, db: D) -> Self {
        Self {
            name: name.into(),
            db: Arc::new(db),
            commit_lock: Arc::new(Mutex::new(())),
            generator: UuidOidGenerator,
        }
    }

    pub fn db(&self) -> &D {
        &self.db
    }
}

async fn get_record<D: KeyValueDb>(db: &D, key: &StoreKey) -> Result<Option<StoredRecord>> {
    match db.get(&key.to_string()).await? {
        Some(bytes) => Ok(Some(StoredRecord::decode(&bytes)?)),
        None => Ok(None),
    }
}

async fn scan_records<D: KeyValueDb>(db: &D, spec_id: &str) -> Result<Vec<StoredRecord>> {
    db.scan_prefix(&StoreKey::type_prefix(spec_id))
        .await?
        .iter()
        .map(|(_, bytes)| StoredRecord::decode(bytes))
        .collect()
}

#[async_trait]
impl<D: KeyValueDb> RecordReader for KeyValueBackingStore<D> {
    async fn load(&self, key: &StoreKey) -> Result<Option<StoredRecord>> {
        get_record(&*self.db, key).await
    }

    async fn scan(&self, spec_id: &str) -> Result<Vec<StoredRecord>> {
        scan_records(&*self.db, spec_id).await
    }
}

#[async_trait]
impl<D: KeyValueDb> BackingStore for KeyValueBackingStore<D> {
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
        Ok(Box::new(KeyValueTransaction {
            db: self.db.clone(),
            commit_lock: self.commit_lock.clone(),
            writes: WriteSet::new(),
        }))
    }

    async fn has_instances(&self, spec_id: &str) -> Result<bool> {
        Ok(!self
            .db
            .scan_prefix(&StoreKey::type_prefix(spec_id))
            .await?
            .is_empty())
    }
}

struct KeyValueTransaction<D: KeyValueDb> {
    db: Arc<D>,
    commit_lock: Arc<Mutex<()>>,
    writes: WriteSet,
}

#[async_trait]
impl<D: KeyValueDb> RecordReader for KeyValueTransaction<D> {
    async fn load(&self, key: &StoreKey) -> Result<Option<StoredRecord>> {
        Ok(self.writes.view(key, get_record(&*self.db, key).await?))
    }

    async fn scan(&self, spec_id: &str) -> Result<Vec<StoredRecord>> {
        let records = scan_records(&*self.db, spec_id).await?;
        Ok(self.writes.overlay_scan(spec_id, records))
    }
}

#[async_trait]
impl<D: KeyValueDb> CommandContext for KeyValueTransaction<D> {
    async fn insert(&mut self, record: StoredRecord) -> Result<()> {
        let current = get_record(&*self.db, &record.store_key()).await?;
        self.writes.stage_insert(record, current)
    }

    async fn update(&mut self, record: StoredRecord, expected_version: &str) -> Result<()> {
        let current = get_record(&*self.db, &record.store_key()).await?;
        self.writes.stage_update(record, expected_version, current)
    }

    async fn delete(&mut self, spec_id: &str, key: &str, version: &str) -> Result<()> {
        let key = StoreKey::new(spec_id, key);
        let current = get_record(&*self.db, &key).await?;
        self.writes.stage_delete(key, version, current)
    }

    async fn flush(&mut self) -> Result<()> {
        Ok(())
    }
}

#[async_trait]
impl<D: KeyValueDb> StoreTransaction for KeyValueTransaction<D> {
    fn as_reader(&self) -> &dyn RecordReader {
        self
    }

    fn as_context(&mut self) -> &mut dyn CommandContext {
        self
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        let KeyValueTransaction {
            db,
            commit_lock,
            writes,
        } = *self;
        let _guard = commit_lock.lock().await;

        let mut current = BTreeMap::new();
        for (key, _) in writes.clone().into_writes() {
            let sequence = get_record(&*db, &key).await?.map(|r| r.version.sequence());
            current.insert(key, sequence);
        }
        writes.validate(|key| Ok(current.get(key).copied().flatten()))?;

        let batch = writes
            .into_writes()
            .map(|(key, record)| -> Result<KeyValueWrite> {
                let bytes = record.map(|r| r.encode()).transpose()?;
                Ok((key.to_string(), bytes))
            })
            .collect::<Result<Vec<_>>>()?;
        db.apply(batch).await
    }

    async fn abort(self: Box<Self>) -> Result<()> {
        Ok(())
    }
}
