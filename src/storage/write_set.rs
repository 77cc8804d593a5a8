use super::record::StoredRecord;
use crate::adapter::StoreKey;
use crate::core::{MetaError, Result};
use std::collections::BTreeMap;

#[derive(Debug, Clone)]
struct Staged {
    /// Committed sequence when the key was first touched; `None` if absent.
    base: Option<u64>,
    /// `None` stages a delete.
    record: Option<StoredRecord>,
}

/// Writes buffered by one transaction, with the committed versions they
/// were based on.
///
/// Each write is checked against the transaction's view when it is staged,
/// and the whole set is checked again against the committed state at commit,
/// so a concurrent commit in between surfaces as a conflict instead of a
/// lost update.
#[derive(Debug, Clone, Default)]
pub struct WriteSet {
    staged: BTreeMap<StoreKey, Staged>,
}

impl WriteSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.staged.len()
    }

    pub fn is_empty(&self) -> bool {
        self.staged.is_empty()
    }

    /// The record visible to this transaction under `key`.
    pub fn view(&self, key: &StoreKey, committed: Option<StoredRecord>) -> Option<StoredRecord> {
        match self.staged.get(key) {
            Some(staged) => staged.record.clone(),
            None => committed,
        }
    }

    /// Overlay staged writes on a committed scan of one type.
    pub fn overlay_scan(&self, spec_id: &str, committed: Vec<StoredRecord>) -> Vec<StoredRecord> {
        let mut merged: BTreeMap<StoreKey, StoredRecord> = committed
            .into_iter()
            .map(|record| (record.store_key(), record))
            .collect();
        for (key, staged) in self.staged.iter().filter(|(k, _)| k.spec_id() == spec_id) {
            match &staged.record {
                Some(record) => {
                    merged.insert(key.clone(), record.clone());
                }
                None => {
                    merged.remove(key);
                }
            }
        }
        merged.into_values().collect()
    }

    pub fn stage_insert(&mut self, record: StoredRecord, committed: Option<StoredRecord>) -> Result<()> {
        let key = record.store_key();
        if self.view(&key, committed.clone()).is_some() {
            return Err(MetaError::Store(format!("Record '{}' already exists", key)));
        }
        self.stage(key, Some(record), committed);
        Ok(())
    }

    pub fn stage_update(
        &mut self,
        record: StoredRecord,
        expected_version: &str,
        committed: Option<StoredRecord>,
    ) -> Result<()> {
        let key = record.store_key();
        self.check_current(&key, expected_version, committed.clone())?;
        self.stage(key, Some(record), committed);
        Ok(())
    }

    pub fn stage_delete(
        &mut self,
        key: StoreKey,
        version: &str,
        committed: Option<StoredRecord>,
    ) -> Result<()> {
        self.check_current(&key, version, committed.clone())?;
        self.stage(key, None, committed);
        Ok(())
    }

    /// Check every staged key against the committed sequence now in the
    /// store.
    pub fn validate<F>(&self, mut committed_sequence: F) -> Result<()>
    where
        F: FnMut(&StoreKey) -> Result<Option<u64>>,
    {
        for (key, staged) in &self.staged {
            let current = committed_sequence(key)?;
            if current != staged.base {
                tracing::warn!(key = %key, expected = ?staged.base, actual = ?current, "commit conflict");
                return Err(MetaError::ConcurrencyConflict {
                    oid: key.to_string(),
                    expected: describe(staged.base),
                    actual: describe(current),
                });
            }
        }
        Ok(())
    }

    /// Final writes in key order: `Some` to put, `None` to delete.
    pub fn into_writes(self) -> impl Iterator<Item = (StoreKey, Option<StoredRecord>)> {
        self.staged.into_iter().map(|(key, staged)| (key, staged.record))
    }

    fn check_current(
        &self,
        key: &StoreKey,
        expected_version: &str,
        committed: Option<StoredRecord>,
    ) -> Result<()> {
        let current = self
            .view(key, committed)
            .ok_or_else(|| MetaError::ObjectNotFound(key.to_string()))?;
        let actual = current.version.sequence_string();
        if actual != expected_version {
            tracing::warn!(key = %key, expected = expected_version, actual = %actual, "version conflict");
            return Err(MetaError::ConcurrencyConflict {
                oid: key.to_string(),
                expected: expected_version.to_string(),
                actual,
            });
        }
        Ok(())
    }

    fn stage(&mut self, key: StoreKey, record: Option<StoredRecord>, committed: Option<StoredRecord>) {
        match self.staged.get_mut(&key) {
            Some(staged) => staged.record = record,
            None => {
                let base = committed.map(|r| r.version.sequence());
                self.staged.insert(key, Staged { base, record });
            }
        }
    }
}

fn describe(sequence: Option<u64>) -> String {
    sequence.map_or_else(|| "<absent>".to_string(), |s| s.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::{DomainObject, Version};

    fn record(key: &str, version: &Version) -> StoredRecord {
        StoredRecord::new("Order", key, version.clone(), DomainObject::new())
    }

    #[test]
    fn test_update_checks_version_at_write_time() {
        let v1 = Version::initial("u");
        let committed = record("1", &v1);
        let mut writes = WriteSet::new();

        let err = writes
            .stage_update(record("1", &v1.next("u")), "7", Some(committed.clone()))
            .unwrap_err();
        assert!(err.is_conflict());

        writes
            .stage_update(record("1", &v1.next("u")), "1", Some(committed.clone()))
            .unwrap();
        // second update in the same transaction sees the staged version
        writes
            .stage_update(record("1", &v1.next("u").next("u")), "2", Some(committed))
            .unwrap();
        assert_eq!(writes.len(), 1);
    }

    #[test]
    fn test_missing_record_is_not_found() {
        let mut writes = WriteSet::new();
        let err = writes
            .stage_delete(StoreKey::new("Order", "9"), "1", None)
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_validate_detects_concurrent_commit() {
        let v1 = Version::initial("u");
        let mut writes = WriteSet::new();
        writes
            .stage_update(record("1", &v1.next("u")), "1", Some(record("1", &v1)))
            .unwrap();

        assert!(writes.validate(|_| Ok(Some(1))).is_ok());
        assert!(writes.validate(|_| Ok(Some(2))).unwrap_err().is_conflict());
    }

    #[test]
    fn test_overlay_scan() {
        let v1 = Version::initial("u");
        let mut writes = WriteSet::new();
        writes.stage_insert(record("3", &v1), None).unwrap();
        writes
            .stage_delete(StoreKey::new("Order", "1"), "1", Some(record("1", &v1)))
            .unwrap();

        let scanned = writes.overlay_scan("Order", vec![record("1", &v1), record("2", &v1)]);
        let keys: Vec<&str> = scanned.iter().map(|r| r.key.as_str()).collect();
        assert_eq!(keys, vec!["2", "3"]);
    }
}
