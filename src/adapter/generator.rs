use crate::core::Result;
use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use uuid::Uuid;

/// Source of object keys.
///
/// Transient keys only need to be unique within a process; persistent keys
/// must be unique within the backing store that hands out the generator.
pub trait OidGenerator: Send + Sync {
    fn name(&self) -> &'static str;

    fn next_transient_id(&self, spec_id: &str) -> Result<String>;

    fn next_persistent_id(&self, spec_id: &str) -> Result<String>;
}

static TRANSIENT_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_transient() -> String {
    TRANSIENT_SEQUENCE.fetch_add(1, Ordering::SeqCst).to_string()
}

/// Per-type counters: `1`, `2`, `3`, ...
#[derive(Debug, Default)]
pub struct SequenceOidGenerator {
    counters: Mutex<HashMap<String, u64>>,
}

impl SequenceOidGenerator {
    pub fn new() -> Self {
        Self::default()
    }
}

impl OidGenerator for SequenceOidGenerator {
    fn name(&self) -> &'static str {
        "sequence"
    }

    fn next_transient_id(&self, _spec_id: &str) -> Result<String> {
        Ok(next_transient())
    }

    fn next_persistent_id(&self, spec_id: &str) -> Result<String> {
        let mut counters = self.counters.lock()?;
        let counter = counters.entry(spec_id.to_string()).or_insert(0);
        *counter += 1;
        Ok(counter.to_string())
    }
}

/// Random v4 uuids, for stores that outlive the process.
#[derive(Debug, Default)]
pub struct UuidOidGenerator;

impl OidGenerator for UuidOidGenerator {
    fn name(&self) -> &'static str {
        "uuid"
    }

    fn next_transient_id(&self, _spec_id: &str) -> Result<String> {
        Ok(next_transient())
    }

    fn next_persistent_id(&self, _spec_id: &str) -> Result<String> {
        Ok(Uuid::new_v4().to_string())
    }
}
