// ============================================================================
// Backing Stores
// ============================================================================
//
// Wire-level persistence behind the object store. A backing store hands out
// transactions; commands write through the transaction's command context,
// and the transaction revalidates versions when it commits.
//
// ============================================================================

pub mod context;
pub mod keyvalue;
pub mod memory;
pub mod record;
pub mod write_set;

pub use context::{BackingStore, CommandContext, RecordReader, StoreTransaction};
pub use keyvalue::{FileKeyValueDb, KeyValueBackingStore, KeyValueDb, KeyValueWrite, MemoryKeyValueDb};
pub use memory::InMemoryBackingStore;
pub use record::StoredRecord;
pub use write_set::WriteSet;
