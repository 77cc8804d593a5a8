// ============================================================================
// Transactions
// ============================================================================
//
// Demarcation mode (chained or unchained) and per-transaction bookkeeping
// for the object store.
//
// ============================================================================

pub mod mode;
pub mod state;

pub use mode::TransactionMode;
pub use state::{Transaction, TransactionId, TransactionState};
