// ============================================================================
// Object Store Transactions
// ============================================================================
//
// Lifecycle bookkeeping for one object-store transaction:
//
//   Active --commit--> Committed
//   Active --abort---> Aborted
//
// Isolation and version checks belong to the backing store; this type only
// knows which phase the transaction is in and how much work went through it.
//
// ============================================================================

use crate::core::{MetaError, Result};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

static TRANSACTION_SEQUENCE: AtomicU64 = AtomicU64::new(1);

/// Process-wide unique transaction number, used in logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TransactionId(u64);

impl TransactionId {
    fn next() -> Self {
        Self(TRANSACTION_SEQUENCE.fetch_add(1, Ordering::Relaxed))
    }

    pub fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "tx-{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionState {
    Active,
    Committed,
    Aborted,
}

impl TransactionState {
    pub fn is_active(&self) -> bool {
        *self == TransactionState::Active
    }

    /// Committed or aborted; no further work is accepted.
    pub fn is_finished(&self) -> bool {
        !self.is_active()
    }
}

impl fmt::Display for TransactionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            TransactionState::Active => "active",
            TransactionState::Committed => "committed",
            TransactionState::Aborted => "aborted",
        };
        f.write_str(label)
    }
}

/// Bookkeeping for one object-store transaction.
#[derive(Debug)]
pub struct Transaction {
    id: TransactionId,
    state: TransactionState,
    /// Set when the store started the transaction on the caller's behalf.
    auto_started: bool,
    commands_executed: usize,
    flushes: usize,
    started: std::time::Instant,
}

impl Transaction {
    pub fn new(auto_started: bool) -> Self {
        Self {
            id: TransactionId::next(),
            state: TransactionState::Active,
            auto_started,
            commands_executed: 0,
            flushes: 0,
            started: std::time::Instant::now(),
        }
    }

    pub fn id(&self) -> TransactionId {
        self.id
    }

    pub fn state(&self) -> TransactionState {
        self.state
    }

    pub fn is_auto_started(&self) -> bool {
        self.auto_started
    }

    pub fn commands_executed(&self) -> usize {
        self.commands_executed
    }

    pub fn flushes(&self) -> usize {
        self.flushes
    }

    pub fn duration(&self) -> std::time::Duration {
        self.started.elapsed()
    }

    /// Record one executed batch of `count` commands followed by a flush.
    pub fn record_batch(&mut self, count: usize) -> Result<()> {
        self.ensure_active("record commands")?;
        self.commands_executed += count;
        self.flushes += 1;
        Ok(())
    }

    pub fn commit(&mut self) -> Result<()> {
        self.ensure_active("commit")?;
        self.state = TransactionState::Committed;
        Ok(())
    }

    pub fn abort(&mut self) -> Result<()> {
        self.ensure_active("abort")?;
        self.state = TransactionState::Aborted;
        Ok(())
    }

    fn ensure_active(&self, what: &str) -> Result<()> {
        if !self.state.is_active() {
            return Err(MetaError::IllegalState(format!(
                "Cannot {}: transaction {} is already {}",
                what, self.id, self.state
            )));
        }
        Ok(())
    }
}
