use thiserror::Error;

#[derive(Error, Debug)]
pub enum MetaError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Illegal state: {0}")]
    IllegalState(String),

    #[error("Illegal argument: {0}")]
    IllegalArgument(String),

    #[error("Object not found: {0}")]
    ObjectNotFound(String),

    #[error("Concurrency conflict on '{oid}': expected version {expected}, found {actual}")]
    ConcurrencyConflict {
        oid: String,
        expected: String,
        actual: String,
    },

    #[error("Unsupported operation: {0}")]
    UnsupportedOperation(String),

    #[error("Store error: {0}")]
    Store(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Lock error: {0}")]
    LockError(String),

    #[error("I/O error: {0}")]
    IoError(String),
}

impl MetaError {
    /// Not-found and conflict errors are distinct from generic store failures.
    pub fn is_not_found(&self) -> bool {
        matches!(self, MetaError::ObjectNotFound(_))
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, MetaError::ConcurrencyConflict { .. })
    }
}

pub type Result<T> = std::result::Result<T, MetaError>;

impl<T> From<std::sync::PoisonError<T>> for MetaError {
    fn from(err: std::sync::PoisonError<T>) -> Self {
        Self::LockError(err.to_string())
    }
}

impl From<std::io::Error> for MetaError {
    fn from(err: std::io::Error) -> Self {
        Self::IoError(err.to_string())
    }
}

impl From<serde_json::Error> for MetaError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<rmp_serde::encode::Error> for MetaError {
    fn from(err: rmp_serde::encode::Error) -> Self {
        Self::Serialization(format!("Failed to encode record: {}", err))
    }
}

impl From<rmp_serde::decode::Error> for MetaError {
    fn from(err: rmp_serde::decode::Error) -> Self {
        Self::Serialization(format!("Failed to decode record: {}", err))
    }
}
