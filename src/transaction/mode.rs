use crate::core::MetaError;
use std::fmt;
use std::str::FromStr;

/// How the object store treats command execution outside a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransactionMode {
    /// A transaction is started automatically when none is active.
    #[default]
    Chained,
    /// The caller must begin a transaction explicitly; executing without one
    /// fails fast.
    Unchained,
}

impl FromStr for TransactionMode {
    type Err = MetaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "chained" => Ok(TransactionMode::Chained),
            "unchained" => Ok(TransactionMode::Unchained),
            other => Err(MetaError::Configuration(format!(
                "Unknown transaction mode '{}' (expected chained or unchained)",
                other
            ))),
        }
    }
}

impl fmt::Display for TransactionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransactionMode::Chained => write!(f, "chained"),
            TransactionMode::Unchained => write!(f, "unchained"),
        }
    }
}
