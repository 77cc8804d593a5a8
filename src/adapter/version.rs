use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Optimistic concurrency stamp carried by every persistent object.
///
/// Only the sequence takes part in conflict detection; user and time record
/// who made the change and when.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Version {
    sequence: u64,
    user: String,
    time: DateTime<Utc>,
}

impl Version {
    pub fn initial(user: impl Into<String>) -> Self {
        Self {
            sequence: 1,
            user: user.into(),
            time: Utc::now(),
        }
    }

    pub fn next(&self, user: impl Into<String>) -> Self {
        Self {
            sequence: self.sequence + 1,
            user: user.into(),
            time: Utc::now(),
        }
    }

    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    pub fn user(&self) -> &str {
        &self.user
    }

    pub fn time(&self) -> DateTime<Utc> {
        self.time
    }

    /// True when the two stamps denote different revisions.
    pub fn different(&self, other: &Version) -> bool {
        self.sequence != other.sequence
    }

    /// The form passed to backing stores for version checks.
    pub fn sequence_string(&self) -> String {
        self.sequence.to_string()
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{} {} {}", self.sequence, self.user, self.time.to_rfc3339())
    }
}
