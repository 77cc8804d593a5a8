use crate::core::MetaError;
use std::fmt;
use std::str::FromStr;

/// Configured default for an action-level axis (command, publishing).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ActionPolicy {
    /// Nothing is attached unless declared.
    #[default]
    None,
    /// Attached unless the action is safe (query-only).
    IgnoreQueryOnly,
    /// Attached for every action.
    All,
}

impl FromStr for ActionPolicy {
    type Err = MetaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "none" => Ok(ActionPolicy::None),
            "ignoreQueryOnly" | "ignoreSafe" => Ok(ActionPolicy::IgnoreQueryOnly),
            "all" => Ok(ActionPolicy::All),
            other => Err(MetaError::Configuration(format!(
                "Unknown action policy '{}' (expected none, ignoreQueryOnly or all)",
                other
            ))),
        }
    }
}

impl fmt::Display for ActionPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActionPolicy::None => write!(f, "none"),
            ActionPolicy::IgnoreQueryOnly => write!(f, "ignoreQueryOnly"),
            ActionPolicy::All => write!(f, "all"),
        }
    }
}

/// Configured default for an object-level axis (publishing, auditing).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ObjectPolicy {
    #[default]
    None,
    All,
}

impl FromStr for ObjectPolicy {
    type Err = MetaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "none" => Ok(ObjectPolicy::None),
            "all" => Ok(ObjectPolicy::All),
            other => Err(MetaError::Configuration(format!(
                "Unknown object policy '{}' (expected none or all)",
                other
            ))),
        }
    }
}

impl fmt::Display for ObjectPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ObjectPolicy::None => write!(f, "none"),
            ObjectPolicy::All => write!(f, "all"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ignore_safe_is_alias() {
        assert_eq!(
            "ignoreSafe".parse::<ActionPolicy>().unwrap(),
            ActionPolicy::IgnoreQueryOnly
        );
        assert_eq!(
            " ignoreQueryOnly ".parse::<ActionPolicy>().unwrap(),
            ActionPolicy::IgnoreQueryOnly
        );
    }

    #[test]
    fn test_unknown_policy_is_configuration_error() {
        let err = "sometimes".parse::<ActionPolicy>().unwrap_err();
        assert!(matches!(err, MetaError::Configuration(_)));
        assert!("ignoreQueryOnly".parse::<ObjectPolicy>().is_err());
    }
}
