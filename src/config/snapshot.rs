use super::{
    ActionPolicy, AUDIT_OBJECTS_KEY, COMMAND_ACTIONS_KEY, DEFAULT_PERSISTOR_USER,
    OBJECTS_EDITING_KEY, ObjectPolicy, PERSISTOR_USER_KEY, POST_ACTION_EVENTS_FOR_DEFAULT_KEY,
    POST_PROPERTY_EVENTS_FOR_DEFAULT_KEY, PUBLISH_ACTIONS_KEY, PUBLISH_OBJECTS_KEY,
    TRANSACTION_MODE_KEY,
};
use crate::core::{MetaError, Result};
use crate::transaction::TransactionMode;
use std::collections::BTreeMap;
use std::str::FromStr;
use std::sync::Arc;

/// Read-only, resolved configuration.
///
/// Cloning is cheap (the map sits behind an `Arc`), so a snapshot is passed
/// by value or reference into every factory call instead of being looked up
/// from ambient state.
#[derive(Debug, Clone, Default)]
pub struct ConfigurationSnapshot {
    values: Arc<BTreeMap<String, String>>,
}

impl ConfigurationSnapshot {
    /// A snapshot with no keys at all; every typed accessor falls back to
    /// its documented default.
    pub fn empty() -> Self {
        Self::default()
    }

    pub(crate) fn from_map(values: BTreeMap<String, String>) -> Self {
        Self {
            values: Arc::new(values),
        }
    }

    /// Build a snapshot directly from pairs. Intended for tests.
    pub fn from_pairs<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self::from_map(
            pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    pub fn get_or<'a>(&'a self, key: &str, default: &'a str) -> &'a str {
        self.get(key).unwrap_or(default)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn get_bool(&self, key: &str, default: bool) -> Result<bool> {
        match self.get(key).map(str::trim) {
            None => Ok(default),
            Some(v) if v.eq_ignore_ascii_case("true") => Ok(true),
            Some(v) if v.eq_ignore_ascii_case("false") => Ok(false),
            Some(other) => Err(MetaError::Configuration(format!(
                "Key '{}' expects a boolean, got '{}'",
                key, other
            ))),
        }
    }

    /// Parse a value with `FromStr`, falling back to `default` when absent.
    pub fn get_parsed<T>(&self, key: &str, default: T) -> Result<T>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        match self.get(key) {
            None => Ok(default),
            Some(raw) => raw.trim().parse::<T>().map_err(|e| {
                MetaError::Configuration(format!("Invalid value for '{}': {}", key, e))
            }),
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn command_policy(&self) -> Result<ActionPolicy> {
        self.get_parsed(COMMAND_ACTIONS_KEY, ActionPolicy::None)
    }

    pub fn publish_action_policy(&self) -> Result<ActionPolicy> {
        self.get_parsed(PUBLISH_ACTIONS_KEY, ActionPolicy::None)
    }

    pub fn publish_object_policy(&self) -> Result<ObjectPolicy> {
        self.get_parsed(PUBLISH_OBJECTS_KEY, ObjectPolicy::None)
    }

    pub fn audit_object_policy(&self) -> Result<ObjectPolicy> {
        self.get_parsed(AUDIT_OBJECTS_KEY, ObjectPolicy::None)
    }

    pub fn post_action_events_for_default(&self) -> Result<bool> {
        self.get_bool(POST_ACTION_EVENTS_FOR_DEFAULT_KEY, true)
    }

    pub fn post_property_events_for_default(&self) -> Result<bool> {
        self.get_bool(POST_PROPERTY_EVENTS_FOR_DEFAULT_KEY, true)
    }

    pub fn objects_editing(&self) -> Result<bool> {
        self.get_bool(OBJECTS_EDITING_KEY, true)
    }

    pub fn transaction_mode(&self) -> Result<TransactionMode> {
        self.get_parsed(TRANSACTION_MODE_KEY, TransactionMode::Chained)
    }

    pub fn persistor_user(&self) -> &str {
        self.get_or(PERSISTOR_USER_KEY, DEFAULT_PERSISTOR_USER)
    }
}
