use super::oid::Oid;
use super::version::Version;
use crate::core::{MetaError, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// State of a domain object: an ordered map of JSON field values.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DomainObject {
    fields: Map<String, Value>,
}

impl DomainObject {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Object(fields) => Ok(Self { fields }),
            other => Err(MetaError::IllegalArgument(format!(
                "Domain object state must be a JSON object, got {}",
                other
            ))),
        }
    }

    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.fields.insert(name.into(), value.into())
    }

    pub fn remove(&mut self, name: &str) -> Option<Value> {
        self.fields.remove(name)
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    /// True when every field of `pattern` is present here with an equal value.
    pub fn matches(&self, pattern: &DomainObject) -> bool {
        pattern
            .fields
            .iter()
            .all(|(name, value)| self.fields.get(name) == Some(value))
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.fields)
    }
}

/// Lifecycle of an adapter's state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolveState {
    /// Identity known, state not loaded.
    Ghost,
    Resolving,
    Resolved,
}

impl ResolveState {
    pub fn can_change_to(self, next: ResolveState) -> bool {
        matches!(
            (self, next),
            (ResolveState::Ghost, ResolveState::Resolving)
                | (ResolveState::Resolving, ResolveState::Resolved)
        )
    }
}

impl fmt::Display for ResolveState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResolveState::Ghost => write!(f, "GHOST"),
            ResolveState::Resolving => write!(f, "RESOLVING"),
            ResolveState::Resolved => write!(f, "RESOLVED"),
        }
    }
}

/// Binds a domain object to its identity, resolve state and version.
#[derive(Debug, Clone)]
pub struct ObjectAdapter {
    oid: Oid,
    pojo: DomainObject,
    resolve_state: ResolveState,
    version: Option<Version>,
}

impl ObjectAdapter {
    /// Adapter for an object created in this session. Nothing needs to be
    /// loaded, so it starts resolved.
    pub(crate) fn resolved(oid: Oid, pojo: DomainObject) -> Self {
        Self {
            oid,
            pojo,
            resolve_state: ResolveState::Resolved,
            version: None,
        }
    }

    /// Adapter for a known identity whose state is still in the store.
    pub(crate) fn ghost(oid: Oid) -> Self {
        Self {
            oid,
            pojo: DomainObject::new(),
            resolve_state: ResolveState::Ghost,
            version: None,
        }
    }

    pub fn oid(&self) -> &Oid {
        &self.oid
    }

    pub fn spec_id(&self) -> &str {
        self.oid.spec_id()
    }

    pub fn pojo(&self) -> &DomainObject {
        &self.pojo
    }

    pub fn pojo_mut(&mut self) -> &mut DomainObject {
        &mut self.pojo
    }

    pub fn resolve_state(&self) -> ResolveState {
        self.resolve_state
    }

    pub fn is_resolved(&self) -> bool {
        self.resolve_state == ResolveState::Resolved
    }

    pub fn is_ghost(&self) -> bool {
        self.resolve_state == ResolveState::Ghost
    }

    pub fn is_transient(&self) -> bool {
        self.oid.is_transient()
    }

    pub fn is_persistent(&self) -> bool {
        self.oid.is_persistent()
    }

    pub fn is_aggregated(&self) -> bool {
        self.oid.is_aggregated()
    }

    pub fn version(&self) -> Option<&Version> {
        self.version.as_ref()
    }

    pub(crate) fn set_version(&mut self, version: Version) {
        self.version = Some(version);
    }

    pub(crate) fn replace_oid(&mut self, oid: Oid) {
        self.oid = oid;
    }

    pub(crate) fn restore_identity(&mut self, oid: Oid, version: Option<Version>) {
        self.oid = oid;
        self.version = version;
    }

    pub fn change_state(&mut self, next: ResolveState) -> Result<()> {
        if !self.resolve_state.can_change_to(next) {
            return Err(MetaError::IllegalState(format!(
                "Cannot change resolve state of '{}' from {} to {}",
                self.oid, self.resolve_state, next
            )));
        }
        tracing::trace!(oid = %self.oid, from = %self.resolve_state, to = %next, "resolve state changed");
        self.resolve_state = next;
        Ok(())
    }

    /// Bind loaded state, walking the adapter through to `Resolved`.
    pub(crate) fn bind(&mut self, pojo: DomainObject, version: Option<Version>) -> Result<()> {
        if self.resolve_state == ResolveState::Ghost {
            self.change_state(ResolveState::Resolving)?;
        }
        self.pojo = pojo;
        if let Some(version) = version {
            self.version = Some(version);
        }
        self.change_state(ResolveState::Resolved)
    }
}
