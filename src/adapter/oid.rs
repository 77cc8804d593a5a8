use crate::core::{MetaError, Result};
use std::fmt;
use std::str::FromStr;

const PERSISTENT_SEPARATOR: char = '@';
const TRANSIENT_MARKER: char = '!';
const AGGREGATE_SEPARATOR: char = '~';
const STORE_KEY_SEPARATOR: char = '|';

const RESERVED: [char; 4] = [
    PERSISTENT_SEPARATOR,
    TRANSIENT_MARKER,
    AGGREGATE_SEPARATOR,
    STORE_KEY_SEPARATOR,
];

fn check_part(part: &str, what: &str) -> Result<()> {
    if part.is_empty() {
        return Err(MetaError::IllegalArgument(format!("Empty {} in oid", what)));
    }
    if let Some(c) = part.chars().find(|c| RESERVED.contains(c)) {
        return Err(MetaError::IllegalArgument(format!(
            "Reserved character '{}' in oid {} '{}'",
            c, what, part
        )));
    }
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OidState {
    Transient,
    Persistent,
}

/// Identity of a top-level object: its type and its key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RootOid {
    spec_id: String,
    identifier: String,
    state: OidState,
}

impl RootOid {
    pub fn transient(spec_id: impl Into<String>, identifier: impl Into<String>) -> Result<Self> {
        Self::new(spec_id.into(), identifier.into(), OidState::Transient)
    }

    pub fn persistent(spec_id: impl Into<String>, identifier: impl Into<String>) -> Result<Self> {
        Self::new(spec_id.into(), identifier.into(), OidState::Persistent)
    }

    fn new(spec_id: String, identifier: String, state: OidState) -> Result<Self> {
        check_part(&spec_id, "type")?;
        check_part(&identifier, "key")?;
        Ok(Self {
            spec_id,
            identifier,
            state,
        })
    }

    pub fn spec_id(&self) -> &str {
        &self.spec_id
    }

    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    pub fn state(&self) -> OidState {
        self.state
    }

    pub fn is_transient(&self) -> bool {
        self.state == OidState::Transient
    }

    /// Same type, new persistent key.
    pub fn as_persistent(&self, identifier: impl Into<String>) -> Result<Self> {
        Self::persistent(self.spec_id.clone(), identifier)
    }

    /// Backing-store key of a persistent oid.
    pub fn store_key(&self) -> Result<StoreKey> {
        if self.is_transient() {
            return Err(MetaError::IllegalState(format!(
                "Transient oid '{}' has no store key",
                self
            )));
        }
        Ok(StoreKey::new(&self.spec_id, &self.identifier))
    }
}

impl fmt::Display for RootOid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_transient() {
            write!(f, "{}", TRANSIENT_MARKER)?;
        }
        write!(f, "{}{}{}", self.spec_id, PERSISTENT_SEPARATOR, self.identifier)
    }
}

impl FromStr for RootOid {
    type Err = MetaError;

    fn from_str(s: &str) -> Result<Self> {
        let (state, rest) = match s.strip_prefix(TRANSIENT_MARKER) {
            Some(rest) => (OidState::Transient, rest),
            None => (OidState::Persistent, s),
        };
        let (spec_id, identifier) = rest.split_once(PERSISTENT_SEPARATOR).ok_or_else(|| {
            MetaError::IllegalArgument(format!("Malformed oid '{}': expected <type>@<key>", s))
        })?;
        Self::new(spec_id.to_string(), identifier.to_string(), state)
    }
}

/// Identity of an embedded part: meaningful only relative to its parent.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AggregatedOid {
    parent: Box<Oid>,
    spec_id: String,
    local_id: String,
}

impl AggregatedOid {
    pub fn new(parent: Oid, spec_id: impl Into<String>, local_id: impl Into<String>) -> Result<Self> {
        let spec_id = spec_id.into();
        let local_id = local_id.into();
        check_part(&spec_id, "type")?;
        check_part(&local_id, "local id")?;
        Ok(Self {
            parent: Box::new(parent),
            spec_id,
            local_id,
        })
    }

    pub fn parent(&self) -> &Oid {
        &self.parent
    }

    pub fn spec_id(&self) -> &str {
        &self.spec_id
    }

    pub fn local_id(&self) -> &str {
        &self.local_id
    }
}

/// Object identity, transient or persistent, root or aggregated.
///
/// String form:
///
/// | variant            | encoding                 |
/// |--------------------|--------------------------|
/// | persistent root    | `<type>@<key>`           |
/// | transient root     | `!<type>@<key>`          |
/// | aggregated         | `<parent>~<type>@<local>`|
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Oid {
    Root(RootOid),
    Aggregated(AggregatedOid),
}

impl Oid {
    pub fn transient(spec_id: impl Into<String>, identifier: impl Into<String>) -> Result<Self> {
        RootOid::transient(spec_id, identifier).map(Oid::Root)
    }

    pub fn persistent(spec_id: impl Into<String>, identifier: impl Into<String>) -> Result<Self> {
        RootOid::persistent(spec_id, identifier).map(Oid::Root)
    }

    pub fn aggregated(parent: Oid, spec_id: impl Into<String>, local_id: impl Into<String>) -> Result<Self> {
        AggregatedOid::new(parent, spec_id, local_id).map(Oid::Aggregated)
    }

    /// The type of the object this oid identifies.
    pub fn spec_id(&self) -> &str {
        match self {
            Oid::Root(root) => root.spec_id(),
            Oid::Aggregated(agg) => agg.spec_id(),
        }
    }

    /// The top-level oid this oid belongs to (itself for roots).
    pub fn root(&self) -> &RootOid {
        match self {
            Oid::Root(root) => root,
            Oid::Aggregated(agg) => agg.parent.root(),
        }
    }

    pub fn as_root(&self) -> Option<&RootOid> {
        match self {
            Oid::Root(root) => Some(root),
            Oid::Aggregated(_) => None,
        }
    }

    pub fn parent(&self) -> Option<&Oid> {
        match self {
            Oid::Root(_) => None,
            Oid::Aggregated(agg) => Some(agg.parent()),
        }
    }

    pub fn is_aggregated(&self) -> bool {
        matches!(self, Oid::Aggregated(_))
    }

    /// Aggregated oids share the state of their root.
    pub fn is_transient(&self) -> bool {
        self.root().is_transient()
    }

    pub fn is_persistent(&self) -> bool {
        !self.is_transient()
    }

    /// Rebuild this oid on top of a different root, keeping every
    /// aggregation step.
    pub fn with_root(&self, root: RootOid) -> Oid {
        match self {
            Oid::Root(_) => Oid::Root(root),
            Oid::Aggregated(agg) => Oid::Aggregated(AggregatedOid {
                parent: Box::new(agg.parent.with_root(root)),
                spec_id: agg.spec_id.clone(),
                local_id: agg.local_id.clone(),
            }),
        }
    }
}

impl From<RootOid> for Oid {
    fn from(root: RootOid) -> Self {
        Oid::Root(root)
    }
}

impl fmt::Display for Oid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Oid::Root(root) => write!(f, "{}", root),
            Oid::Aggregated(agg) => write!(
                f,
                "{}{}{}{}{}",
                agg.parent, AGGREGATE_SEPARATOR, agg.spec_id, PERSISTENT_SEPARATOR, agg.local_id
            ),
        }
    }
}

impl FromStr for Oid {
    type Err = MetaError;

    fn from_str(s: &str) -> Result<Self> {
        match s.rsplit_once(AGGREGATE_SEPARATOR) {
            None => s.parse::<RootOid>().map(Oid::Root),
            Some((parent, local)) => {
                let parent: Oid = parent.parse()?;
                let (spec_id, local_id) = local.split_once(PERSISTENT_SEPARATOR).ok_or_else(|| {
                    MetaError::IllegalArgument(format!(
                        "Malformed aggregated oid '{}': expected <parent>~<type>@<local>",
                        s
                    ))
                })?;
                Oid::aggregated(parent, spec_id, local_id)
            }
        }
    }
}

/// Key of a record in a key/value backing store: `<type>|<key>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StoreKey {
    spec_id: String,
    key: String,
}

impl StoreKey {
    pub fn new(spec_id: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            spec_id: spec_id.into(),
            key: key.into(),
        }
    }

    pub fn spec_id(&self) -> &str {
        &self.spec_id
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Prefix shared by every key of one type.
    pub fn type_prefix(spec_id: &str) -> String {
        format!("{}{}", spec_id, STORE_KEY_SEPARATOR)
    }

    pub fn to_oid(&self) -> Result<Oid> {
        Oid::persistent(self.spec_id.clone(), self.key.clone())
    }
}

impl fmt::Display for StoreKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.spec_id, STORE_KEY_SEPARATOR, self.key)
    }
}

impl FromStr for StoreKey {
    type Err = MetaError;

    fn from_str(s: &str) -> Result<Self> {
        match s.split_once(STORE_KEY_SEPARATOR) {
            Some((spec_id, key)) if !spec_id.is_empty() && !key.is_empty() => {
                Ok(Self::new(spec_id, key))
            }
            _ => Err(MetaError::IllegalArgument(format!(
                "Malformed store key '{}': expected <type>|<key>",
                s
            ))),
        }
    }
}
