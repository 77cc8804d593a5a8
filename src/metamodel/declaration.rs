//! Declared capability metadata.
//!
//! These are the inputs to the facet factories: one [`TypeDeclaration`] per
//! described type with its members, each member carrying zero or more
//! [`Capability`] values. They can be assembled in code with the fluent
//! builders, or deserialized from a JSON side-table.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::holder::FeatureType;

pub const DEFAULT_ACTION_EVENT_TYPE: &str = "ActionDomainEvent.Default";
pub const DEFAULT_PROPERTY_EVENT_TYPE: &str = "PropertyDomainEvent.Default";

/// Name of a domain event type raised around member interaction.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventType(String);

impl EventType {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn default_action() -> Self {
        Self::new(DEFAULT_ACTION_EVENT_TYPE)
    }

    pub fn default_property() -> Self {
        Self::new(DEFAULT_PROPERTY_EVENT_TYPE)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True for the framework's generic default event types.
    pub fn is_framework_default(&self) -> bool {
        self.0 == DEFAULT_ACTION_EVENT_TYPE || self.0 == DEFAULT_PROPERTY_EVENT_TYPE
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Safety semantics of an action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SemanticsOf {
    SafeAndRequestCacheable,
    Safe,
    Idempotent,
    IdempotentAreYouSure,
    NonIdempotent,
    NonIdempotentAreYouSure,
}

impl SemanticsOf {
    /// Query-only: invoking the action changes no state.
    pub fn is_safe_in_nature(&self) -> bool {
        matches!(self, SemanticsOf::SafeAndRequestCacheable | SemanticsOf::Safe)
    }

    pub fn is_idempotent_in_nature(&self) -> bool {
        self.is_safe_in_nature()
            || matches!(
                self,
                SemanticsOf::Idempotent | SemanticsOf::IdempotentAreYouSure
            )
    }

    pub fn is_are_you_sure(&self) -> bool {
        matches!(
            self,
            SemanticsOf::IdempotentAreYouSure | SemanticsOf::NonIdempotentAreYouSure
        )
    }
}

/// Three-way declaration used by every enable/disable axis.
macro_rules! as_configured_enum {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
        #[serde(rename_all = "SCREAMING_SNAKE_CASE")]
        pub enum $name {
            /// Defer the decision to configuration.
            #[default]
            AsConfigured,
            Enabled,
            Disabled,
        }
    };
}

as_configured_enum!(
    /// Whether invoking an action is reified as a command.
    CommandReification
);
as_configured_enum!(
    /// Whether an action or object is published.
    Publishing
);
as_configured_enum!(
    /// Whether a property (or all properties of a type) may be edited.
    Editing
);
as_configured_enum!(
    /// Whether changes to an object are audited.
    Auditing
);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CommandPersistence {
    #[default]
    Persisted,
    NotPersisted,
    IfHinted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CommandExecuteIn {
    #[default]
    Foreground,
    Background,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RestrictTo {
    #[default]
    NoRestrictions,
    Prototyping,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Nature {
    #[default]
    Entity,
    ViewModel,
}

/// Action-level capability metadata.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ActionAnnotation {
    pub semantics: Option<SemanticsOf>,
    pub command: CommandReification,
    pub command_persistence: CommandPersistence,
    pub command_execute_in: CommandExecuteIn,
    pub publishing: Publishing,
    pub restrict_to: Option<RestrictTo>,
    pub domain_event: Option<EventType>,
}

impl ActionAnnotation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn semantics(mut self, semantics: SemanticsOf) -> Self {
        self.semantics = Some(semantics);
        self
    }

    pub fn command(mut self, command: CommandReification) -> Self {
        self.command = command;
        self
    }

    pub fn command_persistence(mut self, persistence: CommandPersistence) -> Self {
        self.command_persistence = persistence;
        self
    }

    pub fn command_execute_in(mut self, execute_in: CommandExecuteIn) -> Self {
        self.command_execute_in = execute_in;
        self
    }

    pub fn publishing(mut self, publishing: Publishing) -> Self {
        self.publishing = publishing;
        self
    }

    pub fn restrict_to(mut self, restrict_to: RestrictTo) -> Self {
        self.restrict_to = Some(restrict_to);
        self
    }

    pub fn domain_event(mut self, event_type: impl Into<String>) -> Self {
        self.domain_event = Some(EventType::new(event_type));
        self
    }
}

/// Property-level capability metadata.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PropertyAnnotation {
    pub editing: Editing,
    pub editing_disabled_reason: Option<String>,
    pub domain_event: Option<EventType>,
}

impl PropertyAnnotation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn editing(mut self, editing: Editing) -> Self {
        self.editing = editing;
        self
    }

    pub fn editing_disabled_reason(mut self, reason: impl Into<String>) -> Self {
        self.editing_disabled_reason = Some(reason.into());
        self
    }

    pub fn domain_event(mut self, event_type: impl Into<String>) -> Self {
        self.domain_event = Some(EventType::new(event_type));
        self
    }
}

/// Type-level capability metadata.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DomainObjectAnnotation {
    pub nature: Nature,
    pub editing: Editing,
    pub publishing: Publishing,
    pub auditing: Auditing,
}

impl DomainObjectAnnotation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn nature(mut self, nature: Nature) -> Self {
        self.nature = nature;
        self
    }

    pub fn editing(mut self, editing: Editing) -> Self {
        self.editing = editing;
        self
    }

    pub fn publishing(mut self, publishing: Publishing) -> Self {
        self.publishing = publishing;
        self
    }

    pub fn auditing(mut self, auditing: Auditing) -> Self {
        self.auditing = auditing;
        self
    }
}

/// A declared capability attached to a type or member.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Capability {
    Action(ActionAnnotation),
    Property(PropertyAnnotation),
    DomainObject(DomainObjectAnnotation),
}

/// One introspected member (action or property) of a type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberDeclaration {
    pub name: String,
    pub feature: FeatureType,
    #[serde(default)]
    pub capabilities: Vec<Capability>,
}

impl MemberDeclaration {
    pub fn action(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            feature: FeatureType::Action,
            capabilities: Vec::new(),
        }
    }

    pub fn property(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            feature: FeatureType::Property,
            capabilities: Vec::new(),
        }
    }

    pub fn with(mut self, capability: Capability) -> Self {
        self.capabilities.push(capability);
        self
    }

    pub fn with_action(self, annotation: ActionAnnotation) -> Self {
        self.with(Capability::Action(annotation))
    }

    pub fn with_property(self, annotation: PropertyAnnotation) -> Self {
        self.with(Capability::Property(annotation))
    }

    /// The action annotation, if declared. When declared more than once the
    /// last declaration wins.
    pub fn action_annotation(&self) -> Option<&ActionAnnotation> {
        self.capabilities.iter().rev().find_map(|c| match c {
            Capability::Action(a) => Some(a),
            _ => None,
        })
    }

    pub fn property_annotation(&self) -> Option<&PropertyAnnotation> {
        self.capabilities.iter().rev().find_map(|c| match c {
            Capability::Property(p) => Some(p),
            _ => None,
        })
    }
}

/// A described type: its identifier, type-level capabilities and members.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeDeclaration {
    pub spec_id: String,
    /// Marks framework types (commands, interactions) that carry their own
    /// transaction id; member facets for them are already decided.
    #[serde(default)]
    pub has_transaction_id: bool,
    #[serde(default)]
    pub capabilities: Vec<Capability>,
    #[serde(default)]
    pub members: Vec<MemberDeclaration>,
}

impl TypeDeclaration {
    pub fn new(spec_id: impl Into<String>) -> Self {
        Self {
            spec_id: spec_id.into(),
            has_transaction_id: false,
            capabilities: Vec::new(),
            members: Vec::new(),
        }
    }

    pub fn has_transaction_id(mut self) -> Self {
        self.has_transaction_id = true;
        self
    }

    pub fn with_domain_object(mut self, annotation: DomainObjectAnnotation) -> Self {
        self.capabilities.push(Capability::DomainObject(annotation));
        self
    }

    pub fn member(mut self, member: MemberDeclaration) -> Self {
        self.members.push(member);
        self
    }

    pub fn domain_object_annotation(&self) -> Option<&DomainObjectAnnotation> {
        self.capabilities.iter().rev().find_map(|c| match c {
            Capability::DomainObject(d) => Some(d),
            _ => None,
        })
    }

    /// Parse a list of declarations from a JSON side-table.
    pub fn list_from_json(json: &str) -> crate::core::Result<Vec<TypeDeclaration>> {
        Ok(serde_json::from_str(json)?)
    }
}
