// ============================================================================
// Facets
// ============================================================================
//
// A facet is an immutable capability marker attached to a metamodel element.
// The set of kinds is closed; each kind has its own record type carrying the
// provenance and the axis-specific payload.
//
// ============================================================================

use super::declaration::{CommandExecuteIn, CommandPersistence, EventType, SemanticsOf};
use std::fmt;

/// Type tag of a facet. A holder keeps at most one facet per kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FacetKind {
    ActionSemantics,
    Command,
    PublishedAction,
    Prototype,
    ActionDomainEvent,
    ActionInvocation,
    PropertyDomainEvent,
    Disabled,
    PublishedObject,
    Auditable,
    Persistability,
}

impl fmt::Display for FacetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FacetKind::ActionSemantics => "ActionSemanticsFacet",
            FacetKind::Command => "CommandFacet",
            FacetKind::PublishedAction => "PublishedActionFacet",
            FacetKind::Prototype => "PrototypeFacet",
            FacetKind::ActionDomainEvent => "ActionDomainEventFacet",
            FacetKind::ActionInvocation => "ActionInvocationFacet",
            FacetKind::PropertyDomainEvent => "PropertyDomainEventFacet",
            FacetKind::Disabled => "DisabledFacet",
            FacetKind::PublishedObject => "PublishedObjectFacet",
            FacetKind::Auditable => "AuditableFacet",
            FacetKind::Persistability => "PersistabilityFacet",
        };
        f.write_str(name)
    }
}

/// Where a facet's decision came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FacetSource {
    /// An explicit, concrete declaration.
    Annotation,
    /// A declaration was present but deferred to configuration, which
    /// enabled the facet; the declaration's sub-attributes are carried.
    AnnotationAsConfigured,
    /// No declaration; configuration enabled the facet.
    Configuration,
    /// Structural default.
    Default,
}

impl fmt::Display for FacetSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FacetSource::Annotation => write!(f, "annotation"),
            FacetSource::AnnotationAsConfigured => write!(f, "annotation-as-configured"),
            FacetSource::Configuration => write!(f, "configuration"),
            FacetSource::Default => write!(f, "default"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Persistability {
    #[default]
    UserPersistable,
    ProgramPersistable,
    NotPersistable,
}

impl Persistability {
    pub fn is_persistable(&self) -> bool {
        !matches!(self, Persistability::NotPersistable)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionSemanticsFacet {
    source: FacetSource,
    semantics: SemanticsOf,
}

impl ActionSemanticsFacet {
    pub fn new(source: FacetSource, semantics: SemanticsOf) -> Self {
        Self { source, semantics }
    }

    pub fn source(&self) -> FacetSource {
        self.source
    }

    pub fn semantics(&self) -> SemanticsOf {
        self.semantics
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandFacet {
    source: FacetSource,
    persistence: CommandPersistence,
    execute_in: CommandExecuteIn,
}

impl CommandFacet {
    pub fn new(
        source: FacetSource,
        persistence: CommandPersistence,
        execute_in: CommandExecuteIn,
    ) -> Self {
        Self {
            source,
            persistence,
            execute_in,
        }
    }

    pub fn source(&self) -> FacetSource {
        self.source
    }

    pub fn persistence(&self) -> CommandPersistence {
        self.persistence
    }

    pub fn execute_in(&self) -> CommandExecuteIn {
        self.execute_in
    }
}

/// Facets whose only payload is their provenance.
macro_rules! marker_facet {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq)]
        pub struct $name {
            source: FacetSource,
        }

        impl $name {
            pub fn new(source: FacetSource) -> Self {
                Self { source }
            }

            pub fn source(&self) -> FacetSource {
                self.source
            }
        }
    };
}

marker_facet!(
    /// Invocations of the action are published.
    PublishedActionFacet
);
marker_facet!(
    /// The member is only visible while prototyping.
    PrototypeFacet
);
marker_facet!(PublishedObjectFacet);
marker_facet!(AuditableFacet);

/// Facets naming an event type.
macro_rules! event_facet {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq)]
        pub struct $name {
            source: FacetSource,
            event_type: EventType,
        }

        impl $name {
            pub fn new(source: FacetSource, event_type: EventType) -> Self {
                Self { source, event_type }
            }

            pub fn source(&self) -> FacetSource {
                self.source
            }

            pub fn event_type(&self) -> &EventType {
                &self.event_type
            }
        }
    };
}

event_facet!(ActionDomainEventFacet);
event_facet!(
    /// Invocation strategy for an action. Its event type always mirrors the
    /// action's [`ActionDomainEventFacet`].
    ActionInvocationFacet
);
event_facet!(PropertyDomainEventFacet);

impl ActionInvocationFacet {
    /// Derive the invocation facet from a resolved domain-event facet.
    pub fn mirroring(domain_event: &ActionDomainEventFacet) -> Self {
        Self::new(domain_event.source(), domain_event.event_type().clone())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisabledFacet {
    source: FacetSource,
    reason: Option<String>,
}

impl DisabledFacet {
    pub fn new(source: FacetSource, reason: Option<String>) -> Self {
        Self { source, reason }
    }

    pub fn source(&self) -> FacetSource {
        self.source
    }

    pub fn reason(&self) -> Option<&str> {
        self.reason.as_deref()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistabilityFacet {
    source: FacetSource,
    persistability: Persistability,
}

impl PersistabilityFacet {
    pub fn new(source: FacetSource, persistability: Persistability) -> Self {
        Self {
            source,
            persistability,
        }
    }

    pub fn source(&self) -> FacetSource {
        self.source
    }

    pub fn persistability(&self) -> Persistability {
        self.persistability
    }
}

/// A facet of any kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Facet {
    ActionSemantics(ActionSemanticsFacet),
    Command(CommandFacet),
    PublishedAction(PublishedActionFacet),
    Prototype(PrototypeFacet),
    ActionDomainEvent(ActionDomainEventFacet),
    ActionInvocation(ActionInvocationFacet),
    PropertyDomainEvent(PropertyDomainEventFacet),
    Disabled(DisabledFacet),
    PublishedObject(PublishedObjectFacet),
    Auditable(AuditableFacet),
    Persistability(PersistabilityFacet),
}

/// Statically typed access to one variant of [`Facet`].
pub trait TypedFacet: Sized {
    const KIND: FacetKind;

    fn from_facet(facet: &Facet) -> Option<&Self>;

    fn into_facet(self) -> Facet;
}

macro_rules! typed_facets {
    ($($variant:ident => $ty:ty),* $(,)?) => {
        impl Facet {
            pub fn kind(&self) -> FacetKind {
                match self {
                    $(Facet::$variant(_) => FacetKind::$variant,)*
                }
            }

            pub fn source(&self) -> FacetSource {
                match self {
                    $(Facet::$variant(f) => f.source(),)*
                }
            }
        }

        $(
            impl TypedFacet for $ty {
                const KIND: FacetKind = FacetKind::$variant;

                fn from_facet(facet: &Facet) -> Option<&Self> {
                    match facet {
                        Facet::$variant(f) => Some(f),
                        _ => None,
                    }
                }

                fn into_facet(self) -> Facet {
                    Facet::$variant(self)
                }
            }

            impl From<$ty> for Facet {
                fn from(facet: $ty) -> Self {
                    Facet::$variant(facet)
                }
            }
        )*
    };
}

typed_facets! {
    ActionSemantics => ActionSemanticsFacet,
    Command => CommandFacet,
    PublishedAction => PublishedActionFacet,
    Prototype => PrototypeFacet,
    ActionDomainEvent => ActionDomainEventFacet,
    ActionInvocation => ActionInvocationFacet,
    PropertyDomainEvent => PropertyDomainEventFacet,
    Disabled => DisabledFacet,
    PublishedObject => PublishedObjectFacet,
    Auditable => AuditableFacet,
    Persistability => PersistabilityFacet,
}
