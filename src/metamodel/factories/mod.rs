// ============================================================================
// Built-in Facet Factories
// ============================================================================
//
// One factory per capability axis. Every axis follows the same precedence:
//
//   explicit concrete declaration  >  configuration default  >  structural default
//
// and an explicit disabling declaration always wins over configuration.
//
// ============================================================================

pub mod command;
pub mod domain_event;
pub mod domain_object;
pub mod editing;
pub mod publishing;
pub mod restrict_to;
pub mod semantics;

pub use command::CommandFacetFactory;
pub use domain_event::{ActionDomainEventFacetFactory, PropertyDomainEventFacetFactory};
pub use domain_object::DomainObjectFacetFactory;
pub use editing::PropertyEditingFacetFactory;
pub use publishing::PublishedActionFacetFactory;
pub use restrict_to::RestrictToFacetFactory;
pub use semantics::ActionSemanticsFacetFactory;

use super::declaration::{Auditing, CommandReification, Editing, Publishing};
use super::facet::{ActionSemanticsFacet, Facet, FacetKind, FacetSource};
use super::holder::FacetHolder;
use crate::config::{ActionPolicy, ObjectPolicy};
use crate::core::{MetaError, Result};

/// What a member declared for one enable/disable axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Declared {
    Absent,
    AsConfigured,
    Enabled,
    Disabled,
}

macro_rules! declared_from {
    ($($ty:ident),*) => {
        $(
            impl From<$ty> for Declared {
                fn from(value: $ty) -> Self {
                    match value {
                        $ty::AsConfigured => Declared::AsConfigured,
                        $ty::Enabled => Declared::Enabled,
                        $ty::Disabled => Declared::Disabled,
                    }
                }
            }
        )*
    };
}

declared_from!(CommandReification, Publishing, Editing, Auditing);

impl Declared {
    pub(crate) fn of<T: Into<Declared>>(value: Option<T>) -> Self {
        value.map_or(Declared::Absent, Into::into)
    }

    /// Provenance of a facet enabled through configuration.
    fn configured_source(self) -> FacetSource {
        match self {
            Declared::AsConfigured => FacetSource::AnnotationAsConfigured,
            _ => FacetSource::Configuration,
        }
    }
}

/// Resolve an action-level axis (command, publishing).
///
/// Returns the provenance of the facet to attach, or `None` when no facet
/// of the axis should be present. The `ignoreQueryOnly` policy needs the
/// action's semantics; when no semantics facet has been resolved yet the
/// build fails rather than guessing.
pub(crate) fn resolve_action_axis(
    axis: &str,
    declared: Declared,
    policy: ActionPolicy,
    holder: &FacetHolder,
) -> Result<Option<FacetSource>> {
    match declared {
        Declared::Enabled => Ok(Some(FacetSource::Annotation)),
        Declared::Disabled => Ok(None),
        Declared::Absent | Declared::AsConfigured => match policy {
            ActionPolicy::None => Ok(None),
            ActionPolicy::All => Ok(Some(declared.configured_source())),
            ActionPolicy::IgnoreQueryOnly => {
                let semantics = holder.get::<ActionSemanticsFacet>().ok_or_else(|| {
                    MetaError::Configuration(format!(
                        "{} policy 'ignoreQueryOnly' on '{}' requires a resolved {}",
                        axis,
                        holder.identifier(),
                        FacetKind::ActionSemantics
                    ))
                })?;
                if semantics.semantics().is_safe_in_nature() {
                    Ok(None)
                } else {
                    Ok(Some(declared.configured_source()))
                }
            }
        },
    }
}

/// Resolve an object-level axis (publishing, auditing).
pub(crate) fn resolve_object_axis(declared: Declared, policy: ObjectPolicy) -> Option<FacetSource> {
    match declared {
        Declared::Enabled => Some(FacetSource::Annotation),
        Declared::Disabled => None,
        Declared::Absent | Declared::AsConfigured => match policy {
            ObjectPolicy::None => None,
            ObjectPolicy::All => Some(declared.configured_source()),
        },
    }
}

/// Attach `facet`, or remove any facet of `kind` when there is none to
/// attach, so that re-resolving an element never leaves a stale facet.
pub(crate) fn replace_facet(
    holder: &mut FacetHolder,
    kind: FacetKind,
    facet: Option<Facet>,
) -> Result<()> {
    match facet {
        Some(facet) => {
            holder.add_facet(facet)?;
        }
        None => {
            holder.remove_facet(kind)?;
        }
    }
    Ok(())
}
