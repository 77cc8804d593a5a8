// ============================================================================
// Metamodel
// ============================================================================
//
// Declarations go in, sealed facet holders come out. Facet factories run once
// per type and member while the metamodel is built; afterwards consumers only
// read facets through `FacetHolder::get` / `contains`.
//
// ============================================================================

pub mod declaration;
pub mod facet;
pub mod factories;
pub mod factory;
pub mod holder;
pub mod loader;
pub mod specification;
pub mod validator;

pub use declaration::{
    ActionAnnotation, Auditing, Capability, CommandExecuteIn, CommandPersistence,
    CommandReification, DomainObjectAnnotation, Editing, EventType, MemberDeclaration, Nature,
    PropertyAnnotation, Publishing, RestrictTo, SemanticsOf, TypeDeclaration,
};
pub use facet::{
    ActionDomainEventFacet, ActionInvocationFacet, ActionSemanticsFacet, AuditableFacet,
    CommandFacet, DisabledFacet, Facet, FacetKind, FacetSource, Persistability,
    PersistabilityFacet, PropertyDomainEventFacet, PrototypeFacet, PublishedActionFacet,
    PublishedObjectFacet, TypedFacet,
};
pub use factory::{FacetFactory, FacetFactoryPipeline, FacetProcessor, ProcessContext};
pub use holder::{FacetHolder, FeatureType, Identifier};
pub use loader::SpecificationLoader;
pub use specification::{Metamodel, ObjectMember, ObjectSpecification};
pub use validator::MetamodelValidator;
