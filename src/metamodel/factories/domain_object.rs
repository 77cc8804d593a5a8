use super::{Declared, replace_facet, resolve_object_axis};
use crate::core::Result;
use crate::metamodel::declaration::Nature;
use crate::metamodel::facet::{
    AuditableFacet, FacetKind, FacetSource, Persistability, PersistabilityFacet,
    PublishedObjectFacet,
};
use crate::metamodel::factory::{FacetFactory, ProcessContext};
use crate::metamodel::holder::FeatureType;

/// Type-level facets: persistability, object publishing and auditing.
pub struct DomainObjectFacetFactory;

impl FacetFactory for DomainObjectFacetFactory {
    fn name(&self) -> &'static str {
        "DomainObjectFacetFactory"
    }

    fn feature_types(&self) -> &'static [FeatureType] {
        &[FeatureType::Object]
    }

    fn provides(&self) -> &'static [FacetKind] {
        &[
            FacetKind::Persistability,
            FacetKind::PublishedObject,
            FacetKind::Auditable,
        ]
    }

    fn process(&self, ctx: &mut ProcessContext<'_>) -> Result<()> {
        let annotation = ctx.type_decl.domain_object_annotation();

        let persistability = match annotation.map(|d| d.nature) {
            Some(Nature::ViewModel) => {
                PersistabilityFacet::new(FacetSource::Annotation, Persistability::NotPersistable)
            }
            Some(Nature::Entity) => {
                PersistabilityFacet::new(FacetSource::Annotation, Persistability::UserPersistable)
            }
            None => PersistabilityFacet::new(FacetSource::Default, Persistability::UserPersistable),
        };
        ctx.holder.add_facet(persistability)?;

        if ctx.type_decl.has_transaction_id {
            return Ok(());
        }

        let published = resolve_object_axis(
            Declared::of(annotation.map(|d| d.publishing)),
            ctx.config.publish_object_policy()?,
        )
        .map(|source| PublishedObjectFacet::new(source).into());
        replace_facet(ctx.holder, FacetKind::PublishedObject, published)?;

        let audited = resolve_object_axis(
            Declared::of(annotation.map(|d| d.auditing)),
            ctx.config.audit_object_policy()?,
        )
        .map(|source| AuditableFacet::new(source).into());
        replace_facet(ctx.holder, FacetKind::Auditable, audited)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AUDIT_OBJECTS_KEY, ConfigurationSnapshot, PUBLISH_OBJECTS_KEY};
    use crate::metamodel::declaration::{
        Auditing, DomainObjectAnnotation, Publishing, TypeDeclaration,
    };
    use crate::metamodel::factories::test_support::run_type;

    #[test]
    fn test_view_model_is_not_persistable() {
        let decl = TypeDeclaration::new("Dashboard")
            .with_domain_object(DomainObjectAnnotation::new().nature(Nature::ViewModel));
        let holder = run_type(&DomainObjectFacetFactory, &decl, &ConfigurationSnapshot::empty()).unwrap();
        assert_eq!(
            holder.get::<PersistabilityFacet>().unwrap().persistability(),
            Persistability::NotPersistable
        );
    }

    #[test]
    fn test_undeclared_type_is_persistable_by_default() {
        let decl = TypeDeclaration::new("Customer");
        let holder = run_type(&DomainObjectFacetFactory, &decl, &ConfigurationSnapshot::empty()).unwrap();
        let facet = holder.get::<PersistabilityFacet>().unwrap();
        assert_eq!(facet.source(), FacetSource::Default);
        assert!(facet.persistability().is_persistable());
        assert!(!holder.contains::<PublishedObjectFacet>());
        assert!(!holder.contains::<AuditableFacet>());
    }

    #[test]
    fn test_publishing_and_auditing_precedence() {
        let config = ConfigurationSnapshot::from_pairs([
            (PUBLISH_OBJECTS_KEY, "all"),
            (AUDIT_OBJECTS_KEY, "all"),
        ]);
        let decl = TypeDeclaration::new("Order").with_domain_object(
            DomainObjectAnnotation::new()
                .publishing(Publishing::Disabled)
                .auditing(Auditing::AsConfigured),
        );
        let holder = run_type(&DomainObjectFacetFactory, &decl, &config).unwrap();

        assert!(!holder.contains::<PublishedObjectFacet>());
        assert_eq!(
            holder.get::<AuditableFacet>().unwrap().source(),
            FacetSource::AnnotationAsConfigured
        );
    }

    #[test]
    fn test_has_transaction_id_keeps_only_persistability() {
        let config = ConfigurationSnapshot::from_pairs([(AUDIT_OBJECTS_KEY, "all")]);
        let decl = TypeDeclaration::new("CommandJdo").has_transaction_id();
        let holder = run_type(&DomainObjectFacetFactory, &decl, &config).unwrap();
        assert_eq!(holder.len(), 1);
        assert!(holder.contains::<PersistabilityFacet>());
    }
}
