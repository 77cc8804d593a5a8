use super::replace_facet;
use crate::core::Result;
use crate::metamodel::declaration::Editing;
use crate::metamodel::facet::{DisabledFacet, FacetKind, FacetSource};
use crate::metamodel::factory::{FacetFactory, ProcessContext};
use crate::metamodel::holder::FeatureType;

/// Property editability.
///
/// Resolution order: the property's own `editing`, then the type's
/// `DomainObject.editing`, then `objects.editing`. Unlike the command axis,
/// the facet here is the restriction: disabling attaches a
/// [`DisabledFacet`], enabling attaches nothing.
pub struct PropertyEditingFacetFactory;

impl FacetFactory for PropertyEditingFacetFactory {
    fn name(&self) -> &'static str {
        "PropertyEditingFacetFactory"
    }

    fn feature_types(&self) -> &'static [FeatureType] {
        &[FeatureType::Property]
    }

    fn provides(&self) -> &'static [FacetKind] {
        &[FacetKind::Disabled]
    }

    fn process(&self, ctx: &mut ProcessContext<'_>) -> Result<()> {
        let annotation = ctx.member.and_then(|m| m.property_annotation());
        let member_editing = annotation.map_or(Editing::AsConfigured, |a| a.editing);
        let type_editing = ctx
            .type_decl
            .domain_object_annotation()
            .map_or(Editing::AsConfigured, |d| d.editing);

        let facet = match (member_editing, type_editing) {
            (Editing::Disabled, _) => Some(DisabledFacet::new(
                FacetSource::Annotation,
                annotation.and_then(|a| a.editing_disabled_reason.clone()),
            )),
            (Editing::Enabled, _) => None,
            (Editing::AsConfigured, Editing::Disabled) => Some(DisabledFacet::new(
                FacetSource::Annotation,
                Some(format!("Disabled for all properties of {}", ctx.type_decl.spec_id)),
            )),
            (Editing::AsConfigured, Editing::Enabled) => None,
            (Editing::AsConfigured, Editing::AsConfigured) => {
                if ctx.config.objects_editing()? {
                    None
                } else {
                    Some(DisabledFacet::new(FacetSource::Configuration, None))
                }
            }
        };
        replace_facet(ctx.holder, FacetKind::Disabled, facet.map(Into::into))
    }
}
