use super::{Declared, replace_facet, resolve_action_axis};
use crate::core::Result;
use crate::metamodel::facet::{FacetKind, PublishedActionFacet};
use crate::metamodel::factory::{FacetFactory, ProcessContext};
use crate::metamodel::holder::FeatureType;

/// Publishing axis for actions, driven by `services.publish.actions`.
pub struct PublishedActionFacetFactory;

impl FacetFactory for PublishedActionFacetFactory {
    fn name(&self) -> &'static str {
        "PublishedActionFacetFactory"
    }

    fn feature_types(&self) -> &'static [FeatureType] {
        &[FeatureType::Action]
    }

    fn provides(&self) -> &'static [FacetKind] {
        &[FacetKind::PublishedAction]
    }

    fn depends_on(&self) -> &'static [FacetKind] {
        &[FacetKind::ActionSemantics]
    }

    fn process(&self, ctx: &mut ProcessContext<'_>) -> Result<()> {
        if ctx.type_decl.has_transaction_id {
            return Ok(());
        }

        let declared = Declared::of(
            ctx.member
                .and_then(|m| m.action_annotation())
                .map(|a| a.publishing),
        );
        let policy = ctx.config.publish_action_policy()?;

        let facet = resolve_action_axis("Publishing", declared, policy, ctx.holder)?
            .map(|source| PublishedActionFacet::new(source).into());
        replace_facet(ctx.holder, FacetKind::PublishedAction, facet)
    }
}
