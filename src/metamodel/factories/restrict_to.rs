use super::replace_facet;
use crate::core::Result;
use crate::metamodel::declaration::RestrictTo;
use crate::metamodel::facet::{FacetKind, FacetSource, PrototypeFacet};
use crate::metamodel::factory::{FacetFactory, ProcessContext};
use crate::metamodel::holder::FeatureType;

/// Visibility restriction: `restrict_to = PROTOTYPING` hides the action
/// outside prototyping mode.
pub struct RestrictToFacetFactory;

impl FacetFactory for RestrictToFacetFactory {
    fn name(&self) -> &'static str {
        "RestrictToFacetFactory"
    }

    fn feature_types(&self) -> &'static [FeatureType] {
        &[FeatureType::Action]
    }

    fn provides(&self) -> &'static [FacetKind] {
        &[FacetKind::Prototype]
    }

    fn process(&self, ctx: &mut ProcessContext<'_>) -> Result<()> {
        let restrict_to = ctx
            .member
            .and_then(|m| m.action_annotation())
            .and_then(|a| a.restrict_to);

        let facet = match restrict_to {
            Some(RestrictTo::Prototyping) => Some(PrototypeFacet::new(FacetSource::Annotation).into()),
            Some(RestrictTo::NoRestrictions) | None => None,
        };
        replace_facet(ctx.holder, FacetKind::Prototype, facet)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigurationSnapshot;
    use crate::metamodel::declaration::{ActionAnnotation, MemberDeclaration, TypeDeclaration};
    use crate::metamodel::factories::test_support::{action_holder, run_member};

    #[test]
    fn test_prototyping_and_no_restrictions() {
        let type_decl = TypeDeclaration::new("Order");
        let config = ConfigurationSnapshot::empty();

        let member = MemberDeclaration::action("debugDump")
            .with_action(ActionAnnotation::new().restrict_to(RestrictTo::Prototyping));
        let mut holder = action_holder(&member);
        run_member(&RestrictToFacetFactory, &type_decl, &member, &config, &mut holder).unwrap();
        assert!(holder.contains::<PrototypeFacet>());

        // re-resolving the same holder with no restriction removes the facet
        let member = MemberDeclaration::action("debugDump")
            .with_action(ActionAnnotation::new().restrict_to(RestrictTo::NoRestrictions));
        run_member(&RestrictToFacetFactory, &type_decl, &member, &config, &mut holder).unwrap();
        assert!(!holder.contains::<PrototypeFacet>());
    }
}
