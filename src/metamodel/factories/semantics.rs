use crate::core::Result;
use crate::metamodel::declaration::SemanticsOf;
use crate::metamodel::facet::{ActionSemanticsFacet, FacetKind, FacetSource};
use crate::metamodel::factory::{FacetFactory, ProcessContext};
use crate::metamodel::holder::FeatureType;

/// Actions not declaring their semantics are treated as non-idempotent.
pub const DEFAULT_SEMANTICS: SemanticsOf = SemanticsOf::NonIdempotent;

pub struct ActionSemanticsFacetFactory;

impl FacetFactory for ActionSemanticsFacetFactory {
    fn name(&self) -> &'static str {
        "ActionSemanticsFacetFactory"
    }

    fn feature_types(&self) -> &'static [FeatureType] {
        &[FeatureType::Action]
    }

    fn provides(&self) -> &'static [FacetKind] {
        &[FacetKind::ActionSemantics]
    }

    fn process(&self, ctx: &mut ProcessContext<'_>) -> Result<()> {
        let declared = ctx
            .member
            .and_then(|m| m.action_annotation())
            .and_then(|a| a.semantics);

        let facet = match declared {
            Some(semantics) => ActionSemanticsFacet::new(FacetSource::Annotation, semantics),
            None => ActionSemanticsFacet::new(FacetSource::Default, DEFAULT_SEMANTICS),
        };
        ctx.holder.add_facet(facet)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigurationSnapshot;
    use crate::metamodel::declaration::{ActionAnnotation, MemberDeclaration, TypeDeclaration};
    use crate::metamodel::factories::test_support::{action_holder, run_member};

    #[test]
    fn test_declared_semantics_from_annotation() {
        let member = MemberDeclaration::action("lookup")
            .with_action(ActionAnnotation::new().semantics(SemanticsOf::Safe));
        let mut holder = action_holder(&member);
        run_member(
            &ActionSemanticsFacetFactory,
            &TypeDeclaration::new("Order"),
            &member,
            &ConfigurationSnapshot::empty(),
            &mut holder,
        )
        .unwrap();

        let facet = holder.get::<ActionSemanticsFacet>().unwrap();
        assert_eq!(facet.semantics(), SemanticsOf::Safe);
        assert_eq!(facet.source(), FacetSource::Annotation);
    }

    #[test]
    fn test_missing_semantics_defaults_to_non_idempotent() {
        let member = MemberDeclaration::action("place");
        let mut holder = action_holder(&member);
        run_member(
            &ActionSemanticsFacetFactory,
            &TypeDeclaration::new("Order"),
            &member,
            &ConfigurationSnapshot::empty(),
            &mut holder,
        )
        .unwrap();

        let facet = holder.get::<ActionSemanticsFacet>().unwrap();
        assert_eq!(facet.semantics(), SemanticsOf::NonIdempotent);
        assert_eq!(facet.source(), FacetSource::Default);
    }
}
