use super::{Declared, replace_facet, resolve_action_axis};
use crate::core::Result;
use crate::metamodel::declaration::{CommandExecuteIn, CommandPersistence};
use crate::metamodel::facet::{CommandFacet, FacetKind};
use crate::metamodel::factory::{FacetFactory, ProcessContext};
use crate::metamodel::holder::FeatureType;

/// Decides whether invoking an action is reified as a command.
///
/// * `command = ENABLED` attaches a facet whatever the configuration says.
/// * `command = DISABLED` attaches nothing whatever the configuration says.
/// * absent or `AS_CONFIGURED` follows `services.command.actions`; the
///   `ignoreQueryOnly` policy consults the action's semantics facet.
///
/// Types marked with `has_transaction_id` are skipped: their commands are
/// already decided by the framework.
pub struct CommandFacetFactory;

impl FacetFactory for CommandFacetFactory {
    fn name(&self) -> &'static str {
        "CommandFacetFactory"
    }

    fn feature_types(&self) -> &'static [FeatureType] {
        &[FeatureType::Action]
    }

    fn provides(&self) -> &'static [FacetKind] {
        &[FacetKind::Command]
    }

    fn depends_on(&self) -> &'static [FacetKind] {
        &[FacetKind::ActionSemantics]
    }

    fn process(&self, ctx: &mut ProcessContext<'_>) -> Result<()> {
        if ctx.type_decl.has_transaction_id {
            return Ok(());
        }

        let annotation = ctx.member.and_then(|m| m.action_annotation());
        let declared = Declared::of(annotation.map(|a| a.command));
        let policy = ctx.config.command_policy()?;

        let source = resolve_action_axis("Command", declared, policy, ctx.holder)?;
        let facet = source.map(|source| {
            let persistence = annotation.map_or(CommandPersistence::default(), |a| a.command_persistence);
            let execute_in = annotation.map_or(CommandExecuteIn::default(), |a| a.command_execute_in);
            CommandFacet::new(source, persistence, execute_in).into()
        });
        replace_facet(ctx.holder, FacetKind::Command, facet)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{COMMAND_ACTIONS_KEY, ConfigurationSnapshot};
    use crate::core::MetaError;
    use crate::metamodel::declaration::{
        ActionAnnotation, CommandReification, MemberDeclaration, SemanticsOf, TypeDeclaration,
    };
    use crate::metamodel::facet::{ActionSemanticsFacet, FacetSource};
    use crate::metamodel::factories::test_support::{action_holder, run_member};

    fn config(policy: &str) -> ConfigurationSnapshot {
        ConfigurationSnapshot::from_pairs([(COMMAND_ACTIONS_KEY, policy)])
    }

    fn with_semantics(member: &MemberDeclaration, semantics: SemanticsOf) -> crate::metamodel::FacetHolder {
        let mut holder = action_holder(member);
        holder
            .add_facet(ActionSemanticsFacet::new(FacetSource::Annotation, semantics))
            .unwrap();
        holder
    }

    #[test]
    fn test_as_configured_ignore_query_only_safe_attaches_nothing() {
        let member = MemberDeclaration::action("lookup").with_action(
            ActionAnnotation::new()
                .command(CommandReification::AsConfigured)
                .command_persistence(CommandPersistence::IfHinted)
                .command_execute_in(CommandExecuteIn::Background),
        );
        let mut holder = with_semantics(&member, SemanticsOf::Safe);

        run_member(
            &CommandFacetFactory,
            &TypeDeclaration::new("Order"),
            &member,
            &config("ignoreQueryOnly"),
            &mut holder,
        )
        .unwrap();

        assert!(holder.get::<CommandFacet>().is_none());
    }

    #[test]
    fn test_as_configured_ignore_query_only_idempotent_carries_sub_attributes() {
        let member = MemberDeclaration::action("approve").with_action(
            ActionAnnotation::new()
                .command(CommandReification::AsConfigured)
                .command_persistence(CommandPersistence::IfHinted)
                .command_execute_in(CommandExecuteIn::Background),
        );
        let mut holder = with_semantics(&member, SemanticsOf::Idempotent);

        run_member(
            &CommandFacetFactory,
            &TypeDeclaration::new("Order"),
            &member,
            &config("ignoreQueryOnly"),
            &mut holder,
        )
        .unwrap();

        let facet = holder.get::<CommandFacet>().unwrap();
        assert_eq!(facet.source(), FacetSource::AnnotationAsConfigured);
        assert_eq!(facet.persistence(), CommandPersistence::IfHinted);
        assert_eq!(facet.execute_in(), CommandExecuteIn::Background);
    }

    #[test]
    fn test_ignore_query_only_without_semantics_fails_fast() {
        let member = MemberDeclaration::action("approve");
        let mut holder = action_holder(&member);

        let err = run_member(
            &CommandFacetFactory,
            &TypeDeclaration::new("Order"),
            &member,
            &config("ignoreQueryOnly"),
            &mut holder,
        )
        .unwrap_err();

        assert!(matches!(err, MetaError::Configuration(_)));
        assert!(holder.is_empty());
    }

    #[test]
    fn test_disabled_wins_over_all() {
        let member = MemberDeclaration::action("approve")
            .with_action(ActionAnnotation::new().command(CommandReification::Disabled));
        let mut holder = with_semantics(&member, SemanticsOf::NonIdempotent);

        run_member(
            &CommandFacetFactory,
            &TypeDeclaration::new("Order"),
            &member,
            &config("all"),
            &mut holder,
        )
        .unwrap();

        assert!(!holder.contains::<CommandFacet>());
    }

    #[test]
    fn test_has_transaction_id_is_skipped() {
        let member = MemberDeclaration::action("approve")
            .with_action(ActionAnnotation::new().command(CommandReification::Enabled));
        let mut holder = action_holder(&member);

        run_member(
            &CommandFacetFactory,
            &TypeDeclaration::new("CommandJdo").has_transaction_id(),
            &member,
            &config("ignoreQueryOnly"),
            &mut holder,
        )
        .unwrap();

        assert!(holder.is_empty());
    }
}
