//! Precedence between declared capabilities and configuration, observed
//! through a fully loaded metamodel.

use facetstore::config::{
    COMMAND_ACTIONS_KEY, ConfigurationSnapshot, POST_ACTION_EVENTS_FOR_DEFAULT_KEY,
    PUBLISH_ACTIONS_KEY,
};
use facetstore::metamodel::{
    ActionAnnotation, ActionDomainEventFacet, ActionInvocationFacet, ActionSemanticsFacet,
    CommandExecuteIn, CommandFacet, CommandPersistence, CommandReification, Facet,
    FacetFactoryPipeline, FacetHolder, FacetSource, Identifier, MemberDeclaration,
    ProcessContext, PrototypeFacet, PublishedActionFacet, Publishing, RestrictTo, SemanticsOf,
    SpecificationLoader, TypeDeclaration,
};
use facetstore::{MetaError, Metamodel};

fn load(config: ConfigurationSnapshot, decl: TypeDeclaration) -> facetstore::Result<Metamodel> {
    SpecificationLoader::new(config)?.load(&[decl])
}

fn command_source(
    policy: &str,
    annotation: Option<ActionAnnotation>,
) -> Option<FacetSource> {
    let member = match annotation {
        Some(a) => MemberDeclaration::action("act").with_action(a),
        None => MemberDeclaration::action("act"),
    };
    let metamodel = load(
        ConfigurationSnapshot::from_pairs([(COMMAND_ACTIONS_KEY, policy)]),
        TypeDeclaration::new("Order").member(member),
    )
    .unwrap();
    let spec = metamodel.expect_specification("Order").unwrap();
    spec.action("act")
        .unwrap()
        .get::<CommandFacet>()
        .map(|f| f.source())
}

fn declared(command: CommandReification, semantics: SemanticsOf) -> Option<ActionAnnotation> {
    Some(ActionAnnotation::new().command(command).semantics(semantics))
}

#[test]
fn test_command_axis_grid() {
    use CommandReification::*;
    use FacetSource::*;
    use SemanticsOf::*;

    // (policy, annotation, expected provenance)
    let grid: Vec<(&str, Option<ActionAnnotation>, Option<FacetSource>)> = vec![
        // explicit enabling wins over every policy
        ("none", declared(Enabled, Safe), Some(Annotation)),
        ("ignoreQueryOnly", declared(Enabled, Safe), Some(Annotation)),
        ("all", declared(Enabled, NonIdempotent), Some(Annotation)),
        // explicit disabling wins over every policy
        ("none", declared(Disabled, NonIdempotent), None),
        ("ignoreQueryOnly", declared(Disabled, NonIdempotent), None),
        ("all", declared(Disabled, NonIdempotent), None),
        // deferred to configuration
        ("none", declared(AsConfigured, NonIdempotent), None),
        ("none", None, None),
        ("all", declared(AsConfigured, Safe), Some(AnnotationAsConfigured)),
        ("all", None, Some(Configuration)),
        ("ignoreQueryOnly", declared(AsConfigured, Safe), None),
        ("ignoreQueryOnly", declared(AsConfigured, SafeAndRequestCacheable), None),
        ("ignoreQueryOnly", declared(AsConfigured, Idempotent), Some(AnnotationAsConfigured)),
        ("ignoreSafe", declared(AsConfigured, NonIdempotent), Some(AnnotationAsConfigured)),
        // no annotation: semantics default to non-idempotent
        ("ignoreQueryOnly", None, Some(Configuration)),
    ];

    for (policy, annotation, expected) in grid {
        let label = format!("{} / {:?}", policy, annotation);
        assert_eq!(command_source(policy, annotation), expected, "{}", label);
    }
}

#[test]
fn test_as_configured_keeps_declared_sub_attributes() {
    let metamodel = load(
        ConfigurationSnapshot::from_pairs([(COMMAND_ACTIONS_KEY, "ignoreQueryOnly")]),
        TypeDeclaration::new("Order").member(
            MemberDeclaration::action("ship").with_action(
                ActionAnnotation::new()
                    .semantics(SemanticsOf::Idempotent)
                    .command(CommandReification::AsConfigured)
                    .command_persistence(CommandPersistence::IfHinted)
                    .command_execute_in(CommandExecuteIn::Background),
            ),
        ),
    )
    .unwrap();

    let spec = metamodel.expect_specification("Order").unwrap();
    let facet = spec.action("ship").unwrap().get::<CommandFacet>().unwrap();
    assert_eq!(facet.source(), FacetSource::AnnotationAsConfigured);
    assert_eq!(facet.persistence(), CommandPersistence::IfHinted);
    assert_eq!(facet.execute_in(), CommandExecuteIn::Background);
}

/// Runs the default pipeline over one action holder twice and returns the
/// facets after each pass.
fn resolve_twice(
    config: &ConfigurationSnapshot,
    annotation: ActionAnnotation,
) -> (Vec<Facet>, Vec<Facet>) {
    let member = MemberDeclaration::action("act").with_action(annotation);
    let decl = TypeDeclaration::new("Order").member(member.clone());
    let processor = FacetFactoryPipeline::with_default_factories().build().unwrap();
    let type_holder = processor.process_type(&decl, config).unwrap();

    let mut holder = FacetHolder::new(Identifier::action("Order", "act"));
    let mut passes = Vec::new();
    for _ in 0..2 {
        let mut ctx =
            ProcessContext::for_member(&decl, &member, config, Some(&type_holder), &mut holder);
        processor.run(&mut ctx).unwrap();
        passes.push(holder.facets().cloned().collect::<Vec<_>>());
    }
    let second = passes.pop().unwrap();
    let first = passes.pop().unwrap();
    (first, second)
}

#[test]
fn test_resolving_a_member_twice_is_idempotent() {
    let cases = [
        (
            [(COMMAND_ACTIONS_KEY, "all"), (PUBLISH_ACTIONS_KEY, "all")],
            ActionAnnotation::new(),
        ),
        (
            [(COMMAND_ACTIONS_KEY, "ignoreQueryOnly"), (PUBLISH_ACTIONS_KEY, "ignoreQueryOnly")],
            ActionAnnotation::new().semantics(SemanticsOf::Idempotent),
        ),
        (
            [(COMMAND_ACTIONS_KEY, "all"), (PUBLISH_ACTIONS_KEY, "all")],
            ActionAnnotation::new()
                .command(CommandReification::Disabled)
                .publishing(Publishing::Disabled),
        ),
    ];

    for (pairs, annotation) in cases {
        let label = format!("{:?} / {:?}", pairs, annotation);
        let config = ConfigurationSnapshot::from_pairs(pairs);
        let (first, second) = resolve_twice(&config, annotation.clone());
        assert_eq!(first.len(), second.len(), "{}", label);
        assert_eq!(first, second, "{}", label);

        let has_command = first.iter().any(|f| matches!(f, Facet::Command(_)));
        let has_published = first.iter().any(|f| matches!(f, Facet::PublishedAction(_)));
        let disabled = annotation.command == CommandReification::Disabled;
        assert_eq!(has_command, !disabled, "{}", label);
        assert_eq!(has_published, !disabled, "{}", label);
    }
}

#[test]
fn test_publishing_follows_the_same_precedence() {
    let metamodel = load(
        ConfigurationSnapshot::from_pairs([(PUBLISH_ACTIONS_KEY, "ignoreQueryOnly")]),
        TypeDeclaration::new("Order")
            .member(
                MemberDeclaration::action("preview")
                    .with_action(ActionAnnotation::new().semantics(SemanticsOf::Safe)),
            )
            .member(MemberDeclaration::action("place"))
            .member(
                MemberDeclaration::action("cancel").with_action(
                    ActionAnnotation::new()
                        .semantics(SemanticsOf::Safe)
                        .publishing(Publishing::Enabled),
                ),
            ),
    )
    .unwrap();

    let spec = metamodel.expect_specification("Order").unwrap();
    assert!(!spec.action("preview").unwrap().contains::<PublishedActionFacet>());
    assert_eq!(
        spec.action("place").unwrap().get::<PublishedActionFacet>().unwrap().source(),
        FacetSource::Configuration
    );
    assert_eq!(
        spec.action("cancel").unwrap().get::<PublishedActionFacet>().unwrap().source(),
        FacetSource::Annotation
    );
}

#[test]
fn test_semantics_default_when_undeclared() {
    let metamodel = load(
        ConfigurationSnapshot::empty(),
        TypeDeclaration::new("Order").member(MemberDeclaration::action("place")),
    )
    .unwrap();
    let spec = metamodel.expect_specification("Order").unwrap();
    let semantics = spec.action("place").unwrap().get::<ActionSemanticsFacet>().unwrap();
    assert_eq!(semantics.source(), FacetSource::Default);
    assert_eq!(semantics.semantics(), SemanticsOf::NonIdempotent);
}

#[test]
fn test_transaction_id_types_skip_command_resolution() {
    let metamodel = load(
        ConfigurationSnapshot::from_pairs([(COMMAND_ACTIONS_KEY, "all")]),
        TypeDeclaration::new("CommandJdo")
            .has_transaction_id()
            .member(
                MemberDeclaration::action("execute")
                    .with_action(ActionAnnotation::new().command(CommandReification::Enabled)),
            ),
    )
    .unwrap();
    let spec = metamodel.expect_specification("CommandJdo").unwrap();
    let action = spec.action("execute").unwrap();
    assert!(!action.contains::<CommandFacet>());
    assert!(action.contains::<ActionSemanticsFacet>());
}

#[test]
fn test_domain_event_resolution_and_mirroring() {
    let decl = TypeDeclaration::new("Order")
        .member(
            MemberDeclaration::action("place")
                .with_action(ActionAnnotation::new().domain_event("Order.PlacedEvent")),
        )
        .member(MemberDeclaration::action("cancel"));

    for (post, default_source) in [("true", FacetSource::Configuration), ("false", FacetSource::Default)] {
        let metamodel = load(
            ConfigurationSnapshot::from_pairs([(POST_ACTION_EVENTS_FOR_DEFAULT_KEY, post)]),
            decl.clone(),
        )
        .unwrap();
        let spec = metamodel.expect_specification("Order").unwrap();

        let place = spec.action("place").unwrap();
        let event = place.get::<ActionDomainEventFacet>().unwrap();
        assert_eq!(event.source(), FacetSource::Annotation);
        assert_eq!(event.event_type().as_str(), "Order.PlacedEvent");

        let cancel = spec.action("cancel").unwrap();
        let event = cancel.get::<ActionDomainEventFacet>().unwrap();
        assert_eq!(event.source(), default_source);
        assert!(event.event_type().is_framework_default());

        for action in [place, cancel] {
            let event = action.get::<ActionDomainEventFacet>().unwrap();
            let invocation = action.get::<ActionInvocationFacet>().unwrap();
            assert_eq!(invocation.event_type(), event.event_type());
            assert_eq!(invocation.source(), event.source());
        }
    }
}

#[test]
fn test_prototyping_restriction() {
    let metamodel = load(
        ConfigurationSnapshot::empty(),
        TypeDeclaration::new("Order")
            .member(
                MemberDeclaration::action("debug")
                    .with_action(ActionAnnotation::new().restrict_to(RestrictTo::Prototyping)),
            )
            .member(MemberDeclaration::action("place")),
    )
    .unwrap();
    let spec = metamodel.expect_specification("Order").unwrap();
    assert!(spec.action("debug").unwrap().contains::<PrototypeFacet>());
    assert!(!spec.action("place").unwrap().contains::<PrototypeFacet>());
}

#[test]
fn test_malformed_policy_fails_the_build() {
    let err = load(
        ConfigurationSnapshot::from_pairs([(COMMAND_ACTIONS_KEY, "sometimes")]),
        TypeDeclaration::new("Order").member(MemberDeclaration::action("place")),
    )
    .unwrap_err();
    assert!(matches!(err, MetaError::Configuration(_)));
}

#[test]
fn test_sealed_holders_reject_changes() {
    let metamodel = load(
        ConfigurationSnapshot::empty(),
        TypeDeclaration::new("Order").member(MemberDeclaration::action("place")),
    )
    .unwrap();
    let spec = metamodel.expect_specification("Order").unwrap();
    let mut holder = spec.action("place").unwrap().holder().clone();
    assert!(holder.is_sealed());
    let err = holder
        .add_facet(PrototypeFacet::new(FacetSource::Annotation))
        .unwrap_err();
    assert!(matches!(err, MetaError::IllegalState(_)));
}
