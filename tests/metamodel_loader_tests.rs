//! Loading a metamodel from a JSON side-table and layered configuration.

use facetstore::config::{COMMAND_ACTIONS_KEY, ConfigurationBuilder, ConfigurationSnapshot};
use facetstore::metamodel::factories::{ActionSemanticsFacetFactory, CommandFacetFactory};
use facetstore::metamodel::{
    ActionSemanticsFacet, AuditableFacet, CommandFacet, DisabledFacet, FacetFactory,
    FacetFactoryPipeline, FacetKind, FacetSource, FeatureType, MemberDeclaration, Persistability,
    ProcessContext, PropertyDomainEventFacet, PrototypeFacet, PublishedObjectFacet,
    SpecificationLoader, TypeDeclaration,
};
use facetstore::MetaError;
use std::io::Write;
use tempfile::NamedTempFile;

const SIDE_TABLE: &str = r#"[
    {
        "spec_id": "Order",
        "capabilities": [
            { "kind": "domain_object", "auditing": "ENABLED", "editing": "AS_CONFIGURED" }
        ],
        "members": [
            {
                "name": "place",
                "feature": "action",
                "capabilities": [{ "kind": "action", "semantics": "NON_IDEMPOTENT" }]
            },
            {
                "name": "preview",
                "feature": "action",
                "capabilities": [{ "kind": "action", "semantics": "SAFE" }]
            },
            {
                "name": "total",
                "feature": "property",
                "capabilities": [{
                    "kind": "property",
                    "editing": "DISABLED",
                    "editing_disabled_reason": "Derived from lines"
                }]
            },
            {
                "name": "notes",
                "feature": "property",
                "capabilities": [{ "kind": "property", "domain_event": "Order.NotesChanged" }]
            },
            { "name": "status", "feature": "property" }
        ]
    },
    {
        "spec_id": "OrderSummary",
        "capabilities": [{ "kind": "domain_object", "nature": "VIEW_MODEL" }]
    }
]"#;

fn properties_file(text: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(text.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

#[test]
fn test_side_table_with_layered_configuration() {
    let file = properties_file(
        "# deployment settings\n\
         isis.services.command.actions = ignoreQueryOnly\n\
         services.publish.objects = all\n\
         objects.editing = true\n",
    );
    let config = ConfigurationBuilder::new()
        .properties_file(file.path())
        .unwrap()
        .set("objects.editing", "false")
        .build();

    let declarations = TypeDeclaration::list_from_json(SIDE_TABLE).unwrap();
    let metamodel = SpecificationLoader::new(config).unwrap().load(&declarations).unwrap();
    assert_eq!(metamodel.len(), 2);

    let order = metamodel.expect_specification("Order").unwrap();
    assert_eq!(order.persistability(), Persistability::UserPersistable);
    assert_eq!(
        order.get::<PublishedObjectFacet>().unwrap().source(),
        FacetSource::AnnotationAsConfigured
    );
    assert_eq!(order.get::<AuditableFacet>().unwrap().source(), FacetSource::Annotation);

    assert!(order.action("place").unwrap().contains::<CommandFacet>());
    assert!(!order.action("preview").unwrap().contains::<CommandFacet>());

    let total = order.property("total").unwrap().get::<DisabledFacet>().unwrap();
    assert_eq!(total.source(), FacetSource::Annotation);
    assert_eq!(total.reason(), Some("Derived from lines"));

    // the override layer turned editing off for everything left undeclared
    let status = order.property("status").unwrap().get::<DisabledFacet>().unwrap();
    assert_eq!(status.source(), FacetSource::Configuration);

    let notes = order.property("notes").unwrap();
    assert_eq!(
        notes.get::<PropertyDomainEventFacet>().unwrap().event_type().as_str(),
        "Order.NotesChanged"
    );

    let summary = metamodel.expect_specification("OrderSummary").unwrap();
    assert_eq!(summary.persistability(), Persistability::NotPersistable);
}

#[test]
fn test_unknown_specification_is_an_argument_error() {
    let metamodel = SpecificationLoader::new(ConfigurationSnapshot::empty())
        .unwrap()
        .load(&[TypeDeclaration::new("Order")])
        .unwrap();
    assert!(metamodel.specification("Invoice").is_none());
    assert!(matches!(
        metamodel.expect_specification("Invoice"),
        Err(MetaError::IllegalArgument(_))
    ));
}

#[test]
fn test_ignore_query_only_without_semantics_fails_fast() {
    let mut pipeline = FacetFactoryPipeline::new();
    pipeline.register(Box::new(CommandFacetFactory));
    let config = ConfigurationSnapshot::from_pairs([(COMMAND_ACTIONS_KEY, "ignoreQueryOnly")]);
    let loader = SpecificationLoader::with_pipeline(pipeline, config).unwrap();

    let err = loader
        .load(&[TypeDeclaration::new("Order").member(MemberDeclaration::action("place"))])
        .unwrap_err();
    assert!(matches!(err, MetaError::Configuration(_)));
}

#[test]
fn test_pipeline_orders_by_dependency() {
    let mut pipeline = FacetFactoryPipeline::new();
    pipeline.register(Box::new(CommandFacetFactory));
    pipeline.register(Box::new(ActionSemanticsFacetFactory));
    let loader = SpecificationLoader::with_pipeline(pipeline, ConfigurationSnapshot::empty()).unwrap();

    assert_eq!(
        loader.processor().factory_names(),
        vec!["ActionSemanticsFacetFactory", "CommandFacetFactory"]
    );
}

/// Marks every action as prototype-only once its command facet is known.
struct PrototypeWhenCommand;

impl FacetFactory for PrototypeWhenCommand {
    fn name(&self) -> &'static str {
        "PrototypeWhenCommand"
    }

    fn feature_types(&self) -> &'static [FeatureType] {
        &[FeatureType::Action]
    }

    fn provides(&self) -> &'static [FacetKind] {
        &[FacetKind::Prototype]
    }

    fn depends_on(&self) -> &'static [FacetKind] {
        &[FacetKind::Command]
    }

    fn process(&self, ctx: &mut ProcessContext<'_>) -> facetstore::Result<()> {
        if ctx.holder.contains::<CommandFacet>() {
            ctx.holder.add_facet(PrototypeFacet::new(FacetSource::Default))?;
        }
        Ok(())
    }
}

/// Provides semantics but claims to need prototype facets first.
struct SemanticsAfterPrototype;

impl FacetFactory for SemanticsAfterPrototype {
    fn name(&self) -> &'static str {
        "SemanticsAfterPrototype"
    }

    fn feature_types(&self) -> &'static [FeatureType] {
        &[FeatureType::Action]
    }

    fn provides(&self) -> &'static [FacetKind] {
        &[FacetKind::ActionSemantics]
    }

    fn depends_on(&self) -> &'static [FacetKind] {
        &[FacetKind::Prototype]
    }

    fn process(&self, _ctx: &mut ProcessContext<'_>) -> facetstore::Result<()> {
        Ok(())
    }
}

#[test]
fn test_custom_factory_runs_after_its_dependencies() {
    let mut pipeline = FacetFactoryPipeline::with_default_factories();
    pipeline.register(Box::new(PrototypeWhenCommand));
    let config = ConfigurationSnapshot::from_pairs([(COMMAND_ACTIONS_KEY, "all")]);
    let metamodel = SpecificationLoader::with_pipeline(pipeline, config)
        .unwrap()
        .load(&[TypeDeclaration::new("Order").member(MemberDeclaration::action("place"))])
        .unwrap();

    let place = metamodel.expect_specification("Order").unwrap();
    let place = place.action("place").unwrap();
    assert!(place.contains::<ActionSemanticsFacet>());
    assert!(place.contains::<PrototypeFacet>());
}

#[test]
fn test_cyclic_factories_are_rejected() {
    let mut pipeline = FacetFactoryPipeline::new();
    pipeline.register(Box::new(CommandFacetFactory));
    pipeline.register(Box::new(PrototypeWhenCommand));
    pipeline.register(Box::new(SemanticsAfterPrototype));

    let err = match SpecificationLoader::with_pipeline(pipeline, ConfigurationSnapshot::empty()) {
        Ok(_) => panic!("cyclic pipeline accepted"),
        Err(err) => err,
    };
    assert!(matches!(err, MetaError::Configuration(_)));
}
