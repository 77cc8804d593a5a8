// ============================================================================
// Facet Factory Pipeline
// ============================================================================
//
// Factories are stateless policies, each resolving one capability axis for
// one structural element. The pipeline orders them by their declared facet
// dependencies (not by registration alone) so that, for example, semantics
// are always resolved before the command and publishing axes consult them.
//
// ============================================================================

use super::declaration::{MemberDeclaration, TypeDeclaration};
use super::facet::FacetKind;
use super::factories;
use super::holder::{FacetHolder, FeatureType, Identifier};
use crate::config::ConfigurationSnapshot;
use crate::core::{MetaError, Result};
use std::collections::BTreeSet;

/// Inputs and output of one factory invocation.
pub struct ProcessContext<'a> {
    pub type_decl: &'a TypeDeclaration,
    /// `None` when the type itself is being processed.
    pub member: Option<&'a MemberDeclaration>,
    pub config: &'a ConfigurationSnapshot,
    /// The already-resolved type-level holder, available to member factories.
    pub type_holder: Option<&'a FacetHolder>,
    pub holder: &'a mut FacetHolder,
}

impl<'a> ProcessContext<'a> {
    pub fn for_type(
        type_decl: &'a TypeDeclaration,
        config: &'a ConfigurationSnapshot,
        holder: &'a mut FacetHolder,
    ) -> Self {
        Self {
            type_decl,
            member: None,
            config,
            type_holder: None,
            holder,
        }
    }

    pub fn for_member(
        type_decl: &'a TypeDeclaration,
        member: &'a MemberDeclaration,
        config: &'a ConfigurationSnapshot,
        type_holder: Option<&'a FacetHolder>,
        holder: &'a mut FacetHolder,
    ) -> Self {
        Self {
            type_decl,
            member: Some(member),
            config,
            type_holder,
            holder,
        }
    }

    pub fn feature(&self) -> FeatureType {
        self.member.map_or(FeatureType::Object, |m| m.feature)
    }
}

/// A policy that inspects one element and attaches, replaces or removes
/// facets on its holder.
pub trait FacetFactory: Send + Sync {
    /// Name of the factory for diagnostics
    fn name(&self) -> &'static str;

    fn feature_types(&self) -> &'static [FeatureType];

    /// Facet kinds this factory may attach.
    fn provides(&self) -> &'static [FacetKind];

    /// Facet kinds that must be resolved before this factory runs.
    fn depends_on(&self) -> &'static [FacetKind] {
        &[]
    }

    fn process(&self, ctx: &mut ProcessContext<'_>) -> Result<()>;
}

/// Registration list of facet factories.
pub struct FacetFactoryPipeline {
    factories: Vec<Box<dyn FacetFactory>>,
}

impl FacetFactoryPipeline {
    pub fn new() -> Self {
        Self {
            factories: Vec::new(),
        }
    }

    pub fn register(&mut self, factory: Box<dyn FacetFactory>) {
        tracing::debug!(factory = factory.name(), "registered facet factory");
        self.factories.push(factory);
    }

    /// All built-in factories. Registration order is only a tie-break; the
    /// processor orders them by dependency.
    pub fn with_default_factories() -> Self {
        let mut pipeline = Self::new();

        // Type level
        pipeline.register(Box::new(factories::DomainObjectFacetFactory));

        // Actions
        pipeline.register(Box::new(factories::CommandFacetFactory));
        pipeline.register(Box::new(factories::PublishedActionFacetFactory));
        pipeline.register(Box::new(factories::ActionSemanticsFacetFactory));
        pipeline.register(Box::new(factories::RestrictToFacetFactory));
        pipeline.register(Box::new(factories::ActionDomainEventFacetFactory));

        // Properties
        pipeline.register(Box::new(factories::PropertyEditingFacetFactory));
        pipeline.register(Box::new(factories::PropertyDomainEventFacetFactory));

        pipeline
    }

    pub fn len(&self) -> usize {
        self.factories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }

    /// Resolve the execution order and freeze the pipeline.
    pub fn build(self) -> Result<FacetProcessor> {
        let order = dependency_order(&self.factories)?;
        let mut slots: Vec<Option<Box<dyn FacetFactory>>> =
            self.factories.into_iter().map(Some).collect();
        let factories: Vec<Box<dyn FacetFactory>> = order
            .into_iter()
            .filter_map(|index| slots[index].take())
            .collect();

        tracing::debug!(
            order = ?factories.iter().map(|f| f.name()).collect::<Vec<_>>(),
            "facet factory order resolved"
        );
        Ok(FacetProcessor { factories })
    }
}

impl Default for FacetFactoryPipeline {
    fn default() -> Self {
        Self::with_default_factories()
    }
}

/// Stable topological sort: a factory runs after every registered factory
/// providing a kind it depends on; ties go to registration order.
fn dependency_order(factories: &[Box<dyn FacetFactory>]) -> Result<Vec<usize>> {
    let n = factories.len();
    let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); n];
    let mut indegree = vec![0usize; n];

    for (d, dependent) in factories.iter().enumerate() {
        for kind in dependent.depends_on() {
            for (p, provider) in factories.iter().enumerate() {
                if p != d && provider.provides().contains(kind) && !dependents[p].contains(&d) {
                    dependents[p].push(d);
                    indegree[d] += 1;
                }
            }
        }
    }

    let mut ready: BTreeSet<usize> = (0..n).filter(|&i| indegree[i] == 0).collect();
    let mut order = Vec::with_capacity(n);
    while let Some(next) = ready.pop_first() {
        order.push(next);
        for &d in &dependents[next] {
            indegree[d] -= 1;
            if indegree[d] == 0 {
                ready.insert(d);
            }
        }
    }

    if order.len() < n {
        let stuck: Vec<&str> = (0..n)
            .filter(|i| !order.contains(i))
            .map(|i| factories[i].name())
            .collect();
        return Err(MetaError::Configuration(format!(
            "Cyclic facet factory dependencies between: {}",
            stuck.join(", ")
        )));
    }
    Ok(order)
}

/// An ordered, immutable set of factories ready to process declarations.
pub struct FacetProcessor {
    factories: Vec<Box<dyn FacetFactory>>,
}

impl FacetProcessor {
    pub fn factory_names(&self) -> Vec<&'static str> {
        self.factories.iter().map(|f| f.name()).collect()
    }

    /// Run every object-level factory against a type declaration.
    pub fn process_type(
        &self,
        type_decl: &TypeDeclaration,
        config: &ConfigurationSnapshot,
    ) -> Result<FacetHolder> {
        let mut holder = FacetHolder::new(Identifier::object(&type_decl.spec_id));
        let mut ctx = ProcessContext::for_type(type_decl, config, &mut holder);
        self.run(&mut ctx)?;
        Ok(holder)
    }

    /// Run every factory registered for the member's feature type.
    pub fn process_member(
        &self,
        type_decl: &TypeDeclaration,
        type_holder: Option<&FacetHolder>,
        member: &MemberDeclaration,
        config: &ConfigurationSnapshot,
    ) -> Result<FacetHolder> {
        let mut holder = FacetHolder::new(Identifier::member(
            &type_decl.spec_id,
            &member.name,
            member.feature,
        ));
        let mut ctx = ProcessContext::for_member(type_decl, member, config, type_holder, &mut holder);
        self.run(&mut ctx)?;
        Ok(holder)
    }

    /// Run the pipeline against a caller-supplied context (and its holder).
    pub fn run(&self, ctx: &mut ProcessContext<'_>) -> Result<()> {
        let feature = ctx.feature();
        for factory in &self.factories {
            if factory.feature_types().contains(&feature) {
                factory.process(ctx).map_err(|err| {
                    tracing::error!(
                        factory = factory.name(),
                        holder = %ctx.holder.identifier(),
                        error = %err,
                        "facet factory failed"
                    );
                    err
                })?;
            }
        }
        Ok(())
    }
}
