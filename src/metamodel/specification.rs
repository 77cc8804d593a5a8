use super::facet::{Persistability, PersistabilityFacet, TypedFacet};
use super::holder::{FacetHolder, FeatureType, Identifier};
use crate::config::ConfigurationSnapshot;
use crate::core::{MetaError, Result};
use std::collections::BTreeMap;
use std::sync::Arc;

/// An action or property of a specification, with its resolved facets.
#[derive(Debug, Clone)]
pub struct ObjectMember {
    holder: FacetHolder,
}

impl ObjectMember {
    pub(crate) fn new(holder: FacetHolder) -> Self {
        Self { holder }
    }

    pub fn identifier(&self) -> &Identifier {
        self.holder.identifier()
    }

    pub fn name(&self) -> &str {
        self.holder.identifier().member_name().unwrap_or_default()
    }

    pub fn feature(&self) -> FeatureType {
        self.holder.identifier().feature()
    }

    pub fn holder(&self) -> &FacetHolder {
        &self.holder
    }

    pub fn get<T: TypedFacet>(&self) -> Option<&T> {
        self.holder.get::<T>()
    }

    pub fn contains<T: TypedFacet>(&self) -> bool {
        self.holder.contains::<T>()
    }
}

/// The resolved metamodel of one described type.
#[derive(Debug, Clone)]
pub struct ObjectSpecification {
    id: String,
    holder: FacetHolder,
    actions: Vec<ObjectMember>,
    properties: Vec<ObjectMember>,
}

impl ObjectSpecification {
    pub(crate) fn new(
        holder: FacetHolder,
        actions: Vec<ObjectMember>,
        properties: Vec<ObjectMember>,
    ) -> Self {
        Self {
            id: holder.identifier().class_name().to_string(),
            holder,
            actions,
            properties,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn holder(&self) -> &FacetHolder {
        &self.holder
    }

    pub fn get<T: TypedFacet>(&self) -> Option<&T> {
        self.holder.get::<T>()
    }

    pub fn actions(&self) -> &[ObjectMember] {
        &self.actions
    }

    pub fn properties(&self) -> &[ObjectMember] {
        &self.properties
    }

    pub fn action(&self, name: &str) -> Option<&ObjectMember> {
        self.actions.iter().find(|a| a.name() == name)
    }

    pub fn property(&self, name: &str) -> Option<&ObjectMember> {
        self.properties.iter().find(|p| p.name() == name)
    }

    /// Persistability as resolved by the type-level facets; types without a
    /// persistability facet are user-persistable.
    pub fn persistability(&self) -> Persistability {
        self.holder
            .get::<PersistabilityFacet>()
            .map_or(Persistability::UserPersistable, |f| f.persistability())
    }

    /// Every holder owned by this specification, type-level first.
    pub fn holders(&self) -> impl Iterator<Item = &FacetHolder> {
        std::iter::once(&self.holder)
            .chain(self.actions.iter().map(|a| &a.holder))
            .chain(self.properties.iter().map(|p| &p.holder))
    }
}

/// All specifications of an application, sealed and immutable.
///
/// Build once through [`super::SpecificationLoader`] and share it behind an
/// `Arc`; nothing in it can change after the build.
#[derive(Debug, Clone)]
pub struct Metamodel {
    config: ConfigurationSnapshot,
    specifications: BTreeMap<String, Arc<ObjectSpecification>>,
}

impl Metamodel {
    pub(crate) fn new(
        config: ConfigurationSnapshot,
        specifications: BTreeMap<String, Arc<ObjectSpecification>>,
    ) -> Self {
        Self {
            config,
            specifications,
        }
    }

    pub fn config(&self) -> &ConfigurationSnapshot {
        &self.config
    }

    pub fn specification(&self, spec_id: &str) -> Option<Arc<ObjectSpecification>> {
        self.specifications.get(spec_id).cloned()
    }

    pub fn expect_specification(&self, spec_id: &str) -> Result<Arc<ObjectSpecification>> {
        self.specification(spec_id).ok_or_else(|| {
            MetaError::IllegalArgument(format!("No specification for type '{}'", spec_id))
        })
    }

    pub fn specifications(&self) -> impl Iterator<Item = &Arc<ObjectSpecification>> {
        self.specifications.values()
    }

    pub fn len(&self) -> usize {
        self.specifications.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specifications.is_empty()
    }
}
