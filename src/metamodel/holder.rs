use super::facet::{Facet, FacetKind, TypedFacet};
use crate::core::{MetaError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// The kind of metamodel element a holder describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeatureType {
    Object,
    Action,
    Property,
}

impl fmt::Display for FeatureType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FeatureType::Object => write!(f, "object"),
            FeatureType::Action => write!(f, "action"),
            FeatureType::Property => write!(f, "property"),
        }
    }
}

/// Identifies a type or one of its members.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Identifier {
    class_name: String,
    member_name: Option<String>,
    feature: FeatureType,
}

impl Identifier {
    pub fn object(class_name: impl Into<String>) -> Self {
        Self {
            class_name: class_name.into(),
            member_name: None,
            feature: FeatureType::Object,
        }
    }

    pub fn action(class_name: impl Into<String>, action: impl Into<String>) -> Self {
        Self {
            class_name: class_name.into(),
            member_name: Some(action.into()),
            feature: FeatureType::Action,
        }
    }

    pub fn property(class_name: impl Into<String>, property: impl Into<String>) -> Self {
        Self {
            class_name: class_name.into(),
            member_name: Some(property.into()),
            feature: FeatureType::Property,
        }
    }

    pub fn member(class_name: &str, member_name: &str, feature: FeatureType) -> Self {
        match feature {
            FeatureType::Object => Self::object(class_name),
            FeatureType::Action => Self::action(class_name, member_name),
            FeatureType::Property => Self::property(class_name, member_name),
        }
    }

    pub fn class_name(&self) -> &str {
        &self.class_name
    }

    pub fn member_name(&self) -> Option<&str> {
        self.member_name.as_deref()
    }

    pub fn feature(&self) -> FeatureType {
        self.feature
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.member_name, self.feature) {
            (Some(member), FeatureType::Action) => write!(f, "{}#{}()", self.class_name, member),
            (Some(member), _) => write!(f, "{}#{}", self.class_name, member),
            (None, _) => write!(f, "{}", self.class_name),
        }
    }
}

/// An introspected element owning at most one facet per [`FacetKind`].
///
/// Holders are mutated only by facet factories while the metamodel is being
/// built. [`FacetHolder::seal`] marks the end of that phase: afterwards every
/// mutation fails, and the holder can be shared freely between threads for
/// reading.
#[derive(Debug, Clone)]
pub struct FacetHolder {
    identifier: Identifier,
    facets: BTreeMap<FacetKind, Facet>,
    sealed: bool,
}

impl FacetHolder {
    pub fn new(identifier: Identifier) -> Self {
        Self {
            identifier,
            facets: BTreeMap::new(),
            sealed: false,
        }
    }

    pub fn identifier(&self) -> &Identifier {
        &self.identifier
    }

    /// Attach a facet, replacing any facet of the same kind.
    ///
    /// Returns the replaced facet, if there was one.
    pub fn add_facet(&mut self, facet: impl Into<Facet>) -> Result<Option<Facet>> {
        self.ensure_unsealed("add facet to")?;
        let facet = facet.into();
        let kind = facet.kind();
        tracing::trace!(
            holder = %self.identifier,
            kind = %kind,
            source = %facet.source(),
            "facet attached"
        );
        Ok(self.facets.insert(kind, facet))
    }

    pub fn remove_facet(&mut self, kind: FacetKind) -> Result<Option<Facet>> {
        self.ensure_unsealed("remove facet from")?;
        let removed = self.facets.remove(&kind);
        if removed.is_some() {
            tracing::trace!(holder = %self.identifier, kind = %kind, "facet removed");
        }
        Ok(removed)
    }

    pub fn get_facet(&self, kind: FacetKind) -> Option<&Facet> {
        self.facets.get(&kind)
    }

    /// Typed lookup, e.g. `holder.get::<CommandFacet>()`.
    pub fn get<T: TypedFacet>(&self) -> Option<&T> {
        self.facets.get(&T::KIND).and_then(T::from_facet)
    }

    pub fn contains_facet(&self, kind: FacetKind) -> bool {
        self.facets.contains_key(&kind)
    }

    pub fn contains<T: TypedFacet>(&self) -> bool {
        self.contains_facet(T::KIND)
    }

    pub fn facets(&self) -> impl Iterator<Item = &Facet> {
        self.facets.values()
    }

    pub fn facet_kinds(&self) -> impl Iterator<Item = FacetKind> + '_ {
        self.facets.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.facets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.facets.is_empty()
    }

    /// End the build phase for this holder.
    pub fn seal(&mut self) {
        self.sealed = true;
    }

    pub fn is_sealed(&self) -> bool {
        self.sealed
    }

    fn ensure_unsealed(&self, what: &str) -> Result<()> {
        if self.sealed {
            return Err(MetaError::IllegalState(format!(
                "Cannot {} sealed holder '{}'",
                what, self.identifier
            )));
        }
        Ok(())
    }
}
