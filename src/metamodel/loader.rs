use super::declaration::TypeDeclaration;
use super::factory::{FacetFactoryPipeline, FacetProcessor};
use super::holder::FeatureType;
use super::specification::{Metamodel, ObjectMember, ObjectSpecification};
use super::validator::MetamodelValidator;
use crate::config::ConfigurationSnapshot;
use crate::core::{MetaError, Result};
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

/// Builds the [`Metamodel`] from type declarations.
///
/// Every type is processed object-level first so that member factories can
/// consult the resolved type holder. All holders are sealed before the
/// validator runs; the returned metamodel is read-only.
pub struct SpecificationLoader {
    processor: FacetProcessor,
    config: ConfigurationSnapshot,
}

impl SpecificationLoader {
    pub fn new(config: ConfigurationSnapshot) -> Result<Self> {
        Self::with_pipeline(FacetFactoryPipeline::with_default_factories(), config)
    }

    pub fn with_pipeline(pipeline: FacetFactoryPipeline, config: ConfigurationSnapshot) -> Result<Self> {
        Ok(Self {
            processor: pipeline.build()?,
            config,
        })
    }

    pub fn processor(&self) -> &FacetProcessor {
        &self.processor
    }

    pub fn load(&self, declarations: &[TypeDeclaration]) -> Result<Metamodel> {
        let mut specifications = BTreeMap::new();

        for decl in declarations {
            if specifications.contains_key(&decl.spec_id) {
                return Err(MetaError::Configuration(format!(
                    "Type '{}' declared more than once",
                    decl.spec_id
                )));
            }
            let spec = self.load_type(decl)?;
            specifications.insert(decl.spec_id.clone(), Arc::new(spec));
        }

        let metamodel = Metamodel::new(self.config.clone(), specifications);
        MetamodelValidator::new().validate(&metamodel)?;

        tracing::info!(types = metamodel.len(), "metamodel built");
        Ok(metamodel)
    }

    fn load_type(&self, decl: &TypeDeclaration) -> Result<ObjectSpecification> {
        let _span = tracing::debug_span!("load_type", spec_id = %decl.spec_id).entered();

        let mut type_holder = self.processor.process_type(decl, &self.config)?;
        let mut seen = HashSet::new();
        let mut actions = Vec::new();
        let mut properties = Vec::new();

        for member in &decl.members {
            if member.feature == FeatureType::Object {
                return Err(MetaError::Configuration(format!(
                    "Member '{}' of '{}' must be an action or a property",
                    member.name, decl.spec_id
                )));
            }
            if !seen.insert(member.name.as_str()) {
                return Err(MetaError::Configuration(format!(
                    "Member '{}' declared more than once on '{}'",
                    member.name, decl.spec_id
                )));
            }

            let mut holder =
                self.processor
                    .process_member(decl, Some(&type_holder), member, &self.config)?;
            holder.seal();
            match member.feature {
                FeatureType::Action => actions.push(ObjectMember::new(holder)),
                _ => properties.push(ObjectMember::new(holder)),
            }
        }

        type_holder.seal();
        Ok(ObjectSpecification::new(type_holder, actions, properties))
    }
}
