use super::facet::{ActionDomainEventFacet, ActionInvocationFacet, ActionSemanticsFacet};
use super::holder::FacetHolder;
use super::specification::Metamodel;
use crate::core::{MetaError, Result};

/// Post-build checks over a complete metamodel.
///
/// Every failure is collected; a single [`MetaError::Configuration`] lists
/// all of them.
#[derive(Debug, Default)]
pub struct MetamodelValidator;

impl MetamodelValidator {
    pub fn new() -> Self {
        Self
    }

    pub fn validate(&self, metamodel: &Metamodel) -> Result<()> {
        let mut failures = Vec::new();

        for spec in metamodel.specifications() {
            for holder in spec.holders() {
                if !holder.is_sealed() {
                    failures.push(format!("{}: holder not sealed", holder.identifier()));
                }
            }
            for action in spec.actions() {
                Self::check_action(action.holder(), &mut failures);
            }
        }

        if failures.is_empty() {
            return Ok(());
        }
        for failure in &failures {
            tracing::warn!(failure = %failure, "metamodel validation failed");
        }
        Err(MetaError::Configuration(format!(
            "Metamodel validation failed: {}",
            failures.join("; ")
        )))
    }

    fn check_action(holder: &FacetHolder, failures: &mut Vec<String>) {
        if !holder.contains::<ActionSemanticsFacet>() {
            failures.push(format!("{}: no semantics", holder.identifier()));
        }

        match (
            holder.get::<ActionDomainEventFacet>(),
            holder.get::<ActionInvocationFacet>(),
        ) {
            (Some(event), Some(invocation)) if event.event_type() != invocation.event_type() => {
                failures.push(format!(
                    "{}: invocation event type '{}' differs from domain event type '{}'",
                    holder.identifier(),
                    invocation.event_type().as_str(),
                    event.event_type().as_str()
                ));
            }
            (Some(_), None) | (None, Some(_)) => {
                failures.push(format!(
                    "{}: domain event and invocation facets must be resolved together",
                    holder.identifier()
                ));
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigurationSnapshot;
    use crate::metamodel::declaration::EventType;
    use crate::metamodel::facet::FacetSource;
    use crate::metamodel::holder::Identifier;
    use crate::metamodel::specification::{ObjectMember, ObjectSpecification};
    use std::collections::BTreeMap;
    use std::sync::Arc;

    fn metamodel_with(action: FacetHolder, seal_type: bool) -> Metamodel {
        let mut type_holder = FacetHolder::new(Identifier::object("Order"));
        if seal_type {
            type_holder.seal();
        }
        let spec = ObjectSpecification::new(type_holder, vec![ObjectMember::new(action)], vec![]);
        let mut specs = BTreeMap::new();
        specs.insert("Order".to_string(), Arc::new(spec));
        Metamodel::new(ConfigurationSnapshot::empty(), specs)
    }

    #[test]
    fn test_collects_every_failure() {
        let mut action = FacetHolder::new(Identifier::action("Order", "place"));
        action
            .add_facet(ActionDomainEventFacet::new(
                FacetSource::Annotation,
                EventType::new("Order.Placed"),
            ))
            .unwrap();
        action
            .add_facet(ActionInvocationFacet::new(
                FacetSource::Default,
                EventType::default_action(),
            ))
            .unwrap();
        action.seal();

        let err = MetamodelValidator::new()
            .validate(&metamodel_with(action, false))
            .unwrap_err();
        let MetaError::Configuration(msg) = err else {
            panic!("expected configuration error");
        };
        assert!(msg.contains("not sealed"));
        assert!(msg.contains("no semantics"));
        assert!(msg.contains("differs"));
    }

    #[test]
    fn test_valid_action_passes() {
        let mut action = FacetHolder::new(Identifier::action("Order", "place"));
        let event = ActionDomainEventFacet::new(FacetSource::Default, EventType::default_action());
        action
            .add_facet(ActionSemanticsFacet::new(
                FacetSource::Default,
                crate::metamodel::declaration::SemanticsOf::NonIdempotent,
            ))
            .unwrap();
        action.add_facet(ActionInvocationFacet::mirroring(&event)).unwrap();
        action.add_facet(event).unwrap();
        action.seal();

        assert!(MetamodelValidator::new()
            .validate(&metamodel_with(action, true))
            .is_ok());
    }
}
