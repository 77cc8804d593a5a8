use crate::core::Result;
use crate::metamodel::declaration::EventType;
use crate::metamodel::facet::{
    ActionDomainEventFacet, ActionInvocationFacet, FacetKind, FacetSource, PropertyDomainEventFacet,
};
use crate::metamodel::factory::{FacetFactory, ProcessContext};
use crate::metamodel::holder::FeatureType;

/// Pick the event type and provenance for a member.
///
/// An explicitly named, non-default event type wins. Otherwise the generic
/// default type is used, sourced from configuration when configuration asks
/// for default events to be posted and from the structural default when it
/// does not.
fn resolve_event_type(
    declared: Option<&EventType>,
    post_for_default: bool,
    default: EventType,
) -> (FacetSource, EventType) {
    match declared {
        Some(event_type) if !event_type.is_framework_default() => {
            (FacetSource::Annotation, event_type.clone())
        }
        _ if post_for_default => (FacetSource::Configuration, default),
        _ => (FacetSource::Default, default),
    }
}

/// Domain event and invocation strategy for actions.
///
/// The invocation facet is always derived from the resolved domain-event
/// facet, so the two can never name different event types.
pub struct ActionDomainEventFacetFactory;

impl FacetFactory for ActionDomainEventFacetFactory {
    fn name(&self) -> &'static str {
        "ActionDomainEventFacetFactory"
    }

    fn feature_types(&self) -> &'static [FeatureType] {
        &[FeatureType::Action]
    }

    fn provides(&self) -> &'static [FacetKind] {
        &[FacetKind::ActionDomainEvent, FacetKind::ActionInvocation]
    }

    fn process(&self, ctx: &mut ProcessContext<'_>) -> Result<()> {
        let declared = ctx
            .member
            .and_then(|m| m.action_annotation())
            .and_then(|a| a.domain_event.as_ref());
        let post_for_default = ctx.config.post_action_events_for_default()?;

        let (source, event_type) =
            resolve_event_type(declared, post_for_default, EventType::default_action());
        let domain_event = ActionDomainEventFacet::new(source, event_type);
        let invocation = ActionInvocationFacet::mirroring(&domain_event);

        ctx.holder.add_facet(domain_event)?;
        ctx.holder.add_facet(invocation)?;
        Ok(())
    }
}

/// Domain event for properties.
pub struct PropertyDomainEventFacetFactory;

impl FacetFactory for PropertyDomainEventFacetFactory {
    fn name(&self) -> &'static str {
        "PropertyDomainEventFacetFactory"
    }

    fn feature_types(&self) -> &'static [FeatureType] {
        &[FeatureType::Property]
    }

    fn provides(&self) -> &'static [FacetKind] {
        &[FacetKind::PropertyDomainEvent]
    }

    fn process(&self, ctx: &mut ProcessContext<'_>) -> Result<()> {
        let declared = ctx
            .member
            .and_then(|m| m.property_annotation())
            .and_then(|p| p.domain_event.as_ref());
        let post_for_default = ctx.config.post_property_events_for_default()?;

        let (source, event_type) =
            resolve_event_type(declared, post_for_default, EventType::default_property());
        ctx.holder
            .add_facet(PropertyDomainEventFacet::new(source, event_type))?;
        Ok(())
    }
}
