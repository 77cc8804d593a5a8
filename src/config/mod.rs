// ============================================================================
// Configuration Snapshot
// ============================================================================
//
// Flat, resolved key/value settings consulted by facet factories when no
// explicit declaration decides an axis, and by the object store for its
// transaction mode. Built once from layered sources, then immutable.
//
// ============================================================================

pub mod builder;
pub mod policy;
pub mod snapshot;

pub use builder::ConfigurationBuilder;
pub use policy::{ActionPolicy, ObjectPolicy};
pub use snapshot::ConfigurationSnapshot;

/// Default command policy for actions: `none`, `ignoreQueryOnly` or `all`.
pub const COMMAND_ACTIONS_KEY: &str = "services.command.actions";

/// Default publishing policy for actions: `none`, `ignoreQueryOnly` or `all`.
pub const PUBLISH_ACTIONS_KEY: &str = "services.publish.actions";

/// Default publishing policy for domain objects: `none` or `all`.
pub const PUBLISH_OBJECTS_KEY: &str = "services.publish.objects";

/// Default auditing policy for domain objects: `none` or `all`.
pub const AUDIT_OBJECTS_KEY: &str = "services.audit.objects";

pub const POST_ACTION_EVENTS_FOR_DEFAULT_KEY: &str =
    "reflector.facet.actionAnnotation.domainEvent.postForDefault";

pub const POST_PROPERTY_EVENTS_FOR_DEFAULT_KEY: &str =
    "reflector.facet.propertyAnnotation.domainEvent.postForDefault";

/// Whether properties are editable unless declared otherwise.
pub const OBJECTS_EDITING_KEY: &str = "objects.editing";

/// `chained` or `unchained`.
pub const TRANSACTION_MODE_KEY: &str = "persistor.transaction.mode";

/// User name stamped on versions written by the object store.
pub const PERSISTOR_USER_KEY: &str = "persistor.user";

pub const DEFAULT_PERSISTOR_USER: &str = "__system";

/// Built-in defaults, lowest layer of every snapshot built by the builder.
pub(crate) const DEFAULTS: &[(&str, &str)] = &[
    (COMMAND_ACTIONS_KEY, "none"),
    (PUBLISH_ACTIONS_KEY, "none"),
    (PUBLISH_OBJECTS_KEY, "none"),
    (AUDIT_OBJECTS_KEY, "none"),
    (POST_ACTION_EVENTS_FOR_DEFAULT_KEY, "true"),
    (POST_PROPERTY_EVENTS_FOR_DEFAULT_KEY, "true"),
    (OBJECTS_EDITING_KEY, "true"),
    (TRANSACTION_MODE_KEY, "chained"),
    (PERSISTOR_USER_KEY, DEFAULT_PERSISTOR_USER),
];
