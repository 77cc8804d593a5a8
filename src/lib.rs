// ============================================================================
// facetstore Library
// ============================================================================
//
// A reflective metamodel whose facets are resolved from declared capability
// metadata and configuration, plus an object-identity and persistence-command
// layer over pluggable backing stores.
//
// Boot:    declarations + configuration -> facet factories -> sealed holders
// Runtime: adapters + persistence commands -> object store -> backing store
//
// ============================================================================

pub mod adapter;
pub mod config;
pub mod core;
pub mod metamodel;
pub mod persistence;
pub mod storage;
pub mod transaction;

// Re-export main types for convenience
pub use core::{MetaError, Result};

pub use config::{ConfigurationBuilder, ConfigurationSnapshot};

pub use metamodel::{
    FacetHolder, FacetKind, Metamodel, ObjectSpecification, SpecificationLoader,
    TypeDeclaration,
};

pub use adapter::{AdapterHandle, AdapterManager, DomainObject, ObjectAdapter, Oid, Version};

pub use storage::{BackingStore, InMemoryBackingStore, KeyValueBackingStore};

pub use persistence::{ObjectStore, PersistenceCommand, PersistenceSession};

pub use transaction::TransactionMode;

// ============================================================================
// Bootstrapping
// ============================================================================

/// Load a metamodel from declarations and open a session over `backing`.
///
/// # Examples
///
/// ```
/// use facetstore::{DomainObject, InMemoryBackingStore, TypeDeclaration};
/// use std::sync::Arc;
///
/// # tokio_test::block_on(async {
/// let mut session = facetstore::bootstrap(
///     facetstore::ConfigurationSnapshot::empty(),
///     &[TypeDeclaration::new("Customer")],
///     Arc::new(InMemoryBackingStore::new()),
/// )?;
///
/// let ann = session.create_transient("Customer", DomainObject::new().with_field("name", "Ann"))?;
/// session.make_persistent(ann)?;
/// session.commit().await?;
/// assert!(session.adapter(ann)?.is_persistent());
/// # Ok::<(), facetstore::MetaError>(())
/// # }).unwrap();
/// ```
pub fn bootstrap(
    config: ConfigurationSnapshot,
    declarations: &[TypeDeclaration],
    backing: std::sync::Arc<dyn BackingStore>,
) -> Result<PersistenceSession> {
    let metamodel = SpecificationLoader::new(config)?.load(declarations)?;
    PersistenceSession::open(std::sync::Arc::new(metamodel), backing)
}
