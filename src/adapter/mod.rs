// ============================================================================
// Object Adapters
// ============================================================================
//
// Runtime identity of domain objects: oids, optimistic versions, the adapter
// wrapping each object, and the per-session identity map.
//
// ============================================================================

pub mod generator;
pub mod manager;
pub mod object;
pub mod oid;
pub mod version;

pub use generator::{OidGenerator, SequenceOidGenerator, UuidOidGenerator};
pub use manager::{AdapterHandle, AdapterManager, AdapterSnapshot};
pub use object::{DomainObject, ObjectAdapter, ResolveState};
pub use oid::{AggregatedOid, Oid, OidState, RootOid, StoreKey};
pub use version::Version;
