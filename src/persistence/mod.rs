// ============================================================================
// Persistence
// ============================================================================
//
// Commands wrap changes to adapted objects; the object store executes them
// inside backing-store transactions and answers queries. A session ties an
// identity map, a store and a queue of pending commands together.
//
// ============================================================================

pub mod command;
pub mod query;
pub mod session;
pub mod store;

pub use command::{CommandEnv, CommandKind, ExecutionMode, PersistenceCommand};
pub use query::{
    FindAll, FindAllProcessor, FindByKeys, FindByKeysProcessor, FindByPattern,
    FindByPatternProcessor, QueryProcessor, QueryProcessorRegistry, QuerySpec,
};
pub use session::PersistenceSession;
pub use store::ObjectStore;
