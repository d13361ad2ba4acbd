pub mod persistence;
pub mod store;

pub use persistence::{context_key, FileJsonPersistence, InMemoryPersistence, PersistenceBackend};
pub use store::{spawn_sweeper, ContextStore};
