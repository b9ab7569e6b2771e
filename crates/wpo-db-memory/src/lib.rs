//! In-memory object store backend for the Wordpress operator.
//!
//! ```ignore
//! use wpo_db_memory::InMemoryStore;
//! use wpo_storage::ObjectStore;
//!
//! let store = InMemoryStore::new();
//! let created = store.create(&wordpress.to_object()?).await?;
//! assert_eq!(created.metadata.generation, Some(1));
//! ```

mod store;

pub use store::{InMemoryStore, StoreId};
pub use wpo_storage::{ObjectStore, StorageError};

/// Creates a new shareable in-memory store.
pub fn create_store() -> wpo_storage::DynStore {
    std::sync::Arc::new(InMemoryStore::new())
}
