//! # wpo-storage
//!
//! Object store contract for the Wordpress operator.
//!
//! This crate defines the trait every store backend implements, the error
//! taxonomy the controller classifies failures with, and [`EventedStore`],
//! which publishes change notifications after committed writes. It contains
//! no backend itself; see `wpo-db-memory`.
//!
//! ## Example
//!
//! ```ignore
//! use wpo_core::{Kind, ObjectKey};
//! use wpo_storage::{ObjectStore, StorageError};
//!
//! async fn replicas(store: &dyn ObjectStore, key: &ObjectKey) -> Result<i64, StorageError> {
//!     let deployment = store.get(Kind::Deployment, key).await?;
//!     Ok(deployment
//!         .and_then(|d| d.pointer_i64("/status/replicas"))
//!         .unwrap_or_default())
//! }
//! ```

mod error;
pub mod evented;
mod traits;

pub use error::{ErrorCategory, StorageError};
pub use evented::EventedStore;
pub use traits::ObjectStore;

/// Type alias for a storage result.
pub type StorageResult<T> = Result<T, StorageError>;

/// Type alias for a shared store trait object.
pub type DynStore = std::sync::Arc<dyn ObjectStore>;

pub mod prelude {
    pub use crate::error::{ErrorCategory, StorageError};
    pub use crate::evented::EventedStore;
    pub use crate::traits::ObjectStore;
    pub use crate::{DynStore, StorageResult};
}
