//! The store contract every backend implements.

use async_trait::async_trait;
use wpo_core::{Kind, Object, ObjectKey};

use crate::error::StorageError;

/// Transactional key-value store of [`Object`]s with optimistic concurrency.
///
/// Objects are addressed by `(Kind, ObjectKey)`. Every committed write
/// assigns a new `metadata.resourceVersion`; writers pass the revision they
/// read as `if_match` and receive [`StorageError::VersionConflict`] when the
/// stored object has moved on. Implementations must be `Send + Sync`.
///
/// # Example
///
/// ```ignore
/// use wpo_storage::{ObjectStore, StorageError};
///
/// async fn bump(store: &dyn ObjectStore, key: &ObjectKey) -> Result<Object, StorageError> {
///     let mut current = store
///         .get(Kind::Deployment, key)
///         .await?
///         .ok_or_else(|| StorageError::not_found(Kind::Deployment, key.clone()))?;
///     let revision = current.metadata.resource_version.clone();
///     current.metadata.labels.insert("touched".into(), "true".into());
///     store.update(&current, revision.as_deref()).await
/// }
/// ```
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Reads an object by kind and key.
    ///
    /// # Errors
    ///
    /// Returns an error only for infrastructure issues, never for a missing object.
    async fn get(&self, kind: Kind, key: &ObjectKey) -> Result<Option<Object>, StorageError>;

    /// Lists objects of a kind, optionally restricted to one namespace.
    async fn list(&self, kind: Kind, namespace: Option<&str>)
    -> Result<Vec<Object>, StorageError>;

    /// Creates a new object.
    ///
    /// The backend assigns `uid`, `resourceVersion`, `generation` and
    /// `creationTimestamp`. The returned object is the committed one.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::AlreadyExists` if the key is taken.
    /// Returns `StorageError::InvalidObject` if the object has no name.
    async fn create(&self, object: &Object) -> Result<Object, StorageError>;

    /// Replaces an existing object, leaving its `status` untouched.
    ///
    /// `generation` is bumped when `spec` changes.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the object does not exist.
    /// Returns `StorageError::VersionConflict` if `if_match` is provided and
    /// doesn't match the stored revision.
    async fn update(&self, object: &Object, if_match: Option<&str>)
    -> Result<Object, StorageError>;

    /// Replaces only the `status` field of an existing object.
    ///
    /// # Errors
    ///
    /// Same as [`ObjectStore::update`].
    async fn update_status(
        &self,
        object: &Object,
        if_match: Option<&str>,
    ) -> Result<Object, StorageError>;

    /// Deletes an object, returning it as it was just before deletion.
    ///
    /// Backends that support it cascade the deletion to objects carrying an
    /// owner reference to the deleted object's uid.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the object does not exist.
    async fn delete(&self, kind: Kind, key: &ObjectKey) -> Result<Object, StorageError>;

    /// Human-readable backend name, for logs.
    fn backend_name(&self) -> &'static str;
}

#[async_trait]
impl<S: ObjectStore + ?Sized> ObjectStore for std::sync::Arc<S> {
    async fn get(&self, kind: Kind, key: &ObjectKey) -> Result<Option<Object>, StorageError> {
        (**self).get(kind, key).await
    }

    async fn list(
        &self,
        kind: Kind,
        namespace: Option<&str>,
    ) -> Result<Vec<Object>, StorageError> {
        (**self).list(kind, namespace).await
    }

    async fn create(&self, object: &Object) -> Result<Object, StorageError> {
        (**self).create(object).await
    }

    async fn update(
        &self,
        object: &Object,
        if_match: Option<&str>,
    ) -> Result<Object, StorageError> {
        (**self).update(object, if_match).await
    }

    async fn update_status(
        &self,
        object: &Object,
        if_match: Option<&str>,
    ) -> Result<Object, StorageError> {
        (**self).update_status(object, if_match).await
    }

    async fn delete(&self, kind: Kind, key: &ObjectKey) -> Result<Object, StorageError> {
        (**self).delete(kind, key).await
    }

    fn backend_name(&self) -> &'static str {
        (**self).backend_name()
    }
}
