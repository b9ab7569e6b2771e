//! EventedStore - a store wrapper that emits change events after writes.
//!
//! ```ignore
//! use wpo_core::events::EventBroadcaster;
//! use wpo_storage::EventedStore;
//!
//! let broadcaster = EventBroadcaster::new_shared();
//! let store = EventedStore::new(memory_store, broadcaster.clone());
//!
//! // Subscribers of `broadcaster` observe a Created event afterwards.
//! store.create(&secret).await?;
//! ```

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;
use wpo_core::events::{EventBroadcaster, ObjectEvent};
use wpo_core::{Kind, Object, ObjectKey};

use crate::error::StorageError;
use crate::traits::ObjectStore;

/// Delegates to an inner store and publishes an [`ObjectEvent`] after every
/// successful write. Events are emitted only after the write is committed,
/// so they always correspond to actual changes. Reads never emit.
pub struct EventedStore<S: ObjectStore> {
    inner: S,
    broadcaster: Arc<EventBroadcaster>,
}

impl<S: ObjectStore> EventedStore<S> {
    pub fn new(inner: S, broadcaster: Arc<EventBroadcaster>) -> Self {
        Self { inner, broadcaster }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    pub fn broadcaster(&self) -> &Arc<EventBroadcaster> {
        &self.broadcaster
    }

    fn emit(&self, event: ObjectEvent) {
        if self.broadcaster.subscriber_count() == 0 {
            return;
        }
        let (event_type, kind, key) = (event.event_type, event.kind, event.key.clone());
        let count = self.broadcaster.send(event);
        debug!(
            event = %event_type,
            kind = %kind,
            key = %key,
            subscribers = count,
            "Emitted object event"
        );
    }
}

#[async_trait]
impl<S: ObjectStore> ObjectStore for EventedStore<S> {
    async fn get(&self, kind: Kind, key: &ObjectKey) -> Result<Option<Object>, StorageError> {
        self.inner.get(kind, key).await
    }

    async fn list(
        &self,
        kind: Kind,
        namespace: Option<&str>,
    ) -> Result<Vec<Object>, StorageError> {
        self.inner.list(kind, namespace).await
    }

    async fn create(&self, object: &Object) -> Result<Object, StorageError> {
        let created = self.inner.create(object).await?;
        self.emit(ObjectEvent::created(&created));
        Ok(created)
    }

    async fn update(
        &self,
        object: &Object,
        if_match: Option<&str>,
    ) -> Result<Object, StorageError> {
        let updated = self.inner.update(object, if_match).await?;
        self.emit(ObjectEvent::updated(&updated));
        Ok(updated)
    }

    async fn update_status(
        &self,
        object: &Object,
        if_match: Option<&str>,
    ) -> Result<Object, StorageError> {
        let updated = self.inner.update_status(object, if_match).await?;
        self.emit(ObjectEvent::updated(&updated));
        Ok(updated)
    }

    async fn delete(&self, kind: Kind, key: &ObjectKey) -> Result<Object, StorageError> {
        let deleted = self.inner.delete(kind, key).await?;
        self.emit(ObjectEvent::deleted(&deleted));
        Ok(deleted)
    }

    fn backend_name(&self) -> &'static str {
        self.inner.backend_name()
    }
}

impl<S: ObjectStore> std::fmt::Debug for EventedStore<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventedStore")
            .field("backend", &self.inner.backend_name())
            .field("subscriber_count", &self.broadcaster.subscriber_count())
            .finish()
    }
}
