use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tracing::debug;
use wpo_core::{Kind, Object, ObjectKey, now_rfc3339};
use wpo_storage::{ObjectStore, StorageError};

/// Storage key: one slot per kind and namespaced name.
pub type StoreId = (Kind, ObjectKey);

/// In-memory [`ObjectStore`] backed by a sharded concurrent map.
///
/// Each write runs under the shard lock of its key, so the revision check
/// and the write are atomic with respect to other writers of the same key.
/// Revisions come from a single counter shared by all objects.
#[derive(Debug)]
pub struct InMemoryStore {
    objects: DashMap<StoreId, Object>,
    revision: AtomicU64,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            objects: DashMap::new(),
            revision: AtomicU64::new(1),
        }
    }

    fn next_revision(&self) -> String {
        self.revision.fetch_add(1, Ordering::SeqCst).to_string()
    }

    /// Number of stored objects across all kinds.
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    fn validate(object: &Object) -> Result<StoreId, StorageError> {
        if object.metadata.name.is_empty() {
            return Err(StorageError::invalid_object(format!(
                "{} has no metadata.name",
                object.kind
            )));
        }
        Ok((object.kind, object.key()))
    }

    fn check_revision(stored: &Object, if_match: Option<&str>) -> Result<(), StorageError> {
        let Some(expected) = if_match else {
            return Ok(());
        };
        let actual = stored.resource_version().unwrap_or_default();
        if expected != actual {
            return Err(StorageError::version_conflict(expected, actual));
        }
        Ok(())
    }

    /// Removes every object carrying an owner reference to `uid`, then
    /// their dependents in turn.
    fn cascade(&self, uid: &str) {
        let mut pending = vec![uid.to_string()];
        while let Some(owner_uid) = pending.pop() {
            let dependents: Vec<StoreId> = self
                .objects
                .iter()
                .filter(|entry| {
                    entry
                        .value()
                        .metadata
                        .owner_references
                        .iter()
                        .any(|r| r.uid == owner_uid)
                })
                .map(|entry| entry.key().clone())
                .collect();

            for id in dependents {
                if let Some((_, removed)) = self.objects.remove(&id) {
                    debug!(kind = %id.0, key = %id.1, owner_uid = %owner_uid, "Cascade deleted");
                    if let Some(uid) = removed.metadata.uid {
                        pending.push(uid);
                    }
                }
            }
        }
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ObjectStore for InMemoryStore {
    async fn get(&self, kind: Kind, key: &ObjectKey) -> Result<Option<Object>, StorageError> {
        Ok(self
            .objects
            .get(&(kind, key.clone()))
            .map(|entry| entry.value().clone()))
    }

    async fn list(
        &self,
        kind: Kind,
        namespace: Option<&str>,
    ) -> Result<Vec<Object>, StorageError> {
        let mut objects: Vec<Object> = self
            .objects
            .iter()
            .filter(|entry| {
                let (k, key) = entry.key();
                *k == kind && namespace.is_none_or(|ns| key.namespace == ns)
            })
            .map(|entry| entry.value().clone())
            .collect();
        objects.sort_by(|a, b| a.key().cmp(&b.key()));
        Ok(objects)
    }

    async fn create(&self, object: &Object) -> Result<Object, StorageError> {
        let id = Self::validate(object)?;
        match self.objects.entry(id.clone()) {
            Entry::Occupied(_) => Err(StorageError::already_exists(id.0, id.1)),
            Entry::Vacant(slot) => {
                let mut created = object.clone();
                created.api_version = object.kind.api_version().to_string();
                let meta = &mut created.metadata;
                meta.uid = Some(uuid::Uuid::new_v4().to_string());
                meta.resource_version = Some(self.next_revision());
                meta.generation = Some(1);
                meta.creation_timestamp = Some(now_rfc3339());
                slot.insert(created.clone());
                Ok(created)
            }
        }
    }

    async fn update(
        &self,
        object: &Object,
        if_match: Option<&str>,
    ) -> Result<Object, StorageError> {
        let id = Self::validate(object)?;
        let Entry::Occupied(mut slot) = self.objects.entry(id.clone()) else {
            return Err(StorageError::not_found(id.0, id.1));
        };
        let stored = slot.get();
        Self::check_revision(stored, if_match)?;

        let mut next = object.clone();
        next.api_version = stored.api_version.clone();
        next.metadata.uid = stored.metadata.uid.clone();
        next.metadata.creation_timestamp = stored.metadata.creation_timestamp.clone();
        next.metadata.resource_version = stored.metadata.resource_version.clone();
        next.metadata.generation = stored.metadata.generation;
        match stored.field("status") {
            Some(status) => next.set_field("status", status.clone()),
            None => {
                next.remove_field("status");
            }
        }

        if next == *stored {
            return Ok(next);
        }
        if next.field("spec") != stored.field("spec") {
            next.metadata.generation = Some(stored.metadata.generation.unwrap_or(0) + 1);
        }
        next.metadata.resource_version = Some(self.next_revision());
        slot.insert(next.clone());
        Ok(next)
    }

    async fn update_status(
        &self,
        object: &Object,
        if_match: Option<&str>,
    ) -> Result<Object, StorageError> {
        let id = Self::validate(object)?;
        let Entry::Occupied(mut slot) = self.objects.entry(id.clone()) else {
            return Err(StorageError::not_found(id.0, id.1));
        };
        Self::check_revision(slot.get(), if_match)?;

        let mut next = slot.get().clone();
        match object.field("status") {
            Some(status) => next.set_field("status", status.clone()),
            None => {
                next.remove_field("status");
            }
        }
        next.metadata.resource_version = Some(self.next_revision());
        slot.insert(next.clone());
        Ok(next)
    }

    async fn delete(&self, kind: Kind, key: &ObjectKey) -> Result<Object, StorageError> {
        let (_, removed) = self
            .objects
            .remove(&(kind, key.clone()))
            .ok_or_else(|| StorageError::not_found(kind, key.clone()))?;
        if let Some(uid) = removed.metadata.uid.as_deref() {
            self.cascade(uid);
        }
        Ok(removed)
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use wpo_core::{ObjectMeta, OwnerReference};

    use super::*;

    fn deployment(name: &str) -> Object {
        let mut object = Object::new(Kind::Deployment, &ObjectKey::new("default", name));
        object.set_field("spec", json!({"replicas": 1}));
        object
    }

    #[tokio::test]
    async fn test_create_assigns_metadata() {
        let store = InMemoryStore::new();
        let created = store.create(&deployment("blog")).await.unwrap();

        assert!(created.metadata.uid.is_some());
        assert!(created.resource_version().is_some());
        assert_eq!(created.metadata.generation, Some(1));
        assert!(created.metadata.creation_timestamp.is_some());

        let err = store.create(&deployment("blog")).await.unwrap_err();
        assert!(err.is_already_exists());
    }

    #[tokio::test]
    async fn test_create_requires_name() {
        let store = InMemoryStore::new();
        let err = store.create(&deployment("")).await.unwrap_err();
        assert!(matches!(err, StorageError::InvalidObject { .. }));
    }

    #[tokio::test]
    async fn test_update_checks_revision() {
        let store = InMemoryStore::new();
        let created = store.create(&deployment("blog")).await.unwrap();
        let revision = created.resource_version().map(str::to_string);

        let mut changed = created.clone();
        changed.set_field("spec", json!({"replicas": 2}));
        let updated = store.update(&changed, revision.as_deref()).await.unwrap();
        assert_eq!(updated.metadata.generation, Some(2));
        assert_ne!(updated.resource_version(), revision.as_deref());

        let err = store.update(&changed, revision.as_deref()).await.unwrap_err();
        assert!(err.is_version_conflict());
    }

    #[tokio::test]
    async fn test_update_missing_is_not_found() {
        let store = InMemoryStore::new();
        let err = store.update(&deployment("gone"), None).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_update_preserves_status() {
        let store = InMemoryStore::new();
        let created = store.create(&deployment("blog")).await.unwrap();

        let mut with_status = created.clone();
        with_status.set_field("status", json!({"replicas": 3}));
        let stored = store.update_status(&with_status, None).await.unwrap();
        assert_eq!(stored.pointer_i64("/status/replicas"), Some(3));
        assert_eq!(stored.metadata.generation, Some(1));

        let mut overwrite = stored.clone();
        overwrite.set_field("status", json!({"replicas": 0}));
        overwrite.metadata.labels.insert("a".into(), "b".into());
        let updated = store.update(&overwrite, None).await.unwrap();
        assert_eq!(updated.pointer_i64("/status/replicas"), Some(3));
        assert_eq!(updated.metadata.generation, Some(1));
    }

    #[tokio::test]
    async fn test_noop_update_keeps_revision() {
        let store = InMemoryStore::new();
        let created = store.create(&deployment("blog")).await.unwrap();
        let same = store.update(&created, None).await.unwrap();
        assert_eq!(same.resource_version(), created.resource_version());
    }

    #[tokio::test]
    async fn test_delete_cascades_to_dependents() {
        let store = InMemoryStore::new();
        let owner = store.create(&deployment("blog")).await.unwrap();

        let mut child = Object::new(Kind::Secret, &ObjectKey::new("default", "blog-wp"));
        child
            .metadata
            .set_controller_reference(OwnerReference::controller(Kind::Deployment, &owner.metadata));
        let child = store.create(&child).await.unwrap();

        let mut grandchild = Object::new(Kind::Service, &ObjectKey::new("default", "blog"));
        grandchild
            .metadata
            .owner_references
            .push(OwnerReference::controller(Kind::Secret, &child.metadata));
        store.create(&grandchild).await.unwrap();

        let mut unrelated_meta = ObjectMeta::new("default", "other");
        unrelated_meta.uid = Some("someone-else".into());
        let mut unrelated = Object::new(Kind::Service, &ObjectKey::new("default", "other"));
        unrelated
            .metadata
            .set_controller_reference(OwnerReference::controller(Kind::Deployment, &unrelated_meta));
        store.create(&unrelated).await.unwrap();

        let removed = store.delete(Kind::Deployment, &owner.key()).await.unwrap();
        assert_eq!(removed.metadata.uid, owner.metadata.uid);
        assert_eq!(store.len(), 1);
        assert!(store
            .get(Kind::Service, &ObjectKey::new("default", "other"))
            .await
            .unwrap()
            .is_some());

        let err = store.delete(Kind::Deployment, &owner.key()).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_list_filters_by_kind_and_namespace() {
        let store = InMemoryStore::new();
        store.create(&deployment("b")).await.unwrap();
        store.create(&deployment("a")).await.unwrap();
        let mut elsewhere = deployment("c");
        elsewhere.metadata.namespace = "prod".into();
        store.create(&elsewhere).await.unwrap();

        let all = store.list(Kind::Deployment, None).await.unwrap();
        assert_eq!(all.len(), 3);

        let names: Vec<_> = store
            .list(Kind::Deployment, Some("default"))
            .await
            .unwrap()
            .into_iter()
            .map(|o| o.metadata.name)
            .collect();
        assert_eq!(names, vec!["a", "b"]);
        assert!(store.list(Kind::Secret, None).await.unwrap().is_empty());
    }
}
