//! Shared fixtures for controller integration tests.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use wpo_controller::{MemoryRecorder, WordpressReconciler};
use wpo_core::{Kind, Object, ObjectKey, Wordpress, WordpressSpec};
use wpo_db_memory::InMemoryStore;
use wpo_storage::{DynStore, ObjectStore, StorageError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Create,
    Update,
    UpdateStatus,
    Delete,
}

/// One committed write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Write {
    pub op: Op,
    pub kind: Kind,
    pub name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    Unavailable,
    Conflict,
}

struct Rule {
    op: Op,
    kind: Kind,
    fault: Fault,
}

/// Store wrapper that records successful writes and fails selected ones.
pub struct TestStore {
    inner: InMemoryStore,
    writes: Mutex<Vec<Write>>,
    rules: Mutex<Vec<Rule>>,
}

impl TestStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            inner: InMemoryStore::new(),
            writes: Mutex::new(Vec::new()),
            rules: Mutex::new(Vec::new()),
        })
    }

    pub fn fail(&self, op: Op, kind: Kind, fault: Fault) {
        self.rules.lock().unwrap().push(Rule { op, kind, fault });
    }

    pub fn clear_faults(&self) {
        self.rules.lock().unwrap().clear();
    }

    pub fn writes(&self) -> Vec<Write> {
        self.writes.lock().unwrap().clone()
    }

    pub fn take_writes(&self) -> Vec<Write> {
        std::mem::take(&mut *self.writes.lock().unwrap())
    }

    pub fn writes_of(&self, op: Op) -> Vec<Write> {
        self.writes().into_iter().filter(|w| w.op == op).collect()
    }

    fn check(&self, op: Op, kind: Kind) -> Result<(), StorageError> {
        let rules = self.rules.lock().unwrap();
        match rules.iter().find(|r| r.op == op && r.kind == kind) {
            Some(Rule {
                fault: Fault::Unavailable,
                ..
            }) => Err(StorageError::unavailable("injected outage")),
            Some(Rule {
                fault: Fault::Conflict,
                ..
            }) => Err(StorageError::version_conflict("stale", "fresh")),
            None => Ok(()),
        }
    }

    fn record(&self, op: Op, object: &Object) {
        self.writes.lock().unwrap().push(Write {
            op,
            kind: object.kind,
            name: object.metadata.name.clone(),
        });
    }
}

#[async_trait]
impl ObjectStore for TestStore {
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
        self.check(Op::Create, object.kind)?;
        let created = self.inner.create(object).await?;
        self.record(Op::Create, &created);
        Ok(created)
    }

    async fn update(
        &self,
        object: &Object,
        if_match: Option<&str>,
    ) -> Result<Object, StorageError> {
        self.check(Op::Update, object.kind)?;
        let updated = self.inner.update(object, if_match).await?;
        self.record(Op::Update, &updated);
        Ok(updated)
    }

    async fn update_status(
        &self,
        object: &Object,
        if_match: Option<&str>,
    ) -> Result<Object, StorageError> {
        self.check(Op::UpdateStatus, object.kind)?;
        let updated = self.inner.update_status(object, if_match).await?;
        self.record(Op::UpdateStatus, &updated);
        Ok(updated)
    }

    async fn delete(&self, kind: Kind, key: &ObjectKey) -> Result<Object, StorageError> {
        self.check(Op::Delete, kind)?;
        let deleted = self.inner.delete(kind, key).await?;
        self.record(Op::Delete, &deleted);
        Ok(deleted)
    }

    fn backend_name(&self) -> &'static str {
        "test"
    }
}

pub struct Harness {
    pub store: Arc<TestStore>,
    pub recorder: Arc<MemoryRecorder>,
    pub reconciler: WordpressReconciler,
}

impl Harness {
    pub fn new() -> Self {
        let store = TestStore::new();
        let recorder = Arc::new(MemoryRecorder::new());
        let dyn_store: DynStore = store.clone();
        let reconciler = WordpressReconciler::new(dyn_store, recorder.clone());
        Self {
            store,
            recorder,
            reconciler,
        }
    }

    /// Seeds a Wordpress directly into the backing store, bypassing write
    /// recording.
    pub async fn seed(&self, name: &str, spec: WordpressSpec) -> Wordpress {
        let object = Wordpress::new("default", name, spec).to_object().unwrap();
        let created = self.store.inner.create(&object).await.unwrap();
        Wordpress::from_object(&created).unwrap()
    }

    pub async fn wordpress(&self, name: &str) -> Wordpress {
        let object = self
            .store
            .get(Kind::Wordpress, &key(name))
            .await
            .unwrap()
            .expect("wordpress exists");
        Wordpress::from_object(&object).unwrap()
    }

    pub async fn object(&self, kind: Kind, name: &str) -> Option<Object> {
        self.store.get(kind, &key(name)).await.unwrap()
    }

    /// Sets `status.replicas` on the stored deployment, as the cluster would.
    pub async fn set_deployment_replicas(&self, name: &str, replicas: i64) {
        let mut deployment = self
            .object(Kind::Deployment, name)
            .await
            .expect("deployment exists");
        deployment.set_field("status", serde_json::json!({"replicas": replicas}));
        self.store.inner.update_status(&deployment, None).await.unwrap();
    }

    pub fn inner(&self) -> &InMemoryStore {
        &self.store.inner
    }
}

pub fn key(name: &str) -> ObjectKey {
    ObjectKey::new("default", name)
}

pub fn domains(domains: &[&str]) -> WordpressSpec {
    WordpressSpec {
        domains: domains.iter().map(|d| d.to_string()).collect(),
        ..Default::default()
    }
}

pub fn write(op: Op, kind: Kind, name: &str) -> Write {
    Write {
        op,
        kind,
        name: name.to_string(),
    }
}
