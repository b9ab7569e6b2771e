mod common;

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use common::{Fault, Op, TestStore, domains, key};
use tokio_util::sync::CancellationToken;
use wpo_controller::{Controller, ControllerConfig, MemoryRecorder, WordpressReconciler};
use wpo_core::events::EventBroadcaster;
use wpo_core::{Kind, Wordpress, WordpressSpec};
use wpo_storage::{DynStore, EventedStore, ObjectStore};

struct Running {
    store: DynStore,
    backing: Arc<TestStore>,
    shutdown: CancellationToken,
    handle: tokio::task::JoinHandle<Result<(), wpo_controller::ReconcileError>>,
    readiness: wpo_controller::runtime::Readiness,
}

fn start() -> Running {
    let backing = TestStore::new();
    let broadcaster = EventBroadcaster::new_shared();
    let store: DynStore = Arc::new(EventedStore::new(backing.clone(), broadcaster.clone()));
    let reconciler = WordpressReconciler::new(store.clone(), Arc::new(MemoryRecorder::new()));
    let controller = Controller::new(
        reconciler,
        broadcaster,
        ControllerConfig {
            workers: 2,
            backoff_base: Duration::from_millis(5),
            backoff_max: Duration::from_millis(100),
        },
    );
    let readiness = controller.readiness();
    let shutdown = CancellationToken::new();
    let handle = tokio::spawn(controller.run(shutdown.clone()));
    Running {
        store,
        backing,
        shutdown,
        handle,
        readiness,
    }
}

/// Polls `check` until it returns true or five seconds pass.
async fn eventually<F, Fut>(mut check: F)
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while !check().await {
        assert!(
            tokio::time::Instant::now() < deadline,
            "condition not reached in time"
        );
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

async fn exists(store: &DynStore, kind: Kind, name: &str) -> bool {
    store.get(kind, &key(name)).await.unwrap().is_some()
}

#[tokio::test]
async fn test_controller_converges_new_resource() {
    let running = start();
    let store = running.store.clone();

    let wp = Wordpress::new("default", "blog", domains(&["blog.example.com"]));
    store.create(&wp.to_object().unwrap()).await.unwrap();

    eventually(|| exists(&store, Kind::Ingress, "blog")).await;
    assert!(running.readiness.is_ready());

    let object = store.get(Kind::Wordpress, &key("blog")).await.unwrap().unwrap();
    let wp = Wordpress::from_object(&object).unwrap();
    assert_eq!(wp.spec.routes.len(), 1);
    assert!(wp.spec.domains.is_empty());

    running.shutdown.cancel();
    running.handle.await.unwrap().unwrap();
}

#[tokio::test]
async fn test_child_status_change_updates_owner() {
    let running = start();
    let store = running.store.clone();

    let wp = Wordpress::new("default", "blog", WordpressSpec::default());
    store.create(&wp.to_object().unwrap()).await.unwrap();
    eventually(|| exists(&store, Kind::Deployment, "blog")).await;

    let mut deployment = store
        .get(Kind::Deployment, &key("blog"))
        .await
        .unwrap()
        .unwrap();
    deployment.set_field("status", serde_json::json!({"replicas": 2}));
    store.update_status(&deployment, None).await.unwrap();

    eventually(|| async {
        let object = store.get(Kind::Wordpress, &key("blog")).await.unwrap().unwrap();
        Wordpress::from_object(&object).unwrap().status.replicas == 2
    })
    .await;

    running.shutdown.cancel();
    running.handle.await.unwrap().unwrap();
}

#[tokio::test]
async fn test_failed_pass_is_retried() {
    let running = start();
    let store = running.store.clone();
    running
        .backing
        .fail(Op::Create, Kind::Service, Fault::Unavailable);

    let wp = Wordpress::new("default", "blog", WordpressSpec::default());
    store.create(&wp.to_object().unwrap()).await.unwrap();
    eventually(|| exists(&store, Kind::Deployment, "blog")).await;
    assert!(!exists(&store, Kind::Service, "blog").await);

    running.backing.clear_faults();
    eventually(|| exists(&store, Kind::Ingress, "blog")).await;

    running.shutdown.cancel();
    running.handle.await.unwrap().unwrap();
}

#[tokio::test]
async fn test_existing_resources_are_listed_at_startup() {
    let backing = TestStore::new();
    let wp = Wordpress::new("default", "early", WordpressSpec::default());
    backing.create(&wp.to_object().unwrap()).await.unwrap();

    let broadcaster = EventBroadcaster::new_shared();
    let store: DynStore = Arc::new(EventedStore::new(backing.clone(), broadcaster.clone()));
    let controller = Controller::new(
        WordpressReconciler::new(store.clone(), Arc::new(MemoryRecorder::new())),
        broadcaster,
        ControllerConfig::default(),
    );
    let readiness = controller.readiness();
    assert!(!readiness.is_ready());

    let shutdown = CancellationToken::new();
    let handle = tokio::spawn(controller.run(shutdown.clone()));
    eventually(|| exists(&store, Kind::Service, "early")).await;
    assert!(readiness.is_ready());

    shutdown.cancel();
    handle.await.unwrap().unwrap();
}

#[tokio::test]
async fn test_deleting_resource_cascades_children() {
    let running = start();
    let store = running.store.clone();

    let wp = Wordpress::new("default", "blog", WordpressSpec::default());
    store.create(&wp.to_object().unwrap()).await.unwrap();
    eventually(|| exists(&store, Kind::Ingress, "blog")).await;

    store.delete(Kind::Wordpress, &key("blog")).await.unwrap();
    assert!(!exists(&store, Kind::Secret, "blog-wp").await);
    assert!(!exists(&store, Kind::Deployment, "blog").await);

    // The controller sees the deletion and settles without recreating anything.
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(!exists(&store, Kind::Service, "blog").await);

    running.shutdown.cancel();
    running.handle.await.unwrap().unwrap();
}
