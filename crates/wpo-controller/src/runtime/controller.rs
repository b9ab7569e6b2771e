use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use wpo_core::events::{EventBroadcaster, ObjectEvent};
use wpo_core::{Kind, ObjectKey};

use super::backoff::Backoff;
use super::queue::WorkQueue;
use crate::error::ReconcileError;
use crate::reconciler::WordpressReconciler;

/// Tuning of the dispatcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControllerConfig {
    /// Number of concurrent reconciliation workers.
    pub workers: usize,
    pub backoff_base: Duration,
    pub backoff_max: Duration,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            workers: 2,
            backoff_base: Duration::from_millis(5),
            backoff_max: Duration::from_secs(1000),
        }
    }
}

/// Set once the initial listing has been queued.
#[derive(Debug, Clone, Default)]
pub struct Readiness(Arc<AtomicBool>);

impl Readiness {
    pub fn is_ready(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    fn mark_ready(&self) {
        self.0.store(true, Ordering::Release);
    }
}

/// Kinds whose changes re-trigger the owning Wordpress.
const OWNED_KINDS: [Kind; 5] = [
    Kind::Deployment,
    Kind::PersistentVolumeClaim,
    Kind::Service,
    Kind::Secret,
    Kind::Ingress,
];

/// Maps a change notification to the Wordpress key it concerns.
///
/// Wordpress events map to their own key. Events of owned kinds map to the
/// key of their controller owner when that owner is a Wordpress in the same
/// namespace. Everything else is ignored.
pub fn key_for_event(event: &ObjectEvent) -> Option<ObjectKey> {
    if event.kind == Kind::Wordpress {
        return Some(event.key.clone());
    }
    if !OWNED_KINDS.contains(&event.kind) {
        return None;
    }
    let owner = event.controller_owner()?;
    owner
        .kind
        .eq_ignore_ascii_case(Kind::Wordpress.as_str())
        .then(|| ObjectKey::new(&event.key.namespace, &owner.name))
}

/// Watches the store and runs reconciliation passes on a worker pool.
///
/// Passes for different keys run concurrently; the work queue guarantees at
/// most one pass per key at a time.
pub struct Controller {
    reconciler: WordpressReconciler,
    broadcaster: Arc<EventBroadcaster>,
    config: ControllerConfig,
    queue: Arc<WorkQueue<ObjectKey>>,
    backoff: Arc<Backoff<ObjectKey>>,
    readiness: Readiness,
}

impl Controller {
    pub fn new(
        reconciler: WordpressReconciler,
        broadcaster: Arc<EventBroadcaster>,
        config: ControllerConfig,
    ) -> Self {
        let backoff = Backoff::new(config.backoff_base, config.backoff_max);
        Self {
            reconciler,
            broadcaster,
            config,
            queue: Arc::new(WorkQueue::new()),
            backoff: Arc::new(backoff),
            readiness: Readiness::default(),
        }
    }

    pub fn readiness(&self) -> Readiness {
        self.readiness.clone()
    }

    /// Queues every stored Wordpress.
    async fn enqueue_all(&self) -> Result<usize, ReconcileError> {
        let objects = self.reconciler.store().list(Kind::Wordpress, None).await?;
        let count = objects.len();
        for object in objects {
            self.queue.add(object.key());
        }
        Ok(count)
    }

    /// Runs until `shutdown` is cancelled or the event channel closes.
    ///
    /// Fails only when the initial listing fails.
    pub async fn run(self, shutdown: CancellationToken) -> Result<(), ReconcileError> {
        // Subscribe before listing so no change between the two is missed.
        let mut events = self.broadcaster.subscribe();
        let listed = self.enqueue_all().await?;
        self.readiness.mark_ready();
        info!(
            workers = self.config.workers,
            listed,
            backend = self.reconciler.store().backend_name(),
            "Controller started"
        );

        let mut workers = JoinSet::new();
        for id in 0..self.config.workers.max(1) {
            workers.spawn(worker(
                id,
                self.reconciler.clone(),
                Arc::clone(&self.queue),
                Arc::clone(&self.backoff),
                shutdown.clone(),
            ));
        }

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                received = events.recv() => match received {
                    Ok(event) => {
                        if let Some(key) = key_for_event(&event) {
                            debug!(kind = %event.kind, object = %event.key, key = %key, "Enqueued from event");
                            self.queue.add(key);
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(missed)) => {
                        warn!(missed, "Controller lagged behind events, relisting");
                        if let Err(err) = self.enqueue_all().await {
                            error!(error = %err, "Relist failed");
                        }
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        info!("Event channel closed, stopping controller");
                        break;
                    }
                },
            }
        }

        self.queue.shutdown();
        while let Some(joined) = workers.join_next().await {
            if let Err(err) = joined {
                error!(error = %err, "Worker task failed");
            }
        }
        info!("Controller stopped");
        Ok(())
    }
}

async fn worker(
    id: usize,
    reconciler: WordpressReconciler,
    queue: Arc<WorkQueue<ObjectKey>>,
    backoff: Arc<Backoff<ObjectKey>>,
    shutdown: CancellationToken,
) {
    while let Some(key) = queue.get().await {
        let pass = shutdown.child_token();
        let result = reconciler.reconcile_with_cancel(&key, &pass).await;
        queue.done(&key);

        match result {
            Ok(outcome) => {
                backoff.forget(&key);
                debug!(worker = id, key = %key, outcome = ?outcome, "Reconciled");
            }
            Err(err) if err.is_cancelled() => {
                debug!(worker = id, key = %key, "Reconcile abandoned on shutdown");
            }
            Err(err) if err.is_retryable() => {
                let delay = backoff.next_delay(&key);
                warn!(
                    worker = id,
                    key = %key,
                    category = %err.category(),
                    retry_in = ?delay,
                    error = %err,
                    "Reconcile failed, requeueing"
                );
                queue.add_after(key, delay);
            }
            Err(err) => {
                backoff.forget(&key);
                error!(
                    worker = id,
                    key = %key,
                    category = %err.category(),
                    error = %err,
                    "Reconcile failed, waiting for a specification change"
                );
            }
        }
    }
    debug!(worker = id, "Worker stopped");
}

#[cfg(test)]
mod tests {
    use wpo_core::{Object, ObjectMeta, OwnerReference};

    use super::*;

    fn child(kind: Kind, owner_kind: &str) -> Object {
        let mut object = Object::new(kind, &ObjectKey::new("default", "blog-wp"));
        let mut owner = OwnerReference::controller(Kind::Wordpress, &ObjectMeta::new("default", "blog"));
        owner.kind = owner_kind.to_string();
        object.metadata.owner_references.push(owner);
        object
    }

    #[test]
    fn test_wordpress_event_maps_to_itself() {
        let object = Object::new(Kind::Wordpress, &ObjectKey::new("default", "blog"));
        assert_eq!(
            key_for_event(&ObjectEvent::updated(&object)),
            Some(ObjectKey::new("default", "blog"))
        );
    }

    #[test]
    fn test_child_event_maps_to_controller_owner() {
        let event = ObjectEvent::created(&child(Kind::Secret, "wordpress"));
        assert_eq!(key_for_event(&event), Some(ObjectKey::new("default", "blog")));
    }

    #[test]
    fn test_unwatched_and_foreign_events_are_ignored() {
        assert_eq!(key_for_event(&ObjectEvent::deleted(&child(Kind::CronJob, "Wordpress"))), None);
        assert_eq!(key_for_event(&ObjectEvent::created(&child(Kind::Service, "Deployment"))), None);

        let orphan = Object::new(Kind::Service, &ObjectKey::new("default", "lonely"));
        assert_eq!(key_for_event(&ObjectEvent::created(&orphan)), None);
    }
}
