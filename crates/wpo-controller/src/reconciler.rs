//! The reconciliation pass.

use std::sync::Arc;

use serde_json::json;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument};
use wpo_core::{Component, CoreError, Kind, ObjectKey, ObjectRef, Wordpress};
use wpo_storage::DynStore;

use crate::error::ReconcileError;
use crate::migrate::migrate;
use crate::pipeline::Pipeline;
use crate::reaper::{ReapOutcome, reap_legacy_cron};
use crate::recorder::EventRecorder;
use crate::syncer::SyncResult;

/// How a pass ended.
#[derive(Debug, Clone, PartialEq)]
pub enum ReconcileOutcome {
    /// The resource no longer exists; the store cascades its children.
    Deleted,
    /// Deprecated fields were rewritten and persisted. The write triggers
    /// the next pass, so nothing else ran.
    Migrated,
    Synced {
        results: Vec<(ObjectRef, SyncResult)>,
        status_updated: bool,
        reaped: ReapOutcome,
    },
}

/// Converges the children of one `Wordpress` per call.
///
/// Holds no per-key state between passes, so any dispatcher can call it,
/// including back-to-back for the same key.
#[derive(Clone)]
pub struct WordpressReconciler {
    store: DynStore,
    recorder: Arc<dyn EventRecorder>,
}

impl WordpressReconciler {
    pub fn new(store: DynStore, recorder: Arc<dyn EventRecorder>) -> Self {
        Self { store, recorder }
    }

    pub fn store(&self) -> &DynStore {
        &self.store
    }

    /// Runs one pass, abandoning it when `cancel` fires.
    ///
    /// Writes already committed when the token fires stay committed.
    pub async fn reconcile_with_cancel(
        &self,
        key: &ObjectKey,
        cancel: &CancellationToken,
    ) -> Result<ReconcileOutcome, ReconcileError> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(ReconcileError::Cancelled),
            result = self.reconcile(key) => result,
        }
    }

    /// Runs one pass for `key`.
    #[instrument(skip_all, fields(key = %key))]
    pub async fn reconcile(&self, key: &ObjectKey) -> Result<ReconcileOutcome, ReconcileError> {
        let store = self.store.as_ref();

        let Some(object) = store.get(Kind::Wordpress, key).await? else {
            debug!("Wordpress not found, nothing to do");
            return Ok(ReconcileOutcome::Deleted);
        };
        let revision = object.resource_version().map(str::to_string);
        let mut wordpress = Wordpress::from_object(&object)?;

        let migration = migrate(&wordpress.spec);
        if migration.changed {
            // Only the migrated keys are rewritten; fields the typed spec
            // does not model stay as stored.
            let routes = serde_json::to_value(&migration.spec.routes).map_err(CoreError::from)?;
            let mut migrated = object;
            migrated.update_object_field("spec", |spec| {
                spec.insert("routes".into(), routes);
                spec.remove("domains");
            });
            store
                .update(&migrated, revision.as_deref())
                .await
                .map_err(|err| ReconcileError::from_write(err, Kind::Wordpress, key))?;
            info!(routes = migration.spec.routes.len(), "Migrated deprecated domains to routes");
            return Ok(ReconcileOutcome::Migrated);
        }
        wordpress.spec = migration.spec;
        wordpress.spec.set_defaults();

        let report = Pipeline::for_wordpress(&wordpress)
            .run(store, self.recorder.as_ref())
            .await?;

        let observed = report
            .object(Kind::Deployment, &wordpress.component_key(Component::Deployment))
            .and_then(|d| d.pointer_i64("/status/replicas"))
            .and_then(|r| i32::try_from(r).ok())
            .unwrap_or_default();

        let status_updated = if observed != wordpress.status.replicas {
            let mut updated = object;
            updated.update_object_field("status", |status| {
                status.insert("replicas".into(), json!(observed));
            });
            store
                .update_status(&updated, revision.as_deref())
                .await
                .map_err(|err| ReconcileError::from_write(err, Kind::Wordpress, key))?;
            debug!(from = wordpress.status.replicas, to = observed, "Updated status");
            true
        } else {
            false
        };

        let reaped = reap_legacy_cron(store, &wordpress).await?;

        Ok(ReconcileOutcome::Synced {
            results: report.results(),
            status_updated,
            reaped,
        })
    }
}

impl std::fmt::Debug for WordpressReconciler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WordpressReconciler")
            .field("backend", &self.store.backend_name())
            .finish()
    }
}
