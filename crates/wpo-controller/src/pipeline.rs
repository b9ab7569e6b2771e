//! Ordered, fail-fast execution of syncers.

use tracing::{debug, warn};
use wpo_core::{Component, Kind, Object, ObjectKey, ObjectRef, Wordpress};
use wpo_storage::ObjectStore;

use crate::builders::{ChildBuilder, SyncOutputs};
use crate::error::ReconcileError;
use crate::recorder::{EventRecorder, RecordedEvent};
use crate::syncer::{SyncOutcome, SyncResult, Syncer};

/// Syncers of one pass, in dependency order.
///
/// Later syncers may read the committed objects of earlier ones through
/// [`SyncOutputs`], so the order is fixed when the pipeline is built.
pub struct Pipeline<'a, B = Component> {
    owner: &'a Wordpress,
    syncers: Vec<Syncer<'a, B>>,
}

impl<'a> Pipeline<'a, Component> {
    /// The production pipeline: secret, deployment, service, ingress, then a
    /// claim for each volume category that requests persistent storage.
    pub fn for_wordpress(owner: &'a Wordpress) -> Self {
        let mut components = vec![
            Component::Secret,
            Component::Deployment,
            Component::Service,
            Component::Ingress,
        ];
        if owner.spec.code_claim().is_some() {
            components.push(Component::CodePvc);
        }
        if owner.spec.media_claim().is_some() {
            components.push(Component::MediaPvc);
        }
        Self::new(owner, components)
    }
}

impl<'a, B: ChildBuilder> Pipeline<'a, B> {
    pub fn new(owner: &'a Wordpress, builders: impl IntoIterator<Item = B>) -> Self {
        let syncers = builders
            .into_iter()
            .map(|builder| Syncer::new(owner, builder))
            .collect();
        Self { owner, syncers }
    }

    pub fn len(&self) -> usize {
        self.syncers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.syncers.is_empty()
    }

    /// Children this pipeline converges, in execution order.
    pub fn object_refs(&self) -> Vec<ObjectRef> {
        self.syncers.iter().map(|s| s.object_ref()).collect()
    }

    /// Runs every syncer in order and stops at the first failure.
    ///
    /// Changes committed before a failure are not rolled back; the next pass
    /// converges from wherever this one stopped. Events are recorded for each
    /// committed change, plus a warning for the failing child.
    pub async fn run(
        &self,
        store: &dyn ObjectStore,
        recorder: &dyn EventRecorder,
    ) -> Result<PipelineReport, ReconcileError> {
        let owner_ref = ObjectRef::new(Kind::Wordpress, &self.owner.key());
        let mut report = PipelineReport::default();

        for syncer in &self.syncers {
            match syncer.sync(store, &report.outputs).await {
                Ok(outcome) => {
                    report.outputs.insert(outcome.object.clone());
                    report.outcomes.push(outcome);
                }
                Err(err) => {
                    let child = syncer.object_ref();
                    report.record(&owner_ref, recorder);
                    warn!(
                        owner = %owner_ref,
                        child = %child,
                        category = %err.category(),
                        error = %err,
                        "Child sync failed"
                    );
                    recorder.record(
                        &owner_ref,
                        RecordedEvent::warning(
                            format!("{}SyncFailed", child.kind),
                            &child,
                            err.to_string(),
                        ),
                    );
                    return Err(err);
                }
            }
        }

        report.record(&owner_ref, recorder);
        debug!(owner = %owner_ref, changed = report.changed_count(), "Pipeline completed");
        Ok(report)
    }
}

/// Committed results of a pipeline run.
#[derive(Debug, Clone, Default)]
pub struct PipelineReport {
    pub outcomes: Vec<SyncOutcome>,
    pub outputs: SyncOutputs,
}

impl PipelineReport {
    pub fn results(&self) -> Vec<(ObjectRef, SyncResult)> {
        self.outcomes
            .iter()
            .map(|o| (o.object_ref.clone(), o.result))
            .collect()
    }

    pub fn changed_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.result.is_changed()).count()
    }

    pub fn object(&self, kind: Kind, key: &ObjectKey) -> Option<&Object> {
        self.outputs.get(kind, key)
    }

    fn record(&self, owner: &ObjectRef, recorder: &dyn EventRecorder) {
        for outcome in self.outcomes.iter().filter(|o| o.result.is_changed()) {
            let child = &outcome.object_ref;
            let verb = match outcome.result {
                SyncResult::Created => "Created",
                _ => "Updated",
            };
            recorder.record(
                owner,
                RecordedEvent::normal(
                    format!("{}{verb}", child.kind),
                    child,
                    format!("{} {} {}", child.kind, child.name, outcome.result),
                ),
            );
        }
    }
}
