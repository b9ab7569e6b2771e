//! Convergence controller for `Wordpress` resources.
//!
//! One reconciliation pass reads the resource, migrates deprecated fields,
//! applies defaults, drives each child object toward its desired shape
//! through an ordered [`Pipeline`] of [`Syncer`]s, writes the observed status
//! when it changed and finally reaps retired children.
//!
//! The pass itself is stateless: [`WordpressReconciler`] can be re-entered by
//! any dispatcher. [`runtime`] provides one, built on the store's change
//! notifications, a de-duplicating work queue and per-key backoff.
//!
//! # Module Structure
//!
//! - [`builders`]: desired shape of each child component
//! - [`syncer`]: single-object convergence against the store
//! - [`pipeline`]: ordered, fail-fast execution of syncers
//! - [`migrate`]: schema migration of deprecated specification fields
//! - [`reconciler`]: the pass state machine
//! - [`reaper`]: deletion of retired children, guarded by ownership
//! - [`recorder`]: observability events emitted per pass
//! - [`runtime`]: work queue, backoff and worker pool

pub mod builders;
pub mod error;
pub mod migrate;
pub mod pipeline;
pub mod reaper;
pub mod reconciler;
pub mod recorder;
pub mod runtime;
pub mod syncer;

pub use builders::{BuildError, ChildBuilder, SyncOutputs};
pub use error::ReconcileError;
pub use migrate::{MigrationOutcome, migrate};
pub use pipeline::{Pipeline, PipelineReport};
pub use reaper::{ReapOutcome, reap_legacy_cron};
pub use reconciler::{ReconcileOutcome, WordpressReconciler};
pub use recorder::{EventRecorder, EventSeverity, MemoryRecorder, RecordedEvent, TracingRecorder};
pub use runtime::{Controller, ControllerConfig};
pub use syncer::{SyncOutcome, SyncResult, Syncer};
