//! Errors surfaced by a reconciliation pass.

use wpo_core::{CoreError, Kind, ObjectKey};
use wpo_storage::{ErrorCategory, StorageError};

use crate::builders::BuildError;

/// Failure of one reconciliation pass.
///
/// The pass never retries by itself. The dispatcher decides from
/// [`ReconcileError::is_retryable`] whether to requeue the key with backoff.
#[derive(Debug, thiserror::Error)]
pub enum ReconcileError {
    /// Raw store failure, propagated unclassified.
    #[error(transparent)]
    Store(#[from] StorageError),

    /// The object moved underneath a write, e.g. it was deleted between the
    /// read and the update.
    #[error("Conflict on {kind} {key}: {reason}")]
    Conflict {
        kind: Kind,
        key: ObjectKey,
        reason: String,
    },

    /// The desired shape of a child could not be computed.
    #[error("Failed to build {kind} {key}: {source}")]
    Builder {
        kind: Kind,
        key: ObjectKey,
        #[source]
        source: BuildError,
    },

    #[error("Invalid resource: {0}")]
    Serialization(#[from] CoreError),

    #[error("Reconciliation cancelled")]
    Cancelled,
}

impl ReconcileError {
    pub fn conflict(kind: Kind, key: ObjectKey, reason: impl Into<String>) -> Self {
        Self::Conflict {
            kind,
            key,
            reason: reason.into(),
        }
    }

    pub fn builder(kind: Kind, key: ObjectKey, source: BuildError) -> Self {
        Self::Builder { kind, key, source }
    }

    /// Maps a store error from a write based on an earlier read. An object
    /// that vanished in between is a conflict, not a missing resource.
    pub(crate) fn from_write(err: StorageError, kind: Kind, key: &ObjectKey) -> Self {
        if err.is_not_found() {
            Self::conflict(kind, key.clone(), "object was deleted during update")
        } else {
            Self::Store(err)
        }
    }

    /// Whether re-running the pass from a fresh read can succeed without a
    /// specification change.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Store(err) => err.is_retryable(),
            Self::Conflict { .. } | Self::Cancelled => true,
            Self::Builder { .. } | Self::Serialization(_) => false,
        }
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict { .. })
            || matches!(self, Self::Store(err) if err.category() == ErrorCategory::Conflict)
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// Returns the error category for logging/monitoring purposes.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Store(err) => err.category(),
            Self::Conflict { .. } => ErrorCategory::Conflict,
            Self::Builder { .. } | Self::Serialization(_) => ErrorCategory::Validation,
            Self::Cancelled => ErrorCategory::Internal,
        }
    }
}
