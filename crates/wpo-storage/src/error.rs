//! Storage error types.

use std::fmt;

use wpo_core::{CoreError, Kind, ObjectKey};

/// Errors that can occur during store operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// The requested object does not exist.
    #[error("Object not found: {kind} {key}")]
    NotFound { kind: Kind, key: ObjectKey },

    /// The write was based on a stale revision.
    #[error("Version conflict: expected {expected}, found {actual}")]
    VersionConflict { expected: String, actual: String },

    /// An object with the same kind and key already exists.
    #[error("Object already exists: {kind} {key}")]
    AlreadyExists { kind: Kind, key: ObjectKey },

    /// The object document is malformed.
    #[error("Invalid object: {message}")]
    InvalidObject { message: String },

    /// The backend could not be reached.
    #[error("Store unavailable: {message}")]
    Unavailable { message: String },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl StorageError {
    #[must_use]
    pub fn not_found(kind: Kind, key: ObjectKey) -> Self {
        Self::NotFound { kind, key }
    }

    #[must_use]
    pub fn version_conflict(expected: impl Into<String>, actual: impl Into<String>) -> Self {
        Self::VersionConflict {
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    #[must_use]
    pub fn already_exists(kind: Kind, key: ObjectKey) -> Self {
        Self::AlreadyExists { kind, key }
    }

    #[must_use]
    pub fn invalid_object(message: impl Into<String>) -> Self {
        Self::InvalidObject {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    #[must_use]
    pub fn is_version_conflict(&self) -> bool {
        matches!(self, Self::VersionConflict { .. })
    }

    #[must_use]
    pub fn is_already_exists(&self) -> bool {
        matches!(self, Self::AlreadyExists { .. })
    }

    /// Whether re-running the pass from a fresh read can succeed.
    ///
    /// Conflicts (stale revision, create race) and backend outages are
    /// retryable. Malformed objects are not. `NotFound` is left to the
    /// caller, which knows whether absence is benign.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::VersionConflict { .. } | Self::AlreadyExists { .. } | Self::Unavailable { .. }
        )
    }

    /// Returns the error category for logging/monitoring purposes.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::NotFound { .. } => ErrorCategory::NotFound,
            Self::VersionConflict { .. } => ErrorCategory::Conflict,
            Self::AlreadyExists { .. } => ErrorCategory::Conflict,
            Self::InvalidObject { .. } => ErrorCategory::Validation,
            Self::Unavailable { .. } => ErrorCategory::Infrastructure,
            Self::Internal { .. } => ErrorCategory::Internal,
        }
    }
}

impl From<CoreError> for StorageError {
    fn from(err: CoreError) -> Self {
        Self::invalid_object(err.to_string())
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        Self::invalid_object(err.to_string())
    }
}

/// Categories of storage errors for logging and monitoring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    NotFound,
    /// Stale revision or existence race.
    Conflict,
    Validation,
    /// Backend/transport failure.
    Infrastructure,
    Internal,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound => write!(f, "not_found"),
            Self::Conflict => write!(f, "conflict"),
            Self::Validation => write!(f, "validation"),
            Self::Infrastructure => write!(f, "infrastructure"),
            Self::Internal => write!(f, "internal"),
        }
    }
}
