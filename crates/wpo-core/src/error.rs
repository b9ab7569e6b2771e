use thiserror::Error;

/// Core error types for object model operations
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Invalid object kind: {0}")]
    InvalidKind(String),

    #[error("JSON serialization error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Invalid object data: {message}")]
    InvalidObject { message: String },
}

impl CoreError {
    /// Create a new InvalidKind error
    pub fn invalid_kind(kind: impl Into<String>) -> Self {
        Self::InvalidKind(kind.into())
    }

    /// Create a new InvalidObject error
    pub fn invalid_object(message: impl Into<String>) -> Self {
        Self::InvalidObject {
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, CoreError>;
