//! Error types shared across Cheezy crates.

use std::fmt;

/// Which half of the two-phase upload write failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadPhase {
    /// Writing the blob to object storage or resolving its address.
    Storage,
    /// Appending the metadata record to the shared store.
    Metadata,
}

impl fmt::Display for UploadPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UploadPhase::Storage => f.write_str("storage"),
            UploadPhase::Metadata => f.write_str("metadata"),
        }
    }
}

/// Top-level error type for Cheezy operations.
#[derive(Debug, thiserror::Error)]
pub enum CheezyError {
    #[error("Permission denied: {message}")]
    PermissionDenied { message: String },

    #[error("Upload failed during {phase} phase: {message}")]
    UploadFailure { phase: UploadPhase, message: String },

    #[error("Malformed record {id}: {message}")]
    MalformedRecord { id: String, message: String },

    #[error("Invalid transition: {event} is not allowed while {state}")]
    InvalidTransition { state: String, event: String },

    #[error("Capture error: {message}")]
    Capture { message: String },

    #[error("Storage error: {message}")]
    Storage { message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Unsupported operation: {message}")]
    Unsupported { message: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result type alias using CheezyError.
pub type CheezyResult<T> = Result<T, CheezyError>;

impl CheezyError {
    pub fn permission_denied(msg: impl Into<String>) -> Self {
        Self::PermissionDenied {
            message: msg.into(),
        }
    }

    pub fn upload(phase: UploadPhase, msg: impl Into<String>) -> Self {
        Self::UploadFailure {
            phase,
            message: msg.into(),
        }
    }

    pub fn malformed(id: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::MalformedRecord {
            id: id.into(),
            message: msg.into(),
        }
    }

    pub fn invalid_transition(state: impl fmt::Debug, event: impl fmt::Debug) -> Self {
        Self::InvalidTransition {
            state: format!("{state:?}"),
            event: format!("{event:?}"),
        }
    }

    pub fn capture(msg: impl Into<String>) -> Self {
        Self::Capture {
            message: msg.into(),
        }
    }

    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage {
            message: msg.into(),
        }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    pub fn unsupported(msg: impl Into<String>) -> Self {
        Self::Unsupported {
            message: msg.into(),
        }
    }

    /// Whether this error came out of the upload pipeline.
    pub fn is_upload_failure(&self) -> bool {
        matches!(self, Self::UploadFailure { .. })
    }
}
