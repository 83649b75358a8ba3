//! Error types for llamalink.
//!
//! Failures are split into two classes: enumeration-class errors end a
//! reconciliation run, everything else is recorded against the model or
//! path it concerns and the run carries on.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Main error type for the llamalink library.
#[derive(Debug, Error)]
pub enum LinkError {
    // File system errors
    #[error("IO error at {path:?}: {message}")]
    Io {
        message: String,
        path: Option<PathBuf>,
        #[source]
        source: Option<std::io::Error>,
    },

    #[error("Failed to create symlink from {src} to {dest}: {reason}")]
    SymlinkFailed {
        src: PathBuf,
        dest: PathBuf,
        reason: String,
    },

    #[error("Refusing to replace non-link entry at {path}")]
    LinkConflict { path: PathBuf },

    // Serialization errors
    #[error("JSON error: {message}")]
    Json {
        message: String,
        #[source]
        source: Option<serde_json::Error>,
    },

    // Model source errors
    #[error("Command `{command}` failed: {message}")]
    CommandFailed { command: String, message: String },

    #[error("Command `{command}` timed out after {timeout:?}")]
    CommandTimeout { command: String, timeout: Duration },

    #[error("Could not parse model list: {message}")]
    ListParse { message: String },

    #[error("Model path not found for {model}")]
    ResolutionFailed { model: String },

    #[error("Invalid model path for {model}: {path} ({reason})")]
    InvalidBackingFile {
        model: String,
        path: PathBuf,
        reason: String,
    },

    // Configuration errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Operation was cancelled")]
    Cancelled,

    // Generic errors
    #[error("{0}")]
    Other(String),
}

/// Result type alias for llamalink operations.
pub type Result<T> = std::result::Result<T, LinkError>;

impl From<std::io::Error> for LinkError {
    fn from(err: std::io::Error) -> Self {
        LinkError::Io {
            message: err.to_string(),
            path: None,
            source: Some(err),
        }
    }
}

impl From<serde_json::Error> for LinkError {
    fn from(err: serde_json::Error) -> Self {
        LinkError::Json {
            message: err.to_string(),
            source: Some(err),
        }
    }
}

impl LinkError {
    /// Create an IO error with path context.
    pub fn io_with_path(err: std::io::Error, path: impl Into<PathBuf>) -> Self {
        LinkError::Io {
            message: err.to_string(),
            path: Some(path.into()),
            source: Some(err),
        }
    }

    /// Whether this error ends a reconciliation run instead of a single model.
    ///
    /// Only failures that leave the run without a model list (or without a
    /// usable configuration) qualify.
    pub fn is_fatal_to_run(&self) -> bool {
        matches!(
            self,
            LinkError::CommandFailed { .. }
                | LinkError::CommandTimeout { .. }
                | LinkError::ListParse { .. }
                | LinkError::Config { .. }
        )
    }
}
