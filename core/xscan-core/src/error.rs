//! Error types for the xscan scanner bridge.
//!
//! All public APIs return `XscanResult<T>` — no panics in library code.
//! Errors raised by hosted readers travel through unchanged; the bridge only
//! adds its own variants for initialization, lifecycle and cleanup failures.

use thiserror::Error;

/// Unified error type for all bridge operations.
#[derive(Debug, Error)]
pub enum XscanError {
    /// Reader resolution or hosted construction failed (fatal for the scan range)
    #[error("bridge initialization failed for format '{format}': {message}")]
    BridgeInit { format: String, message: String },

    /// Error signalled by the hosted reader (missing file, corrupt data, ...)
    #[error("remote {op} failed: {message}")]
    Remote { op: String, message: String },

    /// Operation called out of lifecycle order
    #[error("invalid bridge state: cannot {op} while {state}")]
    InvalidState { op: String, state: String },

    /// Hosted close failed after a successful final read
    #[error("cleanup failed after end of stream: {source}")]
    Cleanup { source: Box<XscanError> },

    /// Malformed scan parameters or options
    #[error("config error: {0}")]
    Config(String),

    /// No reader factory registered for the format
    #[error("no reader registered for format '{0}'")]
    ReaderNotFound(String),

    /// Duplicate reader factory registration
    #[error("reader for format '{0}' already registered")]
    DuplicateReader(String),

    /// Block schema mismatch
    #[error("schema error: {0}")]
    Schema(String),

    /// Apache Arrow error (RecordBatch operations, C Data Interface)
    #[error("arrow error: {source}")]
    Arrow {
        #[from]
        source: arrow::error::ArrowError,
    },

    /// Standard I/O error
    #[error("io error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },

    /// Serialization/deserialization error
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl XscanError {
    /// Hosted-side failure for the given operation.
    pub fn remote(op: impl Into<String>, message: impl Into<String>) -> Self {
        XscanError::Remote {
            op: op.into(),
            message: message.into(),
        }
    }

    pub fn invalid_state(op: impl Into<String>, state: impl ToString) -> Self {
        XscanError::InvalidState {
            op: op.into(),
            state: state.to_string(),
        }
    }
}

/// Result type alias for all bridge operations.
pub type XscanResult<T> = Result<T, XscanError>;

// From 구현들
impl From<serde_json::Error> for XscanError {
    fn from(err: serde_json::Error) -> Self {
        XscanError::Serialization(err.to_string())
    }
}
