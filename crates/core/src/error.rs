//! Unified error types for shutter.
//!
//! Every variant carries a stable code prefix so failures can be reported
//! to the user without inspecting the variant.

use rmcp::model::{ErrorCode, ErrorData as McpError};
use tokio_rusqlite::rusqlite;

/// Unified error types for the photo store and the asset cache.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Invalid input parameters (e.g., empty payload).
    #[error("INVALID_INPUT: {0}")]
    InvalidInput(String),

    /// Invalid URL or asset path.
    #[error("INVALID_URL: {0}")]
    InvalidUrl(String),

    /// The persistent store could not be opened.
    #[error("STORAGE_UNAVAILABLE: {0}")]
    StorageUnavailable(String),

    /// An append or clear transaction was rejected; nothing was written.
    #[error("WRITE_FAILED: {0}")]
    WriteFailed(String),

    /// Database operation failed.
    #[error("STORAGE_ERROR: {0}")]
    Database(tokio_rusqlite::Error),

    /// Migration failed to apply.
    #[error("STORAGE_ERROR: migration failed: {0}")]
    MigrationFailed(String),

    /// One or more assets could not be fetched while populating a generation.
    #[error("INSTALL_FAILED: {generation}: {reason}")]
    InstallFailed { generation: String, reason: String },

    /// Activation named a generation that was never installed.
    #[error("GENERATION_MISSING: {0}")]
    GenerationMissing(String),

    /// Cache miss and the network request failed.
    #[error("NETWORK_UNAVAILABLE: {0}")]
    NetworkUnavailable(String),

    /// Network response exceeded the configured body limit.
    #[error("FETCH_TOO_LARGE: {0}")]
    FetchTooLarge(String),

    /// A cache generation was asked to make a transition its state forbids.
    #[error("INVALID_TRANSITION: {0}")]
    InvalidTransition(String),
}

impl Error {
    /// Turn a low-level database failure into `WriteFailed`.
    ///
    /// Other variants pass through untouched.
    pub fn into_write_failed(self) -> Self {
        match self {
            Error::Database(e) => Error::WriteFailed(e.to_string()),
            other => other,
        }
    }

    /// Whether the caller may retry the operation that produced this error.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::WriteFailed(_) | Error::NetworkUnavailable(_) | Error::InstallFailed { .. })
    }
}

impl From<tokio_rusqlite::Error<Error>> for Error {
    fn from(err: tokio_rusqlite::Error<Error>) -> Self {
        match err {
            tokio_rusqlite::Error::Error(e) => e,
            tokio_rusqlite::Error::ConnectionClosed => Error::Database(tokio_rusqlite::Error::ConnectionClosed),
            tokio_rusqlite::Error::Close(c) => Error::Database(tokio_rusqlite::Error::Close(c)),
            _ => Error::Database(tokio_rusqlite::Error::ConnectionClosed),
        }
    }
}

impl From<tokio_rusqlite::Error<rusqlite::Error>> for Error {
    fn from(err: tokio_rusqlite::Error<rusqlite::Error>) -> Self {
        Error::Database(err)
    }
}

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        Error::Database(tokio_rusqlite::Error::Error(err))
    }
}

impl From<Error> for McpError {
    fn from(err: Error) -> Self {
        let (code, message) = match &err {
            Error::InvalidInput(msg) => (-32602, msg.clone()),
            Error::InvalidUrl(msg) => (-32602, msg.clone()),
            Error::StorageUnavailable(msg) => (-32001, format!("cannot save photos: {msg}")),
            Error::WriteFailed(msg) => (-32002, msg.clone()),
            Error::Database(e) => (-32002, e.to_string()),
            Error::MigrationFailed(msg) => (-32002, msg.clone()),
            Error::InstallFailed { .. } => (-32003, err.to_string()),
            Error::GenerationMissing(name) => (-32004, format!("cache generation not installed: {name}")),
            Error::NetworkUnavailable(msg) => (-32005, msg.clone()),
            Error::FetchTooLarge(msg) => (-32006, msg.clone()),
            Error::InvalidTransition(msg) => (-32007, msg.clone()),
        };

        let data = serde_json::json!({ "retryable": err.is_retryable() });
        McpError { code: ErrorCode(code), message: message.into(), data: Some(data) }
    }
}
