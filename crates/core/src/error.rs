//! Unified error types for the offline cache worker.
//!
//! Every variant renders with a stable code prefix so hosts can match on it.

use rmcp::model::{ErrorCode, ErrorData as McpError};
use tokio_rusqlite::rusqlite;

/// Unified error types for the offline cache worker.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Invalid input parameters (e.g., unknown HTTP method).
    #[error("INVALID_INPUT: {0}")]
    InvalidInput(String),

    /// Invalid or unsupported URL.
    #[error("INVALID_URL: {0}")]
    InvalidUrl(String),

    /// No entry for the given request in the named cache.
    #[error("CACHE_MISS: {0}")]
    CacheMiss(String),

    /// Database operation failed.
    #[error("CACHE_ERROR: {0}")]
    Database(tokio_rusqlite::Error),

    /// Migration failed to apply.
    #[error("CACHE_ERROR: migration failed: {0}")]
    MigrationFailed(String),

    /// A stored entry could not be decoded.
    #[error("CACHE_ERROR: corrupt entry: {0}")]
    CorruptEntry(String),

    /// The network could not produce a response at all (offline, DNS, reset).
    #[error("NETWORK_ERROR: {0}")]
    Network(String),

    /// The network answered, but not with a success status.
    #[error("HTTP_ERROR: {0}")]
    HttpError(String),

    /// Fetch response too large.
    #[error("FETCH_TOO_LARGE: {0}")]
    FetchTooLarge(String),

    /// Pre-populating the static cache failed; nothing was stored.
    #[error("INSTALL_FAILED: {0}")]
    InstallFailed(String),

    /// Lifecycle event arrived in a state that cannot accept it.
    #[error("INVALID_STATE: {0}")]
    InvalidState(String),

    /// The host runtime rejected a side effect (notification, window, claim).
    #[error("HOST_ERROR: {0}")]
    Host(String),
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
            Error::InvalidUrl(msg) => (-32003, msg.clone()),
            Error::CacheMiss(msg) => (-32001, msg.clone()),
            Error::Database(e) => (-32002, e.to_string()),
            Error::MigrationFailed(msg) => (-32002, msg.clone()),
            Error::CorruptEntry(msg) => (-32002, msg.clone()),
            Error::Network(msg) => (-32004, msg.clone()),
            Error::HttpError(msg) => (-32008, msg.clone()),
            Error::FetchTooLarge(msg) => (-32007, msg.clone()),
            Error::InstallFailed(msg) => (-32013, msg.clone()),
            Error::InvalidState(msg) => (-32014, msg.clone()),
            Error::Host(msg) => (-32015, msg.clone()),
        };

        McpError { code: ErrorCode(code), message: message.into(), data: None }
    }
}
