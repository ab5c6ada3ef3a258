//! Error and Result types for export operations.

use common::StorageError;

use crate::search::SearchError;

/// A convenience `Result` type for export operations.
pub type Result<T> = std::result::Result<T, Error>;

/// The error type for export operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// Invalid service configuration, rejected at construction.
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// A request failed validation before any state was persisted.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// The request conflicts with the current export state.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// The caller is not allowed to use the export service.
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// No session is stored under the given id.
    #[error("Export session not found: {0}")]
    NotFound(String),

    /// No session currently holds the global export lock.
    #[error("No active export")]
    NoActiveExport,

    /// The session already reached a terminal status.
    #[error("Export session {id} is already in terminal status {status}")]
    AlreadyTerminal { id: String, status: String },

    #[error("Search error: {0}")]
    Search(#[from] SearchError),

    #[error("File store error: {0}")]
    FileStore(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Encoding error: {0}")]
    Encoding(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<StorageError> for Error {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::Storage(msg) => Error::Storage(msg),
            StorageError::Internal(msg) => Error::Internal(msg),
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Encoding(err.to_string())
    }
}

impl From<slatedb::object_store::Error> for Error {
    fn from(err: slatedb::object_store::Error) -> Self {
        Error::FileStore(err.to_string())
    }
}
