//! Error taxonomy for the note store

use thiserror::Error;

/// The key-value store rejected a call, or handed back something we cannot read.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage {operation} failed: {message}")]
    Backend {
        operation: &'static str,
        message: String,
    },

    #[error("stored value at {key:?} is malformed: {source}")]
    Corrupt {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("{key:?} is reserved and cannot hold a note")]
    ReservedKey { key: String },
}

impl StorageError {
    pub fn backend(operation: &'static str, message: impl Into<String>) -> Self {
        StorageError::Backend {
            operation,
            message: message.into(),
        }
    }
}

/// Reasons an import document is rejected. Raised before anything is written.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ImportError {
    #[error("Invalid JSON file. Please select a valid Notably export file.")]
    InvalidJson,

    #[error("Invalid file format. Expected an object with notes.")]
    NotAnObject,

    #[error("No notes found in the file.")]
    Empty,

    #[error("Invalid note format for URL: {url}. Missing required fields.")]
    InvalidNote { url: String },
}

/// Anything the core can surface to the extension UI.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Import(#[from] ImportError),

    #[error("failed to serialize notes: {0}")]
    Serialize(#[from] serde_json::Error),
}
