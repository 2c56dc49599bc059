use thiserror::Error;

use crate::ObjectId;

/// Errors surfaced to clients through the request/reply interface.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AzError {
    /// Malformed payload or constraint violation. No state change occurred.
    #[error("bad input: {0}")]
    BadInput(String),
    /// Reference to an object that is not in the last published snapshot.
    #[error("unknown object {0}")]
    UnknownObject(ObjectId),
    /// Reference to a template that is not in the store.
    #[error("unknown template `{0}`")]
    UnknownTemplate(String),
    /// Template names are write-once.
    #[error("template `{0}` already exists")]
    Conflict(String),
    /// The datastore was unavailable or rejected the operation.
    #[error("datastore error: {0}")]
    Store(String),
}

impl AzError {
    pub fn bad_input(msg: impl Into<String>) -> Self {
        AzError::BadInput(msg.into())
    }

    pub fn store(err: impl std::fmt::Display) -> Self {
        AzError::Store(err.to_string())
    }
}

pub type AzResult<T> = Result<T, AzError>;
