//! Error types for the IAM engine

use thiserror::Error;

/// IAM engine errors
#[derive(Debug, Error)]
pub enum IamError {
    /// Referenced entity is absent from the store
    #[error("{kind} not found: {name}")]
    NotFound { kind: &'static str, name: String },

    /// An entity with this name already exists in its kind namespace
    #[error("{kind} already exists: {name}")]
    AlreadyExists { kind: &'static str, name: String },

    /// Malformed delimited pattern
    #[error("cannot compile pattern {pattern:?}: {reason}")]
    Compile { pattern: String, reason: String },

    /// Underlying store failure (open, read, write, iterate)
    #[error("storage error: {0}")]
    Storage(#[from] sled::Error),

    /// Record could not be serialized or deserialized
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Password hashing or verification failure
    #[error("credential error: {0}")]
    Credential(String),
}

impl IamError {
    pub(crate) fn not_found(kind: &'static str, name: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            name: name.into(),
        }
    }

    pub(crate) fn already_exists(kind: &'static str, name: impl Into<String>) -> Self {
        Self::AlreadyExists {
            kind,
            name: name.into(),
        }
    }
}

impl From<sled::transaction::TransactionError<IamError>> for IamError {
    fn from(err: sled::transaction::TransactionError<IamError>) -> Self {
        match err {
            sled::transaction::TransactionError::Abort(e) => e,
            sled::transaction::TransactionError::Storage(e) => IamError::Storage(e),
        }
    }
}

/// Result type for IAM operations
pub type Result<T> = std::result::Result<T, IamError>;
