use http::StatusCode;
use thiserror::Error;

use crate::ports::dataplane::TransportError;

/// Errors surfaced by the reconciler.
///
/// Deleting or disabling something that is already absent is never an error;
/// those paths return `Ok(())`.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum ManagerError {
    /// A live object exists in a form incompatible with the request
    #[error("Configuration conflict: {0}")]
    Conflict(String),

    /// The Dataplane API could not be reached
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// The Dataplane API answered with an unexpected status
    #[error("{method} {path} failed with status {status}: {message}")]
    Api {
        method: String,
        path: String,
        status: StatusCode,
        message: String,
    },

    /// The Dataplane API answered with a body of unexpected shape
    #[error("Malformed response from {path}: {reason}")]
    MalformedResponse { path: String, reason: String },

    /// The commit was rejected because the transaction's base version is stale
    #[error("Transaction {transaction_id} is out of sequence: {message}")]
    VersionConflict {
        transaction_id: String,
        message: String,
    },

    /// Reserved port or an operation not allowed for the given mode
    #[error("Restricted operation: {0}")]
    Restricted(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("user list {0} does not exist")]
    UserListNotFound(String),

    #[error("user already exist in user list")]
    UserAlreadyExists { username: String, userlist: String },

    #[error("user {username} does not exist in user list {userlist}")]
    UserNotFound { username: String, userlist: String },

    #[error("Password hashing failed: {0}")]
    Hashing(String),
}

impl ManagerError {
    /// Whether re-running the whole pass with a fresh transaction may succeed
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ManagerError::Transport(_) | ManagerError::VersionConflict { .. }
        )
    }

    pub fn is_version_conflict(&self) -> bool {
        matches!(self, ManagerError::VersionConflict { .. })
    }

    pub(crate) fn malformed(path: &str, reason: impl ToString) -> Self {
        ManagerError::MalformedResponse {
            path: path.to_string(),
            reason: reason.to_string(),
        }
    }
}

/// Result type for reconciler operations
pub type ManagerResult<T> = Result<T, ManagerError>;
