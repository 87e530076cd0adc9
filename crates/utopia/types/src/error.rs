use serde::{Deserialize, Serialize};
use std::fmt;

/// Failure classes surfaced by every workspace operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    NotFound,
    AlreadyExists,
    InvalidArgument,
    Unauthorized,
    AlreadyInitialized,
    NotInitialized,
    /// The ledger rejected the commit because a read key changed underneath it.
    Conflict,
    /// Serialization or backend failure.
    Internal,
}

impl ErrorKind {
    /// Conditions the caller can resolve and resubmit.
    pub fn is_caller_retryable(&self) -> bool {
        matches!(
            self,
            ErrorKind::NotFound | ErrorKind::Unauthorized | ErrorKind::Conflict
        )
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::NotFound => "not_found",
            ErrorKind::AlreadyExists => "already_exists",
            ErrorKind::InvalidArgument => "invalid_argument",
            ErrorKind::Unauthorized => "unauthorized",
            ErrorKind::AlreadyInitialized => "already_initialized",
            ErrorKind::NotInitialized => "not_initialized",
            ErrorKind::Conflict => "conflict",
            ErrorKind::Internal => "internal",
        };
        f.write_str(name)
    }
}
