use thiserror::Error;

/// Result type for ledger operations.
pub type LedgerResult<T> = Result<T, LedgerError>;

/// Ledger-layer errors.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// A key read by the transaction was committed by someone else first.
    #[error("mvcc conflict on key {0}")]
    Conflict(String),

    #[error("cursor already closed")]
    CursorClosed,

    #[error("invalid range: {0}")]
    InvalidRange(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("backend error: {0}")]
    Backend(String),
}

impl From<serde_json::Error> for LedgerError {
    fn from(value: serde_json::Error) -> Self {
        Self::Serialization(value.to_string())
    }
}
