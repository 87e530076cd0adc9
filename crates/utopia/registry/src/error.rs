use thiserror::Error;
use utopia_auth::AuthError;
use utopia_ledger::LedgerError;
use utopia_types::ErrorKind;

/// Result type for registry operations.
pub type RegistryResult<T> = Result<T, RegistryError>;

/// Failures of a workspace state transition. Any of them aborts the
/// surrounding transaction.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("already exists: {0}")]
    AlreadyExists(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("unauthorized: {0}")]
    Unauthorized(#[from] AuthError),

    #[error("ledger already initialized")]
    AlreadyInitialized,

    #[error("ledger not initialized: {0} is missing")]
    NotInitialized(String),

    #[error("ledger error: {0}")]
    Ledger(#[from] LedgerError),
}

impl RegistryError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            RegistryError::NotFound(_) => ErrorKind::NotFound,
            RegistryError::AlreadyExists(_) => ErrorKind::AlreadyExists,
            RegistryError::InvalidArgument(_) => ErrorKind::InvalidArgument,
            RegistryError::Unauthorized(_) => ErrorKind::Unauthorized,
            RegistryError::AlreadyInitialized => ErrorKind::AlreadyInitialized,
            RegistryError::NotInitialized(_) => ErrorKind::NotInitialized,
            RegistryError::Ledger(LedgerError::Conflict(_)) => ErrorKind::Conflict,
            RegistryError::Ledger(_) => ErrorKind::Internal,
        }
    }
}
