use thiserror::Error;
use utopia_ledger::LedgerError;
use utopia_registry::RegistryError;
use utopia_types::ErrorKind;

/// Result type for contract operations.
pub type ContractResult<T> = Result<T, ContractError>;

/// A failed named operation. Nothing it wrote was committed.
#[derive(Debug, Error)]
pub enum ContractError {
    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error("ledger error: {0}")]
    Ledger(#[from] LedgerError),

    #[error("invalid argument: unknown function {0}")]
    UnknownFunction(String),

    #[error("invalid argument: {function}: {reason}")]
    BadArguments { function: String, reason: String },
}

impl ContractError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ContractError::Registry(err) => err.kind(),
            ContractError::Ledger(LedgerError::Conflict(_)) => ErrorKind::Conflict,
            ContractError::Ledger(_) => ErrorKind::Internal,
            ContractError::UnknownFunction(_) | ContractError::BadArguments { .. } => {
                ErrorKind::InvalidArgument
            }
        }
    }
}
