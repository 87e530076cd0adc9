//! CLI error types

use thiserror::Error;
use utopia_contract::{ConfigError, ContractError};
use utopia_ledger::LedgerError;

/// CLI error types
#[derive(Debug, Error)]
pub enum CliError {
    /// Rejected operation, tagged with its error kind
    #[error("[{kind}] {err}", kind = .0.kind(), err = .0)]
    Contract(#[from] ContractError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Snapshot could not be loaded or exported
    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for CLI operations
pub type CliResult<T> = Result<T, CliError>;
