//! Contract configuration

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;
use utopia_registry::IdMode;

/// Result type for configuration loading.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Policy knobs every replica must share.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContractConfig {
    /// Whether creation requests may name their own IDs
    pub id_mode: IdMode,

    /// Distinct approvers needed before an interaction is validated
    pub approval_quorum: usize,
}

impl Default for ContractConfig {
    fn default() -> Self {
        Self {
            id_mode: IdMode::Allocated,
            approval_quorum: 1,
        }
    }
}

impl ContractConfig {
    /// Load configuration from a TOML file, falling back to defaults when it does not exist
    pub fn load(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    pub fn from_toml_str(contents: &str) -> ConfigResult<Self> {
        let config: ContractConfig = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if self.approval_quorum == 0 {
            return Err(ConfigError::Invalid(
                "approval_quorum must be at least 1".into(),
            ));
        }
        Ok(())
    }
}
