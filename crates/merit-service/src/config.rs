//! Service configuration parsing and validation.
//!
//! Configuration is a small TOML file; parsing is fail-closed — a zero
//! accrual amount or an unparseable distributor address rejects the whole
//! file rather than falling back to a default.

use std::path::{Path, PathBuf};

use merit_core::address::Address;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default per-check-in eligibility accrual.
const DEFAULT_PER_CHECKIN_AMOUNT: u64 = 1000;

/// Default loyalty points awarded per check-in.
const DEFAULT_POINTS_PER_CHECKIN: u64 = 10;

/// Errors that can occur when loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("cannot read config file: {0}")]
    Io(#[from] std::io::Error),

    /// The TOML is syntactically or structurally invalid.
    #[error("cannot parse config: {0}")]
    Parse(#[from] toml::de::Error),

    /// The parsed values fail semantic validation.
    #[error("invalid config: {0}")]
    Validation(String),
}

/// Top-level service configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Path to the `SQLite` database file.
    #[serde(default = "default_database_path")]
    pub database_path: PathBuf,

    /// External distributor contract address recorded on each batch.
    #[serde(default = "default_distributor")]
    pub distributor: Address,

    /// Eligibility added per check-in.
    #[serde(default = "default_per_checkin_amount")]
    pub per_checkin_amount: u64,

    /// Loyalty points awarded per check-in.
    #[serde(default = "default_points_per_checkin")]
    pub points_per_checkin: u64,

    /// Hex-encoded Ed25519 seed for the authorization signer.
    ///
    /// Absent in deployments where signing is deferred; issuance operations
    /// then fail closed instead of emitting unsigned payloads.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signing_key_seed: Option<String>,
}

fn default_database_path() -> PathBuf {
    PathBuf::from("merit.db")
}

const fn default_distributor() -> Address {
    Address::ZERO
}

const fn default_per_checkin_amount() -> u64 {
    DEFAULT_PER_CHECKIN_AMOUNT
}

const fn default_points_per_checkin() -> u64 {
    DEFAULT_POINTS_PER_CHECKIN
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            distributor: default_distributor(),
            per_checkin_amount: default_per_checkin_amount(),
            points_per_checkin: default_points_per_checkin(),
            signing_key_seed: None,
        }
    }
}

impl ServiceConfig {
    /// Loads configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed, or validated.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parses configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML is invalid or validation fails.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validates semantic constraints.
    ///
    /// # Errors
    ///
    /// Returns `Validation` if any value is unusable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.per_checkin_amount == 0 {
            return Err(ConfigError::Validation(
                "per_checkin_amount must be positive: a zero accrual would make \
                 every check-in a no-op"
                    .to_string(),
            ));
        }
        Ok(())
    }
}
