//! Application configuration loading and validation.
//!
//! Configuration is loaded from a TOML file; `ODDSMILL_DATABASE_URL`
//! overrides the database location so tests and deployments can point
//! elsewhere without editing the file. Every section has defaults, so an
//! empty file (or a missing one handled by the caller) is valid.

pub mod logging;

use std::fs;
use std::path::Path;

use rust_decimal::Decimal;
use serde::Deserialize;

use crate::error::{ConfigError, Result};
pub use logging::{LogFormat, LoggingConfig};

fn default_database_url() -> String {
    "oddsmill.db".to_string()
}

/// Database settings.
#[derive(Debug, Deserialize)]
pub struct DatabaseConfig {
    /// SQLite database path or `:memory:`.
    #[serde(default = "default_database_url")]
    pub url: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: default_database_url(),
        }
    }
}

fn default_liquidity() -> f64 {
    100.0
}

fn default_starting_balance() -> Decimal {
    Decimal::new(1000, 0)
}

/// Market-maker settings.
#[derive(Debug, Deserialize)]
pub struct MarketConfig {
    /// LMSR liquidity parameter applied to newly created markets.
    #[serde(default = "default_liquidity")]
    pub liquidity: f64,

    /// Balance credited to newly added users.
    #[serde(default = "default_starting_balance")]
    pub starting_balance: Decimal,
}

impl Default for MarketConfig {
    fn default() -> Self {
        Self {
            liquidity: default_liquidity(),
            starting_balance: default_starting_balance(),
        }
    }
}

/// Main application configuration.
#[derive(Debug, Default, Deserialize)]
pub struct Config {
    /// Database settings.
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Market-maker settings.
    #[serde(default)]
    pub market: MarketConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a TOML file, applying environment
    /// overrides and validating values.
    ///
    /// # Errors
    /// Returns `ConfigError` when the file cannot be read or parsed, or
    /// when a value fails validation.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let raw = fs::read_to_string(path).map_err(ConfigError::ReadFile)?;
        Self::parse_toml(&raw)
    }

    /// Parse configuration from a TOML string.
    ///
    /// # Errors
    /// Returns `ConfigError` when parsing or validation fails.
    pub fn parse_toml(raw: &str) -> Result<Self> {
        let mut config: Config = toml::from_str(raw).map_err(ConfigError::Parse)?;

        if let Ok(url) = std::env::var("ODDSMILL_DATABASE_URL") {
            config.database.url = url;
        }

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.database.url.trim().is_empty() {
            return Err(ConfigError::MissingField {
                field: "database.url",
            }
            .into());
        }
        if !(self.market.liquidity.is_finite() && self.market.liquidity > 0.0) {
            return Err(ConfigError::InvalidValue {
                field: "market.liquidity",
                reason: format!("must be positive and finite, got {}", self.market.liquidity),
            }
            .into());
        }
        if self.market.starting_balance < Decimal::ZERO {
            return Err(ConfigError::InvalidValue {
                field: "market.starting_balance",
                reason: format!("must not be negative, got {}", self.market.starting_balance),
            }
            .into());
        }
        Ok(())
    }

    /// Initialize the tracing subscriber from the logging section.
    pub fn init_logging(&self) {
        self.logging.init();
    }
}
