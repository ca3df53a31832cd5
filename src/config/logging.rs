//! Logging configuration and initialization for the market maker.

use serde::Deserialize;
use tracing_subscriber::{fmt, EnvFilter};

/// Output format for log events.
///
/// Parsed as part of the `[logging]` config section; anything other than
/// the two canonical forms is rejected at load time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable output for running the CLI interactively.
    #[default]
    Pretty,
    /// Newline-delimited JSON for log collectors.
    Json,
}

fn default_level() -> String {
    "info".to_string()
}

/// Logging configuration.
#[derive(Debug, Deserialize)]
pub struct LoggingConfig {
    /// Default filter directive; `RUST_LOG` overrides it when set.
    #[serde(default = "default_level")]
    pub level: String,
    /// Event output format.
    #[serde(default)]
    pub format: LogFormat,
}

impl LoggingConfig {
    /// Initialize the tracing subscriber with this logging configuration.
    pub fn init(&self) {
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&self.level));

        match self.format {
            LogFormat::Json => {
                fmt().json().with_env_filter(filter).init();
            }
            LogFormat::Pretty => {
                fmt().with_env_filter(filter).init();
            }
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            format: LogFormat::default(),
        }
    }
}
