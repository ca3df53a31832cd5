//! Error types for the crate.
//!
//! Trade and settlement rejections are modelled as [`TradeError`] so
//! callers can match on the exact reason; infrastructure failures fold
//! into the crate-level [`Error`]. Any error returned from inside a
//! database transaction closure rolls the whole transaction back, so a
//! rejection never leaves partial state behind.

use thiserror::Error;

use crate::domain::error::DomainError;

/// Configuration-related errors with structured variants.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("missing required field: {field}")]
    MissingField { field: &'static str },

    #[error("invalid value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },

    #[error("failed to read config file: {0}")]
    ReadFile(#[source] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[source] toml::de::Error),
}

/// Reasons a trade or settlement request is rejected.
///
/// Every variant is detected before the enclosing transaction commits;
/// a rejected request has no side effects.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TradeError {
    /// The referenced market does not exist.
    #[error("market '{market_id}' not found")]
    MarketNotFound { market_id: String },

    /// The referenced user does not exist.
    #[error("user '{user_id}' not found")]
    UserNotFound { user_id: String },

    /// The outcome is not part of the market.
    #[error("outcome '{outcome_id}' is not part of market '{market_id}'")]
    InvalidOutcome {
        market_id: String,
        outcome_id: String,
    },

    /// The share amount is not strictly positive.
    #[error("share amount must be positive, got {amount}")]
    InvalidAmount { amount: rust_decimal::Decimal },

    /// The market is resolved or archived and no longer accepts requests.
    #[error("market '{market_id}' is {status}, not open")]
    MarketClosed { market_id: String, status: String },

    /// The user's balance does not cover the computed trade cost.
    #[error("balance {balance} is below trade cost {cost}")]
    InsufficientBalance {
        balance: rust_decimal::Decimal,
        cost: rust_decimal::Decimal,
    },

    /// A user with this ID already exists.
    #[error("user '{user_id}' already exists")]
    UserExists { user_id: String },
}

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error(transparent)]
    Trade(#[from] TradeError),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("connection error: {0}")]
    Connection(String),

    #[error("database error: {0}")]
    Database(String),

    #[error("parse error: {0}")]
    Parse(String),
}

pub type Result<T> = std::result::Result<T, Error>;

// Lets `?` inside `conn.transaction(...)` closures convert Diesel
// failures, which also triggers the rollback path.
impl From<diesel::result::Error> for Error {
    fn from(err: diesel::result::Error) -> Self {
        Error::Database(err.to_string())
    }
}

impl Error {
    /// The trade rejection carried by this error, if any.
    #[must_use]
    pub fn as_trade(&self) -> Option<&TradeError> {
        match self {
            Error::Trade(e) => Some(e),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn trade_error_messages_name_the_entities() {
        let err = TradeError::InvalidOutcome {
            market_id: "m1".into(),
            outcome_id: "maybe".into(),
        };
        assert_eq!(err.to_string(), "outcome 'maybe' is not part of market 'm1'");

        let err = TradeError::InsufficientBalance {
            balance: dec!(3.50),
            cost: dec!(5.12),
        };
        assert_eq!(err.to_string(), "balance 3.50 is below trade cost 5.12");
    }

    #[test]
    fn diesel_errors_become_database_errors() {
        let err: Error = diesel::result::Error::NotFound.into();
        assert!(matches!(err, Error::Database(_)));
    }

    #[test]
    fn as_trade_unwraps_only_trade_errors() {
        let err: Error = TradeError::MarketNotFound {
            market_id: "m1".into(),
        }
        .into();
        assert!(err.as_trade().is_some());
        assert!(Error::Connection("down".into()).as_trade().is_none());
    }
}
