//! Domain validation errors for core domain types.
//!
//! These errors are returned by `try_new` constructors and other methods
//! that validate domain rules before any state exists.

use thiserror::Error;

/// Errors that occur when domain invariants are violated.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DomainError {
    /// Markets must have at least two mutually exclusive outcomes.
    #[error("a market needs at least 2 outcomes, got {count}")]
    TooFewOutcomes {
        /// The number of outcomes that was provided.
        count: usize,
    },

    /// Outcome IDs must be unique within a market.
    #[error("duplicate outcome id '{outcome_id}' in market")]
    DuplicateOutcome {
        /// The outcome ID that appeared more than once.
        outcome_id: String,
    },

    /// The liquidity parameter controls price sensitivity and must be a
    /// positive finite number.
    #[error("liquidity parameter must be positive and finite, got {liquidity}")]
    InvalidLiquidity {
        /// The invalid liquidity that was provided.
        liquidity: f64,
    },

    /// Share amounts in the ledger are strictly positive (buy-only).
    #[error("share amount must be positive, got {amount}")]
    NonPositiveAmount {
        /// The invalid amount that was provided.
        amount: rust_decimal::Decimal,
    },

    /// Order costs recorded in the ledger cannot be negative.
    #[error("order cost cannot be negative, got {cost}")]
    NegativeCost {
        /// The invalid cost that was provided.
        cost: rust_decimal::Decimal,
    },
}
