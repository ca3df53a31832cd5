//! Market-related domain types.
//!
//! - [`Market`] - A discrete-outcome prediction market priced by LMSR
//! - [`Outcome`] - A single tradeable outcome within a market
//! - [`MarketStatus`] - Lifecycle state of a market

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::error::DomainError;
use super::id::{MarketId, OutcomeId};

/// A single outcome within a market.
///
/// Outcomes are created with the market and never change afterwards.
/// For binary markets, typical names are "Yes"/"No". For multi-outcome
/// markets, names might be candidate names, team names, etc.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Outcome {
    outcome_id: OutcomeId,
    name: String,
}

impl Outcome {
    /// Create a new outcome.
    pub fn new(outcome_id: OutcomeId, name: impl Into<String>) -> Self {
        Self {
            outcome_id,
            name: name.into(),
        }
    }

    /// Get the outcome ID.
    #[must_use]
    pub const fn outcome_id(&self) -> &OutcomeId {
        &self.outcome_id
    }

    /// Get the name of this outcome.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Lifecycle state of a market.
///
/// The only transition the engines perform is `Open` -> `Resolved`; it is
/// terminal. `Archived` markets exist for bookkeeping and reject trades
/// and resolution like resolved markets do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MarketStatus {
    /// Accepting trades.
    Open,
    /// Settled with a winning outcome; no further trades.
    Resolved,
    /// Retired without settlement; no further trades.
    Archived,
}

impl MarketStatus {
    /// Get the canonical string form used in persistence.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Resolved => "resolved",
            Self::Archived => "archived",
        }
    }

    /// Parse the canonical string form.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "open" => Some(Self::Open),
            "resolved" => Some(Self::Resolved),
            "archived" => Some(Self::Archived),
            _ => None,
        }
    }
}

impl fmt::Display for MarketStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A prediction market with a fixed, ordered set of outcomes.
///
/// The outcome set is immutable after creation. Outcome quantities are not
/// stored here: they are always derivable as the sum of order amounts per
/// outcome, which keeps the order ledger the single source of truth.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Market {
    market_id: MarketId,
    question: String,
    outcomes: Vec<Outcome>,
    status: MarketStatus,
    winner: Option<OutcomeId>,
    liquidity: f64,
    created_at: DateTime<Utc>,
}

impl Market {
    /// Create a new open market with domain invariant validation.
    ///
    /// # Domain Invariants
    ///
    /// - at least two outcomes, with unique outcome IDs
    /// - `liquidity` must be positive and finite
    ///
    /// # Errors
    ///
    /// Returns `DomainError` if any invariant is violated.
    pub fn try_new(
        market_id: MarketId,
        question: impl Into<String>,
        outcomes: Vec<Outcome>,
        liquidity: f64,
    ) -> Result<Self, DomainError> {
        if outcomes.len() < 2 {
            return Err(DomainError::TooFewOutcomes {
                count: outcomes.len(),
            });
        }

        for (i, outcome) in outcomes.iter().enumerate() {
            if outcomes[..i]
                .iter()
                .any(|o| o.outcome_id() == outcome.outcome_id())
            {
                return Err(DomainError::DuplicateOutcome {
                    outcome_id: outcome.outcome_id().to_string(),
                });
            }
        }

        if !(liquidity.is_finite() && liquidity > 0.0) {
            return Err(DomainError::InvalidLiquidity { liquidity });
        }

        Ok(Self {
            market_id,
            question: question.into(),
            outcomes,
            status: MarketStatus::Open,
            winner: None,
            liquidity,
            created_at: Utc::now(),
        })
    }

    /// Reconstruct a market from persisted state without re-validating
    /// creation invariants.
    #[must_use]
    pub fn from_parts(
        market_id: MarketId,
        question: String,
        outcomes: Vec<Outcome>,
        status: MarketStatus,
        winner: Option<OutcomeId>,
        liquidity: f64,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            market_id,
            question,
            outcomes,
            status,
            winner,
            liquidity,
            created_at,
        }
    }

    /// Get the market ID.
    #[must_use]
    pub const fn market_id(&self) -> &MarketId {
        &self.market_id
    }

    /// Get the market question.
    #[must_use]
    pub fn question(&self) -> &str {
        &self.question
    }

    /// Get all outcomes in their fixed creation order.
    #[must_use]
    pub fn outcomes(&self) -> &[Outcome] {
        &self.outcomes
    }

    /// Get the lifecycle status.
    #[must_use]
    pub const fn status(&self) -> MarketStatus {
        self.status
    }

    /// True when the market accepts trades.
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.status == MarketStatus::Open
    }

    /// Get the winning outcome, if resolved.
    #[must_use]
    pub const fn winner(&self) -> Option<&OutcomeId> {
        self.winner.as_ref()
    }

    /// Get the LMSR liquidity parameter for this market.
    #[must_use]
    pub const fn liquidity(&self) -> f64 {
        self.liquidity
    }

    /// Get the creation timestamp.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Check if this is a binary (Yes/No) market.
    #[must_use]
    pub fn is_binary(&self) -> bool {
        self.outcomes.len() == 2
    }

    /// Get the number of outcomes.
    #[must_use]
    pub fn outcome_count(&self) -> usize {
        self.outcomes.len()
    }

    /// Find the index of an outcome within the fixed outcome order.
    #[must_use]
    pub fn outcome_index(&self, outcome_id: &OutcomeId) -> Option<usize> {
        self.outcomes
            .iter()
            .position(|o| o.outcome_id() == outcome_id)
    }

    /// Find an outcome by its ID.
    #[must_use]
    pub fn outcome(&self, outcome_id: &OutcomeId) -> Option<&Outcome> {
        self.outcomes.iter().find(|o| o.outcome_id() == outcome_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn binary_market() -> Market {
        Market::try_new(
            MarketId::from("market-1"),
            "Will it rain tomorrow?",
            vec![
                Outcome::new(OutcomeId::from("yes"), "Yes"),
                Outcome::new(OutcomeId::from("no"), "No"),
            ],
            100.0,
        )
        .unwrap()
    }

    #[test]
    fn new_market_starts_open_without_winner() {
        let market = binary_market();
        assert_eq!(market.status(), MarketStatus::Open);
        assert!(market.is_open());
        assert!(market.winner().is_none());
    }

    #[test]
    fn outcome_index_follows_creation_order() {
        let market = binary_market();
        assert_eq!(market.outcome_index(&OutcomeId::from("yes")), Some(0));
        assert_eq!(market.outcome_index(&OutcomeId::from("no")), Some(1));
        assert_eq!(market.outcome_index(&OutcomeId::from("maybe")), None);
    }

    #[test]
    fn rejects_single_outcome() {
        let result = Market::try_new(
            MarketId::from("m"),
            "q",
            vec![Outcome::new(OutcomeId::from("only"), "Only")],
            100.0,
        );
        assert_eq!(result.unwrap_err(), DomainError::TooFewOutcomes { count: 1 });
    }

    #[test]
    fn rejects_duplicate_outcome_ids() {
        let result = Market::try_new(
            MarketId::from("m"),
            "q",
            vec![
                Outcome::new(OutcomeId::from("yes"), "Yes"),
                Outcome::new(OutcomeId::from("yes"), "Also yes"),
            ],
            100.0,
        );
        assert!(matches!(
            result,
            Err(DomainError::DuplicateOutcome { .. })
        ));
    }

    #[test]
    fn rejects_non_positive_or_non_finite_liquidity() {
        for b in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            let result = Market::try_new(
                MarketId::from("m"),
                "q",
                vec![
                    Outcome::new(OutcomeId::from("yes"), "Yes"),
                    Outcome::new(OutcomeId::from("no"), "No"),
                ],
                b,
            );
            assert!(result.is_err(), "liquidity {b} should be rejected");
        }
    }

    #[test]
    fn status_string_form_roundtrips() {
        for status in [
            MarketStatus::Open,
            MarketStatus::Resolved,
            MarketStatus::Archived,
        ] {
            assert_eq!(MarketStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(MarketStatus::parse("bogus"), None);
    }
}
