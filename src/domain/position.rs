//! User position aggregates.
//!
//! A [`Position`] is the materialized sum of a user's orders for one
//! outcome of one market. It exists to avoid rescanning the full order
//! ledger on every portfolio read; replaying the orders for the same
//! (user, market, outcome) key must always reproduce it exactly.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::id::{MarketId, OutcomeId, UserId};
use super::order::Order;

/// Aggregated holding of one user in one outcome of one market.
///
/// Both fields only ever grow: the system is buy-only, so there is no
/// code path that decrements shares or invested.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    user_id: UserId,
    market_id: MarketId,
    outcome_id: OutcomeId,
    shares: Decimal,
    invested: Decimal,
}

impl Position {
    /// Create an empty position for a (user, market, outcome) key.
    #[must_use]
    pub fn empty(user_id: UserId, market_id: MarketId, outcome_id: OutcomeId) -> Self {
        Self {
            user_id,
            market_id,
            outcome_id,
            shares: Decimal::ZERO,
            invested: Decimal::ZERO,
        }
    }

    /// Reconstruct a position from persisted state.
    #[must_use]
    pub fn from_parts(
        user_id: UserId,
        market_id: MarketId,
        outcome_id: OutcomeId,
        shares: Decimal,
        invested: Decimal,
    ) -> Self {
        Self {
            user_id,
            market_id,
            outcome_id,
            shares,
            invested,
        }
    }

    /// Rebuild a position by replaying order records.
    ///
    /// Orders for other (user, market, outcome) keys are ignored, so a
    /// full ledger scan can be passed in directly.
    #[must_use]
    pub fn replay<'a>(
        user_id: UserId,
        market_id: MarketId,
        outcome_id: OutcomeId,
        orders: impl IntoIterator<Item = &'a Order>,
    ) -> Self {
        let mut position = Self::empty(user_id, market_id, outcome_id);
        for order in orders {
            if order.user_id() == &position.user_id
                && order.market_id() == &position.market_id
                && order.outcome_id() == &position.outcome_id
            {
                position.apply_fill(order.amount(), order.cost());
            }
        }
        position
    }

    /// Fold one fill into the aggregate.
    pub fn apply_fill(&mut self, shares: Decimal, cost: Decimal) {
        self.shares += shares;
        self.invested += cost;
    }

    /// Get the owning user.
    #[must_use]
    pub const fn user_id(&self) -> &UserId {
        &self.user_id
    }

    /// Get the market.
    #[must_use]
    pub const fn market_id(&self) -> &MarketId {
        &self.market_id
    }

    /// Get the outcome.
    #[must_use]
    pub const fn outcome_id(&self) -> &OutcomeId {
        &self.outcome_id
    }

    /// Get total shares owned.
    #[must_use]
    pub const fn shares(&self) -> Decimal {
        self.shares
    }

    /// Get total currency invested.
    #[must_use]
    pub const fn invested(&self) -> Decimal {
        self.invested
    }

    /// Average cost paid per share, or zero for an empty position.
    #[must_use]
    pub fn average_cost(&self) -> Decimal {
        if self.shares.is_zero() {
            Decimal::ZERO
        } else {
            self.invested / self.shares
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::id::OrderId;
    use chrono::Utc;
    use rust_decimal_macros::dec;

    fn key() -> (UserId, MarketId, OutcomeId) {
        (
            UserId::from("alice"),
            MarketId::from("m1"),
            OutcomeId::from("yes"),
        )
    }

    fn order(user: &str, market: &str, outcome: &str, amount: Decimal, cost: Decimal) -> Order {
        Order::from_parts(
            OrderId::generate(),
            MarketId::from(market),
            OutcomeId::from(outcome),
            UserId::from(user),
            amount,
            cost,
            Utc::now(),
        )
    }

    #[test]
    fn apply_fill_accumulates() {
        let (user, market, outcome) = key();
        let mut position = Position::empty(user, market, outcome);
        position.apply_fill(dec!(10), dec!(5.12));
        position.apply_fill(dec!(5), dec!(2.70));

        assert_eq!(position.shares(), dec!(15));
        assert_eq!(position.invested(), dec!(7.82));
    }

    #[test]
    fn replay_matches_incremental_updates() {
        let (user, market, outcome) = key();
        let orders = vec![
            order("alice", "m1", "yes", dec!(10), dec!(5.12)),
            order("alice", "m1", "yes", dec!(3), dec!(1.61)),
            order("alice", "m1", "no", dec!(4), dec!(1.90)),
            order("bob", "m1", "yes", dec!(2), dec!(1.05)),
            order("alice", "m2", "yes", dec!(7), dec!(3.55)),
        ];

        let mut incremental = Position::empty(user.clone(), market.clone(), outcome.clone());
        incremental.apply_fill(dec!(10), dec!(5.12));
        incremental.apply_fill(dec!(3), dec!(1.61));

        let replayed = Position::replay(user, market, outcome, &orders);
        assert_eq!(replayed, incremental);
        assert_eq!(replayed.shares(), dec!(13));
        assert_eq!(replayed.invested(), dec!(6.73));
    }

    #[test]
    fn average_cost_of_empty_position_is_zero() {
        let (user, market, outcome) = key();
        let position = Position::empty(user, market, outcome);
        assert_eq!(position.average_cost(), Decimal::ZERO);
    }

    #[test]
    fn average_cost_divides_invested_by_shares() {
        let (user, market, outcome) = key();
        let mut position = Position::empty(user, market, outcome);
        position.apply_fill(dec!(10), dec!(5));
        assert_eq!(position.average_cost(), dec!(0.5));
    }
}
