//! Trade execution.
//!
//! A buy reads the market's current quantity vector from the order
//! ledger, prices the trade with LMSR, and commits the balance debit,
//! order record, position update, and audit entry as one transaction.
//! A per-market lock is held from the quantity read through commit so
//! concurrent buys on the same market serialize: the second request
//! always prices against the first request's committed quantities.

use std::sync::Arc;

use diesel::prelude::*;
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serialize;
use tracing::info;

use crate::db::DbPool;
use crate::domain::{
    MarketId, Order, OrderId, OutcomeId, Transaction, TransactionKind, UserId,
};
use crate::engine::locks::MarketLocks;
use crate::error::{Error, Result, TradeError};
use crate::ledger;
use crate::pricing::Lmsr;

/// Realized cost is rounded to this many decimal places before any
/// ledger mutation, so balance arithmetic stays exact in Decimal space.
pub const COST_SCALE: u32 = 4;

/// Round a raw trade cost to [`COST_SCALE`] places, half-up.
fn round_cost(cost: Decimal) -> Decimal {
    cost.round_dp_with_strategy(COST_SCALE, RoundingStrategy::MidpointAwayFromZero)
}

/// The result of a successful buy.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Fill {
    /// ID of the order appended to the ledger.
    pub order_id: OrderId,
    /// Shares purchased.
    pub shares: Decimal,
    /// Currency debited.
    pub cost: Decimal,
}

/// Executes buys against the market ledger.
pub struct TradeExecutor {
    pool: DbPool,
    locks: Arc<MarketLocks>,
}

impl TradeExecutor {
    /// Create a trade executor over a connection pool and the lock
    /// registry it shares with the settlement engine.
    #[must_use]
    pub fn new(pool: DbPool, locks: Arc<MarketLocks>) -> Self {
        Self { pool, locks }
    }

    /// Buy `amount` shares of an outcome at the current LMSR price.
    ///
    /// Validation, pricing, and every ledger mutation happen inside a
    /// single transaction; a rejection at any step leaves no side
    /// effects.
    ///
    /// # Errors
    ///
    /// - `InvalidAmount` when `amount` is not strictly positive
    /// - `MarketNotFound` / `UserNotFound` for missing entities
    /// - `MarketClosed` when the market is resolved or archived
    /// - `InvalidOutcome` when the outcome is not part of the market
    /// - `InsufficientBalance` when the balance does not cover the cost
    /// - `Error::Database` when the underlying transaction aborts; the
    ///   whole operation may be retried
    pub async fn place_buy(
        &self,
        market_id: &MarketId,
        user_id: &UserId,
        outcome_id: &OutcomeId,
        amount: Decimal,
    ) -> Result<Fill> {
        if amount <= Decimal::ZERO {
            return Err(Error::Trade(TradeError::InvalidAmount { amount }));
        }

        let lock = self.locks.for_market(market_id);
        let _guard = lock.lock();

        let mut conn = self
            .pool
            .get()
            .map_err(|e| Error::Connection(e.to_string()))?;

        let fill = conn.transaction(|conn| {
            let market = ledger::require_market_with_conn(conn, market_id)?;
            if !market.is_open() {
                return Err(Error::Trade(TradeError::MarketClosed {
                    market_id: market_id.to_string(),
                    status: market.status().to_string(),
                }));
            }

            let index = market.outcome_index(outcome_id).ok_or_else(|| {
                Error::Trade(TradeError::InvalidOutcome {
                    market_id: market_id.to_string(),
                    outcome_id: outcome_id.to_string(),
                })
            })?;

            let quantities: Vec<f64> = ledger::quantities_with_conn(conn, &market)?
                .iter()
                .map(|q| q.to_f64().unwrap_or(0.0))
                .collect();

            let lmsr = Lmsr::new(market.liquidity())?;
            let delta = amount
                .to_f64()
                .ok_or_else(|| Error::Parse(format!("unrepresentable amount {amount}")))?;
            let raw_cost = lmsr.trade_cost(&quantities, index, delta);
            let cost = round_cost(
                Decimal::from_f64(raw_cost)
                    .ok_or_else(|| Error::Parse(format!("unrepresentable cost {raw_cost}")))?,
            );

            let balance = ledger::require_balance_with_conn(conn, user_id)?;
            if balance < cost {
                return Err(Error::Trade(TradeError::InsufficientBalance {
                    balance,
                    cost,
                }));
            }

            let order = Order::try_new(
                market_id.clone(),
                outcome_id.clone(),
                user_id.clone(),
                amount,
                cost,
            )?;

            ledger::set_balance_with_conn(conn, user_id, balance - cost)?;
            ledger::insert_order_with_conn(conn, &order)?;
            ledger::upsert_position_with_conn(conn, user_id, market_id, outcome_id, amount, cost)?;
            let entry = Transaction::new(user_id.clone(), TransactionKind::Bet, cost);
            ledger::insert_transaction_with_conn(conn, &entry)?;

            Ok::<_, Error>(Fill {
                order_id: order.order_id().clone(),
                shares: amount,
                cost,
            })
        })?;

        info!(
            market = %market_id,
            user = %user_id,
            outcome = %outcome_id,
            shares = %fill.shares,
            cost = %fill.cost,
            "Buy executed"
        );
        Ok(fill)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn cost_rounding_is_half_up_at_the_fourth_decimal() {
        assert_eq!(round_cost(dec!(1.00005)), dec!(1.0001));
        assert_eq!(round_cost(dec!(1.00004)), dec!(1.0000));
        assert_eq!(round_cost(dec!(1.00015)), dec!(1.0002));
        assert_eq!(round_cost(dec!(5.12494832)), dec!(5.1249));
    }

    #[test]
    fn non_positive_amounts_are_rejected_before_any_io() {
        let pool = crate::db::create_pool(":memory:").unwrap();
        // No migrations on purpose: the amount check must fire first.
        let executor = TradeExecutor::new(pool, Arc::new(MarketLocks::new()));

        for amount in [dec!(0), dec!(-10)] {
            let err = tokio_test::block_on(executor.place_buy(
                &MarketId::from("m1"),
                &UserId::from("alice"),
                &OutcomeId::from("yes"),
                amount,
            ))
            .unwrap_err();
            assert!(matches!(err.as_trade(), Some(TradeError::InvalidAmount { .. })));
        }
    }
}
