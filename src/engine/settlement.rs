//! Market settlement.
//!
//! Resolution is a terminal, one-way transition: open -> resolved. Every
//! winning share pays out exactly one currency unit (the LMSR
//! normalization for outcomes bounded in [0, 1]); holders of losing
//! outcomes receive nothing and their positions are left as realized
//! losses. The status flip and every payout commit together or not at
//! all.

use std::sync::Arc;

use diesel::prelude::*;
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::info;

use crate::db::DbPool;
use crate::domain::{
    MarketId, MarketStatus, OutcomeId, Transaction, TransactionKind, UserId,
};
use crate::engine::locks::MarketLocks;
use crate::error::{Error, Result, TradeError};
use crate::ledger;

/// One user's settlement credit.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Payout {
    /// The credited user.
    pub user_id: UserId,
    /// Winning shares held, equal to the currency credited.
    pub shares: Decimal,
}

/// The result of resolving a market.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Settlement {
    /// The resolved market.
    pub market_id: MarketId,
    /// The winning outcome.
    pub winner: OutcomeId,
    /// Credits issued, user id ascending.
    pub payouts: Vec<Payout>,
}

/// Resolves markets and pays out winning shares.
pub struct SettlementEngine {
    pool: DbPool,
    locks: Arc<MarketLocks>,
}

impl SettlementEngine {
    /// Create a settlement engine over a connection pool and the lock
    /// registry it shares with the trade executor.
    #[must_use]
    pub fn new(pool: DbPool, locks: Arc<MarketLocks>) -> Self {
        Self { pool, locks }
    }

    /// Resolve a market with the given winning outcome and credit every
    /// holder of that outcome.
    ///
    /// # Errors
    ///
    /// - `MarketNotFound` when the market does not exist
    /// - `MarketClosed` when the market is already resolved or archived
    /// - `InvalidOutcome` when the outcome is not part of the market
    /// - `Error::Database` when the transaction aborts; no payout or
    ///   status change survives, so the whole resolution may be retried
    pub async fn resolve(
        &self,
        market_id: &MarketId,
        winning_outcome_id: &OutcomeId,
    ) -> Result<Settlement> {
        let lock = self.locks.for_market(market_id);
        let _guard = lock.lock();

        let mut conn = self
            .pool
            .get()
            .map_err(|e| Error::Connection(e.to_string()))?;

        let settlement = conn.transaction(|conn| {
            let market = ledger::require_market_with_conn(conn, market_id)?;
            if !market.is_open() {
                return Err(Error::Trade(TradeError::MarketClosed {
                    market_id: market_id.to_string(),
                    status: market.status().to_string(),
                }));
            }
            if market.outcome_index(winning_outcome_id).is_none() {
                return Err(Error::Trade(TradeError::InvalidOutcome {
                    market_id: market_id.to_string(),
                    outcome_id: winning_outcome_id.to_string(),
                }));
            }

            ledger::set_market_status_with_conn(
                conn,
                market_id,
                MarketStatus::Resolved,
                Some(winning_outcome_id),
            )?;

            let holders =
                ledger::positions_for_outcome_with_conn(conn, market_id, winning_outcome_id)?;

            let mut payouts = Vec::new();
            for position in holders {
                let shares = position.shares();
                if shares <= Decimal::ZERO {
                    continue;
                }

                let user_id = position.user_id().clone();
                let balance = ledger::require_balance_with_conn(conn, &user_id)?;
                ledger::set_balance_with_conn(conn, &user_id, balance + shares)?;
                let entry = Transaction::new(user_id.clone(), TransactionKind::Win, shares);
                ledger::insert_transaction_with_conn(conn, &entry)?;

                payouts.push(Payout { user_id, shares });
            }

            Ok::<_, Error>(Settlement {
                market_id: market_id.clone(),
                winner: winning_outcome_id.clone(),
                payouts,
            })
        })?;

        info!(
            market = %market_id,
            winner = %winning_outcome_id,
            payouts = settlement.payouts.len(),
            "Market resolved"
        );
        Ok(settlement)
    }
}
