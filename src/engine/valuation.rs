//! Read-side valuation.
//!
//! Recomputes quantity vectors from the order ledger and prices them
//! with the LMSR engine for market listings, portfolio views, and the
//! leaderboard. Nothing here mutates state, and the read paths take no
//! locks: point-in-time consistency is acceptable for display.

use std::collections::HashMap;

use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;
use serde::Serialize;

use crate::db::DbPool;
use crate::domain::{Market, MarketId, MarketStatus, Order, OutcomeId, Position, UserId};
use crate::error::{Error, Result};
use crate::ledger;
use crate::pricing::Lmsr;

/// Decimal places used for displayed values.
const VALUE_SCALE: u32 = 4;

/// Live quote for one outcome.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutcomeQuote {
    /// The outcome.
    pub outcome_id: OutcomeId,
    /// Display name.
    pub name: String,
    /// Marginal price in (0, 1); for resolved markets, 1 for the winner
    /// and 0 for the rest.
    pub price: f64,
    /// Outstanding shares, derived from the order ledger.
    pub quantity: Decimal,
}

/// Market listing entry.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MarketQuote {
    /// The market.
    pub market_id: MarketId,
    /// The question being traded.
    pub question: String,
    /// Lifecycle status.
    pub status: MarketStatus,
    /// Winning outcome for resolved markets.
    pub winner: Option<OutcomeId>,
    /// Total traded volume: the sum of every order's cost.
    pub volume: Decimal,
    /// Per-outcome quotes in outcome order.
    pub outcomes: Vec<OutcomeQuote>,
}

/// One position within a portfolio view.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Holding {
    /// The market.
    pub market_id: MarketId,
    /// The question being traded.
    pub question: String,
    /// The held outcome.
    pub outcome_id: OutcomeId,
    /// Display name of the held outcome.
    pub outcome_name: String,
    /// Shares owned.
    pub shares: Decimal,
    /// Currency invested.
    pub invested: Decimal,
    /// Average cost paid per share.
    pub average_cost: Decimal,
    /// Valuation price applied to the shares.
    pub price: f64,
    /// Current value of the holding.
    pub value: Decimal,
    /// The individual buys behind this aggregate, oldest first.
    pub orders: Vec<Order>,
}

/// A user's balance plus valued positions.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Portfolio {
    /// The user.
    pub user_id: UserId,
    /// Liquid balance.
    pub balance: Decimal,
    /// Valued positions.
    pub holdings: Vec<Holding>,
    /// Sum of holding values.
    pub positions_value: Decimal,
    /// Balance plus positions value.
    pub total_equity: Decimal,
}

/// One leaderboard row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LeaderboardEntry {
    /// 1-based rank.
    pub rank: usize,
    /// The user.
    pub user_id: UserId,
    /// Liquid balance.
    pub balance: Decimal,
    /// Value of all open and won positions.
    pub positions_value: Decimal,
    /// Balance plus positions value; the ranking key.
    pub total_equity: Decimal,
}

/// The valuation price of one outcome under a market's current state.
///
/// Open markets use the live LMSR price; resolved markets value the
/// winner at 1 and everything else at 0; archived markets pay nothing.
fn valuation_price(market: &Market, prices: &[f64], outcome_id: &OutcomeId) -> f64 {
    match market.status() {
        MarketStatus::Open => market
            .outcome_index(outcome_id)
            .map_or(0.0, |i| prices[i]),
        MarketStatus::Resolved => {
            if market.winner() == Some(outcome_id) {
                1.0
            } else {
                0.0
            }
        }
        MarketStatus::Archived => 0.0,
    }
}

fn decimal_value(shares: Decimal, price: f64) -> Decimal {
    let price = Decimal::from_f64(price).unwrap_or(Decimal::ZERO);
    (shares * price).round_dp(VALUE_SCALE)
}

/// Read-only valuation over the market ledger.
pub struct Valuator {
    pool: DbPool,
}

impl Valuator {
    /// Create a valuator over a connection pool.
    #[must_use]
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    fn conn(
        &self,
    ) -> Result<diesel::r2d2::PooledConnection<diesel::r2d2::ConnectionManager<diesel::SqliteConnection>>>
    {
        self.pool.get().map_err(|e| Error::Connection(e.to_string()))
    }

    /// Quote one market.
    pub async fn market_quote(&self, market_id: &MarketId) -> Result<MarketQuote> {
        let mut conn = self.conn()?;
        let market = ledger::require_market_with_conn(&mut conn, market_id)?;
        Self::quote_with_conn(&mut conn, &market)
    }

    /// Quote every market, oldest first.
    pub async fn list_markets(&self) -> Result<Vec<MarketQuote>> {
        let mut conn = self.conn()?;
        let markets = ledger::load_markets_with_conn(&mut conn)?;
        markets
            .iter()
            .map(|market| Self::quote_with_conn(&mut conn, market))
            .collect()
    }

    fn quote_with_conn(
        conn: &mut diesel::SqliteConnection,
        market: &Market,
    ) -> Result<MarketQuote> {
        let quantities = ledger::quantities_with_conn(conn, market)?;
        let volume = ledger::market_volume_with_conn(conn, market.market_id())?;
        let prices = Self::display_prices(market, &quantities)?;

        let outcomes = market
            .outcomes()
            .iter()
            .zip(quantities)
            .zip(prices)
            .map(|((outcome, quantity), price)| OutcomeQuote {
                outcome_id: outcome.outcome_id().clone(),
                name: outcome.name().to_string(),
                price,
                quantity,
            })
            .collect();

        Ok(MarketQuote {
            market_id: market.market_id().clone(),
            question: market.question().to_string(),
            status: market.status(),
            winner: market.winner().cloned(),
            volume,
            outcomes,
        })
    }

    fn display_prices(market: &Market, quantities: &[Decimal]) -> Result<Vec<f64>> {
        if market.status() == MarketStatus::Resolved {
            return Ok(market
                .outcomes()
                .iter()
                .map(|o| {
                    if market.winner() == Some(o.outcome_id()) {
                        1.0
                    } else {
                        0.0
                    }
                })
                .collect());
        }

        let lmsr = Lmsr::new(market.liquidity())?;
        let q: Vec<f64> = quantities.iter().map(|q| q.to_f64().unwrap_or(0.0)).collect();
        Ok(lmsr.prices(&q))
    }

    /// A user's balance and valued positions, with per-order drill-down.
    pub async fn portfolio(&self, user_id: &UserId) -> Result<Portfolio> {
        let mut conn = self.conn()?;
        let balance = ledger::require_balance_with_conn(&mut conn, user_id)?;
        let positions = ledger::positions_for_user_with_conn(&mut conn, user_id)?;
        let orders = ledger::orders_for_user_with_conn(&mut conn, user_id)?;

        let mut markets: HashMap<MarketId, (Market, Vec<f64>)> = HashMap::new();
        let mut holdings = Vec::with_capacity(positions.len());
        let mut positions_value = Decimal::ZERO;

        for position in positions {
            let market_id = position.market_id().clone();
            if !markets.contains_key(&market_id) {
                let market = ledger::require_market_with_conn(&mut conn, &market_id)?;
                let quantities = ledger::quantities_with_conn(&mut conn, &market)?;
                let prices = Self::display_prices(&market, &quantities)?;
                markets.insert(market_id.clone(), (market, prices));
            }
            let (market, prices) = &markets[&market_id];

            let holding = Self::holding(market, prices, &position, &orders);
            positions_value += holding.value;
            holdings.push(holding);
        }

        Ok(Portfolio {
            user_id: user_id.clone(),
            balance,
            holdings,
            positions_value,
            total_equity: balance + positions_value,
        })
    }

    fn holding(market: &Market, prices: &[f64], position: &Position, orders: &[Order]) -> Holding {
        let outcome_id = position.outcome_id().clone();
        let outcome_name = market
            .outcome(&outcome_id)
            .map(|o| o.name().to_string())
            .unwrap_or_default();
        let price = valuation_price(market, prices, &outcome_id);

        let drill_down: Vec<Order> = orders
            .iter()
            .filter(|o| o.market_id() == position.market_id() && o.outcome_id() == &outcome_id)
            .cloned()
            .collect();

        Holding {
            market_id: position.market_id().clone(),
            question: market.question().to_string(),
            outcome_id,
            outcome_name,
            shares: position.shares(),
            invested: position.invested(),
            average_cost: position.average_cost().round_dp(VALUE_SCALE),
            price,
            value: decimal_value(position.shares(), price),
            orders: drill_down,
        }
    }

    /// All users ranked by total equity, descending; ties break by user
    /// id ascending so the ordering is deterministic.
    pub async fn leaderboard(&self) -> Result<Vec<LeaderboardEntry>> {
        let mut conn = self.conn()?;
        let user_ids = ledger::user_ids_with_conn(&mut conn)?;

        let mut markets: HashMap<MarketId, (Market, Vec<f64>)> = HashMap::new();
        let mut entries = Vec::with_capacity(user_ids.len());

        for user_id in user_ids {
            let balance = ledger::require_balance_with_conn(&mut conn, &user_id)?;
            let positions = ledger::positions_for_user_with_conn(&mut conn, &user_id)?;

            let mut positions_value = Decimal::ZERO;
            for position in positions {
                let market_id = position.market_id().clone();
                if !markets.contains_key(&market_id) {
                    let market = ledger::require_market_with_conn(&mut conn, &market_id)?;
                    let quantities = ledger::quantities_with_conn(&mut conn, &market)?;
                    let prices = Self::display_prices(&market, &quantities)?;
                    markets.insert(market_id.clone(), (market, prices));
                }
                let (market, prices) = &markets[&market_id];
                let price = valuation_price(market, prices, position.outcome_id());
                positions_value += decimal_value(position.shares(), price);
            }

            entries.push(LeaderboardEntry {
                rank: 0,
                user_id,
                balance,
                positions_value,
                total_equity: balance + positions_value,
            });
        }

        // user_ids arrive ascending; a stable sort on equity preserves
        // that order within ties.
        entries.sort_by(|a, b| b.total_equity.cmp(&a.total_equity));
        for (i, entry) in entries.iter_mut().enumerate() {
            entry.rank = i + 1;
        }
        Ok(entries)
    }
}
