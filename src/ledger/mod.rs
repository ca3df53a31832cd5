//! Market ledger: durable orders, positions, balances, and audit log.
//!
//! Two layers live here:
//!
//! - free `*_with_conn` functions operating on a borrowed
//!   [`SqliteConnection`], so the trade and settlement engines can compose
//!   several reads and writes inside one `conn.transaction(...)` closure;
//! - the [`Ledger`] service owning a pool, for the admin-style operations
//!   (users, deposits, market creation) that are single statements or
//!   short transactions of their own.
//!
//! Orders are append-only and are the source of truth: the quantity of an
//! outcome is the sum of `amount` over its orders, and position rows are
//! a materialized aggregate that replaying orders must reproduce exactly.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use rust_decimal::Decimal;
use tracing::info;

use crate::db::model::{MarketRow, OrderRow, OutcomeRow, PositionRow, TransactionRow, UserRow};
use crate::db::schema::{markets, orders, outcomes, positions, transactions, users};
use crate::db::DbPool;
use crate::domain::{
    Market, MarketId, MarketStatus, Order, OrderId, Outcome, OutcomeId, Position, Transaction,
    TransactionId, TransactionKind, UserId,
};
use crate::error::{Error, Result, TradeError};

/// Parse a stored decimal string.
pub(crate) fn parse_decimal(s: &str) -> Result<Decimal> {
    Decimal::from_str(s).map_err(|e| Error::Parse(format!("bad decimal '{s}': {e}")))
}

/// Parse a stored RFC 3339 timestamp.
pub(crate) fn parse_timestamp(s: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| Error::Parse(format!("bad timestamp '{s}': {e}")))
}

fn market_from_rows(row: MarketRow, outcome_rows: Vec<OutcomeRow>) -> Result<Market> {
    let status = MarketStatus::parse(&row.status)
        .ok_or_else(|| Error::Parse(format!("bad market status '{}'", row.status)))?;
    let outcomes = outcome_rows
        .into_iter()
        .map(|o| Outcome::new(OutcomeId::from(o.outcome_id), o.name))
        .collect();

    Ok(Market::from_parts(
        MarketId::from(row.id),
        row.question,
        outcomes,
        status,
        row.winner_outcome_id.map(OutcomeId::from),
        row.liquidity,
        parse_timestamp(&row.created_at)?,
    ))
}

fn order_from_row(row: OrderRow) -> Result<Order> {
    Ok(Order::from_parts(
        OrderId::from(row.id),
        MarketId::from(row.market_id),
        OutcomeId::from(row.outcome_id),
        UserId::from(row.user_id),
        parse_decimal(&row.amount)?,
        parse_decimal(&row.cost)?,
        parse_timestamp(&row.created_at)?,
    ))
}

fn position_from_row(row: PositionRow) -> Result<Position> {
    Ok(Position::from_parts(
        UserId::from(row.user_id),
        MarketId::from(row.market_id),
        OutcomeId::from(row.outcome_id),
        parse_decimal(&row.shares)?,
        parse_decimal(&row.invested)?,
    ))
}

fn transaction_from_row(row: TransactionRow) -> Result<Transaction> {
    let kind = TransactionKind::parse(&row.kind)
        .ok_or_else(|| Error::Parse(format!("bad transaction kind '{}'", row.kind)))?;
    Ok(Transaction::from_parts(
        TransactionId::from(row.id),
        UserId::from(row.user_id),
        kind,
        parse_decimal(&row.amount)?,
        parse_timestamp(&row.created_at)?,
    ))
}

/// Load a market with its outcomes in creation order.
pub fn load_market_with_conn(
    conn: &mut SqliteConnection,
    market_id: &MarketId,
) -> Result<Option<Market>> {
    let row: Option<MarketRow> = markets::table
        .find(market_id.as_str())
        .first(conn)
        .optional()?;

    let Some(row) = row else {
        return Ok(None);
    };

    let outcome_rows: Vec<OutcomeRow> = outcomes::table
        .filter(outcomes::market_id.eq(market_id.as_str()))
        .order(outcomes::idx.asc())
        .load(conn)?;

    market_from_rows(row, outcome_rows).map(Some)
}

/// Load a market, rejecting with `MarketNotFound` when absent.
pub fn require_market_with_conn(
    conn: &mut SqliteConnection,
    market_id: &MarketId,
) -> Result<Market> {
    load_market_with_conn(conn, market_id)?.ok_or_else(|| {
        Error::Trade(TradeError::MarketNotFound {
            market_id: market_id.to_string(),
        })
    })
}

/// Load all markets, oldest first.
pub fn load_markets_with_conn(conn: &mut SqliteConnection) -> Result<Vec<Market>> {
    let rows: Vec<MarketRow> = markets::table.order(markets::created_at.asc()).load(conn)?;

    rows.into_iter()
        .map(|row| {
            let outcome_rows: Vec<OutcomeRow> = outcomes::table
                .filter(outcomes::market_id.eq(&row.id))
                .order(outcomes::idx.asc())
                .load(conn)?;
            market_from_rows(row, outcome_rows)
        })
        .collect()
}

/// Insert a market and its outcome rows.
pub fn insert_market_with_conn(conn: &mut SqliteConnection, market: &Market) -> Result<()> {
    let row = MarketRow {
        id: market.market_id().to_string(),
        question: market.question().to_string(),
        status: market.status().as_str().to_string(),
        winner_outcome_id: market.winner().map(ToString::to_string),
        liquidity: market.liquidity(),
        created_at: market.created_at().to_rfc3339(),
    };
    diesel::insert_into(markets::table).values(&row).execute(conn)?;

    for (idx, outcome) in market.outcomes().iter().enumerate() {
        let row = OutcomeRow {
            market_id: market.market_id().to_string(),
            outcome_id: outcome.outcome_id().to_string(),
            idx: idx as i32,
            name: outcome.name().to_string(),
        };
        diesel::insert_into(outcomes::table).values(&row).execute(conn)?;
    }

    Ok(())
}

/// Flip a market to a terminal status, recording the winner for
/// resolutions.
pub fn set_market_status_with_conn(
    conn: &mut SqliteConnection,
    market_id: &MarketId,
    status: MarketStatus,
    winner: Option<&OutcomeId>,
) -> Result<()> {
    diesel::update(markets::table.find(market_id.as_str()))
        .set((
            markets::status.eq(status.as_str()),
            markets::winner_outcome_id.eq(winner.map(ToString::to_string)),
        ))
        .execute(conn)?;
    Ok(())
}

/// Current quantity vector of a market, in outcome order, derived by
/// replaying the order ledger.
pub fn quantities_with_conn(conn: &mut SqliteConnection, market: &Market) -> Result<Vec<Decimal>> {
    let rows: Vec<(String, String)> = orders::table
        .filter(orders::market_id.eq(market.market_id().as_str()))
        .select((orders::outcome_id, orders::amount))
        .load(conn)?;

    let mut quantities = vec![Decimal::ZERO; market.outcome_count()];
    for (outcome_id, amount) in rows {
        if let Some(i) = market.outcome_index(&OutcomeId::from(outcome_id)) {
            quantities[i] += parse_decimal(&amount)?;
        }
    }
    Ok(quantities)
}

/// Total traded volume of a market: the sum of every order's cost.
pub fn market_volume_with_conn(
    conn: &mut SqliteConnection,
    market_id: &MarketId,
) -> Result<Decimal> {
    let costs: Vec<String> = orders::table
        .filter(orders::market_id.eq(market_id.as_str()))
        .select(orders::cost)
        .load(conn)?;

    let mut volume = Decimal::ZERO;
    for cost in costs {
        volume += parse_decimal(&cost)?;
    }
    Ok(volume)
}

/// All orders of a market, oldest first.
pub fn orders_for_market_with_conn(
    conn: &mut SqliteConnection,
    market_id: &MarketId,
) -> Result<Vec<Order>> {
    let rows: Vec<OrderRow> = orders::table
        .filter(orders::market_id.eq(market_id.as_str()))
        .order(orders::created_at.asc())
        .load(conn)?;
    rows.into_iter().map(order_from_row).collect()
}

/// All orders of a user, oldest first.
pub fn orders_for_user_with_conn(
    conn: &mut SqliteConnection,
    user_id: &UserId,
) -> Result<Vec<Order>> {
    let rows: Vec<OrderRow> = orders::table
        .filter(orders::user_id.eq(user_id.as_str()))
        .order(orders::created_at.asc())
        .load(conn)?;
    rows.into_iter().map(order_from_row).collect()
}

/// Append an order to the ledger.
pub fn insert_order_with_conn(conn: &mut SqliteConnection, order: &Order) -> Result<()> {
    let row = OrderRow {
        id: order.order_id().to_string(),
        market_id: order.market_id().to_string(),
        outcome_id: order.outcome_id().to_string(),
        user_id: order.user_id().to_string(),
        amount: order.amount().to_string(),
        cost: order.cost().to_string(),
        created_at: order.created_at().to_rfc3339(),
    };
    diesel::insert_into(orders::table).values(&row).execute(conn)?;
    Ok(())
}

/// Current balance of a user, or `None` when the user does not exist.
pub fn balance_with_conn(
    conn: &mut SqliteConnection,
    user_id: &UserId,
) -> Result<Option<Decimal>> {
    let balance: Option<String> = users::table
        .find(user_id.as_str())
        .select(users::balance)
        .first(conn)
        .optional()?;
    balance.as_deref().map(parse_decimal).transpose()
}

/// Read a balance, rejecting with `UserNotFound` when absent.
pub fn require_balance_with_conn(
    conn: &mut SqliteConnection,
    user_id: &UserId,
) -> Result<Decimal> {
    balance_with_conn(conn, user_id)?.ok_or_else(|| {
        Error::Trade(TradeError::UserNotFound {
            user_id: user_id.to_string(),
        })
    })
}

/// Overwrite a user's balance.
pub fn set_balance_with_conn(
    conn: &mut SqliteConnection,
    user_id: &UserId,
    balance: Decimal,
) -> Result<()> {
    diesel::update(users::table.find(user_id.as_str()))
        .set(users::balance.eq(balance.to_string()))
        .execute(conn)?;
    Ok(())
}

/// Fold a fill into the position aggregate for (user, market, outcome),
/// creating the row on first trade.
pub fn upsert_position_with_conn(
    conn: &mut SqliteConnection,
    user_id: &UserId,
    market_id: &MarketId,
    outcome_id: &OutcomeId,
    shares: Decimal,
    cost: Decimal,
) -> Result<()> {
    let existing: Option<PositionRow> = positions::table
        .find((user_id.as_str(), market_id.as_str(), outcome_id.as_str()))
        .first(conn)
        .optional()?;

    let mut position = match existing {
        Some(row) => position_from_row(row)?,
        None => Position::empty(user_id.clone(), market_id.clone(), outcome_id.clone()),
    };
    position.apply_fill(shares, cost);

    let row = PositionRow {
        user_id: user_id.to_string(),
        market_id: market_id.to_string(),
        outcome_id: outcome_id.to_string(),
        shares: position.shares().to_string(),
        invested: position.invested().to_string(),
    };
    diesel::replace_into(positions::table).values(&row).execute(conn)?;
    Ok(())
}

/// All positions of a user.
pub fn positions_for_user_with_conn(
    conn: &mut SqliteConnection,
    user_id: &UserId,
) -> Result<Vec<Position>> {
    let rows: Vec<PositionRow> = positions::table
        .filter(positions::user_id.eq(user_id.as_str()))
        .order((positions::market_id.asc(), positions::outcome_id.asc()))
        .load(conn)?;
    rows.into_iter().map(position_from_row).collect()
}

/// All positions held in one outcome of one market, user id ascending.
///
/// Settlement reads the winning outcome's holders through this.
pub fn positions_for_outcome_with_conn(
    conn: &mut SqliteConnection,
    market_id: &MarketId,
    outcome_id: &OutcomeId,
) -> Result<Vec<Position>> {
    let rows: Vec<PositionRow> = positions::table
        .filter(positions::market_id.eq(market_id.as_str()))
        .filter(positions::outcome_id.eq(outcome_id.as_str()))
        .order(positions::user_id.asc())
        .load(conn)?;
    rows.into_iter().map(position_from_row).collect()
}

/// Append an audit transaction entry.
pub fn insert_transaction_with_conn(
    conn: &mut SqliteConnection,
    transaction: &Transaction,
) -> Result<()> {
    let row = TransactionRow {
        id: transaction.transaction_id().to_string(),
        user_id: transaction.user_id().to_string(),
        kind: transaction.kind().as_str().to_string(),
        amount: transaction.amount().to_string(),
        created_at: transaction.created_at().to_rfc3339(),
    };
    diesel::insert_into(transactions::table).values(&row).execute(conn)?;
    Ok(())
}

/// All user IDs, ascending.
pub fn user_ids_with_conn(conn: &mut SqliteConnection) -> Result<Vec<UserId>> {
    let ids: Vec<String> = users::table.select(users::id).order(users::id.asc()).load(conn)?;
    Ok(ids.into_iter().map(UserId::from).collect())
}

/// Ledger service for admin-style operations.
///
/// Trade execution and settlement have their own engines; everything here
/// is either a single statement or a short self-contained transaction.
pub struct Ledger {
    pool: DbPool,
}

impl Ledger {
    /// Create a ledger service over a connection pool.
    #[must_use]
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    fn conn(
        &self,
    ) -> Result<diesel::r2d2::PooledConnection<diesel::r2d2::ConnectionManager<SqliteConnection>>>
    {
        self.pool.get().map_err(|e| Error::Connection(e.to_string()))
    }

    /// Create a user with a starting balance, recording a deposit entry.
    ///
    /// # Errors
    ///
    /// Rejects with `UserExists` when the ID is taken.
    pub async fn add_user(&self, user_id: &UserId, starting_balance: Decimal) -> Result<()> {
        let mut conn = self.conn()?;
        conn.transaction(|conn| {
            let existing: Option<String> = users::table
                .find(user_id.as_str())
                .select(users::id)
                .first(conn)
                .optional()?;
            if existing.is_some() {
                return Err(Error::Trade(TradeError::UserExists {
                    user_id: user_id.to_string(),
                }));
            }

            let row = UserRow {
                id: user_id.to_string(),
                balance: starting_balance.to_string(),
                created_at: Utc::now().to_rfc3339(),
            };
            diesel::insert_into(users::table).values(&row).execute(conn)?;

            if starting_balance > Decimal::ZERO {
                let entry =
                    Transaction::new(user_id.clone(), TransactionKind::Deposit, starting_balance);
                insert_transaction_with_conn(conn, &entry)?;
            }
            Ok(())
        })?;

        info!(user = %user_id, balance = %starting_balance, "User added");
        Ok(())
    }

    /// Credit a user's balance, recording a deposit entry.
    pub async fn deposit(&self, user_id: &UserId, amount: Decimal) -> Result<Decimal> {
        if amount <= Decimal::ZERO {
            return Err(Error::Trade(TradeError::InvalidAmount { amount }));
        }

        let mut conn = self.conn()?;
        let balance = conn.transaction(|conn| {
            let balance = require_balance_with_conn(conn, user_id)? + amount;
            set_balance_with_conn(conn, user_id, balance)?;
            let entry = Transaction::new(user_id.clone(), TransactionKind::Deposit, amount);
            insert_transaction_with_conn(conn, &entry)?;
            Ok::<_, Error>(balance)
        })?;

        info!(user = %user_id, amount = %amount, balance = %balance, "Deposit credited");
        Ok(balance)
    }

    /// Current balance of a user.
    pub async fn balance(&self, user_id: &UserId) -> Result<Decimal> {
        let mut conn = self.conn()?;
        require_balance_with_conn(&mut conn, user_id)
    }

    /// Persist a newly created market.
    pub async fn create_market(&self, market: &Market) -> Result<()> {
        let mut conn = self.conn()?;
        conn.transaction(|conn| insert_market_with_conn(conn, market))?;
        info!(
            market = %market.market_id(),
            outcomes = market.outcome_count(),
            liquidity = market.liquidity(),
            "Market created"
        );
        Ok(())
    }

    /// Load a market by ID.
    pub async fn market(&self, market_id: &MarketId) -> Result<Market> {
        let mut conn = self.conn()?;
        require_market_with_conn(&mut conn, market_id)
    }

    /// Load all markets, oldest first.
    pub async fn markets(&self) -> Result<Vec<Market>> {
        let mut conn = self.conn()?;
        load_markets_with_conn(&mut conn)
    }

    /// Retire an open market without settlement.
    ///
    /// # Errors
    ///
    /// Rejects with `MarketClosed` when the market already left the open
    /// state.
    pub async fn archive_market(&self, market_id: &MarketId) -> Result<()> {
        let mut conn = self.conn()?;
        conn.transaction(|conn| {
            let market = require_market_with_conn(conn, market_id)?;
            if !market.is_open() {
                return Err(Error::Trade(TradeError::MarketClosed {
                    market_id: market_id.to_string(),
                    status: market.status().to_string(),
                }));
            }
            set_market_status_with_conn(conn, market_id, MarketStatus::Archived, None)
        })?;

        info!(market = %market_id, "Market archived");
        Ok(())
    }

    /// All orders of a user, oldest first.
    pub async fn orders_for_user(&self, user_id: &UserId) -> Result<Vec<Order>> {
        let mut conn = self.conn()?;
        orders_for_user_with_conn(&mut conn, user_id)
    }

    /// Audit log entries of a user, oldest first.
    pub async fn transactions_for_user(&self, user_id: &UserId) -> Result<Vec<Transaction>> {
        let mut conn = self.conn()?;
        let rows: Vec<TransactionRow> = transactions::table
            .filter(transactions::user_id.eq(user_id.as_str()))
            .order(transactions::created_at.asc())
            .load(&mut conn)?;
        rows.into_iter().map(transaction_from_row).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Outcome;
    use crate::testkit;
    use rust_decimal_macros::dec;

    fn setup() -> Ledger {
        Ledger::new(testkit::memory_pool())
    }

    fn rain_market() -> Market {
        Market::try_new(
            MarketId::from("m1"),
            "Will it rain tomorrow?",
            vec![
                Outcome::new(OutcomeId::from("yes"), "Yes"),
                Outcome::new(OutcomeId::from("no"), "No"),
            ],
            100.0,
        )
        .unwrap()
    }

    #[tokio::test]
    async fn add_user_records_starting_deposit() {
        let ledger = setup();
        let alice = UserId::from("alice");
        ledger.add_user(&alice, dec!(1000)).await.unwrap();

        assert_eq!(ledger.balance(&alice).await.unwrap(), dec!(1000));
        let log = ledger.transactions_for_user(&alice).await.unwrap();
        assert_eq!(log.len(), 1);
        assert_eq!(log[0].kind(), TransactionKind::Deposit);
        assert_eq!(log[0].amount(), dec!(1000));
    }

    #[tokio::test]
    async fn add_user_rejects_duplicate_id() {
        let ledger = setup();
        let alice = UserId::from("alice");
        ledger.add_user(&alice, dec!(1000)).await.unwrap();

        let err = ledger.add_user(&alice, dec!(500)).await.unwrap_err();
        assert!(matches!(err.as_trade(), Some(TradeError::UserExists { .. })));
        // Original balance untouched by the rolled-back attempt.
        assert_eq!(ledger.balance(&alice).await.unwrap(), dec!(1000));
    }

    #[tokio::test]
    async fn deposit_credits_and_logs() {
        let ledger = setup();
        let alice = UserId::from("alice");
        ledger.add_user(&alice, dec!(100)).await.unwrap();

        let balance = ledger.deposit(&alice, dec!(50)).await.unwrap();
        assert_eq!(balance, dec!(150));
        assert_eq!(ledger.balance(&alice).await.unwrap(), dec!(150));
    }

    #[tokio::test]
    async fn deposit_rejects_non_positive_amounts() {
        let ledger = setup();
        let alice = UserId::from("alice");
        ledger.add_user(&alice, dec!(100)).await.unwrap();

        let err = ledger.deposit(&alice, dec!(0)).await.unwrap_err();
        assert!(matches!(err.as_trade(), Some(TradeError::InvalidAmount { .. })));
    }

    #[tokio::test]
    async fn deposit_to_unknown_user_is_rejected() {
        let ledger = setup();
        let err = ledger
            .deposit(&UserId::from("ghost"), dec!(10))
            .await
            .unwrap_err();
        assert!(matches!(err.as_trade(), Some(TradeError::UserNotFound { .. })));
    }

    #[tokio::test]
    async fn market_roundtrips_with_outcome_order() {
        let ledger = setup();
        let market = rain_market();
        ledger.create_market(&market).await.unwrap();

        let loaded = ledger.market(&MarketId::from("m1")).await.unwrap();
        assert_eq!(loaded.question(), "Will it rain tomorrow?");
        assert_eq!(loaded.status(), MarketStatus::Open);
        assert_eq!(loaded.outcome_index(&OutcomeId::from("yes")), Some(0));
        assert_eq!(loaded.outcome_index(&OutcomeId::from("no")), Some(1));
        assert_eq!(loaded.liquidity(), 100.0);
    }

    #[tokio::test]
    async fn missing_market_is_rejected() {
        let ledger = setup();
        let err = ledger.market(&MarketId::from("nope")).await.unwrap_err();
        assert!(matches!(err.as_trade(), Some(TradeError::MarketNotFound { .. })));
    }

    #[tokio::test]
    async fn archive_is_terminal_and_single_shot() {
        let ledger = setup();
        ledger.create_market(&rain_market()).await.unwrap();
        let id = MarketId::from("m1");

        ledger.archive_market(&id).await.unwrap();
        assert_eq!(
            ledger.market(&id).await.unwrap().status(),
            MarketStatus::Archived
        );

        let err = ledger.archive_market(&id).await.unwrap_err();
        assert!(matches!(err.as_trade(), Some(TradeError::MarketClosed { .. })));
    }

    #[tokio::test]
    async fn quantities_of_fresh_market_are_zero() {
        let ledger = setup();
        let market = rain_market();
        ledger.create_market(&market).await.unwrap();

        let mut conn = ledger.pool.get().unwrap();
        let quantities = quantities_with_conn(&mut conn, &market).unwrap();
        assert_eq!(quantities, vec![Decimal::ZERO, Decimal::ZERO]);
    }
}
