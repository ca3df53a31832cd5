//! Database model types for Diesel ORM.
//!
//! Monetary columns (`balance`, `amount`, `cost`, `shares`, `invested`)
//! are stored as decimal strings so ledger arithmetic survives a
//! round-trip exactly; timestamps are RFC 3339 strings.

use diesel::prelude::*;

use super::schema::{markets, orders, outcomes, positions, transactions, users};

/// Database row for a market.
#[derive(Queryable, Selectable, Insertable, Debug, Clone)]
#[diesel(table_name = markets)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct MarketRow {
    pub id: String,
    pub question: String,
    pub status: String,
    pub winner_outcome_id: Option<String>,
    pub liquidity: f64,
    pub created_at: String,
}

/// Database row for an outcome.
#[derive(Queryable, Selectable, Insertable, Debug, Clone)]
#[diesel(table_name = outcomes)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct OutcomeRow {
    pub market_id: String,
    pub outcome_id: String,
    pub idx: i32,
    pub name: String,
}

/// Database row for an order.
#[derive(Queryable, Selectable, Insertable, Debug, Clone)]
#[diesel(table_name = orders)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct OrderRow {
    pub id: String,
    pub market_id: String,
    pub outcome_id: String,
    pub user_id: String,
    pub amount: String,
    pub cost: String,
    pub created_at: String,
}

/// Database row for a position aggregate.
#[derive(Queryable, Selectable, Insertable, AsChangeset, Debug, Clone)]
#[diesel(table_name = positions)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct PositionRow {
    pub user_id: String,
    pub market_id: String,
    pub outcome_id: String,
    pub shares: String,
    pub invested: String,
}

/// Database row for a user.
#[derive(Queryable, Selectable, Insertable, Debug, Clone)]
#[diesel(table_name = users)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct UserRow {
    pub id: String,
    pub balance: String,
    pub created_at: String,
}

/// Database row for an audit transaction.
#[derive(Queryable, Selectable, Insertable, Debug, Clone)]
#[diesel(table_name = transactions)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct TransactionRow {
    pub id: String,
    pub user_id: String,
    pub kind: String,
    pub amount: String,
    pub created_at: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn market_row_is_insertable() {
        // Type check - if this compiles, the Insertable derive works
        let _row = MarketRow {
            id: "m1".to_string(),
            question: "Will it rain?".to_string(),
            status: "open".to_string(),
            winner_outcome_id: None,
            liquidity: 100.0,
            created_at: "2026-01-01T00:00:00Z".to_string(),
        };
    }

    #[test]
    fn order_row_is_insertable() {
        let _row = OrderRow {
            id: "o1".to_string(),
            market_id: "m1".to_string(),
            outcome_id: "yes".to_string(),
            user_id: "alice".to_string(),
            amount: "10".to_string(),
            cost: "5.1249".to_string(),
            created_at: "2026-01-01T00:00:00Z".to_string(),
        };
    }

    #[test]
    fn position_row_is_insertable() {
        let _row = PositionRow {
            user_id: "alice".to_string(),
            market_id: "m1".to_string(),
            outcome_id: "yes".to_string(),
            shares: "10".to_string(),
            invested: "5.1249".to_string(),
        };
    }
}
