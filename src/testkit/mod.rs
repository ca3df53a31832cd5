//! Test fixtures shared by unit and integration tests.
//!
//! SQLite `:memory:` databases are private to a single connection, so
//! the pools built here are capped at one connection; every checkout
//! sees the same migrated schema. Tests that need real connection
//! concurrency should use [`file_pool`] with a temporary file instead.

use diesel::r2d2::{ConnectionManager, Pool};
use diesel::SqliteConnection;
use diesel_migrations::MigrationHarness;

use crate::db::{DbPool, MIGRATIONS};
use crate::domain::{Market, MarketId, Outcome, OutcomeId};

/// A migrated single-connection in-memory database.
///
/// # Panics
/// Panics if the pool or migrations fail; test-only code.
#[must_use]
pub fn memory_pool() -> DbPool {
    let manager = ConnectionManager::<SqliteConnection>::new(":memory:");
    let pool = Pool::builder()
        .max_size(1)
        .build(manager)
        .expect("in-memory pool");
    migrate(&pool);
    pool
}

/// A migrated multi-connection pool over a database file.
///
/// # Panics
/// Panics if the pool or migrations fail; test-only code.
#[must_use]
pub fn file_pool(database_url: &str) -> DbPool {
    let manager = ConnectionManager::<SqliteConnection>::new(database_url);
    let pool = Pool::builder()
        .max_size(5)
        .build(manager)
        .expect("file-backed pool");
    migrate(&pool);
    pool
}

fn migrate(pool: &DbPool) {
    let mut conn = pool.get().expect("connection");
    conn.run_pending_migrations(MIGRATIONS).expect("migrations");
}

/// A two-outcome yes/no market with the given liquidity.
///
/// # Panics
/// Panics if the market invariants fail; test-only code.
#[must_use]
pub fn yes_no_market(market_id: &str, liquidity: f64) -> Market {
    Market::try_new(
        MarketId::from(market_id),
        format!("Will {market_id} happen?"),
        vec![
            Outcome::new(OutcomeId::from("yes"), "Yes"),
            Outcome::new(OutcomeId::from("no"), "No"),
        ],
        liquidity,
    )
    .expect("valid market")
}
