//! Shared harness for integration tests: a migrated database with the
//! ledger and both engines wired over one lock registry, the same way
//! the binary wires them.
#![allow(dead_code)]

use std::sync::Arc;

use rust_decimal::Decimal;

use oddsmill::db::DbPool;
use oddsmill::domain::{Market, MarketId, Outcome, OutcomeId, UserId};
use oddsmill::engine::{MarketLocks, SettlementEngine, TradeExecutor, Valuator};
use oddsmill::ledger::Ledger;
use oddsmill::testkit;

pub struct Exchange {
    pub pool: DbPool,
    pub ledger: Ledger,
    pub executor: TradeExecutor,
    pub settlement: SettlementEngine,
    pub valuator: Valuator,
}

impl Exchange {
    pub fn in_memory() -> Self {
        Self::over(testkit::memory_pool())
    }

    pub fn over(pool: DbPool) -> Self {
        let locks = Arc::new(MarketLocks::new());
        Self {
            ledger: Ledger::new(pool.clone()),
            executor: TradeExecutor::new(pool.clone(), Arc::clone(&locks)),
            settlement: SettlementEngine::new(pool.clone(), Arc::clone(&locks)),
            valuator: Valuator::new(pool.clone()),
            pool,
        }
    }

    pub async fn seed_user(&self, id: &str, balance: Decimal) -> UserId {
        let user = UserId::from(id);
        self.ledger.add_user(&user, balance).await.expect("seed user");
        user
    }

    pub async fn seed_yes_no(&self, id: &str, liquidity: f64) -> MarketId {
        let market = testkit::yes_no_market(id, liquidity);
        self.ledger.create_market(&market).await.expect("seed market");
        market.market_id().clone()
    }

    pub async fn seed_market(&self, id: &str, outcome_ids: &[&str], liquidity: f64) -> MarketId {
        let outcomes = outcome_ids
            .iter()
            .map(|o| Outcome::new(OutcomeId::from(*o), o.to_uppercase()))
            .collect();
        let market = Market::try_new(
            MarketId::from(id),
            format!("Which of {outcome_ids:?}?"),
            outcomes,
            liquidity,
        )
        .expect("valid market");
        self.ledger.create_market(&market).await.expect("seed market");
        market.market_id().clone()
    }
}

pub fn yes() -> OutcomeId {
    OutcomeId::from("yes")
}

pub fn no() -> OutcomeId {
    OutcomeId::from("no")
}
