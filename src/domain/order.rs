//! Order and audit-transaction ledger records.
//!
//! Orders are the append-only source of truth for all AMM state: the
//! quantity of an outcome is always the sum of `amount` over its orders.
//! Records are immutable once created; there is no sell or cancel path.

use std::fmt;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::error::DomainError;
use super::id::{MarketId, OrderId, OutcomeId, TransactionId, UserId};

/// A single buy execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    order_id: OrderId,
    market_id: MarketId,
    outcome_id: OutcomeId,
    user_id: UserId,
    amount: Decimal,
    cost: Decimal,
    created_at: DateTime<Utc>,
}

impl Order {
    /// Create a new order record with invariant validation.
    ///
    /// # Errors
    ///
    /// Returns `DomainError` when `amount` is not strictly positive or
    /// `cost` is negative.
    pub fn try_new(
        market_id: MarketId,
        outcome_id: OutcomeId,
        user_id: UserId,
        amount: Decimal,
        cost: Decimal,
    ) -> Result<Self, DomainError> {
        if amount <= Decimal::ZERO {
            return Err(DomainError::NonPositiveAmount { amount });
        }
        if cost < Decimal::ZERO {
            return Err(DomainError::NegativeCost { cost });
        }

        Ok(Self {
            order_id: OrderId::generate(),
            market_id,
            outcome_id,
            user_id,
            amount,
            cost,
            created_at: Utc::now(),
        })
    }

    /// Reconstruct an order from persisted state.
    #[must_use]
    pub fn from_parts(
        order_id: OrderId,
        market_id: MarketId,
        outcome_id: OutcomeId,
        user_id: UserId,
        amount: Decimal,
        cost: Decimal,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            order_id,
            market_id,
            outcome_id,
            user_id,
            amount,
            cost,
            created_at,
        }
    }

    /// Get the order ID.
    #[must_use]
    pub const fn order_id(&self) -> &OrderId {
        &self.order_id
    }

    /// Get the market this order belongs to.
    #[must_use]
    pub const fn market_id(&self) -> &MarketId {
        &self.market_id
    }

    /// Get the outcome that was bought.
    #[must_use]
    pub const fn outcome_id(&self) -> &OutcomeId {
        &self.outcome_id
    }

    /// Get the buyer.
    #[must_use]
    pub const fn user_id(&self) -> &UserId {
        &self.user_id
    }

    /// Get the number of shares purchased.
    #[must_use]
    pub const fn amount(&self) -> Decimal {
        self.amount
    }

    /// Get the currency debited for this trade.
    #[must_use]
    pub const fn cost(&self) -> Decimal {
        self.cost
    }

    /// Get the execution timestamp.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

/// Kind of an audit transaction entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    /// Currency credited from outside the ledger (e.g. starting balance).
    Deposit,
    /// Currency debited by a buy.
    Bet,
    /// Currency credited by a settlement payout.
    Win,
}

impl TransactionKind {
    /// Get the canonical string form used in persistence.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Deposit => "deposit",
            Self::Bet => "bet",
            Self::Win => "win",
        }
    }

    /// Parse the canonical string form.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "deposit" => Some(Self::Deposit),
            "bet" => Some(Self::Bet),
            "win" => Some(Self::Win),
            _ => None,
        }
    }
}

impl fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An append-only audit entry for a balance movement.
///
/// Purely observability: the AMM math never reads these back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    transaction_id: TransactionId,
    user_id: UserId,
    kind: TransactionKind,
    amount: Decimal,
    created_at: DateTime<Utc>,
}

impl Transaction {
    /// Create a new audit entry.
    #[must_use]
    pub fn new(user_id: UserId, kind: TransactionKind, amount: Decimal) -> Self {
        Self {
            transaction_id: TransactionId::generate(),
            user_id,
            kind,
            amount,
            created_at: Utc::now(),
        }
    }

    /// Reconstruct an audit entry from persisted state.
    #[must_use]
    pub fn from_parts(
        transaction_id: TransactionId,
        user_id: UserId,
        kind: TransactionKind,
        amount: Decimal,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            transaction_id,
            user_id,
            kind,
            amount,
            created_at,
        }
    }

    /// Get the transaction ID.
    #[must_use]
    pub const fn transaction_id(&self) -> &TransactionId {
        &self.transaction_id
    }

    /// Get the user whose balance moved.
    #[must_use]
    pub const fn user_id(&self) -> &UserId {
        &self.user_id
    }

    /// Get the kind of movement.
    #[must_use]
    pub const fn kind(&self) -> TransactionKind {
        self.kind
    }

    /// Get the amount that moved.
    #[must_use]
    pub const fn amount(&self) -> Decimal {
        self.amount
    }

    /// Get the timestamp.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}
