//! Exchange-agnostic domain types for the market-maker core.
//!
//! Everything in this module is plain data with invariant-checking
//! constructors; persistence and pricing live elsewhere.

pub mod error;
pub mod id;
pub mod market;
pub mod order;
pub mod position;

pub use error::DomainError;
pub use id::{MarketId, OrderId, OutcomeId, TransactionId, UserId};
pub use market::{Market, MarketStatus, Outcome};
pub use order::{Order, Transaction, TransactionKind};
pub use position::Position;
