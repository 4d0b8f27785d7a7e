//! Order engine error types

use ledger::errors::{StoreError, VaultError};
use thiserror::Error;
use types::errors::OrderError;
use types::ids::{Address, OrderId};
use types::numeric::Coin;

/// Errors surfaced by the order keeper
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    /// Malformed request or a transition the order's state does not allow
    #[error("Invalid order: {0}")]
    InvalidOrder(#[from] OrderError),

    /// A lock or spend against the owner's balance failed.
    ///
    /// `stranded` is set when the quantity lock succeeded but the fee lock
    /// did not; those coins stay locked until the caller releases them.
    #[error("Funds unavailable: {source}")]
    FundsUnavailable {
        source: VaultError,
        stranded: Option<Coin>,
    },

    #[error("Order not found: {0}")]
    OrderNotFound(OrderId),

    #[error("Order {order_id} is not owned by {sender}")]
    NotOwner { order_id: OrderId, sender: Address },

    /// Persisted state could not be read or written; halts the block
    #[error("Fatal ledger failure: {0}")]
    Fatal(#[from] StoreError),

    /// Depth book out of step with order state; halts the block
    #[error("Depth book error: {0}")]
    Book(#[from] BookError),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

/// Depth book errors
///
/// Each of these means the book and the persisted orders disagree.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BookError {
    #[error("Order {0} is already in the book")]
    DuplicateOrder(OrderId),

    #[error("Order {0} is not in the book")]
    UnknownOrder(OrderId),

    #[error("Book entry for {0} cannot be updated to zero quantity")]
    EmptyEntry(OrderId),
}

impl EngineError {
    /// True for errors that must stop block processing
    pub fn is_fatal(&self) -> bool {
        matches!(self, EngineError::Fatal(_) | EngineError::Book(_))
    }
}
