//! Error types for order validation and order state transitions
//!
//! Comprehensive error taxonomy using thiserror

use thiserror::Error;

/// Order-specific errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum OrderError {
    #[error("Invalid price: {0}")]
    InvalidPrice(String),

    #[error("Invalid quantity: {0}")]
    InvalidQuantity(String),

    #[error("Invalid product: {0}")]
    InvalidProduct(String),

    #[error("Invalid address: {0:?}")]
    InvalidAddress(String),

    #[error("Invalid order id: {0}")]
    InvalidOrderId(String),

    #[error("Negative amount: {0}")]
    NegativeAmount(String),

    #[error("Order already in terminal state: {status}")]
    AlreadyTerminal { status: String },

    #[error("Fill of {fill} exceeds remaining quantity {remaining}")]
    Overfill { fill: String, remaining: String },

    #[error("Invalid fill: {reason}")]
    InvalidFill { reason: String },

    #[error("Amount overflow: {0}")]
    Overflow(String),
}
