//! Ledger-specific error types
//!
//! Error taxonomy for balance locking and record storage.

use thiserror::Error;

/// Vault (balance lock manager) errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum VaultError {
    #[error("Insufficient available balance for {asset}: required {required}, available {available}")]
    InsufficientBalance {
        asset: String,
        required: String,
        available: String,
    },

    #[error("Insufficient {purpose} lock for {asset}: required {required}, locked {locked}")]
    InsufficientLocked {
        asset: String,
        purpose: String,
        required: String,
        locked: String,
    },

    #[error("Amount must be non-negative: {0}")]
    InvalidAmount(String),

    #[error("Arithmetic overflow in balance calculation")]
    Overflow,
}

/// Ledger store errors
///
/// Any of these surfacing while persisting an order is fatal for the block.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StoreError {
    #[error("Codec error: {0}")]
    Codec(String),

    #[error("Unsupported record version: {0}")]
    UnsupportedVersion(u16),

    #[error("Corrupt record for key {key}: {reason}")]
    Corrupt { key: String, reason: String },

    #[error("Collected fees for {denom} would go negative: have {available}, refund {requested}")]
    CollectedUnderflow {
        denom: String,
        available: String,
        requested: String,
    },
}
