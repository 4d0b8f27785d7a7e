//! Types library for the on-chain order keeper
//!
//! This library provides the core type definitions shared by the ledger
//! collaborators and the order lifecycle engine. Everything here is
//! deterministic: no wall clock, no randomness, no floating point.
//!
//! # Modules
//! - `ids`: Identifiers (OrderId, Address, Product)
//! - `numeric`: Fixed-point decimal types (Price, Quantity, Coin)
//! - `order`: Order drafts, orders and their status machine
//! - `fee`: Fee ledger records
//! - `errors`: Error taxonomy

pub mod ids;
pub mod numeric;
pub mod order;
pub mod fee;
pub mod errors;

// Library version constant
pub const LIB_VERSION: &str = "1.0.0";

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::ids::*;
    pub use crate::numeric::*;
    pub use crate::order::*;
    pub use crate::fee::*;
    pub use crate::errors::*;
}
