//! Order Engine Service
//!
//! Order lifecycle keeper for the on-chain exchange: reserves funds and fees
//! against orders, assigns deterministic order IDs, settles fees when orders
//! leave the book, and maintains the per-product depth books.
//!
//! **Key Invariants:**
//! - An order rests in the depth book iff its status is non-terminal
//! - Quantity coins locked at placement are released or spent exactly once
//! - Refunded fee = locked fee − owed fee, never negative
//! - Order IDs strictly increase within a block and are never reused
//! - Terminal orders are never mutated again

pub mod book;
pub mod config;
pub mod context;
pub mod engine;
pub mod errors;
pub mod events;
pub mod fee;
pub mod query;

pub use config::EngineConfig;
pub use context::BlockContext;
pub use engine::{OrderKeeper, QuitReason};
pub use errors::{BookError, EngineError};
pub use events::EngineEvent;
