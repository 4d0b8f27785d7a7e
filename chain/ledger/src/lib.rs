//! Ledger collaborators for the order keeper
//!
//! This crate provides the state the order keeper reads and writes but does
//! not own: account balances with purpose-tagged locks, and the key-value
//! store holding orders, per-block counters, collected fees and fee records.
//!
//! # Modules
//! - `errors`: Vault and store error types
//! - `vault`: `LockManager` seam and the in-memory `Vault`
//! - `store`: `LedgerStore` seam and the in-memory `MemoryStore`
//! - `codec`: Versioned record encoding and state digests

pub mod codec;
pub mod errors;
pub mod store;
pub mod vault;

pub use errors::{StoreError, VaultError};
pub use store::{LedgerStore, MemoryStore};
pub use vault::{LockManager, LockPurpose, Vault};
