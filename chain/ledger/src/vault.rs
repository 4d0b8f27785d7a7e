//! Vault: balance tracking and coin locking
//!
//! The order keeper never moves balances directly. It goes through the
//! [`LockManager`] seam, which guarantees that:
//! - locked coins cannot be spent through the available balance
//! - every lock/unlock either applies completely or not at all
//! - a lock is tagged with its purpose, so quantity reservations and fee
//!   reservations are accounted separately
//!
//! [`Vault`] is the in-memory implementation used by the node's block
//! working state and by tests.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use tracing::debug;
use types::ids::Address;
use types::numeric::Coin;

use crate::codec::digest;
use crate::errors::{StoreError, VaultError};

/// What a lock reserves coins for
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LockPurpose {
    /// Principal reserved against the unfilled remainder of an order
    Quantity,
    /// Placement fee reserved until the order leaves the book
    Fee,
}

impl fmt::Display for LockPurpose {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LockPurpose::Quantity => f.write_str("quantity"),
            LockPurpose::Fee => f.write_str("fee"),
        }
    }
}

/// Balance lock manager consumed by the order keeper
pub trait LockManager {
    /// Move `coin` from the owner's available balance into a lock.
    /// Fails without any change if the available balance is short.
    fn lock_coins(&mut self, owner: &Address, coin: &Coin, purpose: LockPurpose)
        -> Result<(), VaultError>;

    /// Move `coin` out of a lock back into the owner's available balance.
    fn unlock_coins(&mut self, owner: &Address, coin: &Coin, purpose: LockPurpose)
        -> Result<(), VaultError>;

    /// Remove `coin` from a lock for good (it was delivered in a trade).
    fn spend_locked_coins(&mut self, owner: &Address, coin: &Coin, purpose: LockPurpose)
        -> Result<(), VaultError>;

    /// Move `coin` from the owner's available balance into the fee pool.
    fn collect_fee(&mut self, owner: &Address, coin: &Coin) -> Result<(), VaultError>;
}

/// Per-account balances: available by denom, locked by (purpose, denom)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
struct Holdings {
    available: BTreeMap<String, Decimal>,
    locked: BTreeMap<(LockPurpose, String), Decimal>,
}

/// In-memory balance lock manager
///
/// Balances are stored in `BTreeMap`s so that the serialized state (and
/// therefore the state hash) is identical on every node.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Vault {
    accounts: BTreeMap<Address, Holdings>,
    fee_pool: BTreeMap<String, Decimal>,
}

impl Vault {
    pub fn new() -> Self {
        Self::default()
    }

    /// Credit coins to an account's available balance.
    pub fn deposit(&mut self, owner: &Address, coin: &Coin) -> Result<(), VaultError> {
        check_amount(coin)?;
        let holdings = self.accounts.entry(owner.clone()).or_default();
        let current = holdings.available.entry(coin.denom.clone()).or_insert(Decimal::ZERO);
        *current = current.checked_add(coin.amount).ok_or(VaultError::Overflow)?;
        Ok(())
    }

    /// Available (spendable) balance.
    pub fn available(&self, owner: &Address, denom: &str) -> Decimal {
        self.accounts
            .get(owner)
            .and_then(|h| h.available.get(denom))
            .copied()
            .unwrap_or(Decimal::ZERO)
    }

    /// Balance locked for `purpose`.
    pub fn locked(&self, owner: &Address, denom: &str, purpose: LockPurpose) -> Decimal {
        self.accounts
            .get(owner)
            .and_then(|h| h.locked.get(&(purpose, denom.to_string())))
            .copied()
            .unwrap_or(Decimal::ZERO)
    }

    /// Available plus every lock.
    pub fn total(&self, owner: &Address, denom: &str) -> Decimal {
        self.available(owner, denom)
            + self.locked(owner, denom, LockPurpose::Quantity)
            + self.locked(owner, denom, LockPurpose::Fee)
    }

    /// Fees collected by the protocol so far.
    pub fn fee_pool(&self, denom: &str) -> Decimal {
        self.fee_pool.get(denom).copied().unwrap_or(Decimal::ZERO)
    }

    /// SHA-256 over the canonical serialized balances.
    pub fn state_hash(&self) -> Result<String, StoreError> {
        let bytes = bincode::serialize(self).map_err(|e| StoreError::Codec(e.to_string()))?;
        Ok(digest(&bytes))
    }

    fn debit_available(&mut self, owner: &Address, coin: &Coin) -> Result<(), VaultError> {
        let available = self.available(owner, &coin.denom);
        if available < coin.amount {
            return Err(VaultError::InsufficientBalance {
                asset: coin.denom.clone(),
                required: coin.amount.to_string(),
                available: available.to_string(),
            });
        }
        let holdings = self.accounts.entry(owner.clone()).or_default();
        holdings.available.insert(coin.denom.clone(), available - coin.amount);
        Ok(())
    }

    fn debit_locked(
        &mut self,
        owner: &Address,
        coin: &Coin,
        purpose: LockPurpose,
    ) -> Result<(), VaultError> {
        let locked = self.locked(owner, &coin.denom, purpose);
        if locked < coin.amount {
            return Err(VaultError::InsufficientLocked {
                asset: coin.denom.clone(),
                purpose: purpose.to_string(),
                required: coin.amount.to_string(),
                locked: locked.to_string(),
            });
        }
        let key = (purpose, coin.denom.clone());
        let holdings = self.accounts.entry(owner.clone()).or_default();
        let rest = locked - coin.amount;
        if rest.is_zero() {
            holdings.locked.remove(&key);
        } else {
            holdings.locked.insert(key, rest);
        }
        Ok(())
    }
}

impl LockManager for Vault {
    fn lock_coins(
        &mut self,
        owner: &Address,
        coin: &Coin,
        purpose: LockPurpose,
    ) -> Result<(), VaultError> {
        check_amount(coin)?;
        if coin.is_zero() {
            return Ok(());
        }
        let new_locked = self
            .locked(owner, &coin.denom, purpose)
            .checked_add(coin.amount)
            .ok_or(VaultError::Overflow)?;
        self.debit_available(owner, coin)?;
        let holdings = self.accounts.entry(owner.clone()).or_default();
        holdings.locked.insert((purpose, coin.denom.clone()), new_locked);
        debug!(owner = %owner, coin = %coin, purpose = %purpose, "Coins locked");
        Ok(())
    }

    fn unlock_coins(
        &mut self,
        owner: &Address,
        coin: &Coin,
        purpose: LockPurpose,
    ) -> Result<(), VaultError> {
        check_amount(coin)?;
        if coin.is_zero() {
            return Ok(());
        }
        let new_available = self
            .available(owner, &coin.denom)
            .checked_add(coin.amount)
            .ok_or(VaultError::Overflow)?;
        self.debit_locked(owner, coin, purpose)?;
        let holdings = self.accounts.entry(owner.clone()).or_default();
        holdings.available.insert(coin.denom.clone(), new_available);
        debug!(owner = %owner, coin = %coin, purpose = %purpose, "Coins unlocked");
        Ok(())
    }

    fn spend_locked_coins(
        &mut self,
        owner: &Address,
        coin: &Coin,
        purpose: LockPurpose,
    ) -> Result<(), VaultError> {
        check_amount(coin)?;
        if coin.is_zero() {
            return Ok(());
        }
        self.debit_locked(owner, coin, purpose)?;
        debug!(owner = %owner, coin = %coin, purpose = %purpose, "Locked coins spent");
        Ok(())
    }

    fn collect_fee(&mut self, owner: &Address, coin: &Coin) -> Result<(), VaultError> {
        check_amount(coin)?;
        if coin.is_zero() {
            return Ok(());
        }
        let new_pool = self
            .fee_pool(&coin.denom)
            .checked_add(coin.amount)
            .ok_or(VaultError::Overflow)?;
        self.debit_available(owner, coin)?;
        self.fee_pool.insert(coin.denom.clone(), new_pool);
        debug!(owner = %owner, coin = %coin, "Fee moved to pool");
        Ok(())
    }
}

fn check_amount(coin: &Coin) -> Result<(), VaultError> {
    if coin.amount < Decimal::ZERO {
        return Err(VaultError::InvalidAmount(coin.amount.to_string()));
    }
    Ok(())
}
