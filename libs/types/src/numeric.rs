//! Fixed-point decimal types for prices, quantities and coin amounts
//!
//! Uses rust_decimal for deterministic arithmetic (no floating-point errors).
//! Every node must compute byte-identical amounts, so nothing here touches f64.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Add;
use std::str::FromStr;

use crate::errors::OrderError;

/// Limit price of an order, always strictly positive
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Price(Decimal);

impl Price {
    /// Create a price, rejecting zero and negative values
    pub fn try_new(value: Decimal) -> Result<Self, OrderError> {
        if value <= Decimal::ZERO {
            return Err(OrderError::InvalidPrice(value.to_string()));
        }
        Ok(Self(value.normalize()))
    }

    /// Convenience constructor for whole prices; zero is rejected
    pub fn from_u64(value: u64) -> Result<Self, OrderError> {
        Self::try_new(Decimal::from(value))
    }

    pub fn as_decimal(&self) -> Decimal {
        self.0
    }
}

impl FromStr for Price {
    type Err = OrderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value = Decimal::from_str(s).map_err(|_| OrderError::InvalidPrice(s.to_string()))?;
        Self::try_new(value)
    }
}

impl TryFrom<Decimal> for Price {
    type Error = OrderError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Self::try_new(value)
    }
}

impl From<Price> for Decimal {
    fn from(price: Price) -> Self {
        price.0
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Order quantity in base-asset units
///
/// Zero is a valid quantity (e.g. the remainder of a filled order); drafts
/// additionally require it to be positive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Quantity(Decimal);

impl Quantity {
    /// Create a quantity, rejecting negative values
    pub fn try_new(value: Decimal) -> Result<Self, OrderError> {
        if value < Decimal::ZERO {
            return Err(OrderError::InvalidQuantity(value.to_string()));
        }
        Ok(Self(value.normalize()))
    }

    pub fn zero() -> Self {
        Self(Decimal::ZERO)
    }

    pub fn from_u64(value: u64) -> Self {
        Self(Decimal::from(value))
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    pub fn as_decimal(&self) -> Decimal {
        self.0
    }

    /// Subtract, returning `None` when the result would be negative
    pub fn checked_sub(&self, other: Quantity) -> Option<Quantity> {
        let diff = self.0 - other.0;
        if diff < Decimal::ZERO {
            None
        } else {
            Some(Self(diff.normalize()))
        }
    }
}

impl Add for Quantity {
    type Output = Quantity;

    fn add(self, rhs: Quantity) -> Quantity {
        Quantity((self.0 + rhs.0).normalize())
    }
}

impl FromStr for Quantity {
    type Err = OrderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value =
            Decimal::from_str(s).map_err(|_| OrderError::InvalidQuantity(s.to_string()))?;
        Self::try_new(value)
    }
}

impl TryFrom<Decimal> for Quantity {
    type Error = OrderError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Self::try_new(value)
    }
}

impl From<Quantity> for Decimal {
    fn from(quantity: Quantity) -> Self {
        quantity.0
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An amount of a single asset
///
/// Invariant: amount >= 0.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Coin {
    pub denom: String,
    pub amount: Decimal,
}

impl Coin {
    /// Create a coin; negative amounts are rejected
    pub fn new(denom: impl Into<String>, amount: Decimal) -> Result<Self, OrderError> {
        if amount < Decimal::ZERO {
            return Err(OrderError::NegativeAmount(amount.to_string()));
        }
        Ok(Self {
            denom: denom.into(),
            amount: amount.normalize(),
        })
    }

    pub fn zero(denom: impl Into<String>) -> Self {
        Self {
            denom: denom.into(),
            amount: Decimal::ZERO,
        }
    }

    pub fn is_zero(&self) -> bool {
        self.amount.is_zero()
    }

    /// Subtract another amount of the same denom, flooring at zero
    pub fn saturating_sub(&self, amount: Decimal) -> Coin {
        let rest = (self.amount - amount).max(Decimal::ZERO);
        Coin {
            denom: self.denom.clone(),
            amount: rest.normalize(),
        }
    }

    /// Same denom, different amount
    pub fn with_amount(&self, amount: Decimal) -> Coin {
        Coin {
            denom: self.denom.clone(),
            amount: amount.max(Decimal::ZERO).normalize(),
        }
    }
}

impl fmt::Display for Coin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.amount, self.denom)
    }
}

/// Round a fee amount to `decimals` places, HALF_UP
pub fn round_amount(value: Decimal, decimals: u32) -> Decimal {
    value
        .round_dp_with_strategy(decimals, RoundingStrategy::MidpointAwayFromZero)
        .normalize()
}
