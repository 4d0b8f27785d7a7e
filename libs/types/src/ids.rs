//! Identifier types for keeper entities
//!
//! Order identifiers are derived from `(block height, sequence within block)`
//! so that every validating node assigns the same ID to the same placement.
//! Ordering is height first, then sequence, which gives a total order that
//! doubles as the time priority inside the depth book.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::errors::OrderError;

/// Unique identifier for an order
///
/// Assigned once at successful placement and never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct OrderId {
    height: u64,
    sequence: u64,
}

impl OrderId {
    /// Build an ID from the block height and the 1-based sequence in that block
    pub fn new(height: u64, sequence: u64) -> Self {
        Self { height, sequence }
    }

    /// Block height the order was placed at
    pub fn height(&self) -> u64 {
        self.height
    }

    /// Sequence of the placement within its block
    pub fn sequence(&self) -> u64 {
        self.sequence
    }
}

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ID{:010}-{}", self.height, self.sequence)
    }
}

impl FromStr for OrderId {
    type Err = OrderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || OrderError::InvalidOrderId(s.to_string());
        let body = s.strip_prefix("ID").ok_or_else(invalid)?;
        let (height, sequence) = body.split_once('-').ok_or_else(invalid)?;
        let height = height.parse::<u64>().map_err(|_| invalid())?;
        let sequence = sequence.parse::<u64>().map_err(|_| invalid())?;
        Ok(Self { height, sequence })
    }
}

impl From<OrderId> for String {
    fn from(id: OrderId) -> Self {
        id.to_string()
    }
}

impl TryFrom<String> for OrderId {
    type Error = OrderError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

/// Owner of an order and of the coins locked against it
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Address(String);

impl Address {
    /// Create an address, rejecting empty or whitespace-only strings
    pub fn new(addr: impl Into<String>) -> Result<Self, OrderError> {
        let addr = addr.into();
        if addr.trim().is_empty() {
            return Err(OrderError::InvalidAddress(addr));
        }
        Ok(Self(addr))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Trading pair symbol
///
/// Format: "BASE_QUOTE" (e.g., "btc_usdt"). The base asset is what is
/// bought or sold, the quote asset is what prices are expressed in.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct Product {
    symbol: String,
    split_at: usize,
}

impl Product {
    /// Parse a product symbol, returning an error if the format is invalid
    pub fn new(symbol: impl Into<String>) -> Result<Self, OrderError> {
        let symbol = symbol.into();
        let mut parts = symbol.split('_');
        let valid = match (parts.next(), parts.next(), parts.next()) {
            (Some(base), Some(quote), None) => !base.is_empty() && !quote.is_empty(),
            _ => false,
        };
        match symbol.find('_') {
            Some(split_at) if valid => Ok(Self { symbol, split_at }),
            _ => Err(OrderError::InvalidProduct(symbol)),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.symbol
    }

    /// Base asset denom
    pub fn base(&self) -> &str {
        &self.symbol[..self.split_at]
    }

    /// Quote asset denom
    pub fn quote(&self) -> &str {
        &self.symbol[self.split_at + 1..]
    }
}

impl fmt::Display for Product {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol)
    }
}

impl FromStr for Product {
    type Err = OrderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl From<Product> for String {
    fn from(product: Product) -> Self {
        product.symbol
    }
}

impl TryFrom<String> for Product {
    type Error = OrderError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}
