//! Fee accounting records
//!
//! Fee details are an append-only ledger used for downstream reporting.
//! A record is never mutated once written.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::ids::{Address, OrderId};
use crate::numeric::Coin;

/// Fee record type
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FeeType {
    /// Fee locked when an order is placed
    New,
    /// Portion of the locked fee handed back when an order leaves the book
    Receive,
    /// Fee charged because the owner cancelled
    Cancel,
    /// Fee charged because the order outlived its lifetime
    Expire,
    /// Fee charged for an order that traded out completely
    Deal,
}

impl FeeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FeeType::New => "new",
            FeeType::Receive => "receive",
            FeeType::Cancel => "cancel",
            FeeType::Expire => "expire",
            FeeType::Deal => "deal",
        }
    }
}

impl fmt::Display for FeeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One entry of the fee ledger
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeDetail {
    pub address: Address,
    pub order_id: Option<OrderId>,
    pub fee: Coin,
    pub fee_type: FeeType,
    pub height: u64,
    pub timestamp: i64, // block time, unix nanos
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    #[test]
    fn test_fee_type_serialization() {
        assert_eq!(serde_json::to_string(&FeeType::Receive).unwrap(), "\"RECEIVE\"");
        assert_eq!(FeeType::Expire.to_string(), "expire");
    }

    #[test]
    fn test_fee_detail_serialization() {
        let detail = FeeDetail {
            address: Address::new("alice").unwrap(),
            order_id: Some(OrderId::new(3, 1)),
            fee: Coin::new("usdt", Decimal::new(2, 2)).unwrap(),
            fee_type: FeeType::New,
            height: 3,
            timestamp: 1_708_123_456_789_000_000,
        };
        let json = serde_json::to_string(&detail).unwrap();
        let back: FeeDetail = serde_json::from_str(&json).unwrap();
        assert_eq!(detail, back);
    }
}
