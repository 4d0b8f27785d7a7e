//! Order lifecycle types
//!
//! An order is created from an [`OrderDraft`] once its funds are reserved and
//! an ID has been assigned. From then on it carries its own lock accounting:
//! how much of the quantity-side reservation is still held, how much fee is
//! still held, and how much fee was paid and handed back.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::errors::OrderError;
use crate::ids::{Address, OrderId, Product};
use crate::numeric::{Coin, Price, Quantity};

/// Order side (buyer or seller)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Side {
    /// Buy order (bid)
    Buy,
    /// Sell order (ask)
    Sell,
}

impl Side {
    /// Get the opposite side
    pub fn opposite(&self) -> Self {
        match self {
            Side::Buy => Side::Sell,
            Side::Sell => Side::Buy,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Buy => f.write_str("BUY"),
            Side::Sell => f.write_str("SELL"),
        }
    }
}

/// Order status
///
/// Open and PartiallyFilled rest in the depth book; everything else is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    Open,
    PartiallyFilled,
    Filled,
    Cancelled,
    Expired,
}

impl OrderStatus {
    /// Check if status is terminal (no further transitions possible)
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            OrderStatus::Filled | OrderStatus::Cancelled | OrderStatus::Expired
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Open => "OPEN",
            OrderStatus::PartiallyFilled => "PARTIALLY_FILLED",
            OrderStatus::Filled => "FILLED",
            OrderStatus::Cancelled => "CANCELLED",
            OrderStatus::Expired => "EXPIRED",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A placement request before any funds are reserved
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderDraft {
    pub sender: Address,
    pub product: Product,
    pub side: Side,
    pub price: Price,
    pub quantity: Quantity,
}

impl OrderDraft {
    pub fn new(sender: Address, product: Product, side: Side, price: Price, quantity: Quantity) -> Self {
        Self {
            sender,
            product,
            side,
            price,
            quantity,
        }
    }

    /// Reject drafts that must never reach the lock stage
    pub fn validate(&self) -> Result<(), OrderError> {
        if self.quantity.is_zero() {
            return Err(OrderError::InvalidQuantity(self.quantity.to_string()));
        }
        self.notional()?;
        Ok(())
    }

    /// price × quantity, in quote units
    pub fn notional(&self) -> Result<Decimal, OrderError> {
        checked_notional(self.price, self.quantity)
    }

    /// Coins that must be reserved for the order to rest in the book.
    ///
    /// A buy reserves the quote amount it could spend, a sell reserves the
    /// base amount it could deliver.
    pub fn need_lock_coins(&self) -> Result<Coin, OrderError> {
        Ok(match self.side {
            Side::Buy => Coin {
                denom: self.product.quote().to_string(),
                amount: self.notional()?.normalize(),
            },
            Side::Sell => Coin {
                denom: self.product.base().to_string(),
                amount: self.quantity.as_decimal(),
            },
        })
    }
}

fn checked_notional(price: Price, quantity: Quantity) -> Result<Decimal, OrderError> {
    price
        .as_decimal()
        .checked_mul(quantity.as_decimal())
        .ok_or_else(|| OrderError::Overflow(format!("{} x {}", price, quantity)))
}

/// Complete order structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub order_id: OrderId,
    pub sender: Address,
    pub product: Product,
    pub side: Side,
    pub price: Price,
    pub quantity: Quantity,
    pub filled_quantity: Quantity,
    pub remaining_quantity: Quantity,
    /// Quantity-side coins still reserved
    pub remain_locked: Coin,
    /// Placement fee still reserved
    pub fee_locked: Coin,
    /// Fee paid at placement
    pub fee_paid: Coin,
    /// Fee handed back when the order left the book
    pub fee_received: Coin,
    pub status: OrderStatus,
    pub created_at: i64, // block time, unix nanos
    pub updated_at: i64,
    pub version: u64,
}

impl Order {
    /// Materialize a draft whose quantity lock and fee lock both succeeded
    pub fn from_draft(
        draft: OrderDraft,
        order_id: OrderId,
        fee: Coin,
        timestamp: i64,
    ) -> Result<Self, OrderError> {
        let remain_locked = draft.need_lock_coins()?;
        Ok(Self {
            order_id,
            sender: draft.sender,
            product: draft.product,
            side: draft.side,
            price: draft.price,
            quantity: draft.quantity,
            filled_quantity: Quantity::zero(),
            remaining_quantity: draft.quantity,
            remain_locked,
            fee_locked: fee.clone(),
            fee_received: Coin::zero(fee.denom.clone()),
            fee_paid: fee,
            status: OrderStatus::Open,
            created_at: timestamp,
            updated_at: timestamp,
            version: 0,
        })
    }

    /// Check quantity invariant: filled + remaining = total
    pub fn check_invariant(&self) -> bool {
        self.filled_quantity.as_decimal() + self.remaining_quantity.as_decimal()
            == self.quantity.as_decimal()
    }

    pub fn is_filled(&self) -> bool {
        self.filled_quantity == self.quantity
    }

    pub fn has_fills(&self) -> bool {
        !self.filled_quantity.is_zero()
    }

    /// price × quantity at the frozen limit price
    pub fn notional(&self) -> Result<Decimal, OrderError> {
        checked_notional(self.price, self.quantity)
    }

    /// price × filled quantity at the frozen limit price
    pub fn filled_notional(&self) -> Result<Decimal, OrderError> {
        checked_notional(self.price, self.filled_quantity)
    }

    /// Quantity-side coins that must be handed back when the order quits
    pub fn need_unlock_coins(&self) -> Coin {
        self.remain_locked.clone()
    }

    fn ensure_active(&self) -> Result<(), OrderError> {
        if self.status.is_terminal() {
            return Err(OrderError::AlreadyTerminal {
                status: self.status.to_string(),
            });
        }
        Ok(())
    }

    /// Record an execution against this order.
    ///
    /// The fill price must respect the limit: at or below it for a buy, at
    /// or above it for a sell. Returns the coins spent out of the quantity
    /// lock: the quote paid for a buy, the base delivered for a sell.
    /// Nothing is mutated on error.
    pub fn apply_fill(
        &mut self,
        fill_quantity: Quantity,
        fill_price: Price,
        timestamp: i64,
    ) -> Result<Coin, OrderError> {
        self.ensure_active()?;
        if fill_quantity.is_zero() {
            return Err(OrderError::InvalidFill {
                reason: "fill quantity must be positive".to_string(),
            });
        }
        let remaining = self
            .remaining_quantity
            .checked_sub(fill_quantity)
            .ok_or_else(|| OrderError::Overfill {
                fill: fill_quantity.to_string(),
                remaining: self.remaining_quantity.to_string(),
            })?;

        let crosses_limit = match self.side {
            Side::Buy => fill_price > self.price,
            Side::Sell => fill_price < self.price,
        };
        if crosses_limit {
            return Err(OrderError::InvalidFill {
                reason: format!(
                    "{} fill at {} is outside limit {}",
                    self.side, fill_price, self.price
                ),
            });
        }

        let spent_amount = match self.side {
            Side::Buy => checked_notional(fill_price, fill_quantity).map_err(|e| {
                OrderError::InvalidFill {
                    reason: e.to_string(),
                }
            })?,
            Side::Sell => fill_quantity.as_decimal(),
        };
        if spent_amount > self.remain_locked.amount {
            return Err(OrderError::InvalidFill {
                reason: format!(
                    "fill spends {} but only {} is locked",
                    spent_amount, self.remain_locked
                ),
            });
        }
        let spent = self.remain_locked.with_amount(spent_amount);

        self.filled_quantity = self.filled_quantity + fill_quantity;
        self.remaining_quantity = remaining;
        self.remain_locked = self.remain_locked.saturating_sub(spent_amount);
        self.status = if self.is_filled() {
            OrderStatus::Filled
        } else {
            OrderStatus::PartiallyFilled
        };
        self.touch(timestamp);

        debug_assert!(self.check_invariant(), "Invariant violated after fill");
        Ok(spent)
    }

    /// Move the order to Cancelled
    pub fn cancel(&mut self, timestamp: i64) -> Result<(), OrderError> {
        self.ensure_active()?;
        self.status = OrderStatus::Cancelled;
        self.touch(timestamp);
        Ok(())
    }

    /// Move the order to Expired
    pub fn expire(&mut self, timestamp: i64) -> Result<(), OrderError> {
        self.ensure_active()?;
        self.status = OrderStatus::Expired;
        self.touch(timestamp);
        Ok(())
    }

    pub fn record_receive_fee(&mut self, fee: Coin) {
        self.fee_received = fee;
    }

    /// Clear every remaining reservation; called once the coins are released
    pub fn unlock(&mut self) {
        self.remain_locked = Coin::zero(self.remain_locked.denom.clone());
        self.fee_locked = Coin::zero(self.fee_locked.denom.clone());
    }

    fn touch(&mut self, timestamp: i64) {
        self.updated_at = timestamp;
        self.version += 1;
    }
}
