//! Fee policy
//!
//! Two pure functions of the order: the fee reserved at placement and the
//! fee actually owed for the part of the order that traded. Both are charged
//! at the order's frozen limit price, so the owed fee can only grow with the
//! filled quantity and never passes the placement fee.

use rust_decimal::Decimal;
use types::errors::OrderError;
use types::ids::Product;
use types::numeric::{round_amount, Coin};
use types::order::{Order, OrderDraft};

use crate::config::EngineConfig;

#[derive(Debug, Clone, PartialEq)]
pub struct FeePolicy {
    rate: Decimal,
    denom: Option<String>,
    decimals: u32,
}

impl FeePolicy {
    pub fn new(rate: Decimal, denom: Option<String>, decimals: u32) -> Self {
        Self {
            rate,
            denom,
            decimals,
        }
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(config.fee_rate, config.fee_denom.clone(), config.fee_decimals)
    }

    pub fn rate(&self) -> Decimal {
        self.rate
    }

    /// Denom fees for `product` are charged in
    pub fn fee_denom(&self, product: &Product) -> String {
        match &self.denom {
            Some(denom) => denom.clone(),
            None => product.quote().to_string(),
        }
    }

    /// Fee reserved when the draft is placed: round(price × quantity × rate)
    pub fn placement_fee(&self, draft: &OrderDraft) -> Result<Coin, OrderError> {
        self.charge(&draft.product, draft.notional()?)
    }

    /// Fee owed for the traded part: round(price × filled × rate)
    pub fn cost_fee(&self, order: &Order) -> Result<Coin, OrderError> {
        self.charge(&order.product, order.filled_notional()?)
    }

    fn charge(&self, product: &Product, notional: Decimal) -> Result<Coin, OrderError> {
        let raw = notional
            .checked_mul(self.rate)
            .ok_or_else(|| OrderError::Overflow(format!("{} x {}", notional, self.rate)))?;
        Ok(Coin {
            denom: self.fee_denom(product),
            amount: round_amount(raw, self.decimals),
        })
    }
}
