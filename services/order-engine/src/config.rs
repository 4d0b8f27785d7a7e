//! Engine configuration
//!
//! Loaded once at node start; every validating node must run with the same
//! values or fee figures diverge.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::errors::EngineError;

/// Blocks an order may rest before it is swept by scheduled expiry
pub const DEFAULT_ORDER_EXPIRE_BLOCKS: u64 = 259_200;

/// Largest scale rust_decimal can round fee amounts to without loss
pub const MAX_FEE_DECIMALS: u32 = 18;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Fee charged per unit of notional, e.g. 0.001 = 0.1%
    pub fee_rate: Decimal,
    /// Denom fees are charged in; `None` charges the product's quote asset
    pub fee_denom: Option<String>,
    /// Decimal places fee amounts are rounded to
    pub fee_decimals: u32,
    /// 0 disables scheduled expiry
    pub order_expire_blocks: u64,
    /// Engine events kept in memory before the oldest are dropped
    pub max_events: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            fee_rate: Decimal::new(1, 3),
            fee_denom: None,
            fee_decimals: 8,
            order_expire_blocks: DEFAULT_ORDER_EXPIRE_BLOCKS,
            max_events: 100_000,
        }
    }
}

impl EngineConfig {
    /// Parse and validate a JSON configuration.
    ///
    /// Decimal fields are written as strings (`"fee_rate": "0.001"`); missing
    /// fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self, EngineError> {
        let config: EngineConfig = serde_json::from_str(json)
            .map_err(|e| EngineError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), EngineError> {
        if self.fee_rate < Decimal::ZERO || self.fee_rate >= Decimal::ONE {
            return Err(EngineError::Config(format!(
                "fee_rate must be in [0, 1), got {}",
                self.fee_rate
            )));
        }
        if self.fee_decimals > MAX_FEE_DECIMALS {
            return Err(EngineError::Config(format!(
                "fee_decimals must be at most {}, got {}",
                MAX_FEE_DECIMALS, self.fee_decimals
            )));
        }
        if let Some(denom) = &self.fee_denom {
            if denom.trim().is_empty() {
                return Err(EngineError::Config("fee_denom must not be blank".to_string()));
            }
        }
        if self.max_events == 0 {
            return Err(EngineError::Config("max_events must be positive".to_string()));
        }
        Ok(())
    }
}
