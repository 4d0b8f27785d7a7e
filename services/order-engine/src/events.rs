//! Engine events
//!
//! Every lifecycle transition and every swallowed accounting failure leaves
//! an event, so operators can alert on what the keeper chose not to
//! propagate.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use types::ids::{Address, OrderId, Product};
use types::numeric::{Coin, Price, Quantity};
use types::order::{OrderStatus, Side};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EngineEvent {
    OrderPlaced {
        order_id: OrderId,
        sender: Address,
        product: Product,
        side: Side,
        price: Price,
        quantity: Quantity,
        locked: Coin,
        fee: Coin,
        height: u64,
    },
    OrderFilled {
        order_id: OrderId,
        fill_quantity: Quantity,
        fill_price: Price,
        filled_quantity: Quantity,
        remaining_quantity: Quantity,
        status: OrderStatus,
        height: u64,
    },
    OrderClosed {
        order_id: OrderId,
        status: OrderStatus,
        unlocked: Coin,
        fee_charged: Coin,
        fee_refunded: Coin,
        height: u64,
    },
    /// Owed fee exceeded the locked fee; the charge was capped
    AccountingAnomaly {
        order_id: OrderId,
        locked_fee: Coin,
        owed_fee: Coin,
        height: u64,
    },
    /// Owed fee could not be moved into the collected-fee pool
    CollectionFailed {
        order_id: OrderId,
        owner: Address,
        fee: Coin,
        reason: String,
        height: u64,
    },
}

impl EngineEvent {
    pub fn order_id(&self) -> OrderId {
        match self {
            EngineEvent::OrderPlaced { order_id, .. }
            | EngineEvent::OrderFilled { order_id, .. }
            | EngineEvent::OrderClosed { order_id, .. }
            | EngineEvent::AccountingAnomaly { order_id, .. }
            | EngineEvent::CollectionFailed { order_id, .. } => *order_id,
        }
    }
}

/// Bounded in-memory event log; the oldest events are dropped first
#[derive(Debug, Clone)]
pub struct EventLog {
    events: VecDeque<EngineEvent>,
    capacity: usize,
    dropped: u64,
}

impl EventLog {
    pub fn new(capacity: usize) -> Self {
        Self {
            events: VecDeque::new(),
            capacity: capacity.max(1),
            dropped: 0,
        }
    }

    pub fn push(&mut self, event: EngineEvent) {
        if self.events.len() == self.capacity {
            self.events.pop_front();
            self.dropped += 1;
        }
        self.events.push_back(event);
    }

    pub fn events(&self) -> &VecDeque<EngineEvent> {
        &self.events
    }

    pub fn drain(&mut self) -> Vec<EngineEvent> {
        self.events.drain(..).collect()
    }

    /// Events evicted to stay within capacity
    pub fn dropped(&self) -> u64 {
        self.dropped
    }
}
