//! One side of a product's depth book
//!
//! Bids iterate price descending, asks ascending; both break ties by order
//! arrival. Price levels live in a `BTreeMap` for deterministic iteration,
//! and an ID index maps each resting order to its level.

use serde::Serialize;
use std::collections::BTreeMap;
use types::ids::OrderId;
use types::numeric::{Price, Quantity};
use types::order::Side;

use super::price_level::{BookEntry, PriceLevel};
use crate::errors::BookError;

/// Aggregated quantity at one price
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DepthLevel {
    pub price: Price,
    pub quantity: Quantity,
    pub order_count: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BookSide {
    side: Side,
    levels: BTreeMap<Price, PriceLevel>,
    index: BTreeMap<OrderId, Price>,
}

impl BookSide {
    pub fn new(side: Side) -> Self {
        Self {
            side,
            levels: BTreeMap::new(),
            index: BTreeMap::new(),
        }
    }

    pub fn side(&self) -> Side {
        self.side
    }

    pub fn insert(&mut self, price: Price, entry: BookEntry) -> Result<(), BookError> {
        let order_id = entry.order_id;
        if self.index.contains_key(&order_id) {
            return Err(BookError::DuplicateOrder(order_id));
        }
        self.levels.entry(price).or_default().insert(entry);
        self.index.insert(order_id, price);
        Ok(())
    }

    pub fn remove(&mut self, order_id: &OrderId) -> Result<BookEntry, BookError> {
        let price = self
            .index
            .remove(order_id)
            .ok_or(BookError::UnknownOrder(*order_id))?;
        let level = self
            .levels
            .get_mut(&price)
            .ok_or(BookError::UnknownOrder(*order_id))?;
        let entry = level
            .remove(order_id)
            .ok_or(BookError::UnknownOrder(*order_id))?;
        // Drop empty levels so depth never shows a zero row
        if level.is_empty() {
            self.levels.remove(&price);
        }
        Ok(entry)
    }

    /// Set the remaining quantity of a resting order after a partial fill
    pub fn update(&mut self, order_id: &OrderId, remaining: Quantity) -> Result<(), BookError> {
        if remaining.is_zero() {
            return Err(BookError::EmptyEntry(*order_id));
        }
        let price = self
            .index
            .get(order_id)
            .ok_or(BookError::UnknownOrder(*order_id))?;
        self.levels
            .get_mut(price)
            .and_then(|level| level.update_quantity(order_id, remaining))
            .map(|_| ())
            .ok_or(BookError::UnknownOrder(*order_id))
    }

    pub fn contains(&self, order_id: &OrderId) -> bool {
        self.index.contains_key(order_id)
    }

    /// Levels in matching priority
    pub fn priority_levels(&self) -> Box<dyn Iterator<Item = (&Price, &PriceLevel)> + '_> {
        match self.side {
            Side::Buy => Box::new(self.levels.iter().rev()),
            Side::Sell => Box::new(self.levels.iter()),
        }
    }

    /// Best price and the total quantity resting there
    pub fn best(&self) -> Option<(Price, Quantity)> {
        self.priority_levels()
            .next()
            .map(|(price, level)| (*price, level.total_quantity()))
    }

    /// Top `depth` levels in priority order
    pub fn depth(&self, depth: usize) -> Vec<DepthLevel> {
        self.priority_levels()
            .take(depth)
            .map(|(price, level)| DepthLevel {
                price: *price,
                quantity: level.total_quantity(),
                order_count: level.order_count(),
            })
            .collect()
    }

    /// Every resting order ID, best first
    pub fn priority_orders(&self) -> Vec<OrderId> {
        self.priority_levels()
            .flat_map(|(_, level)| level.entries().map(|e| e.order_id))
            .collect()
    }

    pub fn order_count(&self) -> usize {
        self.index.len()
    }

    pub fn level_count(&self) -> usize {
        self.levels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }
}
