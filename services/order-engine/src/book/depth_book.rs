//! Depth books for every product
//!
//! The depth book is a cache derived from the persisted orders: an order is
//! present iff it is Open or PartiallyFilled. It is never persisted and is
//! rebuilt from the store on restart.

use serde::Serialize;
use std::collections::BTreeMap;
use tracing::debug;
use types::ids::{OrderId, Product};
use types::numeric::Quantity;
use types::order::{Order, OrderStatus, Side};

use super::book_side::{BookSide, DepthLevel};
use super::price_level::BookEntry;
use crate::errors::BookError;

/// Book mutation paired with a persisted order transition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BookDelta {
    /// Newly placed order starts resting
    Insert,
    /// Remaining quantity changed after a partial fill
    Update,
    /// Order reached a terminal status
    Remove,
}

/// Read-only view of one product's book
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DepthSnapshot {
    pub product: Product,
    pub bids: Vec<DepthLevel>,
    pub asks: Vec<DepthLevel>,
}

/// Bid and ask sides of one product
#[derive(Debug, Clone, PartialEq)]
pub struct DepthBook {
    bids: BookSide,
    asks: BookSide,
}

impl DepthBook {
    pub fn new() -> Self {
        Self {
            bids: BookSide::new(Side::Buy),
            asks: BookSide::new(Side::Sell),
        }
    }

    pub fn side(&self, side: Side) -> &BookSide {
        match side {
            Side::Buy => &self.bids,
            Side::Sell => &self.asks,
        }
    }

    fn side_mut(&mut self, side: Side) -> &mut BookSide {
        match side {
            Side::Buy => &mut self.bids,
            Side::Sell => &mut self.asks,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.bids.is_empty() && self.asks.is_empty()
    }
}

impl Default for DepthBook {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DepthBooks {
    books: BTreeMap<Product, DepthBook>,
}

impl DepthBooks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start resting a non-terminal order
    pub fn insert(&mut self, order: &Order) -> Result<(), BookError> {
        let entry = BookEntry {
            order_id: order.order_id,
            sender: order.sender.clone(),
            remaining_quantity: order.remaining_quantity,
        };
        self.books
            .entry(order.product.clone())
            .or_default()
            .side_mut(order.side)
            .insert(order.price, entry)?;
        debug!(order_id = %order.order_id, product = %order.product, side = %order.side, price = %order.price, "Book insert");
        Ok(())
    }

    /// Stop resting an order; `reason` is the terminal status that ended it
    pub fn remove(
        &mut self,
        product: &Product,
        side: Side,
        order_id: &OrderId,
        reason: OrderStatus,
    ) -> Result<BookEntry, BookError> {
        let book = self
            .books
            .get_mut(product)
            .ok_or(BookError::UnknownOrder(*order_id))?;
        let entry = book.side_mut(side).remove(order_id)?;
        if book.is_empty() {
            self.books.remove(product);
        }
        debug!(order_id = %order_id, product = %product, side = %side, reason = %reason, "Book remove");
        Ok(entry)
    }

    pub fn update(
        &mut self,
        product: &Product,
        side: Side,
        order_id: &OrderId,
        remaining: Quantity,
    ) -> Result<(), BookError> {
        self.books
            .get_mut(product)
            .ok_or(BookError::UnknownOrder(*order_id))?
            .side_mut(side)
            .update(order_id, remaining)?;
        debug!(order_id = %order_id, remaining = %remaining, "Book update");
        Ok(())
    }

    /// Apply the book half of an order transition
    pub fn apply(&mut self, order: &Order, delta: BookDelta) -> Result<(), BookError> {
        match delta {
            BookDelta::Insert => self.insert(order),
            BookDelta::Update => self.update(
                &order.product,
                order.side,
                &order.order_id,
                order.remaining_quantity,
            ),
            BookDelta::Remove => self
                .remove(&order.product, order.side, &order.order_id, order.status)
                .map(|_| ()),
        }
    }

    pub fn contains(&self, product: &Product, side: Side, order_id: &OrderId) -> bool {
        self.books
            .get(product)
            .map(|book| book.side(side).contains(order_id))
            .unwrap_or(false)
    }

    pub fn book(&self, product: &Product) -> Option<&DepthBook> {
        self.books.get(product)
    }

    /// Top `depth` levels of each side
    pub fn snapshot(&self, product: &Product, depth: usize) -> DepthSnapshot {
        let (bids, asks) = match self.books.get(product) {
            Some(book) => (book.bids.depth(depth), book.asks.depth(depth)),
            None => (Vec::new(), Vec::new()),
        };
        DepthSnapshot {
            product: product.clone(),
            bids,
            asks,
        }
    }

    /// Resting order IDs of one side, best first
    pub fn priority_orders(&self, product: &Product, side: Side) -> Vec<OrderId> {
        self.books
            .get(product)
            .map(|book| book.side(side).priority_orders())
            .unwrap_or_default()
    }

    /// Total resting orders across all products
    pub fn order_count(&self) -> usize {
        self.books
            .values()
            .map(|b| b.bids.order_count() + b.asks.order_count())
            .sum()
    }

    pub fn products(&self) -> impl Iterator<Item = &Product> {
        self.books.keys()
    }
}
