//! Price level implementation with time-priority ordering
//!
//! A price level holds every resting order at one price. Entries are keyed
//! by `OrderId`, whose ordering (block height, then sequence in block) is the
//! arrival order, so iteration is FIFO and removal by ID is O(log n).

use serde::Serialize;
use std::collections::BTreeMap;
use types::ids::{Address, OrderId};
use types::numeric::Quantity;

/// Lightweight reference to a resting order
///
/// The order itself lives in the ledger store; the book only keeps what
/// matching and quotation need.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BookEntry {
    pub order_id: OrderId,
    pub sender: Address,
    pub remaining_quantity: Quantity,
}

/// All resting orders at a specific price
#[derive(Debug, Clone, PartialEq)]
pub struct PriceLevel {
    orders: BTreeMap<OrderId, BookEntry>,
    total_quantity: Quantity,
}

impl PriceLevel {
    pub fn new() -> Self {
        Self {
            orders: BTreeMap::new(),
            total_quantity: Quantity::zero(),
        }
    }

    /// Add an entry; returns false if the ID is already present
    pub fn insert(&mut self, entry: BookEntry) -> bool {
        if self.orders.contains_key(&entry.order_id) {
            return false;
        }
        self.total_quantity = self.total_quantity + entry.remaining_quantity;
        self.orders.insert(entry.order_id, entry);
        true
    }

    /// Remove an entry by ID
    pub fn remove(&mut self, order_id: &OrderId) -> Option<BookEntry> {
        let entry = self.orders.remove(order_id)?;
        self.total_quantity = self
            .total_quantity
            .checked_sub(entry.remaining_quantity)
            .unwrap_or_else(Quantity::zero);
        Some(entry)
    }

    /// Replace an entry's remaining quantity, returning the previous one
    pub fn update_quantity(&mut self, order_id: &OrderId, quantity: Quantity) -> Option<Quantity> {
        let entry = self.orders.get_mut(order_id)?;
        let previous = entry.remaining_quantity;
        entry.remaining_quantity = quantity;
        self.total_quantity = self
            .total_quantity
            .checked_sub(previous)
            .unwrap_or_else(Quantity::zero)
            + quantity;
        Some(previous)
    }

    /// Oldest entry at this price
    pub fn front(&self) -> Option<&BookEntry> {
        self.orders.values().next()
    }

    /// Entries in time priority
    pub fn entries(&self) -> impl Iterator<Item = &BookEntry> {
        self.orders.values()
    }

    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }

    pub fn total_quantity(&self) -> Quantity {
        self.total_quantity
    }

    pub fn order_count(&self) -> usize {
        self.orders.len()
    }
}

impl Default for PriceLevel {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn entry(height: u64, seq: u64, qty: &str) -> BookEntry {
        BookEntry {
            order_id: OrderId::new(height, seq),
            sender: Address::new("alice").unwrap(),
            remaining_quantity: Quantity::from_str(qty).unwrap(),
        }
    }

    #[test]
    fn test_price_level_insert() {
        let mut level = PriceLevel::new();
        assert!(level.insert(entry(1, 1, "1.5")));
        assert_eq!(level.order_count(), 1);
        assert_eq!(level.total_quantity(), Quantity::from_str("1.5").unwrap());
        assert!(!level.is_empty());
    }

    #[test]
    fn test_price_level_rejects_duplicate() {
        let mut level = PriceLevel::new();
        assert!(level.insert(entry(1, 1, "1")));
        assert!(!level.insert(entry(1, 1, "5")));
        assert_eq!(level.total_quantity(), Quantity::from_u64(1));
    }

    #[test]
    fn test_price_level_time_priority() {
        let mut level = PriceLevel::new();
        // inserted out of arrival order
        level.insert(entry(2, 1, "3"));
        level.insert(entry(1, 10, "2"));
        level.insert(entry(1, 9, "1"));

        let ids: Vec<_> = level.entries().map(|e| e.order_id).collect();
        assert_eq!(ids, vec![OrderId::new(1, 9), OrderId::new(1, 10), OrderId::new(2, 1)]);
        assert_eq!(level.front().unwrap().order_id, OrderId::new(1, 9));
    }

    #[test]
    fn test_price_level_remove() {
        let mut level = PriceLevel::new();
        level.insert(entry(1, 1, "1.0"));
        level.insert(entry(1, 2, "2.0"));

        let removed = level.remove(&OrderId::new(1, 1)).unwrap();
        assert_eq!(removed.remaining_quantity, Quantity::from_u64(1));
        assert_eq!(level.order_count(), 1);
        assert_eq!(level.total_quantity(), Quantity::from_u64(2));
        assert!(level.remove(&OrderId::new(1, 1)).is_none());
    }

    #[test]
    fn test_price_level_update_quantity() {
        let mut level = PriceLevel::new();
        level.insert(entry(1, 1, "5.0"));
        level.insert(entry(1, 2, "1.0"));

        let previous = level
            .update_quantity(&OrderId::new(1, 1), Quantity::from_u64(3))
            .unwrap();
        assert_eq!(previous, Quantity::from_u64(5));
        assert_eq!(level.total_quantity(), Quantity::from_u64(4));
        assert!(level
            .update_quantity(&OrderId::new(9, 9), Quantity::from_u64(1))
            .is_none());
    }
}
