//! Ledger store: deterministic key-value state for the order keeper
//!
//! The keeper reads and writes through the [`LedgerStore`] trait. The
//! in-memory [`MemoryStore`] backs tests and block-local working state; it
//! keeps every map ordered so the serialized state, and therefore the state
//! hash, is byte-identical across replays.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;
use types::fee::{FeeDetail, FeeType};
use types::ids::{Address, OrderId};
use types::numeric::Coin;
use types::order::Order;

use crate::codec::{decode_record, digest, encode_record};
use crate::errors::StoreError;

/// Storage seam consumed by the order keeper
pub trait LedgerStore {
    fn get_order(&self, id: &OrderId) -> Result<Option<Order>, StoreError>;

    /// Persist an order, replacing any previous record with the same ID.
    fn set_order(&mut self, order: &Order) -> Result<(), StoreError>;

    /// Every persisted order, in ID order.
    fn orders(&self) -> Result<Vec<Order>, StoreError>;

    /// Number of orders placed so far at `height`.
    fn block_order_num(&self, height: u64) -> u64;

    fn set_block_order_num(&mut self, height: u64, num: u64) -> Result<(), StoreError>;

    /// Add `fee` to the protocol's collected fees (or take it back when
    /// `is_refund` is set), tagged with the owner and the reason it was charged.
    fn add_collected_fees(
        &mut self,
        fee: &Coin,
        owner: &Address,
        reason: FeeType,
        is_refund: bool,
    ) -> Result<(), StoreError>;

    /// Collected-fee totals, one coin per denom.
    fn collected_fees(&self) -> Vec<Coin>;

    fn add_fee_detail(&mut self, detail: FeeDetail);

    /// Fee records of one owner, oldest first.
    fn fee_details(&self, owner: &Address) -> Vec<FeeDetail>;
}

/// In-memory ledger store
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MemoryStore {
    /// Encoded order records
    orders: BTreeMap<OrderId, Vec<u8>>,
    block_order_num: BTreeMap<u64, u64>,
    collected: BTreeMap<String, Decimal>,
    collected_by_reason: BTreeMap<(FeeType, String), Decimal>,
    fee_details: BTreeMap<Address, Vec<FeeDetail>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Collected fees charged for one reason.
    pub fn collected_for(&self, reason: FeeType, denom: &str) -> Decimal {
        self.collected_by_reason
            .get(&(reason, denom.to_string()))
            .copied()
            .unwrap_or(Decimal::ZERO)
    }

    pub fn order_count(&self) -> usize {
        self.orders.len()
    }

    /// SHA-256 over the canonical serialized store content.
    pub fn state_hash(&self) -> Result<String, StoreError> {
        let bytes = bincode::serialize(self).map_err(|e| StoreError::Codec(e.to_string()))?;
        Ok(digest(&bytes))
    }

    /// Overwrite a raw record; used to exercise corrupt-state handling.
    pub fn put_raw_order(&mut self, id: OrderId, bytes: Vec<u8>) {
        self.orders.insert(id, bytes);
    }

    fn decode(id: &OrderId, bytes: &[u8]) -> Result<Order, StoreError> {
        let order: Order = decode_record(bytes)?;
        if order.order_id != *id {
            return Err(StoreError::Corrupt {
                key: id.to_string(),
                reason: format!("record holds order {}", order.order_id),
            });
        }
        Ok(order)
    }
}

impl LedgerStore for MemoryStore {
    fn get_order(&self, id: &OrderId) -> Result<Option<Order>, StoreError> {
        self.orders
            .get(id)
            .map(|bytes| Self::decode(id, bytes))
            .transpose()
    }

    fn set_order(&mut self, order: &Order) -> Result<(), StoreError> {
        let bytes = encode_record(order)?;
        self.orders.insert(order.order_id, bytes);
        Ok(())
    }

    fn orders(&self) -> Result<Vec<Order>, StoreError> {
        self.orders
            .iter()
            .map(|(id, bytes)| Self::decode(id, bytes))
            .collect()
    }

    fn block_order_num(&self, height: u64) -> u64 {
        self.block_order_num.get(&height).copied().unwrap_or(0)
    }

    fn set_block_order_num(&mut self, height: u64, num: u64) -> Result<(), StoreError> {
        self.block_order_num.insert(height, num);
        Ok(())
    }

    fn add_collected_fees(
        &mut self,
        fee: &Coin,
        owner: &Address,
        reason: FeeType,
        is_refund: bool,
    ) -> Result<(), StoreError> {
        if fee.is_zero() {
            return Ok(());
        }
        let total = self.collected.get(&fee.denom).copied().unwrap_or(Decimal::ZERO);
        let by_reason = self.collected_for(reason, &fee.denom);
        let (total, by_reason) = if is_refund {
            if total < fee.amount || by_reason < fee.amount {
                return Err(StoreError::CollectedUnderflow {
                    denom: fee.denom.clone(),
                    available: total.min(by_reason).to_string(),
                    requested: fee.amount.to_string(),
                });
            }
            (total - fee.amount, by_reason - fee.amount)
        } else {
            (total + fee.amount, by_reason + fee.amount)
        };
        self.collected.insert(fee.denom.clone(), total);
        self.collected_by_reason
            .insert((reason, fee.denom.clone()), by_reason);
        debug!(owner = %owner, fee = %fee, reason = %reason, is_refund, "Collected fees updated");
        Ok(())
    }

    fn collected_fees(&self) -> Vec<Coin> {
        self.collected
            .iter()
            .map(|(denom, amount)| Coin {
                denom: denom.clone(),
                amount: *amount,
            })
            .collect()
    }

    fn add_fee_detail(&mut self, detail: FeeDetail) {
        self.fee_details
            .entry(detail.address.clone())
            .or_default()
            .push(detail);
    }

    fn fee_details(&self, owner: &Address) -> Vec<FeeDetail> {
        self.fee_details.get(owner).cloned().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use types::prelude::*;

    fn alice() -> Address {
        Address::new("alice").unwrap()
    }

    fn order(height: u64, seq: u64) -> Order {
        let draft = OrderDraft::new(
            alice(),
            Product::new("btc_usdt").unwrap(),
            Side::Sell,
            Price::from_u64(3).unwrap(),
            Quantity::from_u64(5),
        );
        let fee = Coin::new("usdt", Decimal::new(15, 3)).unwrap();
        Order::from_draft(draft, OrderId::new(height, seq), fee, 0).unwrap()
    }

    fn usdt(amount: Decimal) -> Coin {
        Coin::new("usdt", amount).unwrap()
    }

    #[test]
    fn test_order_set_and_get() {
        let mut store = MemoryStore::new();
        let o = order(1, 1);
        assert_eq!(store.get_order(&o.order_id).unwrap(), None);
        store.set_order(&o).unwrap();
        assert_eq!(store.get_order(&o.order_id).unwrap(), Some(o));
    }

    #[test]
    fn test_orders_listed_in_id_order() {
        let mut store = MemoryStore::new();
        store.set_order(&order(2, 1)).unwrap();
        store.set_order(&order(1, 10)).unwrap();
        store.set_order(&order(1, 9)).unwrap();
        let ids: Vec<_> = store.orders().unwrap().iter().map(|o| o.order_id).collect();
        assert_eq!(ids, vec![OrderId::new(1, 9), OrderId::new(1, 10), OrderId::new(2, 1)]);
    }

    #[test]
    fn test_corrupt_record_surfaces() {
        let mut store = MemoryStore::new();
        let bytes = encode_record(&order(1, 1)).unwrap();
        store.put_raw_order(OrderId::new(1, 2), bytes);
        let err = store.get_order(&OrderId::new(1, 2)).unwrap_err();
        assert!(matches!(err, StoreError::Corrupt { .. }));

        store.put_raw_order(OrderId::new(1, 3), vec![7, 0, 1]);
        assert!(store.orders().is_err());
    }

    #[test]
    fn test_block_counter_keyed_by_height() {
        let mut store = MemoryStore::new();
        assert_eq!(store.block_order_num(5), 0);
        store.set_block_order_num(5, 2).unwrap();
        assert_eq!(store.block_order_num(5), 2);
        assert_eq!(store.block_order_num(6), 0);
    }

    #[test]
    fn test_collected_fees_add_and_refund() {
        let mut store = MemoryStore::new();
        let fee = usdt(Decimal::new(8, 3));
        store
            .add_collected_fees(&fee, &alice(), FeeType::Cancel, false)
            .unwrap();
        assert_eq!(store.collected_fees(), vec![fee.clone()]);
        assert_eq!(store.collected_for(FeeType::Cancel, "usdt"), Decimal::new(8, 3));

        store
            .add_collected_fees(&fee, &alice(), FeeType::Cancel, true)
            .unwrap();
        assert_eq!(store.collected_fees()[0].amount, Decimal::ZERO);

        let err = store
            .add_collected_fees(&fee, &alice(), FeeType::Cancel, true)
            .unwrap_err();
        assert!(matches!(err, StoreError::CollectedUnderflow { .. }));
    }

    #[test]
    fn test_fee_details_per_owner() {
        let mut store = MemoryStore::new();
        let detail = FeeDetail {
            address: alice(),
            order_id: Some(OrderId::new(1, 1)),
            fee: usdt(Decimal::new(2, 2)),
            fee_type: FeeType::New,
            height: 1,
            timestamp: 0,
        };
        store.add_fee_detail(detail.clone());
        assert_eq!(store.fee_details(&alice()), vec![detail]);
        assert!(store.fee_details(&Address::new("bob").unwrap()).is_empty());
    }

    #[test]
    fn test_state_hash_changes_with_content() {
        let mut store = MemoryStore::new();
        let empty = store.state_hash().unwrap();
        store.set_order(&order(1, 1)).unwrap();
        assert_ne!(store.state_hash().unwrap(), empty);
        assert_eq!(store.state_hash().unwrap(), store.clone().state_hash().unwrap());
    }
}
