//! Property tests over random order flows
//!
//! Each case drives the keeper through a random sequence of placements,
//! fills, cancels and expiries and checks after every step that:
//! - vault locks equal what the non-terminal orders still reserve
//! - every coin deposited is accounted for
//! - fees are never negative and refunds are locked minus owed
//! - book presence matches non-terminal status
//! - IDs strictly increase within a block
//! - terminal orders never change again
//! - fills outside the limit price are rejected and change nothing

use ledger::{LedgerStore, LockPurpose, MemoryStore, Vault};
use order_engine::{BlockContext, EngineConfig, EngineError, EngineEvent, OrderKeeper};
use proptest::prelude::*;
use rust_decimal::Decimal;
use std::collections::BTreeMap;
use types::prelude::*;

const TRADERS: [&str; 3] = ["alice", "bob", "carol"];
const DENOMS: [&str; 2] = ["btc", "usdt"];
const DEPOSIT: u64 = 1_000_000;

#[derive(Debug, Clone)]
enum Op {
    Place {
        trader: usize,
        buy: bool,
        price: u64,
        quantity: u64,
    },
    Fill {
        pick: usize,
        quantity: u64,
        /// Fill price relative to the limit, on either side of it
        offset: i64,
    },
    Cancel {
        pick: usize,
    },
    Expire {
        pick: usize,
    },
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => (0..TRADERS.len(), any::<bool>(), 1u64..20, 1u64..20).prop_map(
            |(trader, buy, price, quantity)| Op::Place { trader, buy, price, quantity }
        ),
        3 => (any::<usize>(), 1u64..12, -3i64..=3).prop_map(
            |(pick, quantity, offset)| Op::Fill { pick, quantity, offset }
        ),
        2 => any::<usize>().prop_map(|pick| Op::Cancel { pick }),
        1 => any::<usize>().prop_map(|pick| Op::Expire { pick }),
    ]
}

fn addr(name: &str) -> Address {
    Address::new(name).unwrap()
}

fn new_keeper() -> OrderKeeper<MemoryStore, Vault> {
    let mut vault = Vault::new();
    for trader in TRADERS {
        for denom in DENOMS {
            vault
                .deposit(&addr(trader), &Coin::new(denom, Decimal::from(DEPOSIT)).unwrap())
                .unwrap();
        }
    }
    OrderKeeper::new(MemoryStore::new(), vault, EngineConfig::default()).unwrap()
}

/// Apply one op; returns the coins a fill moved out of the quantity lock
fn apply(
    keeper: &mut OrderKeeper<MemoryStore, Vault>,
    placed: &mut Vec<OrderId>,
    ctx: &BlockContext,
    op: &Op,
) -> Result<Option<Coin>, TestCaseError> {
    match op {
        Op::Place {
            trader,
            buy,
            price,
            quantity,
        } => {
            let draft = OrderDraft::new(
                addr(TRADERS[*trader]),
                Product::new("btc_usdt").unwrap(),
                if *buy { Side::Buy } else { Side::Sell },
                Price::from_u64(*price).unwrap(),
                Quantity::from_u64(*quantity),
            );
            if let Ok(id) = keeper.place_order(ctx, draft) {
                placed.push(id);
            }
            Ok(None)
        }
        Op::Fill {
            pick,
            quantity,
            offset,
        } => {
            let Some(id) = placed.get(pick % placed.len().max(1)).copied() else {
                return Ok(None);
            };
            let before = keeper.store().get_order(&id).unwrap().unwrap();
            let limit = before.price.as_decimal();
            let shifted = limit + Decimal::from(*offset);
            let price = if shifted > Decimal::ZERO {
                Price::try_new(shifted).unwrap()
            } else {
                Price::try_new(limit / Decimal::from(2)).unwrap()
            };
            let crosses_limit = match before.side {
                Side::Buy => price > before.price,
                Side::Sell => price < before.price,
            };
            let qty = Quantity::from_u64(*quantity);

            let store_hash = keeper.store().state_hash().unwrap();
            let vault_hash = keeper.vault().state_hash().unwrap();
            match keeper.fill_order(ctx, &id, qty, price) {
                Ok(_) => {
                    prop_assert!(!crosses_limit, "fill at {} crossed limit {}", price, before.price);
                    let spent = match before.side {
                        Side::Buy => qty.as_decimal() * price.as_decimal(),
                        Side::Sell => qty.as_decimal(),
                    };
                    Ok(Some(before.remain_locked.with_amount(spent)))
                }
                Err(e) => {
                    prop_assert!(matches!(e, EngineError::InvalidOrder(_)), "unexpected {}", e);
                    let fillable = !before.status.is_terminal() && qty <= before.remaining_quantity;
                    if crosses_limit && fillable {
                        prop_assert!(matches!(
                            e,
                            EngineError::InvalidOrder(OrderError::InvalidFill { .. })
                        ), "expected InvalidFill, got {}", e);
                    }
                    prop_assert_eq!(keeper.store().state_hash().unwrap(), store_hash);
                    prop_assert_eq!(keeper.vault().state_hash().unwrap(), vault_hash);
                    Ok(None)
                }
            }
        }
        Op::Cancel { pick } => {
            if let Some(id) = placed.get(pick % placed.len().max(1)).copied() {
                let owner = keeper.store().get_order(&id).unwrap().unwrap().sender;
                let _ = keeper.cancel_order(ctx, &owner, &id);
            }
            Ok(None)
        }
        Op::Expire { pick } => {
            if let Some(id) = placed.get(pick % placed.len().max(1)).copied() {
                let _ = keeper.expire_order(ctx, &id);
            }
            Ok(None)
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_order_flows_keep_ledger_consistent(ops in proptest::collection::vec(op_strategy(), 1..80)) {
        let mut keeper = new_keeper();
        let mut placed: Vec<OrderId> = Vec::new();
        let mut spent: BTreeMap<String, Decimal> = BTreeMap::new();
        let mut terminal: BTreeMap<OrderId, Order> = BTreeMap::new();

        for (step, op) in ops.iter().enumerate() {
            let height = 1 + step as u64 / 4;
            let ctx = BlockContext::new(height, height as i64 * 1_000);
            if let Some(coin) = apply(&mut keeper, &mut placed, &ctx, op)? {
                *spent.entry(coin.denom.clone()).or_default() += coin.amount;
            }

            let orders = keeper.store().orders().unwrap();
            let vault = keeper.vault();

            // locks mirror what live orders reserve
            for trader in TRADERS {
                let owner = addr(trader);
                for denom in DENOMS {
                    let live = orders.iter().filter(|o| o.sender == owner && !o.status.is_terminal());
                    let quantity: Decimal = live
                        .clone()
                        .filter(|o| o.remain_locked.denom == denom)
                        .map(|o| o.remain_locked.amount)
                        .sum();
                    let fee: Decimal = live
                        .filter(|o| o.fee_locked.denom == denom)
                        .map(|o| o.fee_locked.amount)
                        .sum();
                    prop_assert_eq!(vault.locked(&owner, denom, LockPurpose::Quantity), quantity);
                    prop_assert_eq!(vault.locked(&owner, denom, LockPurpose::Fee), fee);
                }
            }

            // deposits = balances + fee pool + coins delivered in fills
            for denom in DENOMS {
                let held: Decimal = TRADERS.iter().map(|t| vault.total(&addr(t), denom)).sum();
                let delivered = spent.get(denom).copied().unwrap_or(Decimal::ZERO);
                prop_assert_eq!(
                    held + vault.fee_pool(denom) + delivered,
                    Decimal::from(DEPOSIT) * Decimal::from(TRADERS.len() as u64)
                );
            }

            for order in &orders {
                // book presence iff non-terminal
                let resting = keeper
                    .depth_books()
                    .contains(&order.product, order.side, &order.order_id);
                prop_assert_eq!(resting, !order.status.is_terminal());
                prop_assert!(order.check_invariant());
                prop_assert!(order.fee_received.amount >= Decimal::ZERO);

                if order.status.is_terminal() {
                    prop_assert!(order.remain_locked.is_zero());
                    prop_assert!(order.fee_locked.is_zero());
                    match terminal.get(&order.order_id) {
                        Some(frozen) => prop_assert_eq!(frozen, order),
                        None => {
                            terminal.insert(order.order_id, order.clone());
                        }
                    }
                }
            }
        }

        for event in keeper.events() {
            if let EngineEvent::OrderClosed { order_id, fee_charged, fee_refunded, .. } = event {
                let order = keeper.store().get_order(order_id).unwrap().unwrap();
                prop_assert!(fee_charged.amount >= Decimal::ZERO);
                prop_assert_eq!(
                    fee_refunded.amount,
                    (order.fee_paid.amount - fee_charged.amount).max(Decimal::ZERO)
                );
                prop_assert_eq!(&order.fee_received, fee_refunded);
            }
        }
        prop_assert!(!keeper.events().iter().any(|e| matches!(e, EngineEvent::AccountingAnomaly { .. })), "unexpected AccountingAnomaly event");

        // strictly increasing within each block, no reuse
        for pair in placed.windows(2) {
            prop_assert!(pair[0] < pair[1]);
            if pair[0].height() == pair[1].height() {
                prop_assert_eq!(pair[0].sequence() + 1, pair[1].sequence());
            }
        }
    }
}
