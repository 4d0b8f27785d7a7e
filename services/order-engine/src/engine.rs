//! Order keeper
//!
//! Coordinates the balance lock manager, the ledger store, the fee policy
//! and the depth books through every order transition: place, fill, cancel
//! and expire. Transitions run one at a time inside block processing, so
//! the keeper takes `&mut self` and holds no locks of its own.
//!
//! Each transition works on an owned copy of the order and ends in
//! [`OrderKeeper::commit`], which persists the order and applies the matching
//! book delta together. Nothing is written back if a transition is rejected.

use ledger::store::LedgerStore;
use ledger::vault::{LockManager, LockPurpose};
use std::collections::VecDeque;
use tracing::{error, info, warn};
use types::errors::OrderError;
use types::fee::{FeeDetail, FeeType};
use types::ids::{Address, OrderId};
use types::numeric::{Coin, Price, Quantity};
use types::order::{Order, OrderDraft, OrderStatus};

use crate::book::{BookDelta, DepthBooks};
use crate::config::EngineConfig;
use crate::context::BlockContext;
use crate::errors::EngineError;
use crate::events::{EngineEvent, EventLog};
use crate::fee::FeePolicy;

/// Why an order leaves the book
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuitReason {
    Cancel,
    Expire,
    /// Traded out completely
    Deal,
}

impl QuitReason {
    fn fee_type(self) -> FeeType {
        match self {
            QuitReason::Cancel => FeeType::Cancel,
            QuitReason::Expire => FeeType::Expire,
            QuitReason::Deal => FeeType::Deal,
        }
    }
}

pub struct OrderKeeper<S: LedgerStore, L: LockManager> {
    store: S,
    vault: L,
    books: DepthBooks,
    fees: FeePolicy,
    config: EngineConfig,
    events: EventLog,
}

impl<S: LedgerStore, L: LockManager> OrderKeeper<S, L> {
    /// Create a keeper over empty depth books
    pub fn new(store: S, vault: L, config: EngineConfig) -> Result<Self, EngineError> {
        config.validate()?;
        info!(
            fee_rate = %config.fee_rate,
            fee_decimals = config.fee_decimals,
            order_expire_blocks = config.order_expire_blocks,
            "Order keeper started"
        );
        Ok(Self {
            store,
            vault,
            books: DepthBooks::new(),
            fees: FeePolicy::from_config(&config),
            events: EventLog::new(config.max_events),
            config,
        })
    }

    /// Create a keeper and rebuild the depth books from the store's
    /// non-terminal orders
    pub fn restore(store: S, vault: L, config: EngineConfig) -> Result<Self, EngineError> {
        let mut keeper = Self::new(store, vault, config)?;
        let orders = keeper.store.orders()?;
        let mut resting = 0usize;
        for order in orders.iter().filter(|o| !o.status.is_terminal()) {
            keeper.books.insert(order)?;
            resting += 1;
        }
        info!(orders = orders.len(), resting, "Depth books rebuilt from store");
        Ok(keeper)
    }

    // ── Placement ────────────────────────────────────────────────────────────

    /// Reserve funds and fee for a draft, assign its ID, persist it and
    /// start resting it in the book.
    ///
    /// If the fee lock fails after the quantity lock succeeded, the error
    /// carries the stranded quantity coins; see [`Self::release_stranded`].
    pub fn place_order(
        &mut self,
        ctx: &BlockContext,
        draft: OrderDraft,
    ) -> Result<OrderId, EngineError> {
        let priced = draft.validate().and_then(|()| {
            let need = draft.need_lock_coins()?;
            let fee = self.fees.placement_fee(&draft)?;
            Ok((need, fee))
        });
        let (need, fee) = match priced {
            Ok(priced) => priced,
            Err(e) => {
                warn!(sender = %draft.sender, product = %draft.product, error = %e, "Order rejected");
                return Err(e.into());
            }
        };

        if let Err(source) = self
            .vault
            .lock_coins(&draft.sender, &need, LockPurpose::Quantity)
        {
            warn!(sender = %draft.sender, coin = %need, error = %source, "Quantity lock failed");
            return Err(EngineError::FundsUnavailable {
                source,
                stranded: None,
            });
        }

        if let Err(source) = self.vault.lock_coins(&draft.sender, &fee, LockPurpose::Fee) {
            warn!(
                sender = %draft.sender,
                fee = %fee,
                stranded = %need,
                error = %source,
                "Fee lock failed after quantity lock"
            );
            return Err(EngineError::FundsUnavailable {
                source,
                stranded: Some(need),
            });
        }

        let order_id = self.next_order_id(ctx)?;
        let order = Order::from_draft(draft, order_id, fee.clone(), ctx.time)?;
        self.store.add_fee_detail(FeeDetail {
            address: order.sender.clone(),
            order_id: Some(order_id),
            fee: fee.clone(),
            fee_type: FeeType::New,
            height: ctx.height,
            timestamp: ctx.time,
        });
        self.commit(&order, BookDelta::Insert)?;

        info!(
            order_id = %order_id,
            sender = %order.sender,
            product = %order.product,
            side = %order.side,
            price = %order.price,
            quantity = %order.quantity,
            fee = %fee,
            "Order placed"
        );
        self.events.push(EngineEvent::OrderPlaced {
            order_id,
            sender: order.sender.clone(),
            product: order.product.clone(),
            side: order.side,
            price: order.price,
            quantity: order.quantity,
            locked: need,
            fee,
            height: ctx.height,
        });
        Ok(order_id)
    }

    /// Hand back quantity coins left locked by a placement whose fee lock
    /// failed
    pub fn release_stranded(&mut self, owner: &Address, coin: &Coin) -> Result<(), EngineError> {
        self.vault
            .unlock_coins(owner, coin, LockPurpose::Quantity)
            .map_err(|source| EngineError::FundsUnavailable {
                source,
                stranded: None,
            })?;
        info!(owner = %owner, coin = %coin, "Stranded quantity lock released");
        Ok(())
    }

    /// Read-modify-write of the block's order counter
    fn next_order_id(&mut self, ctx: &BlockContext) -> Result<OrderId, EngineError> {
        let next = self.store.block_order_num(ctx.height) + 1;
        self.store.set_block_order_num(ctx.height, next)?;
        Ok(OrderId::new(ctx.height, next))
    }

    // ── Fills ────────────────────────────────────────────────────────────────

    /// Record an execution reported by the matching component.
    ///
    /// The filled share of the quantity lock is spent. A partial fill updates
    /// the book entry; a full fill settles the order like a quit with reason
    /// `Deal`. Returns the order's status after the fill.
    pub fn fill_order(
        &mut self,
        ctx: &BlockContext,
        order_id: &OrderId,
        fill_quantity: Quantity,
        fill_price: Price,
    ) -> Result<OrderStatus, EngineError> {
        let mut order = self.load(order_id)?;
        let spent = order.apply_fill(fill_quantity, fill_price, ctx.time)?;
        self.vault
            .spend_locked_coins(&order.sender, &spent, LockPurpose::Quantity)
            .map_err(|source| {
                error!(order_id = %order_id, coin = %spent, error = %source, "Filled coins not locked");
                EngineError::FundsUnavailable {
                    source,
                    stranded: None,
                }
            })?;

        self.events.push(EngineEvent::OrderFilled {
            order_id: *order_id,
            fill_quantity,
            fill_price,
            filled_quantity: order.filled_quantity,
            remaining_quantity: order.remaining_quantity,
            status: order.status,
            height: ctx.height,
        });
        info!(
            order_id = %order_id,
            fill_quantity = %fill_quantity,
            fill_price = %fill_price,
            remaining = %order.remaining_quantity,
            "Order filled"
        );

        let status = order.status;
        if status == OrderStatus::Filled {
            self.quit_order(ctx, order, QuitReason::Deal)?;
        } else {
            self.commit(&order, BookDelta::Update)?;
        }
        Ok(status)
    }

    // ── Quit ─────────────────────────────────────────────────────────────────

    /// Cancel on behalf of the order's owner; returns the fee charged
    pub fn cancel_order(
        &mut self,
        ctx: &BlockContext,
        sender: &Address,
        order_id: &OrderId,
    ) -> Result<Coin, EngineError> {
        let order = self.load(order_id)?;
        if order.sender != *sender {
            warn!(order_id = %order_id, sender = %sender, "Cancel by non-owner rejected");
            return Err(EngineError::NotOwner {
                order_id: *order_id,
                sender: sender.clone(),
            });
        }
        self.quit_order(ctx, order, QuitReason::Cancel)
    }

    /// Expire an order; returns the fee charged
    pub fn expire_order(&mut self, ctx: &BlockContext, order_id: &OrderId) -> Result<Coin, EngineError> {
        let order = self.load(order_id)?;
        self.quit_order(ctx, order, QuitReason::Expire)
    }

    /// Expire every order that has rested `order_expire_blocks` blocks.
    ///
    /// Orders placed at `ctx.height - order_expire_blocks` are found through
    /// that height's order counter. Returns `(order, fee charged)` in ID order.
    pub fn expire_orders(&mut self, ctx: &BlockContext) -> Result<Vec<(OrderId, Coin)>, EngineError> {
        let blocks = self.config.order_expire_blocks;
        if blocks == 0 || ctx.height <= blocks {
            return Ok(Vec::new());
        }
        let placed_at = ctx.height - blocks;
        let count = self.store.block_order_num(placed_at);
        let mut expired = Vec::new();
        for sequence in 1..=count {
            let order_id = OrderId::new(placed_at, sequence);
            match self.store.get_order(&order_id)? {
                Some(order) if !order.status.is_terminal() => {
                    let fee = self.quit_order(ctx, order, QuitReason::Expire)?;
                    expired.push((order_id, fee));
                }
                _ => {}
            }
        }
        if !expired.is_empty() {
            info!(height = ctx.height, placed_at, count = expired.len(), "Expired orders swept");
        }
        Ok(expired)
    }

    fn quit_order(
        &mut self,
        ctx: &BlockContext,
        mut order: Order,
        reason: QuitReason,
    ) -> Result<Coin, EngineError> {
        let transition = match reason {
            QuitReason::Cancel => order.cancel(ctx.time),
            QuitReason::Expire => order.expire(ctx.time),
            QuitReason::Deal if order.status == OrderStatus::Filled => Ok(()),
            QuitReason::Deal => Err(OrderError::InvalidFill {
                reason: format!("order is {}, not filled", order.status),
            }),
        };
        let cost = transition.and_then(|()| self.fees.cost_fee(&order));
        let cost = match cost {
            Ok(cost) => cost,
            Err(e) => {
                warn!(order_id = %order.order_id, error = %e, "Quit rejected");
                return Err(e.into());
            }
        };
        self.settle(ctx, order, cost, reason)
    }

    /// Release every reservation of an order that just turned terminal,
    /// charge the owed fee and take the order out of the book.
    ///
    /// Only a failed commit is propagated. Unlock, collection and fee
    /// accounting failures are logged and the settlement carries on.
    fn settle(
        &mut self,
        ctx: &BlockContext,
        mut order: Order,
        cost: Coin,
        reason: QuitReason,
    ) -> Result<Coin, EngineError> {
        let owner = order.sender.clone();
        let order_id = order.order_id;

        let unlock = order.need_unlock_coins();
        if let Err(e) = self.vault.unlock_coins(&owner, &unlock, LockPurpose::Quantity) {
            error!(order_id = %order_id, coin = %unlock, error = %e, "Quantity unlock failed");
        }

        let locked_fee = order.fee_locked.clone();
        let (owed, refund) = self.reconcile_fee(ctx, &order, &locked_fee, cost);
        if let Err(e) = self.vault.unlock_coins(&owner, &locked_fee, LockPurpose::Fee) {
            error!(order_id = %order_id, coin = %locked_fee, error = %e, "Fee unlock failed");
        }

        order.record_receive_fee(refund.clone());
        self.store.add_fee_detail(FeeDetail {
            address: owner.clone(),
            order_id: Some(order_id),
            fee: refund.clone(),
            fee_type: FeeType::Receive,
            height: ctx.height,
            timestamp: ctx.time,
        });
        self.collect(ctx, &order, &owed, reason);

        order.unlock();
        self.commit(&order, BookDelta::Remove)?;

        info!(
            order_id = %order_id,
            status = %order.status,
            unlocked = %unlock,
            fee_charged = %owed,
            fee_refunded = %refund,
            "Order closed"
        );
        self.events.push(EngineEvent::OrderClosed {
            order_id,
            status: order.status,
            unlocked: unlock,
            fee_charged: owed.clone(),
            fee_refunded: refund,
            height: ctx.height,
        });
        Ok(owed)
    }

    /// Split the locked fee into (owed, refund). Owed above locked is an
    /// accounting anomaly: the charge is capped and nothing is refunded.
    fn reconcile_fee(
        &mut self,
        ctx: &BlockContext,
        order: &Order,
        locked: &Coin,
        cost: Coin,
    ) -> (Coin, Coin) {
        if cost.denom == locked.denom && cost.amount <= locked.amount {
            let refund = locked.saturating_sub(cost.amount);
            return (cost, refund);
        }
        error!(
            order_id = %order.order_id,
            locked_fee = %locked,
            owed_fee = %cost,
            "Owed fee exceeds locked fee"
        );
        self.events.push(EngineEvent::AccountingAnomaly {
            order_id: order.order_id,
            locked_fee: locked.clone(),
            owed_fee: cost,
            height: ctx.height,
        });
        (locked.clone(), Coin::zero(locked.denom.clone()))
    }

    /// Move the owed fee into the fee pool and the collected-fee record.
    /// Failures are reported, never rolled back.
    fn collect(&mut self, ctx: &BlockContext, order: &Order, owed: &Coin, reason: QuitReason) {
        if owed.is_zero() {
            return;
        }
        let result = self
            .vault
            .collect_fee(&order.sender, owed)
            .map_err(|e| e.to_string())
            .and_then(|()| {
                self.store
                    .add_collected_fees(owed, &order.sender, reason.fee_type(), false)
                    .map_err(|e| e.to_string())
            });
        if let Err(cause) = result {
            error!(
                order_id = %order.order_id,
                owner = %order.sender,
                fee = %owed,
                error = %cause,
                "Fee collection failed"
            );
            self.events.push(EngineEvent::CollectionFailed {
                order_id: order.order_id,
                owner: order.sender.clone(),
                fee: owed.clone(),
                reason: cause,
                height: ctx.height,
            });
        }
    }

    // ── Persistence ──────────────────────────────────────────────────────────

    fn load(&self, order_id: &OrderId) -> Result<Order, EngineError> {
        self.store
            .get_order(order_id)?
            .ok_or(EngineError::OrderNotFound(*order_id))
    }

    /// Persist the order and apply its book delta as one step.
    ///
    /// The book delta is applied even if persisting fails, so the book and
    /// the in-flight order never disagree; the store error is then returned
    /// as fatal.
    fn commit(&mut self, order: &Order, delta: BookDelta) -> Result<(), EngineError> {
        let persisted = self.store.set_order(order);
        let booked = self.books.apply(order, delta);
        if let Err(e) = &persisted {
            error!(order_id = %order.order_id, error = %e, "Order persist failed");
        }
        if let Err(e) = &booked {
            error!(order_id = %order.order_id, error = %e, "Book update failed");
        }
        persisted?;
        booked?;
        Ok(())
    }

    // ── Accessors ────────────────────────────────────────────────────────────

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    pub fn vault(&self) -> &L {
        &self.vault
    }

    pub fn vault_mut(&mut self) -> &mut L {
        &mut self.vault
    }

    pub fn depth_books(&self) -> &DepthBooks {
        &self.books
    }

    pub fn fee_policy(&self) -> &FeePolicy {
        &self.fees
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn events(&self) -> &VecDeque<EngineEvent> {
        self.events.events()
    }

    pub fn drain_events(&mut self) -> Vec<EngineEvent> {
        self.events.drain()
    }
}
