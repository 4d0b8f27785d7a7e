//! Read-only query accessors
//!
//! Serve persisted orders, fee records and depth snapshots to an outer query
//! layer. Nothing here mutates state. Responses are plain serde types; the
//! caller picks the wire format.

use serde::{Deserialize, Serialize};
use types::fee::FeeDetail;
use types::ids::{Address, OrderId, Product};
use types::order::{Order, Side};

use ledger::store::LedgerStore;

use crate::book::{DepthBooks, DepthSnapshot};
use crate::errors::EngineError;

pub const DEFAULT_PAGE: i64 = 1;
pub const DEFAULT_PER_PAGE: i64 = 50;

/// Turn a 1-based page request into `(offset, limit)`.
///
/// `page < 1` reads the first page, `per_page < 1` uses the default size.
pub fn get_page(page: i64, per_page: i64) -> (usize, usize) {
    let page = if page < 1 { DEFAULT_PAGE } else { page };
    let per_page = if per_page < 1 { DEFAULT_PER_PAGE } else { per_page };
    let offset = (page - 1).saturating_mul(per_page);
    (
        usize::try_from(offset).unwrap_or(usize::MAX),
        usize::try_from(per_page).unwrap_or(usize::MAX),
    )
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParamPage {
    pub page: i64,
    pub per_page: i64,
    pub total: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListResponse<T> {
    pub data: Vec<T>,
    pub param_page: ParamPage,
}

impl<T> ListResponse<T> {
    /// Cut one page out of an already filtered and sorted list
    fn paginate(items: Vec<T>, page: i64, per_page: i64) -> Self {
        let total = items.len();
        let (offset, limit) = get_page(page, per_page);
        let data = items.into_iter().skip(offset).take(limit).collect();
        Self {
            data,
            param_page: ParamPage {
                page: page.max(DEFAULT_PAGE),
                per_page: if per_page < 1 { DEFAULT_PER_PAGE } else { per_page },
                total,
            },
        }
    }
}

/// Order list filter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderQuery {
    pub owner: Address,
    #[serde(default)]
    pub product: Option<Product>,
    #[serde(default)]
    pub side: Option<Side>,
    /// true: resting orders, false: terminal orders
    #[serde(default = "default_open")]
    pub open: bool,
    /// Placement time lower bound, inclusive
    #[serde(default)]
    pub start: i64,
    /// Placement time upper bound, exclusive; 0 means unbounded
    #[serde(default)]
    pub end: i64,
    /// Skip terminal orders that never traded (ignored for open orders)
    #[serde(default)]
    pub hide_no_fill: bool,
    #[serde(default = "default_page")]
    pub page: i64,
    #[serde(default = "default_per_page")]
    pub per_page: i64,
}

fn default_open() -> bool {
    true
}

fn default_page() -> i64 {
    DEFAULT_PAGE
}

fn default_per_page() -> i64 {
    DEFAULT_PER_PAGE
}

impl OrderQuery {
    pub fn open_orders(owner: Address) -> Self {
        Self {
            owner,
            product: None,
            side: None,
            open: true,
            start: 0,
            end: 0,
            hide_no_fill: false,
            page: DEFAULT_PAGE,
            per_page: DEFAULT_PER_PAGE,
        }
    }

    pub fn closed_orders(owner: Address) -> Self {
        Self {
            open: false,
            ..Self::open_orders(owner)
        }
    }

    fn matches(&self, order: &Order) -> bool {
        if order.sender != self.owner {
            return false;
        }
        if self.product.as_ref().is_some_and(|p| *p != order.product) {
            return false;
        }
        if self.side.is_some_and(|s| s != order.side) {
            return false;
        }
        if order.status.is_terminal() == self.open {
            return false;
        }
        if order.created_at < self.start || (self.end != 0 && order.created_at >= self.end) {
            return false;
        }
        !(self.hide_no_fill && !self.open && !order.has_fills())
    }
}

/// Orders of one owner, newest first
pub fn query_orders<S: LedgerStore>(
    store: &S,
    query: &OrderQuery,
) -> Result<ListResponse<Order>, EngineError> {
    let mut orders: Vec<Order> = store
        .orders()?
        .into_iter()
        .filter(|o| query.matches(o))
        .collect();
    orders.sort_by(|a, b| b.order_id.cmp(&a.order_id));
    Ok(ListResponse::paginate(orders, query.page, query.per_page))
}

/// Fee records of one owner, newest first
pub fn query_fee_details<S: LedgerStore>(
    store: &S,
    owner: &Address,
    page: i64,
    per_page: i64,
) -> ListResponse<FeeDetail> {
    let mut details = store.fee_details(owner);
    details.reverse();
    ListResponse::paginate(details, page, per_page)
}

/// Top `size` levels of each side of a product's book
pub fn query_depth(books: &DepthBooks, product: &Product, size: usize) -> DepthSnapshot {
    books.snapshot(product, size)
}

pub fn query_order<S: LedgerStore>(store: &S, order_id: &OrderId) -> Result<Order, EngineError> {
    store
        .get_order(order_id)?
        .ok_or(EngineError::OrderNotFound(*order_id))
}
