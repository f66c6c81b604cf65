//! Order lifecycle types and the in-memory order store.
//!
//! An order is opened against a stock and stays open until it is settled
//! (closed) or canceled. Manual orders settle as soon as they are created;
//! conditional orders wait until their price trigger is met and are picked
//! up by the periodic sweep. Terminal orders are immutable: the status and
//! closing price can only be written through the transition methods here.

use crate::types::{
    OrderId, Price, Quantity, Side, StockId, Timestamp, TriggerKind, UserId, ValidationError,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

/// Lifecycle state of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderStatus {
    /// Awaiting settlement. The only state that accepts transitions.
    Open,
    /// Settled against the ledger at a recorded closing price.
    Closed,
    /// Withdrawn before settlement, either by the user or by a failed
    /// settlement attempt. No ledger movement happened.
    Canceled,
}

impl OrderStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Open)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Closed => "closed",
            Self::Canceled => "canceled",
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How an order reaches settlement.
///
/// A manual order settles immediately at the current quote. A conditional
/// order carries a trigger and a price limit and settles only once the
/// current quote satisfies the trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Execution {
    Manual,
    Conditional { kind: TriggerKind, limit: Price },
}

impl Execution {
    pub fn is_manual(&self) -> bool {
        matches!(self, Self::Manual)
    }

    pub fn is_conditional(&self) -> bool {
        matches!(self, Self::Conditional { .. })
    }

    pub fn price_limit(&self) -> Option<Price> {
        match self {
            Self::Manual => None,
            Self::Conditional { limit, .. } => Some(*limit),
        }
    }

    pub fn trigger_kind(&self) -> Option<TriggerKind> {
        match self {
            Self::Manual => None,
            Self::Conditional { kind, .. } => Some(*kind),
        }
    }
}

/// Attempted transition on an order that already reached a terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("order {order} is {status}, not open")]
pub struct NotOpen {
    pub order: OrderId,
    pub status: OrderStatus,
}

/// A single order against a stock.
///
/// `status` and `closing_price` are private so that every state change goes
/// through [`Order::close`] or [`Order::cancel`], which reject anything but
/// an open order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub user: UserId,
    pub stock: StockId,
    pub quantity: Quantity,
    pub side: Side,
    pub execution: Execution,
    status: OrderStatus,
    closing_price: Option<Price>,
    pub created_at: Timestamp,
    settled_at: Option<Timestamp>,
}

impl Order {
    pub fn new(
        id: OrderId,
        user: UserId,
        stock: StockId,
        quantity: Quantity,
        side: Side,
        execution: Execution,
        at: Timestamp,
    ) -> Self {
        Self {
            id,
            user,
            stock,
            quantity,
            side,
            execution,
            status: OrderStatus::Open,
            closing_price: None,
            created_at: at,
            settled_at: None,
        }
    }

    pub fn status(&self) -> OrderStatus {
        self.status
    }

    pub fn is_open(&self) -> bool {
        self.status == OrderStatus::Open
    }

    /// Price the order settled at, if it closed.
    pub fn closing_price(&self) -> Option<Price> {
        self.closing_price
    }

    /// When the order left the open state, if it has.
    pub fn settled_at(&self) -> Option<Timestamp> {
        self.settled_at
    }

    /// Whether the user may still withdraw the order.
    pub fn can_cancel(&self) -> bool {
        self.status == OrderStatus::Open
    }

    /// Whether the current quote satisfies the order's trigger.
    ///
    /// Manual orders have no trigger and never report ready; they settle at
    /// creation instead of through the sweep.
    pub fn trigger_met(&self, current: Price) -> bool {
        match self.execution {
            Execution::Manual => false,
            Execution::Conditional { kind, limit } => kind.is_met(limit, current),
        }
    }

    /// Marks the order settled at `price`. Fails unless the order is open.
    pub(crate) fn close(&mut self, price: Price, at: Timestamp) -> Result<(), NotOpen> {
        if self.status != OrderStatus::Open {
            return Err(NotOpen {
                order: self.id,
                status: self.status,
            });
        }
        self.status = OrderStatus::Closed;
        self.closing_price = Some(price);
        self.settled_at = Some(at);
        Ok(())
    }

    /// Withdraws the order without settlement. Fails unless the order is open.
    pub(crate) fn cancel(&mut self, at: Timestamp) -> Result<(), NotOpen> {
        if self.status != OrderStatus::Open {
            return Err(NotOpen {
                order: self.id,
                status: self.status,
            });
        }
        self.status = OrderStatus::Canceled;
        self.settled_at = Some(at);
        Ok(())
    }
}

/// Raw order payload as a client would submit it.
///
/// Side and trigger kind arrive as strings and are checked here, at the
/// boundary, so the rest of the engine only ever sees the closed enums.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderRequest {
    pub user_id: u64,
    pub stock_id: u32,
    pub quantity: u32,
    pub side: String,
    #[serde(default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub price_limit: Option<Decimal>,
    #[serde(default = "default_manual")]
    pub manual: bool,
}

fn default_manual() -> bool {
    true
}

impl OrderRequest {
    /// Validates the raw payload into a [`NewOrder`].
    ///
    /// Conditional requests must carry both a trigger kind and a price
    /// limit that is positive and within [`Price::MAX`]. Manual requests
    /// ignore both fields.
    pub fn validate(self) -> Result<NewOrder, ValidationError> {
        let quantity = Quantity::new(self.quantity).ok_or(ValidationError::ZeroQuantity)?;
        let side: Side = self.side.parse()?;
        let execution = if self.manual {
            Execution::Manual
        } else {
            let kind: TriggerKind = self
                .kind
                .as_deref()
                .ok_or(ValidationError::MissingKind)?
                .parse()?;
            let raw_limit = self.price_limit.ok_or(ValidationError::MissingPriceLimit)?;
            if raw_limit > Price::MAX.value() {
                return Err(ValidationError::PriceLimitOutOfRange(raw_limit));
            }
            let limit =
                Price::new(raw_limit).ok_or(ValidationError::InvalidPriceLimit(raw_limit))?;
            Execution::Conditional { kind, limit }
        };
        Ok(NewOrder {
            user: UserId(self.user_id),
            stock: StockId(self.stock_id),
            quantity,
            side,
            execution,
        })
    }
}

/// A validated order, ready to be opened by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NewOrder {
    pub user: UserId,
    pub stock: StockId,
    pub quantity: Quantity,
    pub side: Side,
    pub execution: Execution,
}

impl NewOrder {
    pub fn manual(user: UserId, stock: StockId, quantity: Quantity, side: Side) -> Self {
        Self {
            user,
            stock,
            quantity,
            side,
            execution: Execution::Manual,
        }
    }

    pub fn conditional(
        user: UserId,
        stock: StockId,
        quantity: Quantity,
        side: Side,
        kind: TriggerKind,
        limit: Price,
    ) -> Self {
        Self {
            user,
            stock,
            quantity,
            side,
            execution: Execution::Conditional { kind, limit },
        }
    }
}

/// In-memory store of every order the engine has seen, indexed by id and
/// by user. Terminal orders are kept for history and notification audit.
#[derive(Debug, Clone, Default)]
pub struct OrderStore {
    orders: HashMap<OrderId, Order>,
    by_user: HashMap<UserId, Vec<OrderId>>,
    next_id: u64,
}

impl OrderStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocates the next order id. Ids are unique for the life of the store.
    pub fn next_id(&mut self) -> OrderId {
        self.next_id += 1;
        OrderId(self.next_id)
    }

    pub fn insert(&mut self, order: Order) {
        self.by_user.entry(order.user).or_default().push(order.id);
        self.orders.insert(order.id, order);
    }

    pub fn get(&self, id: OrderId) -> Option<&Order> {
        self.orders.get(&id)
    }

    pub(crate) fn get_mut(&mut self, id: OrderId) -> Option<&mut Order> {
        self.orders.get_mut(&id)
    }

    /// All orders ever placed by `user`, oldest first.
    pub fn for_user(&self, user: UserId) -> Vec<&Order> {
        self.by_user
            .get(&user)
            .map(|ids| ids.iter().filter_map(|id| self.orders.get(id)).collect())
            .unwrap_or_default()
    }

    /// Snapshot of the open conditional orders, sorted by id so the sweep
    /// visits them in placement order.
    pub fn open_conditional_ids(&self) -> Vec<OrderId> {
        let mut ids: Vec<OrderId> = self
            .orders
            .values()
            .filter(|o| o.is_open() && o.execution.is_conditional())
            .map(|o| o.id)
            .collect();
        ids.sort();
        ids
    }

    pub fn open_count(&self) -> usize {
        self.orders.values().filter(|o| o.is_open()).count()
    }

    pub fn len(&self) -> usize {
        self.orders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Order> {
        self.orders.values()
    }
}
