//! Order lifecycle: creation, settlement, cancellation.

use super::core::Engine;
use super::results::EngineError;
use crate::events::{
    CancelReason, EventPayload, OrderCanceledEvent, OrderClosedEvent, OrderOpenedEvent,
};
use crate::ledger::{LedgerError, SettlementTransfer};
use crate::notify::Notifier;
use crate::oracle::PriceOracle;
use crate::order::{NewOrder, NotOpen, Order, OrderRequest};
use crate::types::{OrderId, Side};
use tracing::info;

impl<O: PriceOracle, N: Notifier> Engine<O, N> {
    /// Validates a raw client payload and opens the order.
    pub fn submit_order(&mut self, request: OrderRequest) -> Result<Order, EngineError> {
        let new_order = request.validate()?;
        self.create_order(new_order)
    }

    /// Opens an order. Manual orders settle as part of creation; conditional
    /// orders stay open for the sweep.
    pub fn create_order(&mut self, new_order: NewOrder) -> Result<Order, EngineError> {
        if !self.ledger.has_account(new_order.user) {
            return Err(EngineError::UserNotFound(new_order.user));
        }
        if !self.catalog.contains(new_order.stock) {
            return Err(EngineError::StockNotFound(new_order.stock));
        }

        // Affordability gate for buys: checked against the price limit when
        // there is one, otherwise against the current ask. Sells always pass.
        if new_order.side == Side::Buy {
            let required_price = match new_order.execution.price_limit() {
                Some(limit) => limit,
                None => self.oracle.price_for(new_order.stock, Side::Buy)?,
            };
            let required = new_order.quantity.notional(required_price);
            let balance = self.ledger.balance_of(new_order.user)?;
            if required.value() > balance.value() {
                return Err(EngineError::Ledger(LedgerError::InsufficientBalance {
                    requested: required,
                    available: balance,
                }));
            }
        }

        // Availability gate: buys against the tradable supply, sells against
        // the user's inventory. Both are rechecked at settlement, since either
        // can drain while a conditional order waits.
        let quantity = new_order.quantity.value();
        match new_order.side {
            Side::Buy => {
                let available = self.ledger.available_supply(new_order.stock)?;
                if quantity > available {
                    return Err(EngineError::Ledger(LedgerError::InsufficientSupply {
                        stock: new_order.stock,
                        requested: quantity,
                        available,
                    }));
                }
            }
            Side::Sell => {
                let held = self.ledger.holding(new_order.user, new_order.stock);
                if quantity > held {
                    return Err(EngineError::Ledger(LedgerError::InsufficientInventory {
                        stock: new_order.stock,
                        requested: quantity,
                        held,
                    }));
                }
            }
        }

        let id = self.orders.next_id();
        let order = Order::new(
            id,
            new_order.user,
            new_order.stock,
            new_order.quantity,
            new_order.side,
            new_order.execution,
            self.current_time,
        );
        self.orders.insert(order);
        self.emit_event(EventPayload::OrderOpened(OrderOpenedEvent {
            order: id,
            user: new_order.user,
            stock: new_order.stock,
            side: new_order.side,
            quantity: new_order.quantity,
            execution: new_order.execution,
        }));

        if new_order.execution.is_manual() {
            return self.close_order(id);
        }

        self.orders
            .get(id)
            .cloned()
            .ok_or(EngineError::OrderNotFound(id))
    }

    /// Settles an open order at the current quote.
    ///
    /// The ledger applies the whole settlement or none of it. When the
    /// ledger rejects it, the order is canceled, the user is notified, and
    /// the returned error reports the cancellation. When no quote is
    /// available nothing happens and the order stays open.
    pub fn close_order(&mut self, id: OrderId) -> Result<Order, EngineError> {
        let (user, stock, side, quantity) = {
            let order = self.orders.get(id).ok_or(EngineError::OrderNotFound(id))?;
            if !order.is_open() {
                return Err(NotOpen {
                    order: id,
                    status: order.status(),
                }
                .into());
            }
            (order.user, order.stock, order.side, order.quantity)
        };

        // No price, no settlement.
        let price = self.oracle.price_for(stock, side)?;

        let transfer = SettlementTransfer {
            user,
            stock,
            side,
            quantity,
            price,
        };
        let total = transfer.total();

        match self.ledger.settle(transfer) {
            Ok(new_balance) => {
                let now = self.current_time;
                let snapshot = {
                    let order = self.orders.get_mut(id).ok_or(EngineError::OrderNotFound(id))?;
                    order.close(price, now)?;
                    order.clone()
                };
                self.emit_event(EventPayload::OrderClosed(OrderClosedEvent {
                    order: id,
                    user,
                    stock,
                    side,
                    quantity,
                    closing_price: price,
                    total,
                    new_balance,
                }));
                self.notify_order(&snapshot);
                Ok(snapshot)
            }
            Err(cause) => {
                let now = self.current_time;
                let snapshot = {
                    let order = self.orders.get_mut(id).ok_or(EngineError::OrderNotFound(id))?;
                    order.cancel(now)?;
                    order.clone()
                };
                self.emit_event(EventPayload::OrderCanceled(OrderCanceledEvent {
                    order: id,
                    user,
                    stock,
                    reason: CancelReason::SettlementFailed,
                }));
                info!(order = %id, cause = %cause, "settlement failed, order canceled");
                self.notify_order(&snapshot);
                Err(EngineError::Canceled { order: id, cause })
            }
        }
    }

    /// Withdraws an open order at the user's request. Nothing moves in the
    /// ledger. Fails on orders that already reached a terminal state.
    pub fn cancel_order(&mut self, id: OrderId) -> Result<Order, EngineError> {
        let now = self.current_time;
        let snapshot = {
            let order = self.orders.get_mut(id).ok_or(EngineError::OrderNotFound(id))?;
            order.cancel(now)?;
            order.clone()
        };
        self.emit_event(EventPayload::OrderCanceled(OrderCanceledEvent {
            order: id,
            user: snapshot.user,
            stock: snapshot.stock,
            reason: CancelReason::UserRequested,
        }));
        self.notify_order(&snapshot);
        Ok(snapshot)
    }

    /// Whether the order can still be withdrawn.
    pub fn can_cancel_order(&self, id: OrderId) -> Result<bool, EngineError> {
        let order = self.orders.get(id).ok_or(EngineError::OrderNotFound(id))?;
        Ok(order.can_cancel())
    }

    /// Whether the order's trigger is satisfied at the current quote.
    ///
    /// False for manual orders, for orders no longer open, and when no quote
    /// is available. Only an unknown id is an error.
    pub fn is_ready_to_close(&self, id: OrderId) -> Result<bool, EngineError> {
        let order = self.orders.get(id).ok_or(EngineError::OrderNotFound(id))?;
        if !order.is_open() {
            return Ok(false);
        }
        match self.oracle.price_for(order.stock, order.side) {
            Ok(current) => Ok(order.trigger_met(current)),
            Err(_) => Ok(false),
        }
    }
}
