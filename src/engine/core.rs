// 8.1 engine/core.rs: main engine. holds the catalog, ledger, order store, and
// the injected price oracle and notifier. every mutation funnels through
// &mut self, so operations are serialized by construction.

use super::config::EngineConfig;
use super::results::EngineError;
use crate::events::{
    DepositEvent, Event, EventId, EventPayload, NotificationFailedEvent, QuoteUpdatedEvent,
    StockListedEvent, SupplyAdjustedEvent, UserRegisteredEvent, WithdrawalEvent,
    WithdrawalRejectedEvent,
};
use crate::ledger::{Ledger, UserAccount};
use crate::notify::{Notifier, OrderNotice};
use crate::oracle::{PriceOracle, Quote, QuoteSink};
use crate::order::{Order, OrderStore};
use crate::stocks::{Stock, StockCatalog};
use crate::types::{Cash, OrderId, Price, StockId, Timestamp, UserId};
use tracing::warn;

/** 8.1: main engine struct. all state lives here */
#[derive(Debug)]
pub struct Engine<O: PriceOracle, N: Notifier> {
    pub(super) config: EngineConfig,
    pub(super) catalog: StockCatalog,
    pub(super) ledger: Ledger,
    pub(super) orders: OrderStore,
    pub(super) oracle: O,
    pub(super) notifier: N,
    pub(super) events: Vec<Event>,
    pub(super) next_event_id: u64,
    pub(super) next_user_id: u64,
    pub(super) current_time: Timestamp,
    pub(super) last_sweep: Option<Timestamp>,
}

impl<O: PriceOracle, N: Notifier> Engine<O, N> {
    pub fn new(config: EngineConfig, oracle: O, notifier: N) -> Self {
        Self {
            config,
            catalog: StockCatalog::new(),
            ledger: Ledger::new(),
            orders: OrderStore::new(),
            oracle,
            notifier,
            events: Vec::new(),
            next_event_id: 1,
            next_user_id: 0,
            current_time: Timestamp::from_millis(0),
            last_sweep: None,
        }
    }

    pub fn set_time(&mut self, timestamp: Timestamp) {
        self.current_time = timestamp;
    }

    pub fn time(&self) -> Timestamp {
        self.current_time
    }

    pub fn advance_time(&mut self, millis: i64) {
        self.current_time = Timestamp::from_millis(self.current_time.as_millis() + millis);
    }

    // Users.

    pub fn register_user(&mut self, name: &str) -> UserId {
        self.next_user_id += 1;
        let user = UserId(self.next_user_id);
        self.ledger.open_account(user, name, self.current_time);
        self.emit_event(EventPayload::UserRegistered(UserRegisteredEvent {
            user,
            name: name.to_string(),
        }));
        user
    }

    pub fn account(&self, user: UserId) -> Option<&UserAccount> {
        self.ledger.account(user)
    }

    pub fn balance_of(&self, user: UserId) -> Result<Cash, EngineError> {
        self.ledger
            .balance_of(user)
            .map_err(|_| EngineError::UserNotFound(user))
    }

    pub fn deposit(&mut self, user: UserId, amount: Cash) -> Result<Cash, EngineError> {
        if !self.ledger.has_account(user) {
            return Err(EngineError::UserNotFound(user));
        }
        let new_balance = self.ledger.deposit(user, amount)?;
        self.emit_event(EventPayload::Deposit(DepositEvent {
            user,
            amount,
            new_balance,
        }));
        Ok(new_balance)
    }

    pub fn withdraw(&mut self, user: UserId, amount: Cash) -> Result<Cash, EngineError> {
        if !self.ledger.has_account(user) {
            return Err(EngineError::UserNotFound(user));
        }
        match self.ledger.withdraw(user, amount) {
            Ok(new_balance) => {
                self.emit_event(EventPayload::Withdrawal(WithdrawalEvent {
                    user,
                    amount,
                    new_balance,
                }));
                Ok(new_balance)
            }
            Err(e) => {
                // Rejections still land on the audit trail.
                self.emit_event(EventPayload::WithdrawalRejected(WithdrawalRejectedEvent {
                    user,
                    amount,
                    reason: e.to_string(),
                }));
                Err(e.into())
            }
        }
    }

    // Catalog and supply.

    pub fn list_stock(&mut self, symbol: &str, name: &str, supply: u32) -> StockId {
        let id = self.catalog.next_id();
        self.catalog.insert(Stock {
            id,
            symbol: symbol.to_string(),
            name: name.to_string(),
            listed_at: self.current_time,
        });
        self.ledger.register_supply(id, supply);
        self.emit_event(EventPayload::StockListed(StockListedEvent {
            stock: id,
            symbol: symbol.to_string(),
            supply,
        }));
        id
    }

    pub fn stock(&self, id: StockId) -> Option<&Stock> {
        self.catalog.get(id)
    }

    pub fn stock_by_symbol(&self, symbol: &str) -> Option<&Stock> {
        self.catalog.by_symbol(symbol)
    }

    pub fn stocks(&self) -> Vec<&Stock> {
        self.catalog.all()
    }

    pub fn available_quantity(&self, stock: StockId) -> Result<u32, EngineError> {
        self.ledger
            .available_supply(stock)
            .map_err(|_| EngineError::StockNotFound(stock))
    }

    pub fn set_available_quantity(
        &mut self,
        stock: StockId,
        quantity: u32,
    ) -> Result<(), EngineError> {
        if !self.catalog.contains(stock) {
            return Err(EngineError::StockNotFound(stock));
        }
        let new_supply = self.ledger.set_supply(stock, quantity)?;
        self.emit_event(EventPayload::SupplyAdjusted(SupplyAdjustedEvent {
            stock,
            new_supply,
        }));
        Ok(())
    }

    pub fn holding(&self, user: UserId, stock: StockId) -> u32 {
        self.ledger.holding(user, stock)
    }

    pub fn holdings_of(&self, user: UserId) -> Vec<(StockId, u32)> {
        self.ledger.holdings_of(user)
    }

    pub fn can_buy(&self, stock: StockId, quantity: u32) -> bool {
        self.ledger.can_buy(stock, quantity)
    }

    pub fn can_sell(&self, user: UserId, stock: StockId, quantity: u32) -> bool {
        self.ledger.can_sell(user, stock, quantity)
    }

    // Orders (lifecycle operations live in engine/orders.rs).

    pub fn order(&self, id: OrderId) -> Option<&Order> {
        self.orders.get(id)
    }

    pub fn orders_for(&self, user: UserId) -> Vec<&Order> {
        self.orders.for_user(user)
    }

    pub fn open_order_count(&self) -> usize {
        self.orders.open_count()
    }

    /// How many open orders the next sweep will look at.
    pub fn open_conditional_count(&self) -> usize {
        self.orders.open_conditional_ids().len()
    }

    // Injected components.

    pub fn oracle(&self) -> &O {
        &self.oracle
    }

    pub fn oracle_mut(&mut self) -> &mut O {
        &mut self.oracle
    }

    pub fn notifier(&self) -> &N {
        &self.notifier
    }

    pub fn notifier_mut(&mut self) -> &mut N {
        &mut self.notifier
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    // Events.

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn recent_events(&self, count: usize) -> &[Event] {
        let start = self.events.len().saturating_sub(count);
        &self.events[start..]
    }

    pub(super) fn emit_event(&mut self, payload: EventPayload) {
        let event = Event::new(EventId(self.next_event_id), self.current_time, payload);
        self.next_event_id += 1;

        if self.config.verbose {
            println!("[Event {}] {:?}", event.id.0, event.payload);
        }

        self.events.push(event);

        if self.events.len() > self.config.max_events {
            let drain_count = self.events.len() - self.config.max_events;
            self.events.drain(0..drain_count);
        }
    }

    /// Delivers a terminal-state notice for `order`. Failures are logged and
    /// recorded as events; they never propagate to the settlement path.
    pub(super) fn notify_order(&mut self, order: &Order) {
        let symbol = self
            .catalog
            .get(order.stock)
            .map(|s| s.symbol.clone())
            .unwrap_or_default();
        let balance = self.ledger.balance_of(order.user).unwrap_or(Cash::zero());
        let notice = OrderNotice {
            order: order.id,
            user: order.user,
            stock: order.stock,
            symbol,
            side: order.side,
            quantity: order.quantity,
            status: order.status(),
            closing_price: order.closing_price(),
            balance,
        };
        if let Err(e) = self.notifier.notify(&notice) {
            warn!(order = %order.id, user = %order.user, error = %e, "order notification failed");
            self.emit_event(EventPayload::NotificationFailed(NotificationFailedEvent {
                order: order.id,
                user: order.user,
                reason: e.to_string(),
            }));
        }
    }
}

impl<O: PriceOracle + QuoteSink, N: Notifier> Engine<O, N> {
    /// Feeds a fresh two-sided quote into the oracle.
    pub fn update_quote(
        &mut self,
        stock: StockId,
        bid: Price,
        ask: Price,
    ) -> Result<(), EngineError> {
        if !self.catalog.contains(stock) {
            return Err(EngineError::StockNotFound(stock));
        }
        let quote = Quote::new(bid, ask, self.current_time);
        self.oracle.apply(stock, quote);
        self.emit_event(EventPayload::QuoteUpdated(QuoteUpdatedEvent {
            stock,
            bid,
            ask,
        }));
        Ok(())
    }
}
