// 7.0: every state change produces an event. used for audit trails, state reconstruction,
// and driving the sim's narration. the EventPayload enum lists all event types.

use crate::order::Execution;
use crate::types::{Cash, OrderId, Price, Quantity, Side, StockId, Timestamp, UserId};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EventId(pub u64);

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub id: EventId,
    pub timestamp: Timestamp,
    pub payload: EventPayload,
}

impl Event {
    pub fn new(id: EventId, timestamp: Timestamp, payload: EventPayload) -> Self {
        Self {
            id,
            timestamp,
            payload,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum EventPayload {
    // Account events
    UserRegistered(UserRegisteredEvent),
    Deposit(DepositEvent),
    Withdrawal(WithdrawalEvent),
    WithdrawalRejected(WithdrawalRejectedEvent),

    // Catalog events
    StockListed(StockListedEvent),
    SupplyAdjusted(SupplyAdjustedEvent),

    // Price events
    QuoteUpdated(QuoteUpdatedEvent),

    // Order events
    OrderOpened(OrderOpenedEvent),
    OrderClosed(OrderClosedEvent),
    OrderCanceled(OrderCanceledEvent),

    // Sweep events
    SweepCompleted(SweepCompletedEvent),

    // Notification events
    NotificationFailed(NotificationFailedEvent),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserRegisteredEvent {
    pub user: UserId,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DepositEvent {
    pub user: UserId,
    pub amount: Cash,
    pub new_balance: Cash,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WithdrawalEvent {
    pub user: UserId,
    pub amount: Cash,
    pub new_balance: Cash,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WithdrawalRejectedEvent {
    pub user: UserId,
    pub amount: Cash,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockListedEvent {
    pub stock: StockId,
    pub symbol: String,
    pub supply: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SupplyAdjustedEvent {
    pub stock: StockId,
    pub new_supply: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuoteUpdatedEvent {
    pub stock: StockId,
    pub bid: Price,
    pub ask: Price,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderOpenedEvent {
    pub order: OrderId,
    pub user: UserId,
    pub stock: StockId,
    pub side: Side,
    pub quantity: Quantity,
    pub execution: Execution,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderClosedEvent {
    pub order: OrderId,
    pub user: UserId,
    pub stock: StockId,
    pub side: Side,
    pub quantity: Quantity,
    pub closing_price: Price,
    pub total: Cash,
    pub new_balance: Cash,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderCanceledEvent {
    pub order: OrderId,
    pub user: UserId,
    pub stock: StockId,
    pub reason: CancelReason,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CancelReason {
    /// The user withdrew the order before it settled.
    UserRequested,
    /// Settlement was attempted and the ledger rejected it.
    SettlementFailed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SweepCompletedEvent {
    pub evaluated: usize,
    pub closed: usize,
    pub canceled: usize,
    pub skipped: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationFailedEvent {
    pub order: OrderId,
    pub user: UserId,
    pub reason: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn order_closed_event_carries_settlement_detail() {
        let event = Event::new(
            EventId(1),
            Timestamp::from_millis(1_000),
            EventPayload::OrderClosed(OrderClosedEvent {
                order: OrderId(5),
                user: UserId(1),
                stock: StockId(2),
                side: Side::Buy,
                quantity: Quantity::new(3).unwrap(),
                closing_price: Price::new(dec!(20)).unwrap(),
                total: Cash::new(dec!(60)),
                new_balance: Cash::new(dec!(40)),
            }),
        );

        match event.payload {
            EventPayload::OrderClosed(closed) => {
                assert_eq!(closed.total, Cash::new(dec!(60)));
                assert_eq!(closed.new_balance, Cash::new(dec!(40)));
            }
            _ => panic!("wrong payload"),
        }
    }

    #[test]
    fn cancel_reasons_are_distinct() {
        assert_ne!(CancelReason::UserRequested, CancelReason::SettlementFailed);
    }
}
