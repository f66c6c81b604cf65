//! Order notifications.
//!
//! When an order reaches a terminal state the engine hands a notice to a
//! [`Notifier`]. Delivery is fire-and-forget: a failed notification is
//! logged and recorded as an event, but it never rolls back or blocks the
//! settlement that triggered it.

use crate::order::OrderStatus;
use crate::types::{Cash, OrderId, Price, Quantity, Side, StockId, UserId};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NotifyError {
    #[error("delivery failed: {0}")]
    Delivery(String),
}

/// Everything a channel needs to tell a user what happened to their order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderNotice {
    pub order: OrderId,
    pub user: UserId,
    pub stock: StockId,
    pub symbol: String,
    pub side: Side,
    pub quantity: Quantity,
    pub status: OrderStatus,
    /// Present only when the order closed.
    pub closing_price: Option<Price>,
    /// Balance after the transition.
    pub balance: Cash,
}

/// Delivery channel for order notices. Implementations decide the medium.
pub trait Notifier {
    fn notify(&mut self, notice: &OrderNotice) -> Result<(), NotifyError>;
}

/// Discards every notice. The default when nobody is listening.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullNotifier;

impl Notifier for NullNotifier {
    fn notify(&mut self, _notice: &OrderNotice) -> Result<(), NotifyError> {
        Ok(())
    }
}

/// Test channel that keeps every delivered notice and can be flipped into
/// a failing state to exercise the fire-and-forget path.
#[derive(Debug, Clone, Default)]
pub struct RecordingNotifier {
    notices: Vec<OrderNotice>,
    failing: bool,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_failing(&mut self, failing: bool) {
        self.failing = failing;
    }

    pub fn notices(&self) -> &[OrderNotice] {
        &self.notices
    }

    pub fn len(&self) -> usize {
        self.notices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notices.is_empty()
    }

    pub fn last(&self) -> Option<&OrderNotice> {
        self.notices.last()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&mut self, notice: &OrderNotice) -> Result<(), NotifyError> {
        if self.failing {
            return Err(NotifyError::Delivery("channel down".to_string()));
        }
        self.notices.push(notice.clone());
        Ok(())
    }
}
