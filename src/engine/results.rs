// 8.4: result types and errors for engine operations.

use crate::ledger::LedgerError;
use crate::oracle::PriceError;
use crate::order::NotOpen;
use crate::types::{OrderId, StockId, UserId, ValidationError};

/// What one sweep pass did.
#[derive(Debug, Clone, Default)]
pub struct SweepReport {
    /// Open conditional orders visited.
    pub evaluated: usize,
    /// Orders settled this pass.
    pub closed: Vec<OrderId>,
    /// Orders whose settlement failed and were canceled this pass.
    pub canceled: Vec<OrderId>,
    /// Orders left open: trigger unmet, quote missing, or gone mid-pass.
    pub skipped: usize,
}

impl SweepReport {
    /// True when the pass left every visited order untouched.
    pub fn is_quiet(&self) -> bool {
        self.closed.is_empty() && self.canceled.is_empty()
    }
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum EngineError {
    #[error("User {0:?} not found")]
    UserNotFound(UserId),

    #[error("Stock {0:?} not found")]
    StockNotFound(StockId),

    #[error("Order {0:?} not found")]
    OrderNotFound(OrderId),

    #[error("{0}")]
    NotOpen(#[from] NotOpen),

    #[error("Invalid order request: {0}")]
    Validation(#[from] ValidationError),

    #[error("Ledger rejected the operation: {0}")]
    Ledger(#[from] LedgerError),

    #[error("Price unavailable: {0}")]
    Price(#[from] PriceError),

    /// Settlement was attempted and failed, so the order was canceled.
    /// The cancellation has already happened when this is returned.
    #[error("Order {order:?} was canceled: {cause}")]
    Canceled { order: OrderId, cause: LedgerError },
}
