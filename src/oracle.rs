//! Price sourcing.
//!
//! The engine never invents a price. It asks a [`PriceOracle`] for the
//! current quote of a stock and settles buys at the ask and sells at the
//! bid. The engine is agnostic to where quotes come from; the in-memory
//! [`QuoteBoard`] is the default source and doubles as the test double,
//! since removing a quote looks exactly like a feed outage.

use crate::types::{Price, Side, StockId, Timestamp};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PriceError {
    #[error("no quote available for stock {0}")]
    NoQuote(StockId),
}

/// A two-sided quote for one stock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quote {
    /// Price the venue pays when a user sells.
    pub bid: Price,
    /// Price a user pays when buying.
    pub ask: Price,
    pub updated_at: Timestamp,
}

impl Quote {
    pub fn new(bid: Price, ask: Price, updated_at: Timestamp) -> Self {
        Self {
            bid,
            ask,
            updated_at,
        }
    }

    /// The side of the quote an order settles at.
    pub fn side_price(&self, side: Side) -> Price {
        match side {
            Side::Buy => self.ask,
            Side::Sell => self.bid,
        }
    }
}

/// Read access to current prices.
///
/// Implementors only provide [`PriceOracle::quote`]; per-side lookup is
/// derived from it.
pub trait PriceOracle {
    /// Latest quote for `stock`, or an error when none is known.
    fn quote(&self, stock: StockId) -> Result<Quote, PriceError>;

    /// Price at which an order on `side` would settle right now.
    fn price_for(&self, stock: StockId, side: Side) -> Result<Price, PriceError> {
        self.quote(stock).map(|q| q.side_price(side))
    }
}

/// Write access for whatever feeds quotes in.
pub trait QuoteSink {
    fn apply(&mut self, stock: StockId, quote: Quote);
}

/// In-memory oracle holding the latest quote per stock.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QuoteBoard {
    quotes: HashMap<StockId, Quote>,
}

impl QuoteBoard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drops the quote for `stock`, as if the feed went quiet.
    pub fn remove(&mut self, stock: StockId) -> Option<Quote> {
        self.quotes.remove(&stock)
    }

    pub fn len(&self) -> usize {
        self.quotes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.quotes.is_empty()
    }
}

impl PriceOracle for QuoteBoard {
    fn quote(&self, stock: StockId) -> Result<Quote, PriceError> {
        self.quotes
            .get(&stock)
            .copied()
            .ok_or(PriceError::NoQuote(stock))
    }
}

impl QuoteSink for QuoteBoard {
    fn apply(&mut self, stock: StockId, quote: Quote) {
        self.quotes.insert(stock, quote);
    }
}
