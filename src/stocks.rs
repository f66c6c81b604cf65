//! Listed stocks and their metadata.
//!
//! The catalog only knows what a stock is. Tradable supply lives in the
//! ledger and quotes live on the quote board.

use crate::types::{StockId, Timestamp};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Stock {
    pub id: StockId,
    pub symbol: String,
    pub name: String,
    pub listed_at: Timestamp,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StockCatalog {
    stocks: HashMap<StockId, Stock>,
    next_id: u32,
}

impl StockCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_id(&mut self) -> StockId {
        self.next_id += 1;
        StockId(self.next_id)
    }

    pub fn insert(&mut self, stock: Stock) {
        self.stocks.insert(stock.id, stock);
    }

    pub fn get(&self, id: StockId) -> Option<&Stock> {
        self.stocks.get(&id)
    }

    pub fn contains(&self, id: StockId) -> bool {
        self.stocks.contains_key(&id)
    }

    /// Case-insensitive symbol lookup.
    pub fn by_symbol(&self, symbol: &str) -> Option<&Stock> {
        self.stocks
            .values()
            .find(|s| s.symbol.eq_ignore_ascii_case(symbol))
    }

    /// Every listed stock, sorted by id.
    pub fn all(&self) -> Vec<&Stock> {
        let mut stocks: Vec<&Stock> = self.stocks.values().collect();
        stocks.sort_by_key(|s| s.id);
        stocks
    }

    pub fn len(&self) -> usize {
        self.stocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stocks.is_empty()
    }
}
