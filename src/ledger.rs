//! The ledger: cash balances, share inventory, and tradable supply.
//!
//! Every movement of money or shares in the system goes through here, and
//! nothing else writes these books. Debits fail closed: a withdrawal, an
//! inventory draw, or a supply draw that exceeds what is held returns an
//! error and leaves the books untouched. Share credits fail closed the same
//! way when they would overflow a counter. Settlement of an order is a
//! single call that validates every leg before applying any of them, so a
//! failed settlement cannot leave money moved and shares unmoved.

use crate::types::{Cash, Price, Quantity, Side, StockId, Timestamp, UserId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    #[error("no account for user {0}")]
    UnknownAccount(UserId),

    #[error("no supply entry for stock {0}")]
    UnknownStock(StockId),

    #[error("insufficient balance: requested {requested}, available {available}")]
    InsufficientBalance { requested: Cash, available: Cash },

    #[error("insufficient inventory of stock {stock}: requested {requested}, held {held}")]
    InsufficientInventory {
        stock: StockId,
        requested: u32,
        held: u32,
    },

    #[error("insufficient supply of stock {stock}: requested {requested}, available {available}")]
    InsufficientSupply {
        stock: StockId,
        requested: u32,
        available: u32,
    },

    #[error("supply of stock {stock} would overflow: {available} + {requested}")]
    SupplyOverflow {
        stock: StockId,
        requested: u32,
        available: u32,
    },

    #[error("inventory of stock {stock} would overflow: {held} + {requested}")]
    InventoryOverflow {
        stock: StockId,
        requested: u32,
        held: u32,
    },
}

/// A user's cash account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserAccount {
    pub id: UserId,
    pub name: String,
    pub balance: Cash,
    pub total_deposited: Cash,
    pub total_withdrawn: Cash,
    pub created_at: Timestamp,
}

impl UserAccount {
    pub fn new(id: UserId, name: &str, timestamp: Timestamp) -> Self {
        Self {
            id,
            name: name.to_string(),
            balance: Cash::zero(),
            total_deposited: Cash::zero(),
            total_withdrawn: Cash::zero(),
            created_at: timestamp,
        }
    }

    pub fn deposit(&mut self, amount: Cash) {
        self.balance = self.balance.add(amount);
        self.total_deposited = self.total_deposited.add(amount);
    }

    pub fn withdraw(&mut self, amount: Cash) -> Result<(), LedgerError> {
        if amount.value() > self.balance.value() {
            return Err(LedgerError::InsufficientBalance {
                requested: amount,
                available: self.balance,
            });
        }
        self.balance = self.balance.sub(amount);
        self.total_withdrawn = self.total_withdrawn.add(amount);
        Ok(())
    }
}

/// One settlement, described before any book is touched.
///
/// A buy debits cash and supply and credits inventory; a sell debits
/// inventory and credits cash and supply. Either all legs apply or none do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SettlementTransfer {
    pub user: UserId,
    pub stock: StockId,
    pub side: Side,
    pub quantity: Quantity,
    pub price: Price,
}

impl SettlementTransfer {
    /// Cash value of the transfer at its settlement price.
    pub fn total(&self) -> Cash {
        self.quantity.notional(self.price)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Ledger {
    accounts: HashMap<UserId, UserAccount>,
    inventory: HashMap<(UserId, StockId), u32>,
    supply: HashMap<StockId, u32>,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    // Accounts.

    /// Opens a cash account for `user`. Returns false if one already exists.
    pub fn open_account(&mut self, user: UserId, name: &str, timestamp: Timestamp) -> bool {
        if self.accounts.contains_key(&user) {
            return false;
        }
        self.accounts.insert(user, UserAccount::new(user, name, timestamp));
        true
    }

    pub fn has_account(&self, user: UserId) -> bool {
        self.accounts.contains_key(&user)
    }

    pub fn account(&self, user: UserId) -> Option<&UserAccount> {
        self.accounts.get(&user)
    }

    pub fn balance_of(&self, user: UserId) -> Result<Cash, LedgerError> {
        self.accounts
            .get(&user)
            .map(|a| a.balance)
            .ok_or(LedgerError::UnknownAccount(user))
    }

    /// Credits `amount` to the user's balance. Returns the new balance.
    pub fn deposit(&mut self, user: UserId, amount: Cash) -> Result<Cash, LedgerError> {
        let account = self
            .accounts
            .get_mut(&user)
            .ok_or(LedgerError::UnknownAccount(user))?;
        account.deposit(amount);
        Ok(account.balance)
    }

    /// Debits `amount` from the user's balance. Fails closed when the
    /// balance does not cover it. Returns the new balance.
    pub fn withdraw(&mut self, user: UserId, amount: Cash) -> Result<Cash, LedgerError> {
        let account = self
            .accounts
            .get_mut(&user)
            .ok_or(LedgerError::UnknownAccount(user))?;
        account.withdraw(amount)?;
        Ok(account.balance)
    }

    // Supply.

    /// Seeds the tradable supply for a newly listed stock.
    pub fn register_supply(&mut self, stock: StockId, quantity: u32) {
        self.supply.insert(stock, quantity);
    }

    pub fn has_supply_entry(&self, stock: StockId) -> bool {
        self.supply.contains_key(&stock)
    }

    pub fn available_supply(&self, stock: StockId) -> Result<u32, LedgerError> {
        self.supply
            .get(&stock)
            .copied()
            .ok_or(LedgerError::UnknownStock(stock))
    }

    /// Overwrites the tradable supply for `stock`.
    pub fn set_supply(&mut self, stock: StockId, quantity: u32) -> Result<u32, LedgerError> {
        let entry = self
            .supply
            .get_mut(&stock)
            .ok_or(LedgerError::UnknownStock(stock))?;
        *entry = quantity;
        Ok(*entry)
    }

    /// Credits shares back to the tradable supply. Fails closed when the
    /// counter would overflow.
    pub fn add_supply(&mut self, stock: StockId, quantity: u32) -> Result<u32, LedgerError> {
        let entry = self
            .supply
            .get_mut(&stock)
            .ok_or(LedgerError::UnknownStock(stock))?;
        let next = entry
            .checked_add(quantity)
            .ok_or(LedgerError::SupplyOverflow {
                stock,
                requested: quantity,
                available: *entry,
            })?;
        *entry = next;
        Ok(next)
    }

    /// Draws `quantity` from the tradable supply. Fails closed.
    pub fn subtract_supply(&mut self, stock: StockId, quantity: u32) -> Result<u32, LedgerError> {
        let entry = self
            .supply
            .get_mut(&stock)
            .ok_or(LedgerError::UnknownStock(stock))?;
        if quantity > *entry {
            return Err(LedgerError::InsufficientSupply {
                stock,
                requested: quantity,
                available: *entry,
            });
        }
        *entry -= quantity;
        Ok(*entry)
    }

    // Inventory.

    /// Shares of `stock` held by `user`. Zero when no row exists.
    pub fn holding(&self, user: UserId, stock: StockId) -> u32 {
        self.inventory.get(&(user, stock)).copied().unwrap_or(0)
    }

    /// Every non-empty holding of `user`, sorted by stock id.
    pub fn holdings_of(&self, user: UserId) -> Vec<(StockId, u32)> {
        let mut rows: Vec<(StockId, u32)> = self
            .inventory
            .iter()
            .filter(|((u, _), _)| *u == user)
            .map(|((_, s), qty)| (*s, *qty))
            .collect();
        rows.sort();
        rows
    }

    /// Credits shares to the user's inventory, creating the row on first
    /// buy. Fails closed when the count would overflow.
    pub fn add_inventory(
        &mut self,
        user: UserId,
        stock: StockId,
        quantity: u32,
    ) -> Result<u32, LedgerError> {
        let held = self.holding(user, stock);
        let next = held
            .checked_add(quantity)
            .ok_or(LedgerError::InventoryOverflow {
                stock,
                requested: quantity,
                held,
            })?;
        self.inventory.insert((user, stock), next);
        Ok(next)
    }

    /// Debits shares from the user's inventory. Fails closed, and removes
    /// the row when it reaches zero.
    pub fn subtract_inventory(
        &mut self,
        user: UserId,
        stock: StockId,
        quantity: u32,
    ) -> Result<(), LedgerError> {
        let held = self.holding(user, stock);
        if quantity > held {
            return Err(LedgerError::InsufficientInventory {
                stock,
                requested: quantity,
                held,
            });
        }
        let remaining = held - quantity;
        if remaining == 0 {
            self.inventory.remove(&(user, stock));
        } else {
            self.inventory.insert((user, stock), remaining);
        }
        Ok(())
    }

    /// Whether `user` holds at least `quantity` shares of `stock`.
    pub fn can_sell(&self, user: UserId, stock: StockId, quantity: u32) -> bool {
        self.holding(user, stock) >= quantity
    }

    /// Whether the tradable supply of `stock` covers `quantity`.
    pub fn can_buy(&self, stock: StockId, quantity: u32) -> bool {
        self.available_supply(stock)
            .map_or(false, |supply| supply >= quantity)
    }

    // Settlement.

    /// Checks a transfer against the books without applying it.
    pub fn check(&self, transfer: &SettlementTransfer) -> Result<(), LedgerError> {
        let balance = self.balance_of(transfer.user)?;
        let supply = self.available_supply(transfer.stock)?;
        let quantity = transfer.quantity.value();
        match transfer.side {
            Side::Buy => {
                let total = transfer.total();
                if total.value() > balance.value() {
                    return Err(LedgerError::InsufficientBalance {
                        requested: total,
                        available: balance,
                    });
                }
                if quantity > supply {
                    return Err(LedgerError::InsufficientSupply {
                        stock: transfer.stock,
                        requested: quantity,
                        available: supply,
                    });
                }
                let held = self.holding(transfer.user, transfer.stock);
                if held.checked_add(quantity).is_none() {
                    return Err(LedgerError::InventoryOverflow {
                        stock: transfer.stock,
                        requested: quantity,
                        held,
                    });
                }
            }
            Side::Sell => {
                let held = self.holding(transfer.user, transfer.stock);
                if quantity > held {
                    return Err(LedgerError::InsufficientInventory {
                        stock: transfer.stock,
                        requested: quantity,
                        held,
                    });
                }
                if supply.checked_add(quantity).is_none() {
                    return Err(LedgerError::SupplyOverflow {
                        stock: transfer.stock,
                        requested: quantity,
                        available: supply,
                    });
                }
            }
        }
        Ok(())
    }

    /// Applies a settlement atomically and returns the user's new balance.
    ///
    /// Validation happens up front through [`Ledger::check`]; once the legs
    /// start applying, none of them can fail.
    pub fn settle(&mut self, transfer: SettlementTransfer) -> Result<Cash, LedgerError> {
        self.check(&transfer)?;
        let quantity = transfer.quantity.value();
        let total = transfer.total();
        match transfer.side {
            Side::Buy => {
                self.withdraw(transfer.user, total)?;
                self.subtract_supply(transfer.stock, quantity)?;
                self.add_inventory(transfer.user, transfer.stock, quantity)?;
            }
            Side::Sell => {
                self.subtract_inventory(transfer.user, transfer.stock, quantity)?;
                self.add_supply(transfer.stock, quantity)?;
                self.deposit(transfer.user, total)?;
            }
        }
        self.balance_of(transfer.user)
    }

    // Invariant helpers, mostly for audits and tests.

    /// Tradable supply plus every holding of `stock`, across all users.
    pub fn total_shares(&self, stock: StockId) -> u32 {
        let held: u32 = self
            .inventory
            .iter()
            .filter(|((_, s), _)| *s == stock)
            .map(|(_, qty)| qty)
            .sum();
        held + self.supply.get(&stock).copied().unwrap_or(0)
    }

    /// Sum of all cash balances.
    pub fn total_cash(&self) -> Cash {
        self.accounts.values().map(|a| a.balance).sum()
    }

    pub fn account_count(&self) -> usize {
        self.accounts.len()
    }
}
