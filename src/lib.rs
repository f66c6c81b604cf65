// brokerage-core: brokerage simulation settlement engine.
// ledger-first architecture: every cash or share movement clears through
// one ledger, atomically. all computation is deterministic with no external I/O.
//
// file map (search X.0 for structs, X.1+ for logic):
//   1.x  types.rs: primitives: UserId, StockId, Side, TriggerKind, Price, Cash, Quantity
//   2.x  order.rs: order lifecycle, request validation, order store
//   3.x  ledger.rs: balances, inventory, tradable supply, atomic settlement
//   4.x  stocks.rs: listed stock catalog
//   5.x  oracle.rs: bid/ask quote sourcing (in-memory board)
//   6.x  notify.rs: fire-and-forget order notices
//   7.x  events.rs: state transition events for audit
//   8.x  engine/: core engine: accounts, orders, quotes, conditional sweep

// core settlement modules
pub mod engine;
pub mod events;
pub mod ledger;
pub mod order;
pub mod types;

// market data and delivery modules
pub mod notify;
pub mod oracle;
pub mod stocks;

// re exports for convenience
pub use engine::*;
pub use events::*;
pub use ledger::*;
pub use notify::*;
pub use oracle::*;
pub use order::*;
pub use stocks::*;
pub use types::*;
