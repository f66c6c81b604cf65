// 8.0: settlement engine. coordinates accounts, the stock catalog, order
// lifecycle, quote updates, and the periodic conditional-order sweep.
// deterministic and event-driven with no external I/O.

mod config;
mod core;
mod orders;
mod results;
mod sweeper;

pub use config::EngineConfig;
pub use core::Engine;
pub use results::{EngineError, SweepReport};
