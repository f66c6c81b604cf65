//! Periodic conditional-order sweep.
//!
//! Stands in for the production scheduler tick. Each pass snapshots the
//! open conditional orders, re-checks every one against the current quote,
//! and settles those whose trigger is met. An order that gets canceled by a
//! failed settlement is normal flow, not a sweep failure; the pass always
//! visits the remaining orders.

use super::core::Engine;
use super::results::{EngineError, SweepReport};
use crate::events::{EventPayload, SweepCompletedEvent};
use crate::notify::Notifier;
use crate::oracle::PriceOracle;
use crate::types::Timestamp;
use tracing::{debug, warn};

impl<O: PriceOracle, N: Notifier> Engine<O, N> {
    /// Runs one sweep pass unconditionally and stamps the sweep clock.
    pub fn run_sweep(&mut self) -> SweepReport {
        let ids = self.orders.open_conditional_ids();
        let mut report = SweepReport::default();

        for id in ids {
            report.evaluated += 1;

            // Re-check from scratch. The order may have settled or been
            // canceled between the snapshot and this visit.
            let ready = match self.is_ready_to_close(id) {
                Ok(ready) => ready,
                Err(_) => {
                    report.skipped += 1;
                    continue;
                }
            };
            if !ready {
                report.skipped += 1;
                continue;
            }

            match self.close_order(id) {
                Ok(order) => {
                    debug!(order = %order.id, "sweep settled order");
                    report.closed.push(order.id);
                }
                Err(EngineError::Canceled { order, .. }) => {
                    report.canceled.push(order);
                }
                Err(e) => {
                    warn!(order = %id, error = %e, "sweep left order open");
                    report.skipped += 1;
                }
            }
        }

        self.last_sweep = Some(self.current_time);
        self.emit_event(EventPayload::SweepCompleted(SweepCompletedEvent {
            evaluated: report.evaluated,
            closed: report.closed.len(),
            canceled: report.canceled.len(),
            skipped: report.skipped,
        }));
        report
    }

    /// Runs a sweep only when the configured interval has elapsed since the
    /// last pass. The first poll always sweeps.
    pub fn poll_sweep(&mut self) -> Option<SweepReport> {
        let interval_ms = self.config.sweep_interval_secs as i64 * 1000;
        let due = match self.last_sweep {
            None => true,
            Some(last) => self.current_time.elapsed_millis(last) >= interval_ms,
        };
        if due {
            Some(self.run_sweep())
        } else {
            None
        }
    }

    pub fn last_sweep(&self) -> Option<Timestamp> {
        self.last_sweep
    }
}
