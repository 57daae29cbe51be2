//! Drain barrier between write transactions and jet drop finalization.
//!
//! Every write transaction registers against its pulse for its whole lifetime.
//! Finalizing a pulse closes the gate for new writers of that pulse and waits
//! until the in-flight count reaches zero, so the drop hash sees a quiescent
//! record set. Writers of other pulses are never blocked.

use std::{
    collections::{HashMap, HashSet},
    sync::Arc,
    time::{Duration, Instant},
};

use jetledger_types::PulseNumber;
use parking_lot::{Condvar, Mutex};
use tracing::{debug, warn};

use crate::{
    error::{Result, StoreError},
    metrics,
};

#[derive(Debug, Default)]
struct InflightState {
    writers: HashMap<PulseNumber, usize>,
    finalizing: HashSet<PulseNumber>,
}

/// Per-pulse count of open write transactions plus the set of pulses being
/// finalized.
#[derive(Debug, Default)]
pub struct InflightTracker {
    state: Mutex<InflightState>,
    changed: Condvar,
}

impl InflightTracker {
    /// Creates an empty tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a writer for `pulse`, blocking while that pulse is being
    /// finalized.
    pub fn enter(self: &Arc<Self>, pulse: PulseNumber) -> InflightGuard {
        let mut state = self.state.lock();
        while state.finalizing.contains(&pulse) {
            self.changed.wait(&mut state);
        }
        *state.writers.entry(pulse).or_insert(0) += 1;
        InflightGuard { tracker: Arc::clone(self), pulse }
    }

    /// Closes the gate for `pulse` and waits for its writers to drain.
    ///
    /// Concurrent finalizers of the same pulse are serialized. The gate stays
    /// closed until the returned guard is dropped.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::DrainTimeout`] if writers are still open after
    /// `timeout`. The gate is reopened before returning.
    pub fn finalize(self: &Arc<Self>, pulse: PulseNumber, timeout: Duration) -> Result<FinalizeGuard> {
        let started = Instant::now();
        let deadline = started + timeout;
        let mut state = self.state.lock();

        while state.finalizing.contains(&pulse) {
            if self.changed.wait_until(&mut state, deadline).timed_out() {
                let inflight = state.writers.get(&pulse).copied().unwrap_or(0);
                warn!(pulse = %pulse, inflight, "Drain timed out behind another finalizer");
                metrics::record_drain_timeout();
                return Err(StoreError::DrainTimeout { pulse, inflight, waited: started.elapsed() });
            }
        }
        state.finalizing.insert(pulse);

        loop {
            let inflight = state.writers.get(&pulse).copied().unwrap_or(0);
            if inflight == 0 {
                break;
            }
            if self.changed.wait_until(&mut state, deadline).timed_out() {
                let inflight = state.writers.get(&pulse).copied().unwrap_or(0);
                if inflight == 0 {
                    break;
                }
                state.finalizing.remove(&pulse);
                drop(state);
                self.changed.notify_all();
                warn!(pulse = %pulse, inflight, waited = ?started.elapsed(), "Drain timed out");
                metrics::record_drain_timeout();
                return Err(StoreError::DrainTimeout { pulse, inflight, waited: started.elapsed() });
            }
        }

        debug!(pulse = %pulse, waited = ?started.elapsed(), "Pulse drained");
        metrics::record_drain_wait(started.elapsed().as_secs_f64());
        Ok(FinalizeGuard { tracker: Arc::clone(self), pulse })
    }

    /// Number of open write transactions for `pulse`.
    pub fn inflight(&self, pulse: PulseNumber) -> usize {
        self.state.lock().writers.get(&pulse).copied().unwrap_or(0)
    }

    /// Whether `pulse` is currently being finalized.
    pub fn is_finalizing(&self, pulse: PulseNumber) -> bool {
        self.state.lock().finalizing.contains(&pulse)
    }

    fn leave(&self, pulse: PulseNumber) {
        let mut state = self.state.lock();
        if let Some(count) = state.writers.get_mut(&pulse) {
            *count -= 1;
            if *count == 0 {
                state.writers.remove(&pulse);
            }
        }
        drop(state);
        self.changed.notify_all();
    }

    fn reopen(&self, pulse: PulseNumber) {
        self.state.lock().finalizing.remove(&pulse);
        self.changed.notify_all();
    }
}

/// Registration of one write transaction. Released on drop.
#[derive(Debug)]
pub struct InflightGuard {
    tracker: Arc<InflightTracker>,
    pulse: PulseNumber,
}

impl InflightGuard {
    /// Pulse this writer is registered against.
    pub fn pulse(&self) -> PulseNumber {
        self.pulse
    }
}

impl Drop for InflightGuard {
    fn drop(&mut self) {
        self.tracker.leave(self.pulse);
    }
}

/// Keeps a pulse closed to new writers while its drop is built.
#[derive(Debug)]
pub struct FinalizeGuard {
    tracker: Arc<InflightTracker>,
    pulse: PulseNumber,
}

impl Drop for FinalizeGuard {
    fn drop(&mut self) {
        self.tracker.reopen(self.pulse);
    }
}
