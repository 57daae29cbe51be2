//! Store metrics recorded through the `metrics` crate.
//!
//! ## Metric Naming Conventions
//!
//! All metrics follow the pattern: `jetledger_store_{name}_{unit}`
//!
//! - Counters: `_total` suffix
//! - Histograms: `_seconds` suffix, or a plain count

use metrics::{counter, histogram};

// =============================================================================
// Metric Names
// =============================================================================

const WRITE_TXNS_TOTAL: &str = "jetledger_store_write_txns_total";
const DROPS_PERSISTED_TOTAL: &str = "jetledger_store_drops_persisted_total";
const DROP_RECORDS: &str = "jetledger_store_drop_records";
const DROP_LATENCY: &str = "jetledger_store_drop_latency_seconds";
const DRAIN_WAIT: &str = "jetledger_store_drain_wait_seconds";
const DRAIN_TIMEOUTS_TOTAL: &str = "jetledger_store_drain_timeouts_total";

// =============================================================================
// Write Transactions
// =============================================================================

/// How a write transaction ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TxnOutcome {
    Committed,
    Discarded,
    Refused,
}

impl TxnOutcome {
    fn as_str(self) -> &'static str {
        match self {
            Self::Committed => "committed",
            Self::Discarded => "discarded",
            Self::Refused => "refused",
        }
    }
}

/// Records the end of a write transaction.
#[inline]
pub(crate) fn record_write_txn(outcome: TxnOutcome) {
    counter!(WRITE_TXNS_TOTAL, "outcome" => outcome.as_str()).increment(1);
}

// =============================================================================
// Jet Drops
// =============================================================================

/// Records a persisted jet drop and how many records it sealed.
#[inline]
pub(crate) fn record_drop_persisted(records: u64, latency_secs: f64) {
    counter!(DROPS_PERSISTED_TOTAL).increment(1);
    histogram!(DROP_RECORDS).record(records as f64);
    histogram!(DROP_LATENCY).record(latency_secs);
}

/// Records how long finalization waited for writers to drain.
#[inline]
pub(crate) fn record_drain_wait(wait_secs: f64) {
    histogram!(DRAIN_WAIT).record(wait_secs);
}

/// Records a drain that gave up with writers still open.
#[inline]
pub(crate) fn record_drain_timeout() {
    counter!(DRAIN_TIMEOUTS_TOTAL).increment(1);
}
