//! Resolver metrics recorded through the `metrics` crate.
//!
//! ## Metric Naming Conventions
//!
//! All metrics follow the pattern: `jetledger_resolver_{name}_{unit}`
//!
//! - Counters: `_total` suffix
//! - Histograms: `_seconds` suffix

use metrics::{counter, histogram};

// =============================================================================
// Metric Names
// =============================================================================

const RESOLUTIONS_TOTAL: &str = "jetledger_resolver_resolutions_total";
const SHARD_MISSES_TOTAL: &str = "jetledger_resolver_shard_misses_total";
const FETCH_ATTEMPTS_TOTAL: &str = "jetledger_resolver_fetch_attempts_total";
const FETCH_TIMEOUTS_TOTAL: &str = "jetledger_resolver_fetch_timeouts_total";
const FETCH_ERRORS_TOTAL: &str = "jetledger_resolver_fetch_errors_total";
const FETCH_LATENCY: &str = "jetledger_resolver_fetch_latency_seconds";
const JETS_MERGED_TOTAL: &str = "jetledger_resolver_jets_merged_total";
const RETRIES_EXCEEDED_TOTAL: &str = "jetledger_resolver_retries_exceeded_total";
const PARCELS_JOURNALED_TOTAL: &str = "jetledger_resolver_parcels_journaled_total";

// =============================================================================
// Routing
// =============================================================================

/// Records a routed request; `local` is false for a shard miss.
#[inline]
pub(crate) fn record_resolution(local: bool) {
    let outcome = if local { "local" } else { "miss" };
    counter!(RESOLUTIONS_TOTAL, "outcome" => outcome).increment(1);
    if !local {
        counter!(SHARD_MISSES_TOTAL).increment(1);
    }
}

// =============================================================================
// Remote Fetch
// =============================================================================

/// Records one `GetJet` round trip that returned a reply.
#[inline]
pub(crate) fn record_fetch(latency_secs: f64) {
    counter!(FETCH_ATTEMPTS_TOTAL).increment(1);
    histogram!(FETCH_LATENCY).record(latency_secs);
}

/// Records a fetch that hit the per-attempt timeout.
#[inline]
pub(crate) fn record_fetch_timeout() {
    counter!(FETCH_ATTEMPTS_TOTAL).increment(1);
    counter!(FETCH_TIMEOUTS_TOTAL).increment(1);
}

/// Records a fetch the bus failed to deliver.
#[inline]
pub(crate) fn record_fetch_error() {
    counter!(FETCH_ATTEMPTS_TOTAL).increment(1);
    counter!(FETCH_ERRORS_TOTAL).increment(1);
}

/// Records a confirmed jet merged into the local tree.
#[inline]
pub(crate) fn record_jet_merged() {
    counter!(JETS_MERGED_TOTAL).increment(1);
}

/// Records a resolution that ran out of retries.
#[inline]
pub(crate) fn record_retries_exceeded() {
    counter!(RETRIES_EXCEEDED_TOTAL).increment(1);
}

// =============================================================================
// Journal
// =============================================================================

#[inline]
pub(crate) fn record_parcel_journaled() {
    counter!(PARCELS_JOURNALED_TOTAL).increment(1);
}
