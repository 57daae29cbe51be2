//! Jet drops: the per-pulse hash chain of a jet's records.

use std::time::Instant;

use jetledger_types::{DropHasher, Hash, JetId, PulseNumber, ZERO_HASH};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{error::Result, metrics, store::Store, transaction::ScopedRead};

/// Sealed digest of one jet's records for one pulse.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JetDrop {
    /// Jet the drop seals.
    pub jet: JetId,
    /// Pulse the drop seals.
    pub pulse: PulseNumber,
    /// Hash of the previous drop in the chain.
    pub prev_hash: Hash,
    /// Digest over the shallow hashes of the sealed records, in key order.
    pub hash: Hash,
}

impl JetDrop {
    /// Chain anchor for `jet`. Its hash is all zeros.
    pub fn genesis(jet: JetId) -> Self {
        Self { jet, pulse: PulseNumber::GENESIS, prev_hash: ZERO_HASH, hash: ZERO_HASH }
    }
}

impl Store {
    /// Seals the records of `jet` at `pulse` into a drop linked to `prev`.
    ///
    /// New writers for `pulse` block until the drop is persisted. Writers
    /// already open are waited for up to the configured drain timeout.
    ///
    /// # Errors
    ///
    /// Returns [`crate::StoreError::DrainTimeout`] if writers for `pulse` do not
    /// finish in time. Nothing is persisted in that case and the call may be
    /// retried.
    pub fn set_drop(&self, jet: &JetId, pulse: PulseNumber, prev: &JetDrop) -> Result<JetDrop> {
        let started = Instant::now();
        let _finalizing = self.finalize(pulse)?;

        let hashes = self.view(|txn| txn.record_hashes(jet, pulse))?;
        let mut hasher = DropHasher::new();
        for hash in &hashes {
            hasher.update(hash);
        }
        let records = hasher.count();
        let drop = JetDrop { jet: *jet, pulse, prev_hash: prev.hash, hash: hasher.finalize() };

        let mut txn = self.begin_write_untracked(pulse)?;
        txn.put_drop(&drop)?;
        txn.commit()?;

        metrics::record_drop_persisted(records, started.elapsed().as_secs_f64());
        info!(jet = %jet, pulse = %pulse, records, "Jet drop persisted");
        Ok(drop)
    }
}
