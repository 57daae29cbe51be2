//! Journal of parcels handled on this node.
//!
//! Every parcel the resolver routes locally is saved as a message of its jet
//! at the latest pulse, so a jet drop for that pulse can account for the work
//! done under it.

use jetledger_store::Store;
use jetledger_types::{Hash, JetId, PulseNumber};
use snafu::ResultExt;
use tracing::debug;

use crate::{
    error::{JournalSnafu, PulseSnafu, Result},
    message::Parcel,
    metrics,
    resolver::Resolution,
};

/// Saves locally handled parcels under their jet.
#[derive(Clone)]
pub struct ParcelJournal {
    store: Store,
}

impl ParcelJournal {
    /// Creates a journal writing into `store`.
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    /// Saves `parcel` under `jet` at the latest pulse and returns its hash.
    ///
    /// Blocks while the latest pulse is being finalized.
    ///
    /// # Errors
    ///
    /// - [`ResolveError::Pulse`](crate::ResolveError::Pulse) when no pulse is known yet.
    /// - [`ResolveError::Journal`](crate::ResolveError::Journal) when the write fails.
    pub fn save(&self, jet: &JetId, parcel: &Parcel) -> Result<Hash> {
        let latest = self.store.current_pulse().context(PulseSnafu)?;
        let hash = self.store.set_message(jet, latest, parcel).context(JournalSnafu { jet: *jet })?;
        metrics::record_parcel_journaled();
        debug!(jet = %jet, pulse = %latest, kind = parcel.request.kind(), "Parcel journaled");
        Ok(hash)
    }

    /// Saves `parcel` when `resolution` routed it here; misses are not saved.
    pub fn save_resolved(&self, resolution: &Resolution, parcel: &Parcel) -> Result<Option<Hash>> {
        match resolution {
            Resolution::Local { jet } => self.save(jet, parcel).map(Some),
            Resolution::Miss { .. } => Ok(None),
        }
    }

    /// Parcels saved under `jet` at `pulse`, ordered by hash.
    pub fn parcels(&self, jet: &JetId, pulse: PulseNumber) -> Result<Vec<Parcel>> {
        self.store.get_messages(jet, pulse).context(JournalSnafu { jet: *jet })
    }
}

impl std::fmt::Debug for ParcelJournal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ParcelJournal").finish_non_exhaustive()
    }
}
