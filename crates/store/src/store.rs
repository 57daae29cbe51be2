//! Persistent scoped store backed by redb.
//!
//! Provides:
//! - Database lifecycle (file-backed and in-memory)
//! - Raw and scoped access through read/write transactions
//! - The current pulse marker and the pulse chain
//! - Registration of write transactions with the drain barrier

use std::{path::Path, sync::Arc};

use jetledger_types::{Hash, JetId, PulseNumber, RecordId, config::StoreConfig};
use redb::{Database, ReadableTable, backends::InMemoryBackend};
use serde::{Serialize, de::DeserializeOwned};
use snafu::ResultExt;
use tracing::{debug, info};

use crate::{
    drop::JetDrop,
    error::{
        CommitSnafu, ConfigSnafu, DatabaseSnafu, InvalidKeySnafu, Result, StorageSnafu,
        StoreError, TableSnafu, TransactionSnafu, found,
    },
    inflight::{FinalizeGuard, InflightTracker},
    keys::{self, Scope},
    lifeline::{ClassLifeline, ObjectLifeline},
    tables::Tables,
    transaction::{ReadTxn, ScopedRead, WriteTxn},
};

struct StoreInner {
    db: Database,
    config: StoreConfig,
    inflight: Arc<InflightTracker>,
}

/// Handle to the persistent store. Cheap to clone; clones share the database.
#[derive(Clone)]
pub struct Store {
    inner: Arc<StoreInner>,
}

impl Store {
    /// Opens or creates a database file at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Config`] for an invalid configuration and
    /// [`StoreError::Database`] if the file cannot be opened.
    pub fn open(path: impl AsRef<Path>, config: StoreConfig) -> Result<Self> {
        config.validate().context(ConfigSnafu)?;
        let path = path.as_ref();
        let db = Database::builder()
            .set_cache_size(config.cache_size_bytes)
            .create(path)
            .context(DatabaseSnafu { path: path.display().to_string() })?;
        info!(path = %path.display(), "Store opened");
        Self::init(db, config)
    }

    /// Creates a store that lives only in memory.
    pub fn open_in_memory(config: StoreConfig) -> Result<Self> {
        config.validate().context(ConfigSnafu)?;
        let db = Database::builder()
            .set_cache_size(config.cache_size_bytes)
            .create_with_backend(InMemoryBackend::new())
            .context(DatabaseSnafu { path: ":memory:".to_string() })?;
        Self::init(db, config)
    }

    fn init(db: Database, config: StoreConfig) -> Result<Self> {
        // Read transactions fail on tables that were never created.
        let txn = db.begin_write().context(TransactionSnafu)?;
        {
            txn.open_table(Tables::SCOPED).context(TableSnafu)?;
            txn.open_table(Tables::META).context(TableSnafu)?;
            txn.open_table(Tables::PULSES).context(TableSnafu)?;
        }
        txn.commit().context(CommitSnafu)?;

        Ok(Self {
            inner: Arc::new(StoreInner { db, config, inflight: Arc::new(InflightTracker::new()) }),
        })
    }

    /// Configuration the store was opened with.
    pub fn config(&self) -> &StoreConfig {
        &self.inner.config
    }

    // ========================================================================
    // Transactions
    // ========================================================================

    /// Begins a snapshot read transaction.
    pub fn begin_read(&self) -> Result<ReadTxn> {
        let txn = self.inner.db.begin_read().context(TransactionSnafu)?;
        Ok(ReadTxn::new(txn))
    }

    /// Begins a write transaction for `pulse`.
    ///
    /// Blocks while a drop for `pulse` is being built. The transaction counts
    /// as in flight for `pulse` until it ends.
    pub fn begin_write(&self, pulse: PulseNumber) -> Result<WriteTxn> {
        let guard = self.inner.inflight.enter(pulse);
        let txn = self.inner.db.begin_write().context(TransactionSnafu)?;
        Ok(WriteTxn::new(txn, pulse, Some(guard)))
    }

    pub(crate) fn begin_write_untracked(&self, pulse: PulseNumber) -> Result<WriteTxn> {
        let txn = self.inner.db.begin_write().context(TransactionSnafu)?;
        Ok(WriteTxn::new(txn, pulse, None))
    }

    pub(crate) fn finalize(&self, pulse: PulseNumber) -> Result<FinalizeGuard> {
        self.inner.inflight.finalize(pulse, self.inner.config.drain_timeout)
    }

    /// Runs `f` against a consistent snapshot.
    pub fn view<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&ReadTxn) -> Result<T>,
    {
        let txn = self.begin_read()?;
        f(&txn)
    }

    /// Runs `f` in a write transaction for `pulse` and commits on success.
    ///
    /// If `f` fails nothing it wrote becomes visible and its error is returned.
    pub fn update<T, F>(&self, pulse: PulseNumber, f: F) -> Result<T>
    where
        F: FnOnce(&mut WriteTxn) -> Result<T>,
    {
        let mut txn = self.begin_write(pulse)?;
        match f(&mut txn) {
            Ok(value) => {
                txn.commit()?;
                Ok(value)
            },
            Err(err) => {
                txn.discard();
                Err(err)
            },
        }
    }

    /// Number of open write transactions for `pulse`.
    pub fn inflight_writers(&self, pulse: PulseNumber) -> usize {
        self.inner.inflight.inflight(pulse)
    }

    // ========================================================================
    // Raw and scoped access
    // ========================================================================

    /// Reads raw bytes under `key`.
    pub fn get(&self, key: &[u8]) -> Result<Vec<u8>> {
        self.view(|txn| txn.get(key))
    }

    /// Writes raw bytes under `key` in its own transaction.
    ///
    /// A record key is written through a transaction registered for the pulse
    /// it encodes, so it waits while that pulse's drop is being built. Other
    /// keys are not registered with any pulse.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::InvalidKey`] for a malformed record key.
    pub fn set(&self, key: &[u8], value: &[u8]) -> Result<()> {
        let mut txn = if key.first().copied() == Some(Scope::Record.byte()) {
            let Some((_, id)) = keys::decode_record_key(key) else {
                return InvalidKeySnafu { reason: format!("record key of length {}", key.len()) }
                    .fail();
            };
            self.begin_write(id.pulse)?
        } else {
            self.begin_write_untracked(self.current_pulse_or_genesis()?)?
        };
        txn.set(key, value)?;
        txn.commit()
    }

    /// Reads a record body.
    pub fn get_record(&self, jet: &JetId, id: &RecordId) -> Result<Vec<u8>> {
        self.view(|txn| txn.get_record(jet, id))
    }

    /// Stores a record body in `jet` at `pulse`.
    pub fn set_record(&self, jet: &JetId, pulse: PulseNumber, body: &[u8]) -> Result<RecordId> {
        self.update(pulse, |txn| txn.set_record(jet, body))
    }

    /// Reads an object's lifeline index.
    pub fn get_object_index(&self, object: &RecordId) -> Result<ObjectLifeline> {
        self.view(|txn| txn.get_object_index(object))
    }

    /// Stores an object's lifeline index.
    pub fn set_object_index(
        &self,
        pulse: PulseNumber,
        object: &RecordId,
        lifeline: &ObjectLifeline,
    ) -> Result<()> {
        self.update(pulse, |txn| txn.set_object_index(object, lifeline))
    }

    /// Reads a class's lifeline index.
    pub fn get_class_index(&self, class: &RecordId) -> Result<ClassLifeline> {
        self.view(|txn| txn.get_class_index(class))
    }

    /// Stores a class's lifeline index.
    pub fn set_class_index(
        &self,
        pulse: PulseNumber,
        class: &RecordId,
        lifeline: &ClassLifeline,
    ) -> Result<()> {
        self.update(pulse, |txn| txn.set_class_index(class, lifeline))
    }

    /// Stores a message handled in `jet` at `pulse` and returns its hash.
    pub fn set_message<T: Serialize>(&self, jet: &JetId, pulse: PulseNumber, message: &T) -> Result<Hash> {
        self.update(pulse, |txn| txn.set_message(jet, message))
    }

    /// Decodes every message of `jet` at `pulse`.
    pub fn get_messages<T: DeserializeOwned>(&self, jet: &JetId, pulse: PulseNumber) -> Result<Vec<T>> {
        self.view(|txn| txn.get_messages(jet, pulse))
    }

    /// Reads a pulse's entropy.
    pub fn get_entropy(&self, pulse: PulseNumber) -> Result<Vec<u8>> {
        self.view(|txn| txn.get_entropy(pulse))
    }

    /// Stores a pulse's entropy.
    pub fn set_entropy(&self, pulse: PulseNumber, entropy: &[u8]) -> Result<()> {
        self.update(pulse, |txn| txn.set_entropy(pulse, entropy))
    }

    /// Reads the drop of `jet` at `pulse`.
    pub fn get_drop(&self, jet: &JetId, pulse: PulseNumber) -> Result<JetDrop> {
        self.view(|txn| txn.get_drop(jet, pulse))
    }

    // ========================================================================
    // Pulses
    // ========================================================================

    /// Returns the current pulse.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] before any pulse has been set.
    pub fn current_pulse(&self) -> Result<PulseNumber> {
        let txn = self.inner.db.begin_read().context(TransactionSnafu)?;
        let table = txn.open_table(Tables::META).context(TableSnafu)?;
        let value = table.get(Tables::CURRENT_PULSE_KEY).context(StorageSnafu)?;
        found(value.map(|guard| PulseNumber::new(guard.value())))
    }

    fn current_pulse_or_genesis(&self) -> Result<PulseNumber> {
        match self.current_pulse() {
            Ok(pulse) => Ok(pulse),
            Err(StoreError::NotFound) => Ok(PulseNumber::GENESIS),
            Err(err) => Err(err),
        }
    }

    /// Overwrites the current pulse marker without touching the pulse chain.
    pub fn set_current_pulse(&self, pulse: PulseNumber) -> Result<()> {
        let txn = self.inner.db.begin_write().context(TransactionSnafu)?;
        {
            let mut table = txn.open_table(Tables::META).context(TableSnafu)?;
            table.insert(Tables::CURRENT_PULSE_KEY, pulse.value()).context(StorageSnafu)?;
        }
        txn.commit().context(CommitSnafu)?;
        debug!(pulse = %pulse, "Current pulse set");
        Ok(())
    }

    /// Appends `pulse` to the pulse chain and makes it current.
    ///
    /// The previous current pulse, if any, becomes its predecessor.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NonMonotonicPulse`] unless `pulse` is greater than
    /// the current pulse.
    pub fn add_pulse(&self, pulse: PulseNumber) -> Result<()> {
        let txn = self.inner.db.begin_write().context(TransactionSnafu)?;
        {
            let mut meta = txn.open_table(Tables::META).context(TableSnafu)?;
            let current = meta
                .get(Tables::CURRENT_PULSE_KEY)
                .context(StorageSnafu)?
                .map(|guard| PulseNumber::new(guard.value()));

            if let Some(current) = current {
                if pulse <= current {
                    return Err(StoreError::NonMonotonicPulse { pulse, current });
                }
                let mut chain = txn.open_table(Tables::PULSES).context(TableSnafu)?;
                chain.insert(pulse.value(), current.value()).context(StorageSnafu)?;
            }
            meta.insert(Tables::CURRENT_PULSE_KEY, pulse.value()).context(StorageSnafu)?;
        }
        txn.commit().context(CommitSnafu)?;
        info!(pulse = %pulse, "Pulse added");
        Ok(())
    }

    /// Returns the pulse that preceded `pulse` in the chain.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] for the first pulse of the chain and
    /// for pulses never added.
    pub fn previous_pulse(&self, pulse: PulseNumber) -> Result<PulseNumber> {
        let txn = self.inner.db.begin_read().context(TransactionSnafu)?;
        let table = txn.open_table(Tables::PULSES).context(TableSnafu)?;
        let value = table.get(pulse.value()).context(StorageSnafu)?;
        found(value.map(|guard| PulseNumber::new(guard.value())))
    }
}

impl std::fmt::Debug for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store").field("config", &self.inner.config).finish_non_exhaustive()
    }
}
