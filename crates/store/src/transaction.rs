//! Read and write transactions over the scoped key space.
//!
//! Both transaction kinds expose the scoped readers through [`ScopedRead`].
//! Writes exist only on [`WriteTxn`], which is registered with the drain
//! barrier for its pulse until it is committed, discarded or dropped.

use std::cell::Cell;

use jetledger_types::{Hash, JetId, PulseNumber, RecordId, codec, sha256};
use redb::{ReadableTable, ReadTransaction, WriteTransaction};
use serde::{Serialize, de::DeserializeOwned};
use snafu::ResultExt;
use tracing::debug;

use crate::{
    drop::JetDrop,
    error::{
        CodecSnafu, CommitSnafu, InvalidKeySnafu, Result, StorageSnafu, StoreError, TableSnafu,
        found,
    },
    inflight::InflightGuard,
    keys::{self, Scope},
    lifeline::{ClassLifeline, ObjectLifeline},
    metrics::{self, TxnOutcome},
    tables::Tables,
};

// ============================================================================
// Table helpers
// ============================================================================

fn read_value<T>(table: &T, key: &[u8]) -> Result<Vec<u8>>
where
    T: ReadableTable<&'static [u8], &'static [u8]>,
{
    let value = table.get(key).context(StorageSnafu)?;
    found(value.map(|guard| guard.value().to_vec()))
}

fn scan_record_hashes<T>(table: &T, jet: &JetId, pulse: PulseNumber) -> Result<Vec<Hash>>
where
    T: ReadableTable<&'static [u8], &'static [u8]>,
{
    let (start, end) = keys::record_range(jet, pulse);
    let mut hashes = Vec::new();
    for entry in table.range(&start[..]..=&end[..]).context(StorageSnafu)? {
        let (key, _) = entry.context(StorageSnafu)?;
        let hash = keys::shallow_hash(key.value()).ok_or_else(|| {
            InvalidKeySnafu { reason: format!("record key of length {}", key.value().len()) }
                .build()
        })?;
        hashes.push(hash);
    }
    Ok(hashes)
}

fn scan_values<T>(table: &T, start: &[u8], end: &[u8]) -> Result<Vec<Vec<u8>>>
where
    T: ReadableTable<&'static [u8], &'static [u8]>,
{
    let mut values = Vec::new();
    for entry in table.range(start..=end).context(StorageSnafu)? {
        let (_, value) = entry.context(StorageSnafu)?;
        values.push(value.value().to_vec());
    }
    Ok(values)
}

// ============================================================================
// Scoped readers
// ============================================================================

/// Typed readers over the scoped key space, shared by both transaction kinds.
pub trait ScopedRead {
    /// Reads raw bytes under `key`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] if the key is absent.
    fn get(&self, key: &[u8]) -> Result<Vec<u8>>;

    /// Shallow hashes of every record of `jet` at `pulse`, in key order.
    fn record_hashes(&self, jet: &JetId, pulse: PulseNumber) -> Result<Vec<Hash>>;

    /// Raw bodies of every message of `jet` at `pulse`, ordered by hash.
    fn message_bodies(&self, jet: &JetId, pulse: PulseNumber) -> Result<Vec<Vec<u8>>>;

    /// Reads a record body.
    fn get_record(&self, jet: &JetId, id: &RecordId) -> Result<Vec<u8>> {
        self.get(&keys::record_key(jet, id))
    }

    /// Reads an object's lifeline index.
    fn get_object_index(&self, object: &RecordId) -> Result<ObjectLifeline> {
        let bytes = self.get(&keys::lifeline_key(object))?;
        codec::decode(&bytes).context(CodecSnafu)
    }

    /// Reads a class's lifeline index.
    fn get_class_index(&self, class: &RecordId) -> Result<ClassLifeline> {
        let bytes = self.get(&keys::lifeline_key(class))?;
        codec::decode(&bytes).context(CodecSnafu)
    }

    /// Decodes every message of `jet` at `pulse`.
    fn get_messages<T>(&self, jet: &JetId, pulse: PulseNumber) -> Result<Vec<T>>
    where
        T: DeserializeOwned,
        Self: Sized,
    {
        self.message_bodies(jet, pulse)?
            .iter()
            .map(|bytes| codec::decode(bytes).context(CodecSnafu))
            .collect()
    }

    /// Reads a pulse's entropy.
    fn get_entropy(&self, pulse: PulseNumber) -> Result<Vec<u8>> {
        self.get(&keys::entropy_key(pulse))
    }

    /// Reads the drop of `jet` at `pulse`.
    fn get_drop(&self, jet: &JetId, pulse: PulseNumber) -> Result<JetDrop> {
        let bytes = self.get(&keys::drop_key(jet, pulse))?;
        codec::decode(&bytes).context(CodecSnafu)
    }
}

// ============================================================================
// Read transaction
// ============================================================================

/// Snapshot read transaction. Sees only data committed before it began.
pub struct ReadTxn {
    txn: ReadTransaction,
}

impl ReadTxn {
    pub(crate) fn new(txn: ReadTransaction) -> Self {
        Self { txn }
    }
}

impl ScopedRead for ReadTxn {
    fn get(&self, key: &[u8]) -> Result<Vec<u8>> {
        let table = self.txn.open_table(Tables::SCOPED).context(TableSnafu)?;
        read_value(&table, key)
    }

    fn record_hashes(&self, jet: &JetId, pulse: PulseNumber) -> Result<Vec<Hash>> {
        let table = self.txn.open_table(Tables::SCOPED).context(TableSnafu)?;
        scan_record_hashes(&table, jet, pulse)
    }

    fn message_bodies(&self, jet: &JetId, pulse: PulseNumber) -> Result<Vec<Vec<u8>>> {
        let table = self.txn.open_table(Tables::SCOPED).context(TableSnafu)?;
        let (start, end) = keys::message_range(jet, pulse);
        scan_values(&table, &start, &end)
    }
}

// ============================================================================
// Write transaction
// ============================================================================

/// Write transaction bound to a pulse.
///
/// Writes become visible atomically on [`WriteTxn::commit`]. Dropping the
/// transaction or calling [`WriteTxn::discard`] voids them. Once any operation
/// has failed the transaction refuses to commit. A missing key on read is not
/// a failure.
pub struct WriteTxn {
    txn: WriteTransaction,
    pulse: PulseNumber,
    failed: Cell<bool>,
    // Released after the engine transaction so the drain barrier covers commit.
    _inflight: Option<InflightGuard>,
}

impl WriteTxn {
    pub(crate) fn new(
        txn: WriteTransaction,
        pulse: PulseNumber,
        inflight: Option<InflightGuard>,
    ) -> Self {
        Self { txn, pulse, failed: Cell::new(false), _inflight: inflight }
    }

    /// Pulse the transaction writes records into.
    pub fn pulse(&self) -> PulseNumber {
        self.pulse
    }

    /// Whether an operation on this transaction has failed.
    pub fn is_failed(&self) -> bool {
        self.failed.get()
    }

    fn track<T>(&self, result: Result<T>) -> Result<T> {
        if let Err(err) = &result
            && !err.is_not_found()
        {
            self.failed.set(true);
        }
        result
    }

    /// Writes raw bytes under `key`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::InvalidKey`] for a record-scope key that is
    /// malformed or belongs to another pulse. Records only enter a pulse
    /// through a transaction registered for it.
    pub fn set(&mut self, key: &[u8], value: &[u8]) -> Result<()> {
        let result = self.check_record_pulse(key).and_then(|()| self.insert(key, value));
        self.track(result)
    }

    fn check_record_pulse(&self, key: &[u8]) -> Result<()> {
        if key.first().copied() != Some(Scope::Record.byte()) {
            return Ok(());
        }
        let Some((_, id)) = keys::decode_record_key(key) else {
            return InvalidKeySnafu { reason: format!("record key of length {}", key.len()) }
                .fail();
        };
        if id.pulse != self.pulse {
            return InvalidKeySnafu {
                reason: format!("record {id} written from a transaction for {}", self.pulse),
            }
            .fail();
        }
        Ok(())
    }

    fn insert(&self, key: &[u8], value: &[u8]) -> Result<()> {
        let mut table = self.txn.open_table(Tables::SCOPED).context(TableSnafu)?;
        table.insert(key, value).context(StorageSnafu)?;
        Ok(())
    }

    /// Stores a record body in `jet` at this transaction's pulse.
    ///
    /// Records are content addressed: the returned id carries the SHA-256 of
    /// `body`, so storing identical bytes twice is idempotent.
    pub fn set_record(&mut self, jet: &JetId, body: &[u8]) -> Result<RecordId> {
        let id = RecordId::new(self.pulse, sha256(body));
        self.set(&keys::record_key(jet, &id), body)?;
        debug!(jet = %jet, record = %id, "Record stored");
        Ok(id)
    }

    /// Stores an object's lifeline index.
    pub fn set_object_index(&mut self, object: &RecordId, lifeline: &ObjectLifeline) -> Result<()> {
        let bytes = self.track(codec::encode(lifeline).context(CodecSnafu))?;
        self.set(&keys::lifeline_key(object), &bytes)
    }

    /// Stores a class's lifeline index.
    pub fn set_class_index(&mut self, class: &RecordId, lifeline: &ClassLifeline) -> Result<()> {
        let bytes = self.track(codec::encode(lifeline).context(CodecSnafu))?;
        self.set(&keys::lifeline_key(class), &bytes)
    }

    /// Stores a message handled in `jet` at this transaction's pulse.
    ///
    /// Messages are addressed by the SHA-256 of their encoding; the hash is
    /// returned.
    pub fn set_message<T: Serialize>(&mut self, jet: &JetId, message: &T) -> Result<Hash> {
        let bytes = self.track(codec::encode(message).context(CodecSnafu))?;
        let hash = sha256(&bytes);
        self.set(&keys::message_key(jet, self.pulse, &hash), &bytes)?;
        debug!(jet = %jet, pulse = %self.pulse, "Message stored");
        Ok(hash)
    }

    /// Stores a pulse's entropy.
    pub fn set_entropy(&mut self, pulse: PulseNumber, entropy: &[u8]) -> Result<()> {
        self.set(&keys::entropy_key(pulse), entropy)
    }

    pub(crate) fn put_drop(&mut self, drop: &JetDrop) -> Result<()> {
        let bytes = self.track(codec::encode(drop).context(CodecSnafu))?;
        self.set(&keys::drop_key(&drop.jet, drop.pulse), &bytes)
    }

    /// Commits every write of this transaction atomically.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::TransactionDiscarded`] if an earlier operation
    /// failed, or [`StoreError::Commit`] if the engine rejects the commit.
    pub fn commit(self) -> Result<()> {
        let Self { txn, pulse, failed, _inflight } = self;
        if failed.get() {
            debug!(pulse = %pulse, "Discarding failed write transaction");
            metrics::record_write_txn(TxnOutcome::Refused);
            txn.abort().context(StorageSnafu)?;
            return Err(StoreError::TransactionDiscarded { pulse });
        }
        txn.commit().context(CommitSnafu)?;
        metrics::record_write_txn(TxnOutcome::Committed);
        Ok(())
    }

    /// Voids every write of this transaction.
    pub fn discard(self) {
        let Self { txn, pulse, .. } = self;
        metrics::record_write_txn(TxnOutcome::Discarded);
        if let Err(err) = txn.abort() {
            debug!(pulse = %pulse, error = %err, "Abort failed; writes are dropped anyway");
        }
    }
}

impl ScopedRead for WriteTxn {
    fn get(&self, key: &[u8]) -> Result<Vec<u8>> {
        let result = self
            .txn
            .open_table(Tables::SCOPED)
            .context(TableSnafu)
            .and_then(|table| read_value(&table, key));
        self.track(result)
    }

    fn record_hashes(&self, jet: &JetId, pulse: PulseNumber) -> Result<Vec<Hash>> {
        let result = self
            .txn
            .open_table(Tables::SCOPED)
            .context(TableSnafu)
            .and_then(|table| scan_record_hashes(&table, jet, pulse));
        self.track(result)
    }

    fn message_bodies(&self, jet: &JetId, pulse: PulseNumber) -> Result<Vec<Vec<u8>>> {
        let (start, end) = keys::message_range(jet, pulse);
        let result = self
            .txn
            .open_table(Tables::SCOPED)
            .context(TableSnafu)
            .and_then(|table| scan_values(&table, &start, &end));
        self.track(result)
    }
}

impl std::fmt::Debug for WriteTxn {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WriteTxn")
            .field("pulse", &self.pulse)
            .field("failed", &self.failed.get())
            .finish_non_exhaustive()
    }
}
