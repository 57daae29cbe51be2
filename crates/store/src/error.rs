//! Error types for the jetledger persistent store.

use std::time::Duration;

use jetledger_types::{PulseNumber, codec::CodecError, config::ConfigError};
use snafu::Snafu;

/// Result type alias for store operations.
pub type Result<T, E = StoreError> = std::result::Result<T, E>;

/// Errors that can occur during store operations.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum StoreError {
    /// Requested key is absent. Recoverable: the caller decides the default.
    #[snafu(display("Key not found"))]
    NotFound,

    /// The database could not be opened or created.
    #[snafu(display("Failed to open database at {path}: {source}"))]
    Database {
        /// Location of the database.
        path: String,
        /// The underlying engine error.
        source: redb::DatabaseError,
    },

    /// A transaction could not be started.
    #[snafu(display("Transaction error: {source}"))]
    Transaction {
        /// The underlying engine error.
        source: redb::TransactionError,
    },

    /// A table could not be opened.
    #[snafu(display("Table error: {source}"))]
    Table {
        /// The underlying engine error.
        source: redb::TableError,
    },

    /// A read or write against a table failed.
    #[snafu(display("Storage error: {source}"))]
    Storage {
        /// The underlying engine error.
        source: redb::StorageError,
    },

    /// Committing a write transaction failed. Nothing from it is visible.
    #[snafu(display("Commit error: {source}"))]
    Commit {
        /// The underlying engine error.
        source: redb::CommitError,
    },

    /// A stored value could not be encoded or decoded.
    #[snafu(display("Codec error: {source}"))]
    Codec {
        /// The underlying codec error.
        source: CodecError,
    },

    /// A write transaction had a failed operation and was discarded instead of
    /// committed. None of its writes are visible.
    #[snafu(display("Transaction for {pulse} was discarded after a failed operation"))]
    TransactionDiscarded {
        /// Pulse the transaction was opened against.
        pulse: PulseNumber,
    },

    /// Jet drop finalization could not reach a quiescent state for the pulse.
    /// Must be retried by the caller, never skipped.
    #[snafu(display(
        "Drain timeout for {pulse}: {inflight} write transactions still open after {waited:?}"
    ))]
    DrainTimeout {
        /// Pulse being finalized.
        pulse: PulseNumber,
        /// Writers still in flight when the wait gave up.
        inflight: usize,
        /// How long finalization waited.
        waited: Duration,
    },

    /// The store configuration failed validation.
    #[snafu(display("Invalid store configuration: {source}"))]
    Config {
        /// The validation error.
        source: ConfigError,
    },

    /// A pulse was registered that does not advance the pulse chain.
    #[snafu(display("Pulse {pulse} does not follow current {current}"))]
    NonMonotonicPulse {
        /// The rejected pulse.
        pulse: PulseNumber,
        /// The current pulse at the time of the call.
        current: PulseNumber,
    },

    /// A stored key does not match the expected scoped layout.
    #[snafu(display("Invalid key: {reason}"))]
    InvalidKey {
        /// What was wrong with the key.
        reason: String,
    },
}

impl StoreError {
    /// Returns true for [`StoreError::NotFound`].
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound)
    }
}

/// Maps a lookup result onto the store's NotFound convention.
pub(crate) fn found<T>(value: Option<T>) -> Result<T> {
    value.ok_or(StoreError::NotFound)
}
