//! jetledger-store: transactional scoped key-value store.
//!
//! Wraps a redb database with the ledger's key layout and transaction rules:
//!
//! - **Scoped keys**: every key is `scope-byte ‖ subkey` (see [`keys`])
//! - **Snapshot reads**: [`ReadTxn`] sees only data committed before it began
//! - **Atomic writes**: [`WriteTxn`] commits all or nothing; a failed
//!   operation poisons the transaction
//! - **Drain barrier**: jet drops are built only after every writer of the
//!   pulse has finished
//!
//! ## Quick Start
//!
//! ```no_run
//! use jetledger_store::{ScopedRead, Store};
//! use jetledger_types::{JetId, PulseNumber, config::StoreConfig};
//!
//! let store = Store::open_in_memory(StoreConfig::default())?;
//!
//! let id = store.update(PulseNumber::GENESIS, |txn| txn.set_record(&JetId::ROOT, b"body"))?;
//! let body = store.view(|txn| txn.get_record(&JetId::ROOT, &id))?;
//! assert_eq!(body, b"body");
//! # Ok::<(), jetledger_store::StoreError>(())
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod drop;
pub mod error;
pub mod inflight;
pub mod keys;
pub mod lifeline;
mod metrics;
pub mod store;
pub mod tables;
pub mod transaction;

pub use drop::JetDrop;
pub use error::{Result, StoreError};
pub use inflight::{FinalizeGuard, InflightGuard, InflightTracker};
pub use keys::Scope;
pub use lifeline::{ClassLifeline, ObjectLifeline, ObjectState};
pub use store::Store;
pub use transaction::{ReadTxn, ScopedRead, WriteTxn};
