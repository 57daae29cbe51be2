//! jetledger-resolver: routes ledger requests to the node executing their jet.
//!
//! [`ShardResolver`] looks up the jet covering a request in the local
//! [`JetStore`](jetledger_jet::JetStore). When the local tree is stale it asks
//! the executor of the previous pulse over the [`MessageBus`], merges the
//! confirmed answer and retries within a bounded budget. Peers answer those
//! questions with a [`JetDescriber`]. Parcels handled locally are kept in a
//! [`ParcelJournal`] under their jet.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod collaborators;
mod describer;
mod error;
mod journal;
pub mod message;
mod metrics;
mod resolver;

pub use collaborators::{JetCoordinator, MessageBus, PulseAccessor};
pub use describer::JetDescriber;
pub use error::{BusError, CoordinatorError, ResolveError, Result};
pub use journal::ParcelJournal;
pub use message::{LedgerRequest, Parcel, Reply, Request, SendOptions, Target, TargetPulse};
pub use resolver::{Resolution, ShardResolver};
