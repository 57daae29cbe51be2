//! Error types for shard resolution.

use jetledger_store::StoreError;
use jetledger_types::{JetId, NodeId, PulseNumber, RecordId};
use snafu::Snafu;

/// Result type alias for resolution.
pub type Result<T, E = ResolveError> = std::result::Result<T, E>;

/// Failure of the executor lookup.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum CoordinatorError {
    /// No node is assigned to the jet for the pulse.
    #[snafu(display("No executor for {jet} at {pulse}"))]
    NoExecutor {
        /// Jet that was looked up.
        jet: JetId,
        /// Pulse of the lookup.
        pulse: PulseNumber,
    },

    /// The active node list for the pulse is not known.
    #[snafu(display("Node list unavailable for {pulse}: {message}"))]
    Unavailable {
        /// Pulse of the lookup.
        pulse: PulseNumber,
        /// Why it is unavailable.
        message: String,
    },
}

/// Failure to deliver a message or receive its reply.
#[derive(Debug, Clone, PartialEq, Eq, Snafu)]
#[snafu(visibility(pub))]
pub enum BusError {
    /// The receiver could not be reached.
    #[snafu(display("Node {receiver} unreachable: {message}"))]
    Unreachable {
        /// Intended receiver.
        receiver: NodeId,
        /// Transport detail.
        message: String,
    },

    /// The bus has shut down.
    #[snafu(display("Message bus closed"))]
    Closed,
}

/// Errors returned by the shard resolver.
///
/// A stale local answer and a jet owned by another node are not errors: the
/// first is retried internally, the second is reported as
/// [`crate::Resolution::Miss`].
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum ResolveError {
    /// The retry budget ran out before an actual jet was found.
    #[snafu(display(
        "Retries exceeded resolving {object} at {pulse} after {attempts} attempts, last saw {jet}"
    ))]
    RetriesExceeded {
        /// Object being routed.
        object: RecordId,
        /// Last non-actual jet the local tree returned.
        jet: JetId,
        /// Pulse the jet was resolved for.
        pulse: PulseNumber,
        /// Remote fetches made.
        attempts: u32,
    },

    /// The caller cancelled the resolution.
    #[snafu(display("Resolution cancelled"))]
    Cancelled,

    /// A peer answered with something other than a jet covering the object.
    #[snafu(display("Unexpected reply: {description}"))]
    UnexpectedReply {
        /// What was received.
        description: String,
    },

    /// The executor lookup failed.
    #[snafu(display("Coordinator error: {source}"))]
    Coordinator {
        /// The underlying lookup failure.
        source: CoordinatorError,
    },

    /// The pulse chain could not be read.
    #[snafu(display("Pulse lookup failed: {source}"))]
    Pulse {
        /// The underlying store error.
        source: StoreError,
    },

    /// A handled parcel could not be journaled.
    #[snafu(display("Failed to journal parcel in {jet}: {source}"))]
    Journal {
        /// Jet the parcel was handled in.
        jet: JetId,
        /// The underlying store error.
        source: StoreError,
    },
}

impl ResolveError {
    /// Whether retrying the whole request later may succeed.
    ///
    /// Exhausted retries and coordinator gaps depend on peers and membership
    /// that change over time. Cancellation, malformed replies and storage
    /// failures do not heal by retrying.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::RetriesExceeded { .. } => true,
            Self::Coordinator { .. } => true,
            Self::Cancelled => false,
            Self::UnexpectedReply { .. } => false,
            Self::Pulse { .. } => false,
            Self::Journal { .. } => false,
        }
    }
}
