//! Error types for jet tree operations.

use jetledger_types::JetId;
use snafu::Snafu;

/// Result type alias for jet tree operations.
pub type Result<T, E = JetError> = std::result::Result<T, E>;

/// Errors from jet tree mutations. Both are logic errors and are never retried.
#[derive(Debug, Clone, PartialEq, Eq, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum JetError {
    /// The jet cannot be split.
    #[snafu(display("Cannot split {jet}: {reason}"))]
    InvalidSplit {
        /// Jet the split was requested for.
        jet: JetId,
        /// Why the split was refused.
        reason: String,
    },

    /// No node with this exact prefix exists in the tree.
    #[snafu(display("{jet} not found in tree"))]
    JetNotFound {
        /// The missing jet.
        jet: JetId,
    },
}
