//! Routes requests to the node that executes their jet.
//!
//! ```text
//! resolve(object, P) -> JetStore(P).for_id(object)
//!                              |
//!               +--------------+--------------+
//!               |                             |
//!            actual                         stale
//!               |                             |
//!     executor_for_jet(jet, P)      GetJet -> executor of jet at P-1
//!               |                             |
//!       +-------+-------+            merge_actual(P, id), loop
//!       |               |
//!     me()           other node
//!   Local{jet}     Miss{jet, executor}
//! ```

use std::{sync::Arc, time::Instant};

use jetledger_jet::JetStore;
use jetledger_types::{JetId, NodeId, PulseNumber, RecordId, config::ResolverConfig};
use snafu::ResultExt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::{
    collaborators::{JetCoordinator, MessageBus, PulseAccessor},
    error::{
        CancelledSnafu, CoordinatorSnafu, PulseSnafu, Result, RetriesExceededSnafu,
        UnexpectedReplySnafu,
    },
    message::{Parcel, Reply, Request, SendOptions, Target},
    metrics,
};

/// Outcome of routing a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// This node executes the jet; handle the request here.
    Local {
        /// Actual jet covering the request.
        jet: JetId,
    },
    /// Another node executes the jet; tell the sender where to go.
    Miss {
        /// Actual jet covering the request.
        jet: JetId,
        /// Node that executes it.
        executor: NodeId,
    },
}

impl Resolution {
    /// The resolved jet.
    pub fn jet(&self) -> JetId {
        match self {
            Self::Local { jet } | Self::Miss { jet, .. } => *jet,
        }
    }

    /// Whether the request can be handled locally.
    pub fn is_local(&self) -> bool {
        matches!(self, Self::Local { .. })
    }

    /// The reply to send back for a miss.
    pub fn miss_reply(&self) -> Option<Reply> {
        match self {
            Self::Local { .. } => None,
            Self::Miss { jet, executor } => {
                Some(Reply::JetMiss { jet: *jet, executor: executor.clone() })
            },
        }
    }
}

/// Resolves the actual jet for a request and decides where it executes.
///
/// Stale local trees are refreshed from the executor of the previous pulse,
/// bounded by [`ResolverConfig::max_retries`] and
/// [`ResolverConfig::fetch_timeout`].
#[derive(bon::Builder)]
pub struct ShardResolver {
    jets: Arc<JetStore>,
    pulses: Arc<dyn PulseAccessor>,
    coordinator: Arc<dyn JetCoordinator>,
    bus: Arc<dyn MessageBus>,
    #[builder(default)]
    config: ResolverConfig,
}

impl ShardResolver {
    /// Retry and timeout settings in use.
    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    /// Routes a parcel according to its target and target pulse.
    ///
    /// Requests that name their jet skip the tree lookup.
    ///
    /// # Errors
    ///
    /// See [`ShardResolver::resolve`].
    pub async fn check(&self, parcel: &Parcel, cancel: &CancellationToken) -> Result<Resolution> {
        let target_pulse = parcel.target_pulse();
        debug!(kind = parcel.request.kind(), pulse = %target_pulse, "Checking parcel");
        match parcel.request.target() {
            Target::Jet(jet) => self.route(jet, target_pulse),
            Target::Object(object) => {
                self.resolve(&object, target_pulse, parcel.pulse, cancel).await
            },
        }
    }

    /// Finds the actual jet covering `object` at `target_pulse` and routes it.
    ///
    /// `request_pulse` is the pulse the request was sent in; stale jets are
    /// fetched from their executor at the pulse before it.
    ///
    /// # Errors
    ///
    /// - [`ResolveError::RetriesExceeded`](crate::ResolveError::RetriesExceeded) when no actual
    ///   jet was found within the retry budget.
    /// - [`ResolveError::Cancelled`](crate::ResolveError::Cancelled) when `cancel` fires.
    /// - [`ResolveError::UnexpectedReply`](crate::ResolveError::UnexpectedReply) when a peer
    ///   answers with anything but a jet covering the object.
    /// - Coordinator and pulse lookup failures.
    pub async fn resolve(
        &self,
        object: &RecordId,
        target_pulse: PulseNumber,
        request_pulse: PulseNumber,
        cancel: &CancellationToken,
    ) -> Result<Resolution> {
        let jet = self.fetch_actual(object, target_pulse, request_pulse, cancel).await?;
        self.route(jet, target_pulse)
    }

    fn route(&self, jet: JetId, pulse: PulseNumber) -> Result<Resolution> {
        let executor = self.coordinator.executor_for_jet(jet, pulse).context(CoordinatorSnafu)?;
        let local = executor == self.coordinator.me();
        metrics::record_resolution(local);
        if local {
            return Ok(Resolution::Local { jet });
        }
        debug!(jet = %jet, pulse = %pulse, executor = %executor, "Jet executed elsewhere");
        Ok(Resolution::Miss { jet, executor })
    }

    async fn fetch_actual(
        &self,
        object: &RecordId,
        target_pulse: PulseNumber,
        request_pulse: PulseNumber,
        cancel: &CancellationToken,
    ) -> Result<JetId> {
        let mut attempts: u32 = 0;
        // Jet named by an unconfirmed reply; re-queried before it is merged.
        let mut pending: Option<JetId> = None;

        loop {
            if cancel.is_cancelled() {
                return CancelledSnafu.fail();
            }

            let (local, actual) = self.jets.for_id(target_pulse, &object.hash);
            if actual {
                return Ok(local);
            }

            if attempts >= self.config.max_retries {
                warn!(
                    object = %object,
                    pulse = %target_pulse,
                    jet = %local,
                    attempts,
                    "Jet still stale after retry budget"
                );
                metrics::record_retries_exceeded();
                return RetriesExceededSnafu {
                    object: *object,
                    jet: local,
                    pulse: target_pulse,
                    attempts,
                }
                .fail();
            }
            attempts += 1;

            let asked = pending.take().unwrap_or(local);
            let previous = self.pulses.previous(request_pulse).context(PulseSnafu)?;
            let executor =
                self.coordinator.executor_for_jet(asked, previous).context(CoordinatorSnafu)?;
            let latest = self.pulses.latest().context(PulseSnafu)?;

            debug!(
                object = %object,
                jet = %asked,
                executor = %executor,
                attempt = attempts,
                "Fetching stale jet"
            );

            let request = Request::GetJet { object: *object, jet: asked, pulse: target_pulse };
            let options = SendOptions { receiver: executor.clone() };
            let started = Instant::now();
            let sent = tokio::select! {
                biased;
                () = cancel.cancelled() => {
                    return CancelledSnafu.fail();
                }
                sent = tokio::time::timeout(
                    self.config.fetch_timeout,
                    self.bus.send(request, latest, options),
                ) => sent,
            };

            let reply = match sent {
                Ok(Ok(reply)) => {
                    metrics::record_fetch(started.elapsed().as_secs_f64());
                    reply
                },
                Ok(Err(e)) => {
                    metrics::record_fetch_error();
                    warn!(jet = %asked, executor = %executor, error = %e, "Jet fetch failed");
                    continue;
                },
                Err(_) => {
                    metrics::record_fetch_timeout();
                    warn!(
                        jet = %asked,
                        executor = %executor,
                        timeout = ?self.config.fetch_timeout,
                        "Jet fetch timed out"
                    );
                    continue;
                },
            };

            match reply {
                Reply::Jet { id, actual } => {
                    if !id.contains(&object.hash) {
                        return UnexpectedReplySnafu {
                            description: format!("{id} does not cover {object}"),
                        }
                        .fail();
                    }
                    if id != asked {
                        debug!(asked = %asked, got = %id, "Peer named another jet, re-querying");
                        pending = Some(id);
                    } else if actual {
                        self.jets.merge_actual(target_pulse, id);
                        metrics::record_jet_merged();
                    }
                },
                Reply::JetMiss { jet, executor } => {
                    return UnexpectedReplySnafu {
                        description: format!("jet miss for {jet} to {executor}"),
                    }
                    .fail();
                },
                Reply::Error { message } => {
                    return UnexpectedReplySnafu { description: format!("error: {message}") }
                        .fail();
                },
            }
        }
    }
}

impl std::fmt::Debug for ShardResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShardResolver")
            .field("jets", &self.jets.len())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_miss_reply_only_for_remote() {
        let jet = JetId::ROOT.child(true).unwrap();
        let local = Resolution::Local { jet };
        assert!(local.is_local());
        assert_eq!(local.jet(), jet);
        assert!(local.miss_reply().is_none());

        let miss = Resolution::Miss { jet, executor: "node-b".into() };
        assert!(!miss.is_local());
        assert_eq!(miss.miss_reply(), Some(Reply::JetMiss { jet, executor: "node-b".into() }));
    }
}
