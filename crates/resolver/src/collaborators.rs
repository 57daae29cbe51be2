//! Services the resolver depends on but does not implement: executor
//! assignment, the message bus and the pulse chain.

use async_trait::async_trait;
use jetledger_store::{Store, StoreError};
use jetledger_types::{JetId, NodeId, PulseNumber};

use crate::{
    error::{BusError, CoordinatorError},
    message::{Reply, Request, SendOptions},
};

/// Assigns executors to jets.
pub trait JetCoordinator: Send + Sync {
    /// Node responsible for `jet` during `pulse`.
    fn executor_for_jet(&self, jet: JetId, pulse: PulseNumber) -> Result<NodeId, CoordinatorError>;

    /// Identity of the local node.
    fn me(&self) -> NodeId;
}

/// Sends requests to other nodes and waits for their reply.
#[async_trait]
pub trait MessageBus: Send + Sync {
    /// Sends `request` stamped with `pulse` and returns the reply.
    async fn send(
        &self,
        request: Request,
        pulse: PulseNumber,
        options: SendOptions,
    ) -> Result<Reply, BusError>;
}

/// Read access to the pulse chain.
pub trait PulseAccessor: Send + Sync {
    /// Most recent pulse.
    fn latest(&self) -> Result<PulseNumber, StoreError>;

    /// Pulse that preceded `pulse`.
    fn previous(&self, pulse: PulseNumber) -> Result<PulseNumber, StoreError>;
}

impl PulseAccessor for Store {
    fn latest(&self) -> Result<PulseNumber, StoreError> {
        self.current_pulse()
    }

    fn previous(&self, pulse: PulseNumber) -> Result<PulseNumber, StoreError> {
        self.previous_pulse(pulse)
    }
}
