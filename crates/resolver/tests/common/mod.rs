//! Test doubles for the resolver's collaborators.

#![allow(dead_code, clippy::unwrap_used, clippy::expect_used)]

use std::{
    collections::{HashMap, VecDeque},
    sync::Arc,
    time::Duration,
};

use async_trait::async_trait;
use jetledger_jet::JetStore;
use jetledger_resolver::{
    BusError, CoordinatorError, JetCoordinator, JetDescriber, MessageBus, Reply, Request,
    SendOptions, ShardResolver,
};
use jetledger_store::Store;
use jetledger_types::{
    JetId, NodeId, PulseNumber, RecordId,
    config::{ResolverConfig, StoreConfig},
};
use parking_lot::Mutex;

pub const PULSE: PulseNumber = PulseNumber::new(65547);
pub const ME: &str = "node-a";
pub const PEER: &str = "node-b";

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Pulse chain GENESIS -> PULSE.
pub fn pulse_chain() -> Arc<Store> {
    let store = Store::open_in_memory(StoreConfig::default()).unwrap();
    store.add_pulse(PulseNumber::GENESIS).unwrap();
    store.add_pulse(PULSE).unwrap();
    Arc::new(store)
}

/// Object whose key starts with bit `first`.
pub fn object(first: bool, tag: u8) -> RecordId {
    let mut hash = [tag; 32];
    hash[0] = if first { 0x80 | tag } else { tag & 0x7F };
    RecordId::new(PulseNumber::GENESIS, hash)
}

pub fn config(max_retries: u32, fetch_timeout: Duration) -> ResolverConfig {
    ResolverConfig::builder()
        .max_retries(max_retries)
        .fetch_timeout(fetch_timeout)
        .build()
        .unwrap()
}

// ============================================================================
// Coordinator
// ============================================================================

/// Assigns executors per pulse, falling back to a default node.
pub struct MockCoordinator {
    me: NodeId,
    by_pulse: Mutex<HashMap<PulseNumber, NodeId>>,
    fallback: Option<NodeId>,
}

impl MockCoordinator {
    pub fn new(me: &str, fallback: Option<&str>) -> Self {
        Self {
            me: me.to_string(),
            by_pulse: Mutex::new(HashMap::new()),
            fallback: fallback.map(str::to_string),
        }
    }

    pub fn assign(self, pulse: PulseNumber, node: &str) -> Self {
        self.by_pulse.lock().insert(pulse, node.to_string());
        self
    }
}

impl JetCoordinator for MockCoordinator {
    fn executor_for_jet(&self, jet: JetId, pulse: PulseNumber) -> Result<NodeId, CoordinatorError> {
        self.by_pulse
            .lock()
            .get(&pulse)
            .cloned()
            .or_else(|| self.fallback.clone())
            .ok_or(CoordinatorError::NoExecutor { jet, pulse })
    }

    fn me(&self) -> NodeId {
        self.me.clone()
    }
}

// ============================================================================
// Buses
// ============================================================================

/// A sent message as observed by a bus.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sent {
    pub request: Request,
    pub pulse: PulseNumber,
    pub receiver: NodeId,
}

/// Replies from a fixed script; `Closed` once the script runs out.
#[derive(Default)]
pub struct ScriptedBus {
    script: Mutex<VecDeque<Result<Reply, BusError>>>,
    sent: Mutex<Vec<Sent>>,
}

impl ScriptedBus {
    pub fn new(script: impl IntoIterator<Item = Result<Reply, BusError>>) -> Self {
        Self { script: Mutex::new(script.into_iter().collect()), sent: Mutex::new(Vec::new()) }
    }

    pub fn sent(&self) -> Vec<Sent> {
        self.sent.lock().clone()
    }
}

#[async_trait]
impl MessageBus for ScriptedBus {
    async fn send(
        &self,
        request: Request,
        pulse: PulseNumber,
        options: SendOptions,
    ) -> Result<Reply, BusError> {
        self.sent.lock().push(Sent { request, pulse, receiver: options.receiver });
        self.script.lock().pop_front().unwrap_or(Err(BusError::Closed))
    }
}

/// Never replies.
#[derive(Default)]
pub struct HangingBus {
    sent: Mutex<usize>,
}

impl HangingBus {
    pub fn calls(&self) -> usize {
        *self.sent.lock()
    }
}

#[async_trait]
impl MessageBus for HangingBus {
    async fn send(
        &self,
        _request: Request,
        _pulse: PulseNumber,
        _options: SendOptions,
    ) -> Result<Reply, BusError> {
        *self.sent.lock() += 1;
        std::future::pending().await
    }
}

/// Delivers requests to the describer registered for the receiver.
#[derive(Default)]
pub struct NetworkBus {
    nodes: Mutex<HashMap<NodeId, JetDescriber>>,
    calls: Mutex<usize>,
}

impl NetworkBus {
    pub fn join(&self, node: &str, jets: Arc<JetStore>) {
        self.nodes.lock().insert(node.to_string(), JetDescriber::new(jets));
    }

    pub fn calls(&self) -> usize {
        *self.calls.lock()
    }
}

#[async_trait]
impl MessageBus for NetworkBus {
    async fn send(
        &self,
        request: Request,
        _pulse: PulseNumber,
        options: SendOptions,
    ) -> Result<Reply, BusError> {
        *self.calls.lock() += 1;
        let describer = self.nodes.lock().get(&options.receiver).cloned().ok_or_else(|| {
            BusError::Unreachable {
                receiver: options.receiver.clone(),
                message: "not joined".to_string(),
            }
        })?;
        Ok(describer.handle(&request))
    }
}

pub fn resolver(
    jets: Arc<JetStore>,
    coordinator: MockCoordinator,
    bus: Arc<dyn MessageBus>,
    config: ResolverConfig,
) -> ShardResolver {
    ShardResolver::builder()
        .jets(jets)
        .pulses(pulse_chain())
        .coordinator(Arc::new(coordinator))
        .bus(bus)
        .config(config)
        .build()
}
