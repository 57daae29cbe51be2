//! End-to-end resolution against mocked peers.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

mod common;

use std::{sync::Arc, time::Duration};

use common::{
    HangingBus, ME, MockCoordinator, NetworkBus, PEER, PULSE, ScriptedBus, Sent, config,
    init_tracing, object, pulse_chain, resolver,
};
use jetledger_jet::JetStore;
use jetledger_resolver::{
    BusError, LedgerRequest, Parcel, ParcelJournal, Reply, Request, ResolveError, Resolution,
    ShardResolver,
};
use jetledger_types::{JetId, PulseNumber};
use tokio_util::sync::CancellationToken;

const LONG: Duration = Duration::from_secs(10);
const SHORT: Duration = Duration::from_millis(20);

fn right() -> JetId {
    JetId::ROOT.child(true).unwrap()
}

fn left() -> JetId {
    JetId::ROOT.child(false).unwrap()
}

/// Local node executes everything at `PULSE`; the peer executed everything
/// at the pulse before it.
fn coordinator() -> MockCoordinator {
    MockCoordinator::new(ME, None).assign(PULSE, ME).assign(PulseNumber::GENESIS, PEER)
}

async fn resolve(resolver: &ShardResolver, first: bool) -> Result<Resolution, ResolveError> {
    resolver.resolve(&object(first, 1), PULSE, PULSE, &CancellationToken::new()).await
}

#[tokio::test]
async fn test_actual_local_tree_needs_no_fetch() {
    init_tracing();
    let jets = Arc::new(JetStore::new());
    jets.update(PULSE, true, &[JetId::ROOT]).unwrap();
    let bus = Arc::new(ScriptedBus::default());
    let resolver = resolver(jets, coordinator(), bus.clone(), config(10, LONG));

    let resolution = resolve(&resolver, true).await.unwrap();

    assert_eq!(resolution, Resolution::Local { jet: JetId::ROOT });
    assert!(bus.sent().is_empty());
}

#[tokio::test]
async fn test_zero_retries_fails_without_network() {
    init_tracing();
    let bus = Arc::new(ScriptedBus::default());
    let resolver = resolver(Arc::new(JetStore::new()), coordinator(), bus.clone(), config(0, LONG));

    let err = resolve(&resolver, true).await.unwrap_err();

    match err {
        ResolveError::RetriesExceeded { pulse, attempts, jet, .. } => {
            assert_eq!(pulse, PULSE);
            assert_eq!(attempts, 0);
            assert_eq!(jet, JetId::ROOT);
        },
        other => panic!("expected RetriesExceeded, got {other:?}"),
    }
    assert!(bus.sent().is_empty());
}

#[tokio::test]
async fn test_stale_jet_fetched_from_previous_executor_and_merged() {
    init_tracing();
    let jets = Arc::new(JetStore::new());
    let bus = Arc::new(ScriptedBus::new([Ok(Reply::Jet { id: JetId::ROOT, actual: true })]));
    let resolver = resolver(Arc::clone(&jets), coordinator(), bus.clone(), config(10, LONG));

    let resolution = resolve(&resolver, true).await.unwrap();

    assert_eq!(resolution, Resolution::Local { jet: JetId::ROOT });
    assert_eq!(jets.for_id(PULSE, &object(false, 9).hash), (JetId::ROOT, true));
    assert_eq!(
        bus.sent(),
        vec![Sent {
            request: Request::GetJet { object: object(true, 1), jet: JetId::ROOT, pulse: PULSE },
            pulse: PULSE,
            receiver: PEER.to_string(),
        }]
    );
}

#[tokio::test]
async fn test_jet_executed_elsewhere_is_a_miss() {
    init_tracing();
    let jets = Arc::new(JetStore::new());
    jets.update(PULSE, true, &[JetId::ROOT]).unwrap();
    let coordinator = MockCoordinator::new(ME, Some(PEER));
    let resolver = resolver(jets, coordinator, Arc::new(ScriptedBus::default()), config(10, LONG));

    let resolution = resolve(&resolver, false).await.unwrap();

    assert_eq!(resolution, Resolution::Miss { jet: JetId::ROOT, executor: PEER.to_string() });
    assert_eq!(
        resolution.miss_reply(),
        Some(Reply::JetMiss { jet: JetId::ROOT, executor: PEER.to_string() })
    );
}

#[tokio::test]
async fn test_timeouts_consume_attempts() {
    init_tracing();
    let bus = Arc::new(HangingBus::default());
    let resolver = resolver(Arc::new(JetStore::new()), coordinator(), bus.clone(), config(2, SHORT));

    let err = resolve(&resolver, true).await.unwrap_err();

    assert!(matches!(err, ResolveError::RetriesExceeded { attempts: 2, .. }), "got {err:?}");
    assert!(err.is_retryable());
    assert_eq!(bus.calls(), 2);
}

#[tokio::test]
async fn test_bus_error_consumes_one_attempt() {
    init_tracing();
    let unreachable =
        BusError::Unreachable { receiver: PEER.to_string(), message: "reset".to_string() };

    let bus = Arc::new(ScriptedBus::new([
        Err(unreachable.clone()),
        Ok(Reply::Jet { id: JetId::ROOT, actual: true }),
    ]));
    let resolver = resolver(Arc::new(JetStore::new()), coordinator(), bus.clone(), config(2, LONG));
    assert_eq!(resolve(&resolver, true).await.unwrap(), Resolution::Local { jet: JetId::ROOT });
    assert_eq!(bus.sent().len(), 2);

    let bus = Arc::new(ScriptedBus::new([
        Err(unreachable),
        Ok(Reply::Jet { id: JetId::ROOT, actual: true }),
    ]));
    let resolver = common::resolver(Arc::new(JetStore::new()), coordinator(), bus.clone(), config(1, LONG));
    let err = resolve(&resolver, true).await.unwrap_err();
    assert!(matches!(err, ResolveError::RetriesExceeded { attempts: 1, .. }), "got {err:?}");
    assert_eq!(bus.sent().len(), 1);
}

#[tokio::test]
async fn test_retries_exceeded_names_last_stale_jet() {
    init_tracing();
    let jets = Arc::new(JetStore::new());
    jets.split(PULSE, JetId::ROOT).unwrap();
    let bus = Arc::new(ScriptedBus::new([Ok(Reply::Jet { id: right(), actual: false })]));
    let resolver = resolver(Arc::clone(&jets), coordinator(), bus.clone(), config(1, LONG));

    let err = resolve(&resolver, true).await.unwrap_err();

    match err {
        ResolveError::RetriesExceeded { jet, attempts, .. } => {
            assert_eq!(jet, right());
            assert_eq!(attempts, 1);
        },
        other => panic!("expected RetriesExceeded, got {other:?}"),
    }
    assert_eq!(bus.sent()[0].request, Request::GetJet {
        object: object(true, 1),
        jet: right(),
        pulse: PULSE,
    });
}

#[tokio::test]
async fn test_inactive_confirmation_consumes_attempt() {
    init_tracing();
    let bus = Arc::new(ScriptedBus::new([
        Ok(Reply::Jet { id: JetId::ROOT, actual: false }),
        Ok(Reply::Jet { id: JetId::ROOT, actual: false }),
        Ok(Reply::Jet { id: JetId::ROOT, actual: false }),
    ]));
    let jets = Arc::new(JetStore::new());
    let resolver = resolver(Arc::clone(&jets), coordinator(), bus.clone(), config(3, LONG));

    let err = resolve(&resolver, true).await.unwrap_err();

    assert!(matches!(err, ResolveError::RetriesExceeded { attempts: 3, .. }), "got {err:?}");
    assert_eq!(bus.sent().len(), 3);
    assert_eq!(jets.for_id(PULSE, &object(true, 1).hash), (JetId::ROOT, false));
}

#[tokio::test]
async fn test_cancellation_abandons_in_flight_fetch() {
    init_tracing();
    let bus = Arc::new(HangingBus::default());
    let resolver = resolver(Arc::new(JetStore::new()), coordinator(), bus.clone(), config(10, LONG));
    let cancel = CancellationToken::new();

    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(SHORT).await;
        trigger.cancel();
    });

    let started = std::time::Instant::now();
    let err = resolver.resolve(&object(true, 1), PULSE, PULSE, &cancel).await.unwrap_err();

    assert!(matches!(err, ResolveError::Cancelled), "got {err:?}");
    assert!(!err.is_retryable());
    assert!(started.elapsed() < LONG);
    assert_eq!(bus.calls(), 1);
}

#[tokio::test]
async fn test_cancelled_before_start_sends_nothing() {
    init_tracing();
    let bus = Arc::new(HangingBus::default());
    let resolver = resolver(Arc::new(JetStore::new()), coordinator(), bus.clone(), config(10, LONG));
    let cancel = CancellationToken::new();
    cancel.cancel();

    let err = resolver.resolve(&object(true, 1), PULSE, PULSE, &cancel).await.unwrap_err();

    assert!(matches!(err, ResolveError::Cancelled), "got {err:?}");
    assert_eq!(bus.calls(), 0);
}

#[tokio::test]
async fn test_different_jet_is_requeried_before_merge() {
    init_tracing();
    let jets = Arc::new(JetStore::new());
    let bus = Arc::new(ScriptedBus::new([
        Ok(Reply::Jet { id: right(), actual: true }),
        Ok(Reply::Jet { id: right(), actual: true }),
    ]));
    let resolver = resolver(Arc::clone(&jets), coordinator(), bus.clone(), config(10, LONG));

    let resolution = resolve(&resolver, true).await.unwrap();

    assert_eq!(resolution, Resolution::Local { jet: right() });
    let asked: Vec<JetId> = bus
        .sent()
        .into_iter()
        .map(|sent| match sent.request {
            Request::GetJet { jet, .. } => jet,
        })
        .collect();
    assert_eq!(asked, vec![JetId::ROOT, right()]);
    assert_eq!(jets.for_id(PULSE, &object(false, 1).hash), (left(), false));
}

#[tokio::test]
async fn test_unexpected_replies_are_fatal() {
    init_tracing();
    let replies = [
        Reply::Jet { id: left(), actual: true },
        Reply::JetMiss { jet: JetId::ROOT, executor: PEER.to_string() },
        Reply::Error { message: "boom".to_string() },
    ];
    for reply in replies {
        let bus = Arc::new(ScriptedBus::new([Ok(reply.clone())]));
        let resolver =
            resolver(Arc::new(JetStore::new()), coordinator(), bus.clone(), config(10, LONG));

        let err = resolve(&resolver, true).await.unwrap_err();

        assert!(matches!(err, ResolveError::UnexpectedReply { .. }), "{reply:?} gave {err:?}");
        assert!(!err.is_retryable());
        assert_eq!(bus.sent().len(), 1);
    }
}

#[tokio::test]
async fn test_missing_previous_pulse_is_reported() {
    init_tracing();
    let resolver = resolver(
        Arc::new(JetStore::new()),
        coordinator(),
        Arc::new(ScriptedBus::default()),
        config(10, LONG),
    );

    let err = resolver
        .resolve(&object(true, 1), PULSE, PulseNumber::GENESIS, &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(err, ResolveError::Pulse { .. }), "got {err:?}");
}

#[tokio::test]
async fn test_unassigned_jet_is_a_coordinator_error() {
    init_tracing();
    let jets = Arc::new(JetStore::new());
    jets.update(PULSE, true, &[JetId::ROOT]).unwrap();
    let resolver = resolver(
        jets,
        MockCoordinator::new(ME, None),
        Arc::new(ScriptedBus::default()),
        config(10, LONG),
    );

    let err = resolve(&resolver, true).await.unwrap_err();

    assert!(matches!(err, ResolveError::Coordinator { .. }), "got {err:?}");
    assert!(err.is_retryable());
}

#[tokio::test]
async fn test_resolves_against_peer_describer() {
    init_tracing();
    let peer = Arc::new(JetStore::new());
    let (l, r) = peer.split(PULSE, JetId::ROOT).unwrap();
    peer.update(PULSE, true, &[l, r]).unwrap();

    let bus = Arc::new(NetworkBus::default());
    bus.join(PEER, peer);
    let local = Arc::new(JetStore::new());
    let resolver = resolver(Arc::clone(&local), coordinator(), bus.clone(), config(10, LONG));

    assert_eq!(resolve(&resolver, true).await.unwrap(), Resolution::Local { jet: r });
    assert_eq!(bus.calls(), 2);

    assert_eq!(resolve(&resolver, false).await.unwrap(), Resolution::Local { jet: l });
    assert_eq!(bus.calls(), 3);

    // Both halves are now actual locally.
    assert_eq!(resolve(&resolver, true).await.unwrap(), Resolution::Local { jet: r });
    assert_eq!(bus.calls(), 3);
    assert_eq!(local.all(PULSE), vec![l, r]);
}

// ============================================================================
// Parcels
// ============================================================================

#[tokio::test]
async fn test_check_routes_object_requests_at_sent_pulse() {
    init_tracing();
    let jets = Arc::new(JetStore::new());
    jets.update(PULSE, true, &[JetId::ROOT]).unwrap();
    let bus = Arc::new(ScriptedBus::default());
    let resolver = resolver(jets, coordinator(), bus.clone(), config(10, LONG));

    let parcel = Parcel {
        request: LedgerRequest::SetRecord { object: object(true, 3), body: b"body".to_vec() },
        pulse: PULSE,
    };
    let resolution = resolver.check(&parcel, &CancellationToken::new()).await.unwrap();

    assert_eq!(resolution, Resolution::Local { jet: JetId::ROOT });
    assert!(bus.sent().is_empty());
}

#[tokio::test]
async fn test_check_bypasses_tree_for_jet_requests() {
    init_tracing();
    let jets = Arc::new(JetStore::new());
    let bus = Arc::new(ScriptedBus::default());
    // Stale everywhere: a tree lookup would need the network.
    let resolver = resolver(Arc::clone(&jets), coordinator(), bus.clone(), config(0, LONG));

    let parcel = Parcel {
        request: LedgerRequest::JetDrop {
            jet: right(),
            pulse: PulseNumber::GENESIS,
            drop: Vec::new(),
        },
        pulse: PULSE,
    };
    let resolution = resolver.check(&parcel, &CancellationToken::new()).await.unwrap();

    // Routed at the named pulse, where the peer executed.
    assert_eq!(resolution, Resolution::Miss { jet: right(), executor: PEER.to_string() });
    assert!(bus.sent().is_empty());
    assert!(jets.is_empty());
}

#[tokio::test]
async fn test_checked_local_parcel_journaled_under_its_jet() {
    init_tracing();
    let jets = Arc::new(JetStore::new());
    jets.update(PULSE, true, &[left(), right()]).unwrap();
    let store = pulse_chain();
    let resolver = ShardResolver::builder()
        .jets(jets)
        .pulses(store.clone())
        .coordinator(Arc::new(coordinator()))
        .bus(Arc::new(ScriptedBus::default()))
        .config(config(0, LONG))
        .build();
    let journal = ParcelJournal::new(store.as_ref().clone());

    let parcel = Parcel {
        request: LedgerRequest::SetRecord { object: object(true, 4), body: b"body".to_vec() },
        pulse: PULSE,
    };
    let resolution = resolver.check(&parcel, &CancellationToken::new()).await.unwrap();
    assert!(journal.save_resolved(&resolution, &parcel).unwrap().is_some());

    assert_eq!(journal.parcels(&right(), PULSE).unwrap(), vec![parcel]);
    assert!(journal.parcels(&left(), PULSE).unwrap().is_empty());
}
