//! Jet drop chain and drain barrier tests against a file-backed store.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    thread,
    time::Duration,
};

use jetledger_store::{JetDrop, ScopedRead, Store, StoreError};
use jetledger_test_utils::{TestDir, strategies, wait_until};
use jetledger_types::{DropHasher, EMPTY_HASH, JetId, PulseNumber, config::StoreConfig, sha256};
use proptest::prelude::*;

fn open(dir: &TestDir) -> Store {
    Store::open(dir.db_path(), StoreConfig::default()).expect("open store")
}

fn short_drain() -> StoreConfig {
    StoreConfig::builder().drain_timeout(Duration::from_millis(50)).build().unwrap()
}

#[test]
fn test_empty_jet_drop_hash() {
    let dir = TestDir::new();
    let store = open(&dir);
    let genesis = JetDrop::genesis(JetId::ROOT);

    let drop = store.set_drop(&JetId::ROOT, PulseNumber::GENESIS, &genesis).unwrap();

    assert_eq!(drop.hash, EMPTY_HASH);
    assert_eq!(drop.prev_hash, genesis.hash);
    assert_eq!(store.get_drop(&JetId::ROOT, PulseNumber::GENESIS).unwrap(), drop);
}

#[test]
fn test_consecutive_drops_chain() {
    let dir = TestDir::new();
    let store = open(&dir);
    let jet = JetId::ROOT;
    let p1 = PulseNumber::GENESIS;
    let p2 = PulseNumber::new(65547);

    store.set_record(&jet, p1, b"first").unwrap();
    let d1 = store.set_drop(&jet, p1, &JetDrop::genesis(jet)).unwrap();

    store.set_record(&jet, p2, b"second").unwrap();
    store.set_record(&jet, p2, b"third").unwrap();
    let d2 = store.set_drop(&jet, p2, &d1).unwrap();

    assert_eq!(d2.prev_hash, d1.hash);
    assert_ne!(d1.hash, d2.hash);
    assert_ne!(d1.hash, EMPTY_HASH);
}

#[test]
fn test_drop_hash_covers_only_its_jet_and_pulse_in_key_order() {
    let dir = TestDir::new();
    let store = open(&dir);
    let left = JetId::ROOT.child(false).unwrap();
    let right = JetId::ROOT.child(true).unwrap();
    let pulse = PulseNumber::GENESIS;

    let bodies: [&[u8]; 3] = [b"alpha", b"beta", b"gamma"];
    for body in bodies {
        store.set_record(&left, pulse, body).unwrap();
    }
    store.set_record(&right, pulse, b"elsewhere").unwrap();
    store.set_record(&left, PulseNumber::new(65547), b"later").unwrap();

    let mut hashes: Vec<_> = bodies.iter().map(|body| sha256(body)).collect();
    hashes.sort();
    let mut expected = DropHasher::new();
    for hash in &hashes {
        expected.update(hash);
    }

    let drop = store.set_drop(&left, pulse, &JetDrop::genesis(left)).unwrap();
    assert_eq!(drop.hash, expected.finalize());
}

#[test]
fn test_drop_survives_reopen() {
    let dir = TestDir::new();
    let jet = JetId::ROOT.child(true).unwrap();
    let drop = {
        let store = open(&dir);
        store.add_pulse(PulseNumber::GENESIS).unwrap();
        store.set_record(&jet, PulseNumber::GENESIS, b"durable").unwrap();
        store.set_drop(&jet, PulseNumber::GENESIS, &JetDrop::genesis(jet)).unwrap()
    };

    let store = open(&dir);
    assert_eq!(store.get_drop(&jet, PulseNumber::GENESIS).unwrap(), drop);
    assert_eq!(store.current_pulse().unwrap(), PulseNumber::GENESIS);
}

#[test]
fn test_drop_times_out_while_writer_open() {
    let store = Store::open_in_memory(short_drain()).unwrap();
    let pulse = PulseNumber::GENESIS;
    let writer = store.begin_write(pulse).unwrap();

    let err = store.set_drop(&JetId::ROOT, pulse, &JetDrop::genesis(JetId::ROOT)).unwrap_err();
    match err {
        StoreError::DrainTimeout { pulse: p, inflight, .. } => {
            assert_eq!(p, pulse);
            assert_eq!(inflight, 1);
        },
        other => panic!("expected DrainTimeout, got {other:?}"),
    }
    assert!(store.get_drop(&JetId::ROOT, pulse).unwrap_err().is_not_found());

    // Retrying after the writer finishes succeeds.
    writer.discard();
    store.set_drop(&JetId::ROOT, pulse, &JetDrop::genesis(JetId::ROOT)).unwrap();
}

#[test]
fn test_drop_waits_for_writer_and_includes_its_record() {
    let store = Store::open_in_memory(StoreConfig::default()).unwrap();
    let pulse = PulseNumber::GENESIS;
    let jet = JetId::ROOT;

    let mut writer = store.begin_write(pulse).unwrap();
    let id = writer.set_record(&jet, b"in flight").unwrap();

    let finished = Arc::new(AtomicBool::new(false));
    let handle = {
        let store = store.clone();
        let finished = Arc::clone(&finished);
        thread::spawn(move || {
            let drop = store.set_drop(&jet, pulse, &JetDrop::genesis(jet)).unwrap();
            finished.store(true, Ordering::SeqCst);
            drop
        })
    };

    assert!(!wait_until(Duration::from_millis(50), || finished.load(Ordering::SeqCst)));
    writer.commit().unwrap();

    let drop = handle.join().unwrap();
    let mut expected = DropHasher::new();
    expected.update(&id.hash);
    assert_eq!(drop.hash, expected.finalize());
}

#[test]
fn test_view_sees_record_hashes_sorted() {
    let store = Store::open_in_memory(StoreConfig::default()).unwrap();
    let pulse = PulseNumber::GENESIS;
    for body in [b"c".as_slice(), b"a", b"b"] {
        store.set_record(&JetId::ROOT, pulse, body).unwrap();
    }

    let hashes = store.view(|txn| txn.record_hashes(&JetId::ROOT, pulse)).unwrap();
    let mut sorted = hashes.clone();
    sorted.sort();
    assert_eq!(hashes, sorted);
    assert_eq!(hashes.len(), 3);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn test_drop_hash_independent_of_insert_order(
        bodies in proptest::collection::vec(strategies::arb_record_body(), 0..8),
    ) {
        let forward = Store::open_in_memory(StoreConfig::default()).unwrap();
        let backward = Store::open_in_memory(StoreConfig::default()).unwrap();
        let pulse = PulseNumber::GENESIS;

        for body in &bodies {
            forward.set_record(&JetId::ROOT, pulse, body).unwrap();
        }
        for body in bodies.iter().rev() {
            backward.set_record(&JetId::ROOT, pulse, body).unwrap();
        }

        let genesis = JetDrop::genesis(JetId::ROOT);
        let a = forward.set_drop(&JetId::ROOT, pulse, &genesis).unwrap();
        let b = backward.set_drop(&JetId::ROOT, pulse, &genesis).unwrap();
        prop_assert_eq!(a.hash, b.hash);
    }
}
