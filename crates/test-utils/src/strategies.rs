//! Proptest strategies for jetledger domain types.
//!
//! # Usage
//!
//! ```no_run
//! use jetledger_test_utils::strategies;
//! use proptest::prelude::*;
//!
//! proptest! {
//!     #[test]
//!     fn jet_contains_own_prefix(jet in strategies::arb_jet_id(16)) {
//!         prop_assert!(jet.contains(jet.prefix()));
//!     }
//! }
//! ```

use jetledger_types::{Hash, JetId, PulseNumber, RecordId};
use proptest::prelude::*;

/// Generates an arbitrary 32-byte key.
pub fn arb_hash() -> impl Strategy<Value = Hash> {
    any::<[u8; 32]>()
}

/// Generates a pulse number at or after genesis.
pub fn arb_pulse() -> impl Strategy<Value = PulseNumber> {
    (PulseNumber::GENESIS.value()..u32::MAX).prop_map(PulseNumber::new)
}

/// Generates a record id with a random pulse and hash.
pub fn arb_record_id() -> impl Strategy<Value = RecordId> {
    (arb_pulse(), arb_hash()).prop_map(|(pulse, hash)| RecordId::new(pulse, hash))
}

/// Generates a normalized jet id no deeper than `max_depth`.
pub fn arb_jet_id(max_depth: u8) -> impl Strategy<Value = JetId> {
    (0..=max_depth, arb_hash()).prop_map(|(depth, prefix)| JetId::new(depth, prefix))
}

/// Generates a record body of 0-255 bytes.
pub fn arb_record_body() -> impl Strategy<Value = Vec<u8>> {
    proptest::collection::vec(any::<u8>(), 0..256)
}

/// Generates a sequence of split paths, each a list of left/right choices.
///
/// Applying the paths from the root in order yields an arbitrary tree shape of
/// bounded depth.
pub fn arb_split_paths(max_depth: usize, max_splits: usize) -> impl Strategy<Value = Vec<Vec<bool>>> {
    proptest::collection::vec(proptest::collection::vec(any::<bool>(), 0..max_depth), 0..max_splits)
}
