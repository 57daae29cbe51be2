//! Scoped key encoding.
//!
//! Every stored key is `scope-byte ‖ encoded-subkey`:
//!
//! | Scope        | Byte | Subkey                                  |
//! |--------------|------|-----------------------------------------|
//! | Lifeline     | 1    | `pulse(4 BE) ‖ hash(32)` of the object  |
//! | Record       | 2    | `jet(33) ‖ pulse(4 BE) ‖ hash(32)`      |
//! | JetDrop      | 3    | `jet(33) ‖ pulse(4 BE)`                 |
//! | Entropy      | 4    | `pulse(4 BE)`                           |
//! | Message      | 5    | `jet(33) ‖ pulse(4 BE) ‖ hash(32)`      |
//!
//! Object and class lifelines share the lifeline scope; both are keyed by the
//! record id that created them.
//! Pulses are big-endian so a range scan over a `jet ‖ pulse` prefix visits
//! records in a stable, deterministic order.

use jetledger_types::{Hash, JetId, PulseNumber, RecordId};

/// Key-space scope tag, the first byte of every stored key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Scope {
    /// Object lifeline indices.
    Lifeline = 1,
    /// Records, grouped by jet and pulse.
    Record = 2,
    /// Jet drops, grouped by jet.
    JetDrop = 3,
    /// Pulse entropy.
    Entropy = 4,
    /// Parcels handled locally, grouped by jet and pulse.
    Message = 5,
}

impl Scope {
    /// Returns the tag byte.
    #[inline]
    pub const fn byte(self) -> u8 {
        self as u8
    }

    /// Parses a tag byte.
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            1 => Some(Self::Lifeline),
            2 => Some(Self::Record),
            3 => Some(Self::JetDrop),
            4 => Some(Self::Entropy),
            5 => Some(Self::Message),
            _ => None,
        }
    }
}

/// Length of a record key.
pub const RECORD_KEY_LEN: usize = 1 + JetId::SIZE + RecordId::SIZE;

/// Builds `scope ‖ part0 ‖ part1 ‖ ...`.
pub fn prefix_key(scope: Scope, parts: &[&[u8]]) -> Vec<u8> {
    let len = 1 + parts.iter().map(|p| p.len()).sum::<usize>();
    let mut key = Vec::with_capacity(len);
    key.push(scope.byte());
    for part in parts {
        key.extend_from_slice(part);
    }
    key
}

/// Key of an object's or class's lifeline index.
pub fn lifeline_key(object: &RecordId) -> Vec<u8> {
    prefix_key(Scope::Lifeline, &[&object.to_bytes()])
}

/// Key of a record stored in `jet`.
pub fn record_key(jet: &JetId, id: &RecordId) -> Vec<u8> {
    prefix_key(Scope::Record, &[&jet.to_bytes(), &id.to_bytes()])
}

/// Common prefix of every record of `jet` created in `pulse`.
pub fn record_prefix(jet: &JetId, pulse: PulseNumber) -> Vec<u8> {
    prefix_key(Scope::Record, &[&jet.to_bytes(), &pulse.to_be_bytes()])
}

/// Inclusive key bounds covering every record of `jet` at `pulse`.
pub fn record_range(jet: &JetId, pulse: PulseNumber) -> (Vec<u8>, Vec<u8>) {
    let prefix = record_prefix(jet, pulse);
    let mut start = prefix.clone();
    start.extend_from_slice(&[0x00; 32]);
    let mut end = prefix;
    end.extend_from_slice(&[0xFF; 32]);
    (start, end)
}

/// Key of the drop of `jet` at `pulse`.
pub fn drop_key(jet: &JetId, pulse: PulseNumber) -> Vec<u8> {
    prefix_key(Scope::JetDrop, &[&jet.to_bytes(), &pulse.to_be_bytes()])
}

/// Key of a message handled in `jet` at `pulse`, addressed by its hash.
pub fn message_key(jet: &JetId, pulse: PulseNumber, hash: &Hash) -> Vec<u8> {
    prefix_key(Scope::Message, &[&jet.to_bytes(), &pulse.to_be_bytes(), hash])
}

/// Inclusive key bounds covering every message of `jet` at `pulse`.
pub fn message_range(jet: &JetId, pulse: PulseNumber) -> (Vec<u8>, Vec<u8>) {
    let prefix = prefix_key(Scope::Message, &[&jet.to_bytes(), &pulse.to_be_bytes()]);
    let mut start = prefix.clone();
    start.extend_from_slice(&[0x00; 32]);
    let mut end = prefix;
    end.extend_from_slice(&[0xFF; 32]);
    (start, end)
}

/// Key of a pulse's entropy.
pub fn entropy_key(pulse: PulseNumber) -> Vec<u8> {
    prefix_key(Scope::Entropy, &[&pulse.to_be_bytes()])
}

/// Splits a record key back into its jet and record id.
pub fn decode_record_key(key: &[u8]) -> Option<(JetId, RecordId)> {
    if key.len() != RECORD_KEY_LEN || Scope::from_byte(key[0]) != Some(Scope::Record) {
        return None;
    }
    let jet = JetId::from_bytes(&key[1..1 + JetId::SIZE])?;
    let id = RecordId::from_bytes(&key[1 + JetId::SIZE..])?;
    Some((jet, id))
}

/// Returns the shallow hash (trailing 32 bytes) of a record key.
pub fn shallow_hash(key: &[u8]) -> Option<Hash> {
    if key.len() != RECORD_KEY_LEN {
        return None;
    }
    key[RECORD_KEY_LEN - 32..].try_into().ok()
}
