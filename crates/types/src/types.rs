//! Core type definitions for jetledger.
//!
//! - Identifier types (PulseNumber, RecordId, JetId, NodeId)
//! - Bit addressing over the object key space

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::hash::Hash;

// ============================================================================
// Identifier Types
// ============================================================================

/// Generates a newtype wrapper around a numeric type for type-safe identifiers.
///
/// Each generated type provides:
/// - Standard derives: Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord
/// - Serde with `#[serde(transparent)]` for wire format compatibility
/// - `From<inner>` and `Into<inner>` conversions
/// - `Display` with a semantic prefix (e.g., `pulse:65537`)
/// - `new()` constructor and `value()` accessor
macro_rules! define_id {
    (
        $(#[$meta:meta])*
        $name:ident, $inner:ty, $prefix:expr
    ) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord,
            Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name($inner);

        impl $name {
            /// Creates a new identifier from a raw value.
            #[inline]
            pub const fn new(value: $inner) -> Self {
                Self(value)
            }

            /// Returns the raw numeric value.
            #[inline]
            pub const fn value(self) -> $inner {
                self.0
            }
        }

        impl From<$inner> for $name {
            #[inline]
            fn from(value: $inner) -> Self {
                Self(value)
            }
        }

        impl From<$name> for $inner {
            #[inline]
            fn from(id: $name) -> Self {
                id.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}:{}", $prefix, self.0)
            }
        }

        impl std::str::FromStr for $name {
            type Err = <$inner as std::str::FromStr>::Err;

            fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
                s.parse::<$inner>().map(Self)
            }
        }
    };
}

define_id!(
    /// Discrete epoch identifier versioning all sharding and storage state.
    ///
    /// Pulse numbers increase monotonically. In storage keys they are encoded
    /// big-endian so that byte order equals pulse order.
    ///
    /// # Display
    ///
    /// Formats with `pulse:` prefix: `pulse:65537`.
    PulseNumber, u32, "pulse"
);

impl PulseNumber {
    /// The first pulse of the network. Jet trees created for this pulse start
    /// with an authoritative root.
    pub const GENESIS: Self = Self(65537);

    /// Encoded size in bytes.
    pub const SIZE: usize = 4;

    /// Big-endian encoding used inside storage keys.
    #[inline]
    pub const fn to_be_bytes(self) -> [u8; Self::SIZE] {
        self.0.to_be_bytes()
    }

    /// Decodes a big-endian pulse number.
    #[inline]
    pub const fn from_be_bytes(bytes: [u8; Self::SIZE]) -> Self {
        Self(u32::from_be_bytes(bytes))
    }
}

/// Identity of a node in the network.
pub type NodeId = String;

/// Maximum depth a jet can reach in the jet tree.
pub const MAX_JET_DEPTH: u8 = u8::MAX;

/// Returns bit `index` of a key, most significant bit first.
#[inline]
pub fn key_bit(key: &Hash, index: u8) -> bool {
    let byte = key[usize::from(index / 8)];
    (byte >> (7 - index % 8)) & 1 == 1
}

// ============================================================================
// Record Identifier
// ============================================================================

/// Identifier of a record: the pulse it was created in plus its content hash.
///
/// The hash part is the record's shallow hash. It is also the bit string the
/// jet tree routes on, so an object stays in the same jet subtree regardless of
/// the pulse its records were written in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RecordId {
    /// Pulse the record was created in.
    pub pulse: PulseNumber,
    /// Content hash of the record.
    pub hash: Hash,
}

impl RecordId {
    /// Encoded size in bytes: pulse (4) + hash (32).
    pub const SIZE: usize = PulseNumber::SIZE + 32;

    /// Creates a record identifier.
    pub const fn new(pulse: PulseNumber, hash: Hash) -> Self {
        Self { pulse, hash }
    }

    /// Encodes as `pulse(BE) ‖ hash`.
    pub fn to_bytes(&self) -> [u8; Self::SIZE] {
        let mut buf = [0u8; Self::SIZE];
        buf[..PulseNumber::SIZE].copy_from_slice(&self.pulse.to_be_bytes());
        buf[PulseNumber::SIZE..].copy_from_slice(&self.hash);
        buf
    }

    /// Decodes from `pulse(BE) ‖ hash`. Returns `None` on a length mismatch.
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        if bytes.len() != Self::SIZE {
            return None;
        }
        let pulse = PulseNumber::from_be_bytes(bytes[..PulseNumber::SIZE].try_into().ok()?);
        let hash = bytes[PulseNumber::SIZE..].try_into().ok()?;
        Some(Self { pulse, hash })
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "rec:{}:", self.pulse.value())?;
        for byte in &self.hash[..8] {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

// ============================================================================
// Jet Identifier
// ============================================================================

/// Identifier of a jet: a bit prefix of the object key space.
///
/// The root jet has depth 0 and covers every key. A jet at depth `d` covers all
/// keys whose first `d` bits equal its prefix. Bits of `prefix` past `depth` are
/// always zero, so two ids covering the same range compare equal. Decoding
/// goes through [`JetId::new`] and normalizes foreign input the same way.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "(u8, Hash)", into = "(u8, Hash)")]
pub struct JetId {
    depth: u8,
    prefix: Hash,
}

impl JetId {
    /// The root jet covering the entire key space.
    pub const ROOT: Self = Self { depth: 0, prefix: [0u8; 32] };

    /// Encoded size in bytes: depth (1) + prefix (32).
    pub const SIZE: usize = 1 + 32;

    /// Creates a jet id, clearing any prefix bits past `depth`.
    pub fn new(depth: u8, prefix: Hash) -> Self {
        let mut prefix = prefix;
        let full = usize::from(depth / 8);
        let rem = depth % 8;
        let mut clear_from = full;
        if rem > 0 {
            prefix[full] &= 0xFFu8 << (8 - rem);
            clear_from += 1;
        }
        for byte in prefix.iter_mut().skip(clear_from) {
            *byte = 0;
        }
        Self { depth, prefix }
    }

    /// Returns the depth of this jet in the tree.
    #[inline]
    pub const fn depth(&self) -> u8 {
        self.depth
    }

    /// Returns the (normalized) prefix bits.
    #[inline]
    pub const fn prefix(&self) -> &Hash {
        &self.prefix
    }

    /// Returns true for the root jet.
    #[inline]
    pub const fn is_root(&self) -> bool {
        self.depth == 0
    }

    /// Returns prefix bit `index`. Only meaningful for `index < depth`.
    #[inline]
    pub fn bit(&self, index: u8) -> bool {
        key_bit(&self.prefix, index)
    }

    /// Returns the child jet on the given side (`false` = left/0, `true` = right/1).
    ///
    /// Returns `None` if this jet is already at [`MAX_JET_DEPTH`].
    pub fn child(&self, right: bool) -> Option<Self> {
        if self.depth == MAX_JET_DEPTH {
            return None;
        }
        let mut prefix = self.prefix;
        if right {
            let index = usize::from(self.depth);
            prefix[index / 8] |= 0x80 >> (index % 8);
        }
        Some(Self { depth: self.depth + 1, prefix })
    }

    /// Returns the parent jet, or `None` for the root.
    pub fn parent(&self) -> Option<Self> {
        if self.depth == 0 {
            return None;
        }
        Some(Self::new(self.depth - 1, self.prefix))
    }

    /// Returns true if `key` falls inside this jet's range.
    pub fn contains(&self, key: &Hash) -> bool {
        Self::new(self.depth, *key).prefix == self.prefix
    }

    /// Encodes as `depth ‖ prefix`.
    pub fn to_bytes(&self) -> [u8; Self::SIZE] {
        let mut buf = [0u8; Self::SIZE];
        buf[0] = self.depth;
        buf[1..].copy_from_slice(&self.prefix);
        buf
    }

    /// Decodes from `depth ‖ prefix`. Returns `None` on a length mismatch.
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        if bytes.len() != Self::SIZE {
            return None;
        }
        let prefix: Hash = bytes[1..].try_into().ok()?;
        Some(Self::new(bytes[0], prefix))
    }
}

impl From<(u8, Hash)> for JetId {
    fn from((depth, prefix): (u8, Hash)) -> Self {
        Self::new(depth, prefix)
    }
}

impl From<JetId> for (u8, Hash) {
    fn from(jet: JetId) -> Self {
        (jet.depth, jet.prefix)
    }
}

impl Default for JetId {
    fn default() -> Self {
        Self::ROOT
    }
}

impl fmt::Display for JetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "jet:{}:", self.depth)?;
        for index in 0..self.depth {
            f.write_str(if self.bit(index) { "1" } else { "0" })?;
        }
        Ok(())
    }
}
