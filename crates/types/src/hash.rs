//! Cryptographic hashing functions for jetledger.
//!
//! All hashing uses SHA-256. This module provides:
//! - Basic SHA-256 hashing (record content hashes)
//! - The running accumulator used to compute jet drop hashes

use sha2::{Digest, Sha256};

/// SHA-256 hash output (32 bytes).
pub type Hash = [u8; 32];

/// Hash of empty input: SHA-256("").
///
/// This is the drop hash of a jet with no records for a pulse.
/// NOT zero bytes: every node must agree on the empty digest.
pub const EMPTY_HASH: Hash = [
    0xe3, 0xb0, 0xc4, 0x42, 0x98, 0xfc, 0x1c, 0x14, 0x9a, 0xfb, 0xf4, 0xc8, 0x99, 0x6f, 0xb9, 0x24,
    0x27, 0xae, 0x41, 0xe4, 0x64, 0x9b, 0x93, 0x4c, 0xa4, 0x95, 0x99, 0x1b, 0x78, 0x52, 0xb8, 0x55,
];

/// Zero hash: 32 zero bytes.
/// Used ONLY as the hash of the genesis drop anchoring a jet's drop chain.
pub const ZERO_HASH: Hash = [0u8; 32];

/// Compute SHA-256 hash of arbitrary data.
#[inline]
pub fn sha256(data: &[u8]) -> Hash {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// Running digest over record shallow hashes.
///
/// Starts from an empty state: the previous drop hash is linked by the drop
/// itself and is never fed into the accumulator.
#[derive(Clone, Default)]
pub struct DropHasher {
    inner: Sha256,
    count: u64,
}

impl DropHasher {
    /// Creates an empty accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds one record shallow hash.
    pub fn update(&mut self, shallow_hash: &Hash) {
        self.inner.update(shallow_hash);
        self.count += 1;
    }

    /// Number of hashes fed so far.
    pub fn count(&self) -> u64 {
        self.count
    }

    /// Consumes the accumulator and returns the digest.
    pub fn finalize(self) -> Hash {
        self.inner.finalize().into()
    }
}

impl std::fmt::Debug for DropHasher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DropHasher").field("count", &self.count).finish()
    }
}
