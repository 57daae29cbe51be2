//! Core types, hashing and configuration for jetledger.
//!
//! This crate provides the foundational types shared by the jet tree, the
//! shard resolver and the persistent store:
//! - Identifier types (PulseNumber, RecordId, JetId, NodeId)
//! - SHA-256 hashing helpers and the drop hash accumulator
//! - Postcard codec with snafu errors
//! - Validated configuration structs

pub mod codec;
pub mod config;
pub mod hash;
pub mod types;

// Re-export commonly used types at crate root
pub use hash::{DropHasher, EMPTY_HASH, Hash, ZERO_HASH, sha256};
pub use types::*;
