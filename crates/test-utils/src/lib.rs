//! Shared test utilities for jetledger crates.
//!
//! - [`TestDir`] - Managed temporary directory with path helpers
//! - [`assert_eventually`] / [`wait_until`] - Poll a condition until it holds or times out
//! - [`strategies`] - Proptest generators for keys, pulses, jets and tree shapes

#![deny(unsafe_code)]

mod test_dir;
pub use test_dir::TestDir;

mod assertions;
pub use assertions::{assert_eventually, wait_until};

pub mod strategies;
