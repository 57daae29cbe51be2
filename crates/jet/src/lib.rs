//! jetledger-jet: jet trees and their per-pulse registry.
//!
//! A jet is a bit prefix of the object key space. Each pulse has a
//! [`JetTree`] whose leaves partition the key space into jets; the
//! [`JetStore`] owns one tree per pulse and serializes mutations per pulse.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod error;
pub mod store;
pub mod tree;

pub use error::{JetError, Result};
pub use store::JetStore;
pub use tree::JetTree;
