//! Concurrent registry of jet trees, one per pulse.
//!
//! ## Locking
//!
//! Two tiers:
//! - a store-level lock over the `pulse → tree` map, held only to find, insert
//!   or remove an entry;
//! - a per-pulse lock on each tree, held for the duration of a tree operation.
//!
//! Lookups for different pulses never contend, readers of one pulse never
//! block each other, and a mutation excludes only users of that pulse's tree.
//! The store-level lock is never held while a tree lock is taken.

use std::{collections::HashMap, sync::Arc};

use jetledger_types::{Hash, JetId, PulseNumber};
use parking_lot::RwLock;
use tracing::{debug, info};

use crate::{
    error::{JetNotFoundSnafu, Result},
    tree::JetTree,
};

type SharedTree = Arc<RwLock<JetTree>>;

/// Registry owning every pulse's jet tree.
///
/// Absent pulses are created lazily as a fresh tree: actual only for the
/// genesis pulse, inactive otherwise.
#[derive(Debug, Default)]
pub struct JetStore {
    trees: RwLock<HashMap<PulseNumber, SharedTree>>,
}

impl JetStore {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    fn tree(&self, pulse: PulseNumber) -> SharedTree {
        if let Some(tree) = self.trees.read().get(&pulse) {
            return Arc::clone(tree);
        }
        let mut trees = self.trees.write();
        let tree = trees.entry(pulse).or_insert_with(|| {
            debug!(pulse = %pulse, "Creating default jet tree");
            Arc::new(RwLock::new(JetTree::new(pulse == PulseNumber::GENESIS)))
        });
        Arc::clone(tree)
    }

    /// Finds the jet covering `key` at `pulse` and whether it is actual.
    pub fn for_id(&self, pulse: PulseNumber, key: &Hash) -> (JetId, bool) {
        self.tree(pulse).read().find(key)
    }

    /// Sets the `actual` flag of every jet in `ids` at `pulse`.
    ///
    /// The batch is applied under one lock hold: readers of the pulse see all
    /// of it or none of it.
    ///
    /// # Errors
    ///
    /// Returns [`crate::JetError::JetNotFound`] if any id is absent, in which
    /// case nothing is changed.
    pub fn update(&self, pulse: PulseNumber, set_actual: bool, ids: &[JetId]) -> Result<()> {
        let tree = self.tree(pulse);
        let mut tree = tree.write();
        if let Some(missing) = ids.iter().find(|id| !tree.contains(id)) {
            return JetNotFoundSnafu { jet: *missing }.fail();
        }
        for id in ids {
            tree.update(*id, set_actual)?;
        }
        debug!(pulse = %pulse, set_actual, count = ids.len(), "Jets updated");
        Ok(())
    }

    /// Splits the leaf `jet` at `pulse`.
    pub fn split(&self, pulse: PulseNumber, jet: JetId) -> Result<(JetId, JetId)> {
        let (left, right) = self.tree(pulse).write().split(jet)?;
        info!(pulse = %pulse, jet = %jet, left = %left, right = %right, "Jet split");
        Ok((left, right))
    }

    /// Installs an authoritative `jet` as actual at `pulse`.
    pub fn merge_actual(&self, pulse: PulseNumber, jet: JetId) {
        self.tree(pulse).write().merge_actual(jet);
        debug!(pulse = %pulse, jet = %jet, "Merged actual jet");
    }

    /// Copies the tree of `from` into `to`, replacing whatever `to` held.
    pub fn clone_tree(&self, from: PulseNumber, to: PulseNumber) {
        self.install_copy(from, to, false);
    }

    /// Like [`JetStore::clone_tree`] but carries forward only actual jets.
    pub fn clone_actual(&self, from: PulseNumber, to: PulseNumber) {
        self.install_copy(from, to, true);
    }

    fn install_copy(&self, from: PulseNumber, to: PulseNumber, keep_actual_only: bool) {
        let copy = self.tree(from).read().clone_tree(keep_actual_only);
        let leaves = copy.leaf_ids().len();
        self.trees.write().insert(to, Arc::new(RwLock::new(copy)));
        info!(from = %from, to = %to, keep_actual_only, leaves, "Jet tree cloned");
    }

    /// Drops the tree of `pulse`.
    pub fn delete(&self, pulse: PulseNumber) {
        if self.trees.write().remove(&pulse).is_some() {
            debug!(pulse = %pulse, "Jet tree deleted");
        }
    }

    /// Leaf jets of `pulse` in key order.
    pub fn all(&self, pulse: PulseNumber) -> Vec<JetId> {
        self.tree(pulse).read().leaf_ids()
    }

    /// Point-in-time copy of the tree of `pulse`.
    pub fn snapshot(&self, pulse: PulseNumber) -> JetTree {
        self.tree(pulse).read().clone()
    }

    /// Pulses that currently have a tree, ascending.
    pub fn pulses(&self) -> Vec<PulseNumber> {
        let mut pulses: Vec<_> = self.trees.read().keys().copied().collect();
        pulses.sort_unstable();
        pulses
    }

    /// Number of pulses with a tree.
    pub fn len(&self) -> usize {
        self.trees.read().len()
    }

    /// Whether no pulse has a tree.
    pub fn is_empty(&self) -> bool {
        self.trees.read().is_empty()
    }
}
