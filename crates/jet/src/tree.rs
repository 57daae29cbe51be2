//! Jet tree: a binary trie partitioning the object key space for one pulse.
//!
//! Every node covers the keys whose leading bits equal its prefix. A node is
//! either a leaf or has exactly two children (bit 0 left, bit 1 right), so the
//! leaves always partition the whole key space and a lookup always ends at
//! exactly one leaf. The `actual` flag marks a jet this node has confirmed to
//! be current for the pulse.

use std::fmt;

use jetledger_types::{Hash, JetId, key_bit};

use crate::error::{InvalidSplitSnafu, JetNotFoundSnafu, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
struct Node {
    actual: bool,
    children: Option<Box<(Node, Node)>>,
}

impl Node {
    fn leaf(actual: bool) -> Self {
        Self { actual, children: None }
    }

    fn is_leaf(&self) -> bool {
        self.children.is_none()
    }

    fn count(&self) -> usize {
        match &self.children {
            None => 1,
            Some(children) => 1 + children.0.count() + children.1.count(),
        }
    }

    /// Copy keeping only actual leaves. Returns `None` when this subtree has to
    /// collapse into its nearest actual ancestor.
    fn prune_inactive(&self) -> Option<Node> {
        let Some(children) = &self.children else {
            return self.actual.then(|| Node::leaf(true));
        };
        match (children.0.prune_inactive(), children.1.prune_inactive()) {
            (Some(left), Some(right)) => {
                Some(Node { actual: self.actual, children: Some(Box::new((left, right))) })
            },
            _ => self.actual.then(|| Node::leaf(true)),
        }
    }

    fn collect_leaves(&self, id: JetId, out: &mut Vec<(JetId, bool)>) {
        match (&self.children, id.child(false), id.child(true)) {
            (Some(children), Some(left), Some(right)) => {
                children.0.collect_leaves(left, out);
                children.1.collect_leaves(right, out);
            },
            _ => out.push((id, self.actual)),
        }
    }

    fn write_indented(&self, id: JetId, indent: usize, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{:indent$}{id} actual={}", "", self.actual, indent = indent * 2)?;
        if let (Some(children), Some(left), Some(right)) =
            (&self.children, id.child(false), id.child(true))
        {
            children.0.write_indented(left, indent + 1, f)?;
            children.1.write_indented(right, indent + 1, f)?;
        }
        Ok(())
    }
}

/// Jet tree for a single pulse.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JetTree {
    root: Node,
    default_actual: bool,
}

impl JetTree {
    /// Creates a tree with a single root leaf whose flag is `default_actual`.
    pub fn new(default_actual: bool) -> Self {
        Self { root: Node::leaf(default_actual), default_actual }
    }

    /// Flag the root had when this tree was created.
    pub fn default_actual(&self) -> bool {
        self.default_actual
    }

    /// Finds the leaf jet covering `key` and returns it with its `actual` flag.
    pub fn find(&self, key: &Hash) -> (JetId, bool) {
        let mut node = &self.root;
        let mut depth: u8 = 0;
        while let Some(children) = &node.children {
            node = if key_bit(key, depth) { &children.1 } else { &children.0 };
            depth += 1;
        }
        (JetId::new(depth, *key), node.actual)
    }

    fn node(&self, jet: &JetId) -> Option<&Node> {
        let mut node = &self.root;
        for index in 0..jet.depth() {
            let children = node.children.as_deref()?;
            node = if jet.bit(index) { &children.1 } else { &children.0 };
        }
        Some(node)
    }

    fn node_mut(&mut self, jet: &JetId) -> Option<&mut Node> {
        let mut node = &mut self.root;
        for index in 0..jet.depth() {
            let children = node.children.as_deref_mut()?;
            node = if jet.bit(index) { &mut children.1 } else { &mut children.0 };
        }
        Some(node)
    }

    /// Whether a node with exactly this prefix exists.
    pub fn contains(&self, jet: &JetId) -> bool {
        self.node(jet).is_some()
    }

    /// Returns the `actual` flag of the node with exactly this prefix.
    pub fn is_actual(&self, jet: &JetId) -> Option<bool> {
        self.node(jet).map(|node| node.actual)
    }

    /// Sets the `actual` flag of the node with exactly this prefix.
    ///
    /// # Errors
    ///
    /// Returns [`crate::JetError::JetNotFound`] if no such node exists.
    pub fn update(&mut self, jet: JetId, set_actual: bool) -> Result<()> {
        match self.node_mut(&jet) {
            Some(node) => {
                node.actual = set_actual;
                Ok(())
            },
            None => JetNotFoundSnafu { jet }.fail(),
        }
    }

    /// Turns the leaf `jet` into an internal node with two inactive leaves.
    ///
    /// # Errors
    ///
    /// Returns [`crate::JetError::InvalidSplit`] if `jet` is absent, is not a
    /// leaf, or is already at maximum depth.
    pub fn split(&mut self, jet: JetId) -> Result<(JetId, JetId)> {
        let (Some(left), Some(right)) = (jet.child(false), jet.child(true)) else {
            return InvalidSplitSnafu { jet, reason: "maximum depth reached" }.fail();
        };
        let Some(node) = self.node_mut(&jet) else {
            return InvalidSplitSnafu { jet, reason: "jet not found" }.fail();
        };
        if !node.is_leaf() {
            return InvalidSplitSnafu { jet, reason: "not a leaf" }.fail();
        }
        node.children = Some(Box::new((Node::leaf(false), Node::leaf(false))));
        Ok((left, right))
    }

    /// Makes `jet` an actual leaf, creating the path to it as needed.
    ///
    /// Leaves on the path are split and the new siblings start inactive. Any
    /// local subtree below `jet` is dropped. Used to install an authoritative
    /// answer from another node.
    pub fn merge_actual(&mut self, jet: JetId) {
        let mut node = &mut self.root;
        for index in 0..jet.depth() {
            let children = node
                .children
                .get_or_insert_with(|| Box::new((Node::leaf(false), Node::leaf(false))));
            node = if jet.bit(index) { &mut children.1 } else { &mut children.0 };
        }
        node.children = None;
        node.actual = true;
    }

    /// Deep copy of the tree.
    ///
    /// With `keep_actual_only`, inactive leaves are pruned and a branch that
    /// loses a child collapses into a leaf at its nearest actual ancestor. If
    /// nothing actual survives the copy is a single inactive root.
    pub fn clone_tree(&self, keep_actual_only: bool) -> JetTree {
        if !keep_actual_only {
            return self.clone();
        }
        let root = self.root.prune_inactive().unwrap_or_else(|| Node::leaf(false));
        JetTree { root, default_actual: self.default_actual }
    }

    /// Leaf jets in left-to-right key order.
    pub fn leaf_ids(&self) -> Vec<JetId> {
        self.leaves().into_iter().map(|(id, _)| id).collect()
    }

    /// Leaf jets with their `actual` flags, in left-to-right key order.
    pub fn leaves(&self) -> Vec<(JetId, bool)> {
        let mut out = Vec::new();
        self.root.collect_leaves(JetId::ROOT, &mut out);
        out
    }

    /// Total number of nodes, internal and leaf.
    pub fn node_count(&self) -> usize {
        self.root.count()
    }
}

impl Default for JetTree {
    fn default() -> Self {
        Self::new(false)
    }
}

impl fmt::Display for JetTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.root.write_indented(JetId::ROOT, 0, f)
    }
}
