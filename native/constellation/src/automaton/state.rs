//! Node sets for closure and reachability computations.

use fixedbitset::FixedBitSet;
use std::fmt;

use crate::automaton::graph::NodeId;

/// A set of nodes backed by a growable bit set indexed by [`NodeId`].
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct NodeSet {
    bits: FixedBitSet,
}

impl NodeSet {
    /// Create a new empty node set with the given capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            bits: FixedBitSet::with_capacity(capacity),
        }
    }

    /// Insert a node, returning whether it was newly added.
    pub fn insert(&mut self, node: NodeId) -> bool {
        let idx = node.index();
        if idx >= self.bits.len() {
            self.bits.grow(idx + 1);
        }
        !self.bits.put(idx)
    }

    /// Check if a node is in the set.
    pub fn contains(&self, node: NodeId) -> bool {
        let idx = node.index();
        idx < self.bits.len() && self.bits.contains(idx)
    }

    pub fn is_empty(&self) -> bool {
        self.bits.is_clear()
    }

    pub fn len(&self) -> usize {
        self.bits.count_ones(..)
    }

    /// Iterate over the nodes in id order.
    pub fn iter(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.bits.ones().map(NodeId::from_index)
    }
}

impl fmt::Debug for NodeSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_set_basic() {
        let mut set = NodeSet::with_capacity(4);
        assert!(set.is_empty());

        assert!(set.insert(NodeId(3)));
        assert!(set.insert(NodeId(70)));
        assert!(!set.insert(NodeId(3)));
        assert_eq!(set.len(), 2);
        assert!(set.contains(NodeId(70)));
        assert!(!set.contains(NodeId(5)));
        assert!(!set.contains(NodeId(500)));
    }
}
