//! Arena-based MCTS tree.
//!
//! A flat `Vec<MctsNode>` with index references: no reference counting,
//! and clearing the tree between decisions keeps the allocation.

use super::node::{MctsNode, NodeId};

/// Arena of search nodes. The root is always `NodeId(0)`.
#[derive(Clone, Debug, Default)]
pub struct MctsTree {
    nodes: Vec<MctsNode>,
}

impl MctsTree {
    /// Create an empty tree with room for `capacity` nodes.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            nodes: Vec::with_capacity(capacity),
        }
    }

    /// Drop every node and install a new root.
    pub fn reset(&mut self, root: MctsNode) -> NodeId {
        self.nodes.clear();
        self.alloc(root)
    }

    /// Root node ID.
    #[inline]
    #[must_use]
    pub const fn root_id(&self) -> NodeId {
        NodeId(0)
    }

    /// Get a node by ID.
    #[inline]
    #[must_use]
    pub fn get(&self, id: NodeId) -> &MctsNode {
        &self.nodes[id.0 as usize]
    }

    /// Get a mutable node by ID.
    #[inline]
    pub fn get_mut(&mut self, id: NodeId) -> &mut MctsNode {
        &mut self.nodes[id.0 as usize]
    }

    /// Allocate a new node, returning its ID.
    pub fn alloc(&mut self, node: MctsNode) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(node);
        id
    }

    /// The root node, if the tree has one.
    #[must_use]
    pub fn root(&self) -> Option<&MctsNode> {
        self.nodes.first()
    }

    /// Number of nodes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// `true` before the first search.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::PlayerId;

    #[test]
    fn test_alloc_and_reset() {
        let mut tree = MctsTree::with_capacity(4);
        assert!(tree.is_empty());
        assert!(tree.root().is_none());

        let root = tree.reset(MctsNode::new(PlayerId::new(0), 0));
        assert_eq!(root, tree.root_id());
        let child = tree.alloc(MctsNode::new(PlayerId::new(1), 1));
        assert_eq!(child, NodeId(1));
        assert_eq!(tree.get(child).depth, 1);
        assert_eq!(tree.len(), 2);

        tree.reset(MctsNode::new(PlayerId::new(1), 0));
        assert_eq!(tree.len(), 1);
        assert_eq!(tree.get(tree.root_id()).to_move, PlayerId::new(1));
    }
}
