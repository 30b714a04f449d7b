use alloc::vec;
use alloc::vec::Vec;
use core::ops::{Index, IndexMut};

use crate::{NodeId, TreeNode};

/// Arena owning every node of a plan. Children are owned through their parent's child list;
/// parents are referenced by index only.
#[derive(Clone, Debug, Default)]
pub struct ExecTree {
    nodes: Vec<TreeNode>,
}

impl ExecTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Stores a node that is not yet attached to a parent's child list.
    pub fn add(&mut self, node: TreeNode) -> NodeId {
        self.nodes.push(node);
        NodeId(self.nodes.len() - 1)
    }

    /// Attaches `children` to `id` in execution order, replacing any previous children.
    pub fn set_children(&mut self, id: NodeId, children: Vec<NodeId>) {
        for &child in &children {
            self.nodes[child.0].parent = Some(id);
        }
        self.nodes[id.0].children = children;
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.0].children
    }

    /// All nodes of the subtree rooted at `root`, parents before children.
    pub fn pre_order(&self, root: NodeId) -> Vec<NodeId> {
        let mut order = Vec::new();
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            order.push(id);
            stack.extend(self.children(id).iter().rev());
        }
        order
    }

    /// All nodes of the subtree rooted at `root`, children before parents.
    pub fn post_order(&self, root: NodeId) -> Vec<NodeId> {
        let mut order = self.pre_order_mirrored(root);
        order.reverse();
        order
    }

    // Root, then children last-to-first: reversing it yields a post-order.
    fn pre_order_mirrored(&self, root: NodeId) -> Vec<NodeId> {
        let mut order = Vec::new();
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            order.push(id);
            stack.extend(self.children(id).iter());
        }
        order
    }

    /// Leaves of the subtree in execution order.
    pub fn leaves(&self, root: NodeId) -> Vec<NodeId> {
        self.pre_order(root)
            .into_iter()
            .filter(|&id| self[id].children.is_empty())
            .collect()
    }

    /// Number of edges between `id` and the root of its tree.
    pub fn depth(&self, id: NodeId) -> usize {
        let mut depth = 0;
        let mut cur = self[id].parent;
        while let Some(parent) = cur {
            depth += 1;
            cur = self[parent].parent;
        }
        depth
    }
}

impl Index<NodeId> for ExecTree {
    type Output = TreeNode;

    fn index(&self, id: NodeId) -> &TreeNode {
        &self.nodes[id.0]
    }
}

impl IndexMut<NodeId> for ExecTree {
    fn index_mut(&mut self, id: NodeId) -> &mut TreeNode {
        &mut self.nodes[id.0]
    }
}

#[cfg(test)]
mod tests {
    use gfp_catalog::Precision;

    use super::*;
    use crate::{ComputeScheme, Direction};

    fn leaf(tree: &mut ExecTree) -> NodeId {
        tree.add(TreeNode::new(
            ComputeScheme::KernelStockham,
            Precision::Single,
            Direction::Forward,
        ))
    }

    #[test]
    fn traversal_orders() {
        //        r
        //      / | \
        //     a  b  c
        //       / \
        //      d   e
        let mut tree = ExecTree::new();
        let r = tree.add(TreeNode::new(
            ComputeScheme::Bluestein,
            Precision::Single,
            Direction::Forward,
        ));
        let [a, b, c, d, e] = [(); 5].map(|_| leaf(&mut tree));
        tree[b].scheme = ComputeScheme::L1dCc;
        tree.set_children(r, vec![a, b, c]);
        tree.set_children(b, vec![d, e]);

        assert_eq!(tree.pre_order(r), vec![r, a, b, d, e, c]);
        assert_eq!(tree.post_order(r), vec![a, d, e, b, c, r]);
        assert_eq!(tree.leaves(r), vec![a, d, e, c]);
        assert_eq!(tree[d].parent, Some(b));
        assert_eq!(tree.depth(e), 2);
        assert_eq!(tree.depth(r), 0);
    }
}
