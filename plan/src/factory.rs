use gfp_catalog::KernelCatalog;
use tracing::{instrument, trace};

use crate::{
    BluesteinNode, ComputeScheme, ExecTree, L1dCcNode, NodeId, NodeMetaData, PlanError,
    PlanResult, RealViaComplexNode, TreeNode,
};

/// Behaviour of a composite node: how it expands into children and how it hands its
/// strides, distances and offsets down to them.
pub trait InternalNode {
    /// Creates and attaches the node's children, building composite children depth-first.
    fn build_tree_internal<C: KernelCatalog + ?Sized>(
        factory: &NodeFactory<'_, C>,
        tree: &mut ExecTree,
        id: NodeId,
    ) -> PlanResult<()>;

    /// Propagates the node's own layout parameters to its already built children.
    fn assign_params_internal(tree: &mut ExecTree, id: NodeId) -> PlanResult<()>;
}

/// Creates tree nodes, consulting the kernel catalog to decide how explicit FFT nodes are
/// realized.
#[derive(Debug)]
pub struct NodeFactory<'a, C: ?Sized> {
    catalog: &'a C,
}

impl<'a, C: KernelCatalog + ?Sized> NodeFactory<'a, C> {
    pub const fn new(catalog: &'a C) -> Self {
        Self { catalog }
    }

    pub const fn catalog(&self) -> &'a C {
        self.catalog
    }

    /// Creates a node of a known scheme under `parent`. The node is not attached to the
    /// parent's child list; the caller does that once all siblings exist.
    pub fn create_node_from_scheme(
        &self,
        tree: &mut ExecTree,
        scheme: ComputeScheme,
        parent: NodeId,
    ) -> NodeId {
        let node = TreeNode::child_of(scheme, &tree[parent], parent);
        tree.add(node)
    }

    /// Creates a transform node from a parameter bundle, choosing its scheme from the catalog.
    pub fn create_explicit_node(
        &self,
        tree: &mut ExecTree,
        meta: NodeMetaData,
        parent: Option<NodeId>,
    ) -> PlanResult<NodeId> {
        let scheme = self.decide_node_scheme(&meta)?;
        trace!(length = ?meta.length, %scheme, "explicit node");
        Ok(tree.add(TreeNode::from_meta(scheme, meta, parent)))
    }

    /// One kernel when the catalog has it, two kernels when the length splits into supported
    /// factors, and Bluestein otherwise.
    pub fn decide_node_scheme(&self, meta: &NodeMetaData) -> PlanResult<ComputeScheme> {
        let length = *meta.length.first().ok_or(PlanError::InvalidDescription(
            "a transform node needs at least one length",
        ))?;
        let precision = meta.precision;
        if self.catalog.single_kernel_supported(precision, length) {
            Ok(ComputeScheme::KernelStockham)
        } else if self.catalog.two_kernel_split(precision, length).is_some() {
            Ok(ComputeScheme::L1dCc)
        } else if length.is_power_of_two() || length < 2 {
            // A power of two Bluestein would pad to an even larger power of two.
            Err(PlanError::UnsupportedLength { length, precision })
        } else {
            Ok(ComputeScheme::Bluestein)
        }
    }

    /// Expands the subtree rooted at `id`.
    #[instrument(level = "debug", skip_all, fields(scheme = %tree[id].scheme, length = ?tree[id].length))]
    pub fn recursive_build_tree(&self, tree: &mut ExecTree, id: NodeId) -> PlanResult<()> {
        match tree[id].scheme {
            ComputeScheme::Bluestein => BluesteinNode::build_tree_internal(self, tree, id),
            ComputeScheme::L1dCc => L1dCcNode::build_tree_internal(self, tree, id),
            ComputeScheme::RealViaComplex => {
                RealViaComplexNode::build_tree_internal(self, tree, id)
            }
            _ => Ok(()),
        }
    }
}

/// Propagates layout parameters through the subtree rooted at `id`. Leaves have nothing to
/// propagate.
pub fn assign_params(tree: &mut ExecTree, id: NodeId) -> PlanResult<()> {
    match tree[id].scheme {
        ComputeScheme::Bluestein => BluesteinNode::assign_params_internal(tree, id),
        ComputeScheme::L1dCc => L1dCcNode::assign_params_internal(tree, id),
        ComputeScheme::RealViaComplex => RealViaComplexNode::assign_params_internal(tree, id),
        _ => Ok(()),
    }
}
