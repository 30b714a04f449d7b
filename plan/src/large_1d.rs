use alloc::vec;
use alloc::vec::Vec;

use gfp_catalog::KernelCatalog;
use tracing::{instrument, trace};

use crate::{
    ComputeScheme, ExecTree, InternalNode, NodeFactory, NodeId, PlanError, PlanResult,
    packed_layout,
};

/// A 1D transform of length `a * b` too large for one kernel.
///
/// The column kernel transforms `b` columns of length `a` into a packed intermediate, and the
/// row kernel transforms `a` rows of length `b`, writing its output transposed.
pub struct L1dCcNode;

impl InternalNode for L1dCcNode {
    #[instrument(level = "debug", skip_all, fields(length = ?tree[id].length))]
    fn build_tree_internal<C: KernelCatalog + ?Sized>(
        factory: &NodeFactory<'_, C>,
        tree: &mut ExecTree,
        id: NodeId,
    ) -> PlanResult<()> {
        let length = tree[id].length.clone();
        let precision = tree[id].precision;
        let len = *length.first().ok_or(PlanError::InvalidDescription(
            "a large 1D node needs at least one length",
        ))?;
        let (a, b) = factory
            .catalog()
            .two_kernel_split(precision, len)
            .ok_or(PlanError::UnsupportedLength {
                length: len,
                precision,
            })?;
        trace!(a, b, "large 1D split");

        let cc = factory.create_node_from_scheme(tree, ComputeScheme::KernelStockhamBlockCc, id);
        {
            let node = &mut tree[cc];
            node.length = split_dims(a, b, &length);
            node.large_1d = len;
        }

        let rc = factory.create_node_from_scheme(tree, ComputeScheme::KernelStockhamBlockRc, id);
        tree[rc].length = split_dims(b, a, &length);

        tree.set_children(id, vec![cc, rc]);
        Ok(())
    }

    #[instrument(level = "debug", skip_all)]
    fn assign_params_internal(tree: &mut ExecTree, id: NodeId) -> PlanResult<()> {
        let [cc, rc] = tree.children(id)[..] else {
            return Err(PlanError::UnexpectedShape {
                scheme: ComputeScheme::L1dCc,
                children: tree.children(id).len(),
            });
        };

        let node = &tree[id];
        let (in_stride, i_dist) = node.in_layout();
        let (out_stride, o_dist) = node.out_layout();
        let (i_offset, o_offset) = (node.i_offset, node.o_offset);
        let (&s_in, &s_out) = in_stride.first().zip(out_stride.first()).ok_or(
            PlanError::InvalidDescription("a large 1D node needs its layout before its children"),
        )?;

        let a = tree[cc].length[0];
        let b = tree[rc].length[0];

        let cc_node = &mut tree[cc];
        cc_node.set_in_layout((split_dims(s_in * b, s_in, &in_stride), i_dist));
        cc_node.set_out_layout(packed_layout(&cc_node.length));
        cc_node.i_offset = i_offset;
        cc_node.o_offset = o_offset;
        let (mut rc_in_stride, rc_i_dist) = cc_node.out_layout();
        rc_in_stride.swap(0, 1);

        let rc_node = &mut tree[rc];
        rc_node.set_in_layout((rc_in_stride, rc_i_dist));
        rc_node.set_out_layout((split_dims(s_out * a, s_out, &out_stride), o_dist));
        rc_node.i_offset = o_offset;
        rc_node.o_offset = o_offset;
        Ok(())
    }
}

/// Replaces the leading dimension of `dims` by the two given ones.
fn split_dims(first: usize, second: usize, dims: &[usize]) -> Vec<usize> {
    [first, second]
        .into_iter()
        .chain(dims.iter().skip(1).copied())
        .collect()
}
