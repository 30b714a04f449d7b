use alloc::vec;

use gfp_catalog::KernelCatalog;
use tracing::instrument;

use crate::{
    ComputeScheme, Direction, ExecTree, InternalNode, NodeFactory, NodeId, NodeMetaData,
    PlanError, PlanResult, assign_params, packed_layout,
};

/// A real transform computed with a complex transform of the full length.
///
/// Forward: real input is widened to complex, transformed, and the non-redundant `N / 2 + 1`
/// hermitian outputs are kept. Inverse: the hermitian input is expanded to the full complex
/// spectrum, transformed, and the real parts are written out.
pub struct RealViaComplexNode;

impl InternalNode for RealViaComplexNode {
    #[instrument(level = "debug", skip_all, fields(length = ?tree[id].length))]
    fn build_tree_internal<C: KernelCatalog + ?Sized>(
        factory: &NodeFactory<'_, C>,
        tree: &mut ExecTree,
        id: NodeId,
    ) -> PlanResult<()> {
        let length = tree[id].length.clone();
        let (copy_in_scheme, copy_out_scheme) = match tree[id].direction {
            Direction::Forward => (
                ComputeScheme::KernelCopyRToCmplx,
                ComputeScheme::KernelCopyCmplxToHerm,
            ),
            Direction::Inverse => (
                ComputeScheme::KernelCopyHermToCmplx,
                ComputeScheme::KernelCopyCmplxToR,
            ),
        };

        let copy_in = factory.create_node_from_scheme(tree, copy_in_scheme, id);
        tree[copy_in].length = length.clone();

        let mut fft_data = NodeMetaData::from_parent(&tree[id]);
        fft_data.length = length.clone();
        let fft = factory.create_explicit_node(tree, fft_data, Some(id))?;
        factory.recursive_build_tree(tree, fft)?;

        let copy_out = factory.create_node_from_scheme(tree, copy_out_scheme, id);
        tree[copy_out].length = length;

        tree.set_children(id, vec![copy_in, fft, copy_out]);
        Ok(())
    }

    #[instrument(level = "debug", skip_all)]
    fn assign_params_internal(tree: &mut ExecTree, id: NodeId) -> PlanResult<()> {
        let [copy_in, fft, copy_out] = tree.children(id)[..] else {
            return Err(PlanError::UnexpectedShape {
                scheme: ComputeScheme::RealViaComplex,
                children: tree.children(id).len(),
            });
        };

        let node = &tree[id];
        let in_layout = node.in_layout();
        let out_layout = node.out_layout();
        let (i_offset, o_offset) = (node.i_offset, node.o_offset);
        let packed = packed_layout(&node.length);

        let copy_in_node = &mut tree[copy_in];
        copy_in_node.set_in_layout(in_layout);
        copy_in_node.set_out_layout(packed.clone());
        copy_in_node.i_offset = i_offset;

        tree[fft].set_in_layout(packed.clone());
        tree[fft].set_out_layout(packed.clone());
        assign_params(tree, fft)?;

        let copy_out_node = &mut tree[copy_out];
        copy_out_node.set_in_layout(packed);
        copy_out_node.set_out_layout(out_layout);
        copy_out_node.o_offset = o_offset;
        Ok(())
    }
}
