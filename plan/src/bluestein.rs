use alloc::vec;
use alloc::vec::Vec;

use gfp_catalog::{KernelCatalog, KernelKind, Precision};
use gfp_util::next_pow2;
use tracing::{debug, instrument};

use crate::{
    ComputeScheme, ExecTree, InternalNode, NodeFactory, NodeId, NodeMetaData, OperatingBuffer,
    PlanError, PlanResult, TreeNode, assign_params,
};

/// A non-power-of-two convolution length at or above this fraction of the power-of-two
/// fallback has been measured to be no faster than the fallback.
pub const LEN_CUTOFF_RATIO: f64 = 0.9;

/// Chooses the padded convolution length for a Bluestein transform of `len`.
///
/// With `force_pow2` this is `2 * next_pow2(len)`. Otherwise the first length in
/// `[2 * len - 1, 2 * next_pow2(len))` that the catalog supports and that stays below
/// [`LEN_CUTOFF_RATIO`] of the power-of-two fallback; the fallback itself if there is none.
pub fn find_blue<C: KernelCatalog + ?Sized>(
    catalog: &C,
    len: usize,
    precision: Precision,
    force_pow2: bool,
) -> usize {
    let len_pow2_blue = 2 * next_pow2(len);
    if force_pow2 {
        return len_pow2_blue;
    }

    let min_len_blue = (2 * len).saturating_sub(1);
    // The ratio grows with the candidate, so nothing past the first rejection can qualify.
    (min_len_blue..len_pow2_blue)
        .take_while(|&candidate| {
            (candidate as f64) / (len_pow2_blue as f64) < LEN_CUTOFF_RATIO
        })
        .find(|&candidate| catalog.non_pow2_length_supported(precision, candidate))
        .unwrap_or(len_pow2_blue)
}

/// Bluestein's algorithm for a 1D transform of arbitrary length.
///
/// Expands into either
/// - 3 children `[chirp, chirp FFT, single kernel]` when the padded length fits one kernel, or
/// - 6 children `[chirp, pad-mul, FFT of chirp and input, FFT multiply, inverse FFT, res-mul]`.
///
/// All intermediate data lives in [`OperatingBuffer::TempBluestein`]: the chirp at offset 0,
/// its transform at `length_blue`, and the padded input from `2 * length_blue` on.
pub struct BluesteinNode;

impl InternalNode for BluesteinNode {
    #[instrument(level = "debug", skip_all, fields(length = ?tree[id].length))]
    fn build_tree_internal<C: KernelCatalog + ?Sized>(
        factory: &NodeFactory<'_, C>,
        tree: &mut ExecTree,
        id: NodeId,
    ) -> PlanResult<()> {
        let length = tree[id].length.clone();
        let precision = tree[id].precision;
        let direction = tree[id].direction;
        let len = *length.first().ok_or(PlanError::InvalidDescription(
            "a bluestein node needs at least one length",
        ))?;

        let use_single_kernel = BluesteinSingleNode::size_fits(factory.catalog(), len, precision);

        // The single kernel also pads, multiplies and extracts; a power of two padding keeps
        // its radices simple.
        let length_blue = find_blue(factory.catalog(), len, precision, use_single_kernel);
        tree[id].length_blue = length_blue;
        debug!(len, length_blue, use_single_kernel, "bluestein padding chosen");

        let chirp = factory.create_node_from_scheme(tree, ComputeScheme::KernelChirp, id);
        {
            let node = &mut tree[chirp];
            node.dimension = 1;
            node.length = vec![len];
            node.length_blue = length_blue;
            node.direction = direction;
            node.batch = 1;
            node.large_1d = 2 * len;
            node.pinned_buffer = Some(OperatingBuffer::TempBluestein);
        }

        let children = if use_single_kernel {
            // FFT of the second half of the chirp buffer, consumed by the single kernel.
            let mut chirp_fft_data = NodeMetaData::from_parent(&tree[id]);
            chirp_fft_data.length = vec![length_blue];
            chirp_fft_data.batch = 1;
            chirp_fft_data.i_offset = length_blue;
            chirp_fft_data.o_offset = length_blue;
            chirp_fft_data.pinned_buffer = Some(OperatingBuffer::TempBluestein);
            let chirp_fft = factory.create_explicit_node(tree, chirp_fft_data, Some(id))?;
            factory.recursive_build_tree(tree, chirp_fft)?;

            let single =
                factory.create_node_from_scheme(tree, ComputeScheme::KernelBluesteinSingle, id);
            let node = &mut tree[single];
            node.dimension = 1;
            node.length = length;
            node.length_blue = length_blue;

            vec![chirp, chirp_fft, single]
        } else {
            let pad_mul = factory.create_node_from_scheme(tree, ComputeScheme::KernelPadMul, id);
            {
                let node = &mut tree[pad_mul];
                node.dimension = 1;
                node.length = length.clone();
                node.length_blue = length_blue;
                node.o_offset = 2 * length_blue;
            }

            // The extra batch slot transforms the chirp together with the padded input. Both
            // are addressed through offsets into the bluestein buffer, which only keeps its
            // meaning if the FFT stays in place.
            let mut fft_ic_data = NodeMetaData::from_parent(&tree[id]);
            fft_ic_data.length = vec![length_blue];
            fft_ic_data.batch *= length[1..].iter().product::<usize>();
            fft_ic_data.batch += 1;
            fft_ic_data.i_offset = length_blue;
            fft_ic_data.o_offset = length_blue;
            fft_ic_data.allow_out_of_place = false;
            let fft_ic = factory.create_explicit_node(tree, fft_ic_data, Some(id))?;
            factory.recursive_build_tree(tree, fft_ic)?;

            let fft_mul = factory.create_node_from_scheme(tree, ComputeScheme::KernelFftMul, id);
            {
                let node = &mut tree[fft_mul];
                node.dimension = 1;
                node.length = blue_lengths(length_blue, &length);
                node.length_blue = length_blue;
                node.i_offset = 2 * length_blue;
                node.o_offset = 2 * length_blue;
            }

            let mut fft_r_data = NodeMetaData::from_parent(&tree[id]);
            fft_r_data.length = blue_lengths(length_blue, &length);
            fft_r_data.direction = -direction;
            fft_r_data.i_offset = 2 * length_blue;
            fft_r_data.o_offset = 2 * length_blue;
            fft_r_data.allow_out_of_place = false;
            let fft_r = factory.create_explicit_node(tree, fft_r_data, Some(id))?;
            factory.recursive_build_tree(tree, fft_r)?;

            let res_mul = factory.create_node_from_scheme(tree, ComputeScheme::KernelResMul, id);
            {
                let node = &mut tree[res_mul];
                node.dimension = 1;
                node.length = length;
                node.length_blue = length_blue;
                node.i_offset = 2 * length_blue;
            }

            vec![chirp, pad_mul, fft_ic, fft_mul, fft_r, res_mul]
        };

        tree.set_children(id, children);
        Ok(())
    }

    #[instrument(level = "debug", skip_all)]
    fn assign_params_internal(tree: &mut ExecTree, id: NodeId) -> PlanResult<()> {
        let children = tree.children(id).to_vec();
        let in_layout = tree[id].in_layout();
        let out_layout = tree[id].out_layout();
        let (i_offset, o_offset) = (tree[id].i_offset, tree[id].o_offset);

        match children[..] {
            [chirp, chirp_fft, single] => {
                assign_chirp_params(&mut tree[chirp]);

                let chirp_out = tree[chirp].out_layout();
                tree[chirp_fft].set_in_layout(chirp_out.clone());
                tree[chirp_fft].set_out_layout(chirp_out);
                assign_params(tree, chirp_fft)?;

                let node = &mut tree[single];
                node.set_in_layout(in_layout);
                node.set_out_layout(out_layout);
                node.i_offset = i_offset;
                node.o_offset = o_offset;
                assign_params(tree, single)
            }
            [chirp, pad_mul, fft_ic, fft_mul, fft_r, res_mul] => {
                assign_chirp_params(&mut tree[chirp]);

                let node = &mut tree[pad_mul];
                node.set_in_layout(in_layout);
                node.i_offset = i_offset;
                let padded = blue_lengths(node.length_blue, &node.length);
                node.set_out_layout(crate::packed_layout(&padded));

                let chirp_out = tree[chirp].out_layout();
                tree[fft_ic].set_in_layout(chirp_out.clone());
                tree[fft_ic].set_out_layout(chirp_out);
                assign_params(tree, fft_ic)?;

                let pad_mul_out = tree[pad_mul].out_layout();
                tree[fft_mul].set_in_layout(pad_mul_out.clone());
                tree[fft_mul].set_out_layout(pad_mul_out);

                let fft_mul_out = tree[fft_mul].out_layout();
                tree[fft_r].set_in_layout(fft_mul_out.clone());
                tree[fft_r].set_out_layout(fft_mul_out);
                assign_params(tree, fft_r)?;

                let fft_r_out = tree[fft_r].out_layout();
                let node = &mut tree[res_mul];
                node.set_in_layout(fft_r_out);
                node.set_out_layout(out_layout);
                node.o_offset = o_offset;
                Ok(())
            }
            _ => Err(PlanError::UnexpectedBluesteinShape {
                children: children.len(),
            }),
        }
    }
}

fn assign_chirp_params(chirp: &mut TreeNode) {
    chirp.set_in_layout((vec![1], chirp.length_blue));
    chirp.set_out_layout((vec![1], chirp.length_blue));
}

/// `length_blue` along the transform dimension, the remaining lengths unchanged.
fn blue_lengths(length_blue: usize, length: &[usize]) -> Vec<usize> {
    core::iter::once(length_blue)
        .chain(length.iter().skip(1).copied())
        .collect()
}

/// The fused kernel used when `2 * length - 1` fits in one kernel: pads, multiplies by the
/// chirp, transforms forward and back, and extracts the result.
pub struct BluesteinSingleNode;

impl BluesteinSingleNode {
    /// Whether the whole convolution of a length `length` transform fits one kernel.
    pub fn size_fits<C: KernelCatalog + ?Sized>(
        catalog: &C,
        length: usize,
        precision: Precision,
    ) -> bool {
        (2 * length).saturating_sub(1) < catalog.largest_length(precision)
    }

    /// The internal FFT runs at the padded length, so that is what the twiddles cover.
    pub const fn twiddle_table_length(node: &TreeNode) -> usize {
        node.length_blue
    }

    /// Radices of the internal power of two FFT.
    ///
    /// Radix 16 needs too many registers next to the rest of the work this kernel does, so the
    /// two lengths where the catalog would pick it are factored by hand.
    pub fn kernel_factors<C: KernelCatalog + ?Sized>(
        catalog: &C,
        node: &TreeNode,
    ) -> PlanResult<Vec<usize>> {
        match node.length_blue {
            2048 => Ok(vec![8, 8, 8, 4]),
            4096 => Ok(vec![8, 8, 8, 8]),
            length => catalog
                .kernel_factors(length, node.precision, KernelKind::Stockham)
                .ok_or(PlanError::MissingKernel {
                    length,
                    precision: node.precision,
                }),
        }
    }
}
