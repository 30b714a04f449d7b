use alloc::vec;
use alloc::vec::Vec;

use gfp_catalog::Precision;
use gfp_util::strided_span;

use crate::{ArrayType, ComputeScheme, Direction, OperatingBuffer, Placement};

/// Stable index of a node inside its [`ExecTree`](crate::ExecTree).
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(pub(crate) usize);

/// One computational step of a plan.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TreeNode {
    pub scheme: ComputeScheme,
    /// Non-owning back-reference used for upward traversal.
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,

    pub dimension: usize,
    /// Transform length first, then the lengths of any batch-like dimensions.
    pub length: Vec<usize>,
    /// Padded convolution length of a Bluestein stage, 0 elsewhere.
    pub length_blue: usize,
    /// Size of the large twiddle table a kernel needs, 0 if none.
    pub large_1d: usize,
    pub precision: Precision,
    pub direction: Direction,
    pub batch: usize,

    pub in_stride: Vec<usize>,
    pub out_stride: Vec<usize>,
    pub i_dist: usize,
    pub o_dist: usize,
    pub i_offset: usize,
    pub o_offset: usize,

    /// If false, the node must read and write the same buffer.
    pub allow_out_of_place: bool,
    /// Nodes that work on a fixed scratch buffer, independent of the transform data flowing
    /// through the plan.
    pub pinned_buffer: Option<OperatingBuffer>,

    pub placement: Placement,
    pub ob_in: OperatingBuffer,
    pub ob_out: OperatingBuffer,
    pub in_array_type: ArrayType,
    pub out_array_type: ArrayType,

    pub kernel_factors: Vec<usize>,
    pub twiddle_length: usize,
    /// Position in the plan's execution sequence, set for leaves only.
    pub seq_id: Option<usize>,
}

impl TreeNode {
    pub fn new(scheme: ComputeScheme, precision: Precision, direction: Direction) -> Self {
        Self {
            scheme,
            parent: None,
            children: Vec::new(),
            dimension: 1,
            length: Vec::new(),
            length_blue: 0,
            large_1d: 0,
            precision,
            direction,
            batch: 1,
            in_stride: Vec::new(),
            out_stride: Vec::new(),
            i_dist: 0,
            o_dist: 0,
            i_offset: 0,
            o_offset: 0,
            allow_out_of_place: true,
            pinned_buffer: None,
            placement: Placement::NotInPlace,
            ob_in: OperatingBuffer::Uninit,
            ob_out: OperatingBuffer::Uninit,
            in_array_type: ArrayType::Unset,
            out_array_type: ArrayType::Unset,
            kernel_factors: Vec::new(),
            twiddle_length: 0,
            seq_id: None,
        }
    }

    /// A node inheriting precision, batch, direction and buffer constraints from `parent`.
    pub fn child_of(scheme: ComputeScheme, parent: &TreeNode, parent_id: NodeId) -> Self {
        Self {
            parent: Some(parent_id),
            batch: parent.batch,
            allow_out_of_place: parent.allow_out_of_place,
            pinned_buffer: parent.pinned_buffer,
            ..Self::new(scheme, parent.precision, parent.direction)
        }
    }

    pub fn from_meta(scheme: ComputeScheme, meta: NodeMetaData, parent: Option<NodeId>) -> Self {
        Self {
            parent,
            dimension: meta.dimension,
            length: meta.length,
            batch: meta.batch,
            i_offset: meta.i_offset,
            o_offset: meta.o_offset,
            allow_out_of_place: meta.allow_out_of_place,
            pinned_buffer: meta.pinned_buffer,
            ..Self::new(scheme, meta.precision, meta.direction)
        }
    }

    pub const fn is_leaf(&self) -> bool {
        self.scheme.is_leaf()
    }

    pub fn in_layout(&self) -> (Vec<usize>, usize) {
        (self.in_stride.clone(), self.i_dist)
    }

    pub fn out_layout(&self) -> (Vec<usize>, usize) {
        (self.out_stride.clone(), self.o_dist)
    }

    pub fn set_in_layout(&mut self, (stride, dist): (Vec<usize>, usize)) {
        self.in_stride = stride;
        self.i_dist = dist;
    }

    pub fn set_out_layout(&mut self, (stride, dist): (Vec<usize>, usize)) {
        self.out_stride = stride;
        self.o_dist = dist;
    }

    /// Lengths of the data the node writes, which differ from `length` for kernels that pad or
    /// drop redundant hermitian elements.
    pub fn effective_out_len(&self) -> Vec<usize> {
        let mut len = self.length.clone();
        match self.scheme {
            ComputeScheme::KernelPadMul => len[0] = self.length_blue,
            ComputeScheme::KernelCopyCmplxToHerm => len[0] = len[0] / 2 + 1,
            _ => {}
        }
        len
    }

    /// Real scalars spanned by the node's output when written as `out_type`.
    pub fn out_footprint(&self, out_type: ArrayType) -> usize {
        strided_span(
            &self.effective_out_len(),
            &self.out_stride,
            self.o_dist,
            self.batch,
            self.o_offset,
        ) * out_type.scalars_per_element()
    }
}

/// Parameters for a node whose scheme the factory decides, such as a sub-FFT of a Bluestein
/// stage.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NodeMetaData {
    pub dimension: usize,
    pub length: Vec<usize>,
    pub batch: usize,
    pub precision: Precision,
    pub direction: Direction,
    pub i_offset: usize,
    pub o_offset: usize,
    pub allow_out_of_place: bool,
    pub pinned_buffer: Option<OperatingBuffer>,
}

impl NodeMetaData {
    pub fn new(length: Vec<usize>, precision: Precision, direction: Direction) -> Self {
        Self {
            dimension: 1,
            length,
            batch: 1,
            precision,
            direction,
            i_offset: 0,
            o_offset: 0,
            allow_out_of_place: true,
            pinned_buffer: None,
        }
    }

    /// Starts from the parent's precision, batch, direction and buffer constraints.
    pub fn from_parent(parent: &TreeNode) -> Self {
        Self {
            batch: parent.batch,
            allow_out_of_place: parent.allow_out_of_place,
            pinned_buffer: parent.pinned_buffer,
            ..Self::new(Vec::new(), parent.precision, parent.direction)
        }
    }
}

/// Packed strides of a layout with the given dimensions: unit stride along the first, each
/// following dimension stepping over all previous ones. Returns `(strides, dist)`.
pub fn packed_layout(dims: &[usize]) -> (Vec<usize>, usize) {
    let mut strides = vec![1];
    let mut dist = dims.first().copied().unwrap_or(1);
    for &dim in dims.iter().skip(1) {
        strides.push(dist);
        dist *= dim;
    }
    (strides, dist)
}
