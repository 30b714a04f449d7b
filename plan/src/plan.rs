use alloc::format;
use alloc::string::String;
use alloc::vec::Vec;

use gfp_catalog::{KernelCatalog, Precision};
use gfp_util::strided_span;
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::{
    ArrayType, BluesteinSingleNode, ComputeScheme, ExecTree, NodeFactory, NodeId, NodeMetaData,
    OperatingBuffer, PlanError, PlanResult, Placement, TransformType, TreeNode, assign_params,
    packed_layout,
};

/// What the user asked for: a batched 1D transform and the layout of its buffers.
///
/// `length` holds the transform length first, followed by the lengths of any further dimensions
/// the transform is batched over. Strides, distances and offsets count elements of the
/// respective array type.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransformDesc {
    pub transform_type: TransformType,
    pub precision: Precision,
    pub length: Vec<usize>,
    pub batch: usize,
    pub placement: Placement,
    pub in_array_type: ArrayType,
    pub out_array_type: ArrayType,
    pub in_stride: Vec<usize>,
    pub out_stride: Vec<usize>,
    pub in_dist: usize,
    pub out_dist: usize,
    pub in_offset: usize,
    pub out_offset: usize,
}

impl TransformDesc {
    /// An out-of-place, unbatched transform over packed interleaved buffers.
    pub fn new(transform_type: TransformType, precision: Precision, length: Vec<usize>) -> Self {
        let (in_array_type, out_array_type) = match transform_type {
            TransformType::ComplexForward | TransformType::ComplexInverse => (
                ArrayType::ComplexInterleaved,
                ArrayType::ComplexInterleaved,
            ),
            TransformType::RealForward => (ArrayType::Real, ArrayType::HermitianInterleaved),
            TransformType::RealInverse => (ArrayType::HermitianInterleaved, ArrayType::Real),
        };
        let mut desc = Self {
            transform_type,
            precision,
            length,
            batch: 1,
            placement: Placement::NotInPlace,
            in_array_type,
            out_array_type,
            in_stride: Vec::new(),
            out_stride: Vec::new(),
            in_dist: 0,
            out_dist: 0,
            in_offset: 0,
            out_offset: 0,
        };
        desc.reset_layout();
        desc
    }

    pub const fn with_batch(mut self, batch: usize) -> Self {
        self.batch = batch;
        self
    }

    /// A packed layout is repacked for the new placement, since in-place real transforms pad
    /// each real row to hold its hermitian counterpart. Layouts set by [`Self::with_layout`]
    /// are kept.
    pub fn with_placement(mut self, placement: Placement) -> Self {
        let packed = self.has_packed_layout();
        self.placement = placement;
        if packed {
            self.reset_layout();
        }
        self
    }

    pub fn with_array_types(mut self, in_type: ArrayType, out_type: ArrayType) -> Self {
        self.in_array_type = in_type;
        self.out_array_type = out_type;
        self
    }

    pub fn with_layout(
        mut self,
        (in_stride, in_dist): (Vec<usize>, usize),
        (out_stride, out_dist): (Vec<usize>, usize),
    ) -> Self {
        self.in_stride = in_stride;
        self.in_dist = in_dist;
        self.out_stride = out_stride;
        self.out_dist = out_dist;
        self
    }

    pub const fn with_offsets(mut self, in_offset: usize, out_offset: usize) -> Self {
        self.in_offset = in_offset;
        self.out_offset = out_offset;
        self
    }

    fn has_packed_layout(&self) -> bool {
        let (in_stride, in_dist) = packed_layout(&self.stored_lengths(self.in_array_type));
        let (out_stride, out_dist) = packed_layout(&self.stored_lengths(self.out_array_type));
        self.in_stride == in_stride
            && self.in_dist == in_dist
            && self.out_stride == out_stride
            && self.out_dist == out_dist
    }

    fn reset_layout(&mut self) {
        (self.in_stride, self.in_dist) = packed_layout(&self.stored_lengths(self.in_array_type));
        (self.out_stride, self.out_dist) =
            packed_layout(&self.stored_lengths(self.out_array_type));
    }

    /// Lengths of the data held by a buffer of the given type.
    pub fn logical_lengths(&self, ty: ArrayType) -> Vec<usize> {
        let mut lengths = self.length.clone();
        if ty.is_hermitian() {
            if let Some(first) = lengths.first_mut() {
                *first = *first / 2 + 1;
            }
        }
        lengths
    }

    /// Like [`Self::logical_lengths`], but including the padding of in-place real rows.
    fn stored_lengths(&self, ty: ArrayType) -> Vec<usize> {
        let mut lengths = self.logical_lengths(ty);
        if ty == ArrayType::Real && self.placement == Placement::InPlace {
            if let Some(first) = lengths.first_mut() {
                *first = 2 * (*first / 2 + 1);
            }
        }
        lengths
    }

    pub fn validate(&self) -> PlanResult<()> {
        if self.length.first().is_none_or(|&n| n < 2) {
            return Err(PlanError::InvalidDescription(
                "the transform length must be at least 2",
            ));
        }
        if self.length.iter().any(|&l| l == 0) {
            return Err(PlanError::InvalidDescription("lengths must be positive"));
        }
        if self.batch == 0 {
            return Err(PlanError::InvalidDescription("the batch must be positive"));
        }
        if self.in_stride.len() != self.length.len() || self.out_stride.len() != self.length.len()
        {
            return Err(PlanError::InvalidDescription(
                "every dimension needs an input and an output stride",
            ));
        }
        if self.in_stride.iter().chain(&self.out_stride).any(|&s| s == 0) {
            return Err(PlanError::InvalidDescription("strides must be positive"));
        }

        let (i, o) = (self.in_array_type, self.out_array_type);
        let types_match = match self.transform_type {
            TransformType::ComplexForward | TransformType::ComplexInverse => {
                i.is_complex() && o.is_complex()
            }
            TransformType::RealForward => i == ArrayType::Real && o.is_hermitian(),
            TransformType::RealInverse => i.is_hermitian() && o == ArrayType::Real,
        };
        if !types_match {
            return Err(PlanError::InvalidDescription(
                "array types do not match the transform type",
            ));
        }
        if self.placement == Placement::InPlace && !self.transform_type.is_real() && i != o {
            return Err(PlanError::InvalidDescription(
                "in-place complex transforms need one array type",
            ));
        }
        Ok(())
    }

    fn footprint(&self, ty: ArrayType, stride: &[usize], dist: usize, offset: usize) -> usize {
        strided_span(&self.logical_lengths(ty), stride, dist, self.batch, offset)
            * ty.scalars_per_element()
    }

    /// Real scalars of the user input buffer the transform may address.
    pub fn in_footprint(&self) -> usize {
        self.footprint(
            self.in_array_type,
            &self.in_stride,
            self.in_dist,
            self.in_offset,
        )
    }

    /// Real scalars of the user output buffer the transform may address.
    pub fn out_footprint(&self) -> usize {
        self.footprint(
            self.out_array_type,
            &self.out_stride,
            self.out_dist,
            self.out_offset,
        )
    }
}

/// Two consecutive kernels that may run as one launch.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct FuseShim {
    pub first: NodeId,
    pub last: NodeId,
}

impl FuseShim {
    /// The fused kernel must not read and write the same buffer.
    pub fn is_fusable(&self, tree: &ExecTree) -> bool {
        tree[self.first].ob_in != tree[self.last].ob_out
    }
}

/// A fully built execution tree and the data the buffer assignment needs about it.
#[derive(Clone, Debug)]
pub struct ExecPlan {
    pub desc: TransformDesc,
    pub tree: ExecTree,
    pub root: NodeId,
    /// Leaves in execution order; `seq_id` of each leaf is its index here.
    pub exec_seq: Vec<NodeId>,
    pub fuse_shims: Vec<FuseShim>,
    in_capacity: usize,
    out_capacity: usize,
}

impl ExecPlan {
    /// Builds the tree for `desc`, propagates layouts and resolves every leaf's kernel. Buffers
    /// are left unassigned.
    #[instrument(level = "debug", skip_all, fields(
        transform = ?desc.transform_type,
        length = ?desc.length,
        precision = %desc.precision,
    ))]
    pub fn build<C: KernelCatalog + ?Sized>(desc: TransformDesc, catalog: &C) -> PlanResult<Self> {
        desc.validate()?;
        let factory = NodeFactory::new(catalog);
        let mut tree = ExecTree::new();

        let direction = desc.transform_type.direction();
        let root = if desc.transform_type.is_real() {
            let mut node = TreeNode::new(ComputeScheme::RealViaComplex, desc.precision, direction);
            node.length = desc.length.clone();
            node.batch = desc.batch;
            tree.add(node)
        } else {
            let mut meta = NodeMetaData::new(desc.length.clone(), desc.precision, direction);
            meta.batch = desc.batch;
            factory.create_explicit_node(&mut tree, meta, None)?
        };
        {
            let node = &mut tree[root];
            node.set_in_layout((desc.in_stride.clone(), desc.in_dist));
            node.set_out_layout((desc.out_stride.clone(), desc.out_dist));
            node.i_offset = desc.in_offset;
            node.o_offset = desc.out_offset;
            node.placement = desc.placement;
            node.in_array_type = desc.in_array_type;
            node.out_array_type = desc.out_array_type;
        }

        factory.recursive_build_tree(&mut tree, root)?;
        assign_params(&mut tree, root)?;

        let exec_seq = tree.leaves(root);
        for (seq_id, &id) in exec_seq.iter().enumerate() {
            tree[id].seq_id = Some(seq_id);
        }
        resolve_kernels(&mut tree, &exec_seq, catalog)?;

        let fuse_shims = exec_seq
            .iter()
            .tuple_windows()
            .filter(|&(&first, &last)| {
                tree[first].scheme == ComputeScheme::KernelStockhamBlockCc
                    && tree[last].scheme == ComputeScheme::KernelStockhamBlockRc
                    && tree[first].parent == tree[last].parent
            })
            .map(|(&first, &last)| FuseShim { first, last })
            .collect_vec();

        let (mut in_capacity, mut out_capacity) = (desc.in_footprint(), desc.out_footprint());
        if desc.placement == Placement::InPlace {
            in_capacity = in_capacity.max(out_capacity);
            out_capacity = in_capacity;
        }

        debug!(
            nodes = tree.len(),
            leaves = exec_seq.len(),
            shims = fuse_shims.len(),
            "plan tree built"
        );
        Ok(Self {
            desc,
            tree,
            root,
            exec_seq,
            fuse_shims,
            in_capacity,
            out_capacity,
        })
    }

    pub fn is_in_place(&self) -> bool {
        self.desc.placement == Placement::InPlace
    }

    /// Where the final result must land.
    pub fn root_out_buffer(&self) -> OperatingBuffer {
        if self.is_in_place() {
            OperatingBuffer::UserIn
        } else {
            OperatingBuffer::UserOut
        }
    }

    /// Size in real scalars of a user buffer; `None` for temporaries, which are allocated to fit.
    pub fn buffer_capacity(&self, buffer: OperatingBuffer) -> Option<usize> {
        match buffer {
            OperatingBuffer::UserIn => Some(self.in_capacity),
            OperatingBuffer::UserOut => Some(self.out_capacity),
            _ => None,
        }
    }

    /// Whether consecutive elements of the buffer's leading dimension are adjacent.
    pub fn buffer_is_unit_stride(&self, buffer: OperatingBuffer) -> bool {
        let unit = |stride: &[usize]| stride.first() == Some(&1);
        match buffer {
            OperatingBuffer::UserIn if self.is_in_place() => {
                unit(&self.desc.in_stride) && unit(&self.desc.out_stride)
            }
            OperatingBuffer::UserIn => unit(&self.desc.in_stride),
            OperatingBuffer::UserOut => unit(&self.desc.out_stride),
            _ => true,
        }
    }

    pub fn contains_scheme(&self, scheme: ComputeScheme) -> bool {
        self.tree
            .pre_order(self.root)
            .into_iter()
            .any(|id| self.tree[id].scheme == scheme)
    }

    /// One line per node, indented by depth.
    pub fn describe(&self) -> String {
        self.tree
            .pre_order(self.root)
            .into_iter()
            .map(|id| {
                let node = &self.tree[id];
                format!(
                    "{:indent$}{} len={:?} batch={} {}:{} -> {}:{}",
                    "",
                    node.scheme,
                    node.length,
                    node.batch,
                    node.ob_in,
                    node.in_array_type,
                    node.ob_out,
                    node.out_array_type,
                    indent = 2 * self.tree.depth(id),
                )
            })
            .join("\n")
    }
}

/// Fills in kernel factors and twiddle table sizes of every leaf.
fn resolve_kernels<C: KernelCatalog + ?Sized>(
    tree: &mut ExecTree,
    exec_seq: &[NodeId],
    catalog: &C,
) -> PlanResult<()> {
    for &id in exec_seq {
        let node = &tree[id];
        let (factors, twiddle_length) = match node.scheme {
            ComputeScheme::KernelBluesteinSingle => (
                BluesteinSingleNode::kernel_factors(catalog, node)?,
                BluesteinSingleNode::twiddle_table_length(node),
            ),
            ComputeScheme::KernelChirp => (Vec::new(), node.large_1d),
            scheme => match scheme.kernel_kind() {
                Some(kind) => {
                    let length = node.length[0];
                    let factors = catalog
                        .kernel_factors(length, node.precision, kind)
                        .ok_or(PlanError::MissingKernel {
                            length,
                            precision: node.precision,
                        })?;
                    (factors, length)
                }
                None => continue,
            },
        };
        let node = &mut tree[id];
        node.kernel_factors = factors;
        node.twiddle_length = twiddle_length;
    }
    Ok(())
}
