use alloc::collections::BTreeSet;
use alloc::vec;
use alloc::vec::Vec;
use core::fmt;
use core::ops::Index;

use gfp_plan::{ArrayType, NodeId, OperatingBuffer};

/// Index of a trace inside its [`TraceArena`].
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TraceId(usize);

/// One step of a candidate assignment: the buffers and array types chosen for one kernel.
///
/// Counters accumulate along the path from the root, so every trace knows the totals of the
/// partial assignment ending at it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PlacementTrace {
    /// `None` for the synthetic root, which only carries the plan's input.
    pub node: Option<NodeId>,
    pub in_buf: OperatingBuffer,
    pub out_buf: OperatingBuffer,
    pub in_type: ArrayType,
    pub out_type: ArrayType,
    /// Where the transform data lives after this step. Pinned kernels leave it untouched.
    pub stream_buf: OperatingBuffer,
    pub stream_type: ArrayType,

    pub num_in_place: usize,
    pub num_type_switches: usize,
    pub num_fusions: usize,
    pub used_buffers: BTreeSet<OperatingBuffer>,

    pub parent: Option<TraceId>,
    pub branches: Vec<TraceId>,
}

impl PlacementTrace {
    pub fn is_in_place(&self) -> bool {
        self.node.is_some() && self.in_buf == self.out_buf
    }

    pub fn num_used_buffers(&self) -> usize {
        self.used_buffers.len()
    }
}

impl fmt::Display for PlacementTrace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}:{} -> {}:{}]",
            self.in_buf, self.in_type, self.out_buf, self.out_type
        )
    }
}

/// The placement to record for one kernel.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct KernelPlacement {
    pub node: NodeId,
    pub in_buf: OperatingBuffer,
    pub out_buf: OperatingBuffer,
    pub in_type: ArrayType,
    pub out_type: ArrayType,
    /// The kernel works on its own buffer and passes the transform data through.
    pub pinned: bool,
    /// The kernel completes a fusable pair with its predecessor.
    pub fused: bool,
}

/// Owns every trace of one search.
#[derive(Clone, Debug, Default)]
pub struct TraceArena {
    traces: Vec<PlacementTrace>,
}

impl TraceArena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.traces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.traces.is_empty()
    }

    pub fn clear(&mut self) {
        self.traces.clear();
    }

    /// Starts a search tree whose data stream begins in `buf` as `ty`.
    pub fn add_root(&mut self, buf: OperatingBuffer, ty: ArrayType) -> TraceId {
        self.push(PlacementTrace {
            node: None,
            in_buf: buf,
            out_buf: buf,
            in_type: ty,
            out_type: ty,
            stream_buf: buf,
            stream_type: ty,
            num_in_place: 0,
            num_type_switches: 0,
            num_fusions: 0,
            used_buffers: BTreeSet::new(),
            parent: None,
            branches: Vec::new(),
        })
    }

    /// Records `placement` as a branch of `parent`.
    pub fn add_branch(&mut self, parent: TraceId, placement: KernelPlacement) -> TraceId {
        let p = &self[parent];
        let is_in_place = placement.in_buf == placement.out_buf;
        let (stream_buf, stream_type) = if placement.pinned {
            (p.stream_buf, p.stream_type)
        } else {
            (placement.out_buf, placement.out_type)
        };
        let mut used_buffers = p.used_buffers.clone();
        used_buffers.extend([placement.in_buf, placement.out_buf]);

        let trace = PlacementTrace {
            node: Some(placement.node),
            in_buf: placement.in_buf,
            out_buf: placement.out_buf,
            in_type: placement.in_type,
            out_type: placement.out_type,
            stream_buf,
            stream_type,
            num_in_place: p.num_in_place + usize::from(is_in_place),
            num_type_switches: p.num_type_switches
                + usize::from(placement.in_type != placement.out_type),
            num_fusions: p.num_fusions + usize::from(placement.fused),
            used_buffers,
            parent: Some(parent),
            branches: Vec::new(),
        };
        let id = self.push(trace);
        self.traces[parent.0].branches.push(id);
        id
    }

    fn push(&mut self, trace: PlacementTrace) -> TraceId {
        self.traces.push(trace);
        TraceId(self.traces.len() - 1)
    }

    /// Traces from the first kernel to `leaf`, excluding the root.
    pub fn path(&self, leaf: TraceId) -> Vec<TraceId> {
        let mut path = vec![];
        let mut cur = Some(leaf);
        while let Some(id) = cur {
            if self[id].node.is_some() {
                path.push(id);
            }
            cur = self[id].parent;
        }
        path.reverse();
        path
    }
}

impl Index<TraceId> for TraceArena {
    type Output = PlacementTrace;

    fn index(&self, id: TraceId) -> &PlacementTrace {
        &self.traces[id.0]
    }
}
