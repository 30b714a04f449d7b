use alloc::collections::{BTreeMap, BTreeSet};
use alloc::vec::Vec;
use core::cmp::Reverse;

use gfp_plan::{
    ArrayType, ComputeScheme, ExecPlan, NodeId, OperatingBuffer, Placement, TransformType,
    TreeNode,
};
use itertools::Itertools;
use tracing::{debug, instrument, trace};

use crate::{AssignmentConfig, KernelPlacement, TraceArena, TraceId};

/// Searches all legal buffer and array type assignments of a plan and commits the best one.
///
/// A policy owns its search state and handles one plan at a time; every call to
/// [`Self::assign_buffers`] starts from scratch.
#[derive(Clone, Debug, Default)]
pub struct AssignmentPolicy {
    config: AssignmentConfig,
    traces: TraceArena,
    winner_candidates: Vec<TraceId>,
    available_buffers: BTreeSet<OperatingBuffer>,
    available_array_types: BTreeSet<ArrayType>,
    num_cur_winner_fusions: Option<usize>,
    must_use_cmplx_for_real: bool,
    must_use_bluestein: bool,
    /// Second kernel of each fuse shim, mapped to the first.
    shim_firsts: BTreeMap<NodeId, NodeId>,
    num_pruned: usize,
}

impl AssignmentPolicy {
    pub fn new(config: AssignmentConfig) -> Self {
        Self {
            config,
            ..Default::default()
        }
    }

    /// Assigns `ob_in`, `ob_out`, array types and placement to every node of `plan`.
    ///
    /// Returns `false`, leaving the plan untouched, if no assignment satisfies every constraint.
    #[instrument(level = "debug", skip_all, fields(leaves = plan.exec_seq.len()))]
    pub fn assign_buffers(&mut self, plan: &mut ExecPlan) -> bool {
        self.reset(plan);

        let root = self
            .traces
            .add_root(OperatingBuffer::UserIn, plan.desc.in_array_type);
        self.enumerate(plan, root, 0);

        debug!(
            traces = self.traces.len(),
            pruned = self.num_pruned,
            candidates = self.winner_candidates.len(),
            "assignment search finished"
        );

        let Some(winner) = self.pick_winner() else {
            debug!("no valid buffer assignment");
            return false;
        };
        self.backtracking(plan, winner);
        true
    }

    fn reset(&mut self, plan: &ExecPlan) {
        self.traces.clear();
        self.winner_candidates.clear();
        self.num_cur_winner_fusions = None;
        self.num_pruned = 0;

        self.must_use_cmplx_for_real = plan.contains_scheme(ComputeScheme::RealViaComplex);
        self.must_use_bluestein = plan.contains_scheme(ComputeScheme::Bluestein);

        self.available_buffers = [OperatingBuffer::UserIn, OperatingBuffer::Temp].into();
        if !plan.is_in_place() {
            self.available_buffers.insert(OperatingBuffer::UserOut);
        }
        if self.must_use_cmplx_for_real {
            self.available_buffers
                .insert(OperatingBuffer::TempCmplxForReal);
        }
        if self.must_use_bluestein {
            self.available_buffers.insert(OperatingBuffer::TempBluestein);
        }

        self.available_array_types = [
            ArrayType::ComplexInterleaved,
            plan.desc.in_array_type,
            plan.desc.out_array_type,
        ]
        .into();

        self.shim_firsts = plan
            .fuse_shims
            .iter()
            .map(|shim| (shim.last, shim.first))
            .collect();
    }

    /// Whether a buffer declared as `root_type` may hold data of `test_type`.
    ///
    /// Real and hermitian interleaved buffers are big enough to double as interleaved complex
    /// scratch; whether a particular write fits is a separate capacity check.
    fn equivalent_array_type(root_type: ArrayType, test_type: ArrayType) -> bool {
        root_type == test_type
            || (matches!(root_type, ArrayType::Real | ArrayType::HermitianInterleaved)
                && test_type == ArrayType::ComplexInterleaved)
    }

    fn buffer_holds_type(plan: &ExecPlan, buffer: OperatingBuffer, ty: ArrayType) -> bool {
        let desc = &plan.desc;
        match buffer {
            OperatingBuffer::UserIn => {
                Self::equivalent_array_type(desc.in_array_type, ty)
                    || (plan.is_in_place() && Self::equivalent_array_type(desc.out_array_type, ty))
            }
            OperatingBuffer::UserOut => Self::equivalent_array_type(desc.out_array_type, ty),
            OperatingBuffer::Uninit => false,
            _ => ty == ArrayType::ComplexInterleaved,
        }
    }

    /// Whether `node`, reading `(in_buf, in_type)`, may write `(out_buf, out_type)`.
    fn valid_out_buffer(
        &self,
        plan: &ExecPlan,
        node: &TreeNode,
        parent: TraceId,
        out_buf: OperatingBuffer,
        out_type: ArrayType,
    ) -> bool {
        let p = &self.traces[parent];
        let in_buf = p.stream_buf;

        if node
            .scheme
            .required_out_buffer()
            .is_some_and(|required| required != out_buf)
        {
            return false;
        }
        if !node.allow_out_of_place && out_buf != in_buf {
            return false;
        }
        if node.scheme.requires_unit_stride_output() && !plan.buffer_is_unit_stride(out_buf) {
            return false;
        }
        if !node.scheme.accepts_out_type(out_type)
            || !Self::buffer_holds_type(plan, out_buf, out_type)
        {
            return false;
        }
        if plan
            .buffer_capacity(out_buf)
            .is_some_and(|capacity| node.out_footprint(out_type) > capacity)
        {
            return false;
        }
        // Only out-of-place real inverse transforms may use their input as scratch.
        if out_buf == OperatingBuffer::UserIn
            && !plan.is_in_place()
            && plan.desc.transform_type != TransformType::RealInverse
        {
            return false;
        }

        let mut used = p.used_buffers.clone();
        used.extend([in_buf, out_buf]);
        used.len() <= self.config.buffer_budget
    }

    /// Depth-first expansion of every legal choice for the kernel at `cur_seq_id`.
    fn enumerate(&mut self, plan: &ExecPlan, parent: TraceId, cur_seq_id: usize) {
        let Some(&id) = plan.exec_seq.get(cur_seq_id) else {
            if self.check_assignment_valid(plan, parent) {
                self.update_winner_from_valid_paths(parent);
            }
            return;
        };
        let node = &plan.tree[id];

        if let Some(pinned) = node.pinned_buffer {
            let fits_budget = {
                let p = &self.traces[parent];
                p.used_buffers.contains(&pinned)
                    || p.num_used_buffers() < self.config.buffer_budget
            };
            if !self.available_buffers.contains(&pinned) || !fits_budget {
                self.num_pruned += 1;
                return;
            }
            let child = self.traces.add_branch(
                parent,
                KernelPlacement {
                    node: id,
                    in_buf: pinned,
                    out_buf: pinned,
                    in_type: ArrayType::ComplexInterleaved,
                    out_type: ArrayType::ComplexInterleaved,
                    pinned: true,
                    fused: false,
                },
            );
            self.enumerate(plan, child, cur_seq_id + 1);
            return;
        }

        let (in_buf, in_type) = {
            let p = &self.traces[parent];
            (p.stream_buf, p.stream_type)
        };
        if !node.scheme.accepts_in_type(in_type) {
            self.num_pruned += 1;
            return;
        }

        let choices = self
            .available_buffers
            .iter()
            .copied()
            .cartesian_product(self.available_array_types.iter().copied())
            .collect_vec();
        for (out_buf, out_type) in choices {
            if !self.valid_out_buffer(plan, node, parent, out_buf, out_type) {
                self.num_pruned += 1;
                continue;
            }
            let fused = self.completes_fusion(parent, id, out_buf);
            let child = self.traces.add_branch(
                parent,
                KernelPlacement {
                    node: id,
                    in_buf,
                    out_buf,
                    in_type,
                    out_type,
                    pinned: false,
                    fused,
                },
            );
            self.enumerate(plan, child, cur_seq_id + 1);
        }
    }

    /// `id` closes a fuse shim opened by the previous kernel, and the fused kernel would be
    /// out-of-place.
    fn completes_fusion(
        &self,
        parent: TraceId,
        id: NodeId,
        out_buf: OperatingBuffer,
    ) -> bool {
        let p = &self.traces[parent];
        self.shim_firsts
            .get(&id)
            .is_some_and(|&first| p.node == Some(first) && p.in_buf != out_buf)
    }

    /// Whether the complete path ending at `leaf` is an acceptable assignment.
    fn check_assignment_valid(&self, plan: &ExecPlan, leaf: TraceId) -> bool {
        let t = &self.traces[leaf];
        if t.stream_buf != plan.root_out_buffer()
            || !Self::equivalent_array_type(plan.desc.out_array_type, t.stream_type)
        {
            return false;
        }
        if t.num_used_buffers() > self.config.buffer_budget {
            return false;
        }
        if self.must_use_cmplx_for_real
            && !t.used_buffers.contains(&OperatingBuffer::TempCmplxForReal)
        {
            return false;
        }
        if self.must_use_bluestein && !t.used_buffers.contains(&OperatingBuffer::TempBluestein) {
            return false;
        }
        true
    }

    /// Keeps only the valid paths with the most fusions.
    fn update_winner_from_valid_paths(&mut self, leaf: TraceId) {
        let fusions = self.traces[leaf].num_fusions;
        match self.num_cur_winner_fusions {
            Some(cur) if fusions < cur => {}
            Some(cur) if fusions == cur => self.winner_candidates.push(leaf),
            _ => {
                trace!(fusions, "new best fusion count");
                self.winner_candidates.clear();
                self.winner_candidates.push(leaf);
                self.num_cur_winner_fusions = Some(fusions);
            }
        }
    }

    /// Most fusions, then fewest buffers, then fewest array type switches, then first found.
    fn pick_winner(&self) -> Option<TraceId> {
        self.winner_candidates
            .iter()
            .copied()
            .enumerate()
            .min_by_key(|&(discovered, id)| {
                let t = &self.traces[id];
                (
                    Reverse(t.num_fusions),
                    t.num_used_buffers(),
                    t.num_type_switches,
                    discovered,
                )
            })
            .map(|(_, id)| id)
    }

    /// Writes the path ending at `winner` into the plan's leaves, then derives every composite
    /// node's buffers from its children.
    fn backtracking(&self, plan: &mut ExecPlan, winner: TraceId) {
        let path = self.traces.path(winner);
        for &tid in &path {
            let t = &self.traces[tid];
            let Some(id) = t.node else { continue };
            trace!(node = %plan.tree[id].scheme, "{t}");
            let node = &mut plan.tree[id];
            node.ob_in = t.in_buf;
            node.ob_out = t.out_buf;
            node.in_array_type = t.in_type;
            node.out_array_type = t.out_type;
            node.placement = placement_of(t.in_buf, t.out_buf);
        }

        for id in plan.tree.post_order(plan.root) {
            let children = plan.tree.children(id);
            let (Some(&last), Some(&first)) = (
                children.last(),
                children
                    .iter()
                    .find(|&&c| plan.tree[c].pinned_buffer.is_none())
                    .or(children.first()),
            ) else {
                continue;
            };
            let (ob_in, in_type) = (plan.tree[first].ob_in, plan.tree[first].in_array_type);
            let (ob_out, out_type) = (plan.tree[last].ob_out, plan.tree[last].out_array_type);

            let node = &mut plan.tree[id];
            node.ob_in = ob_in;
            node.ob_out = ob_out;
            node.in_array_type = in_type;
            node.out_array_type = out_type;
            node.placement = placement_of(ob_in, ob_out);
        }

        let winner = &self.traces[winner];
        debug!(
            fusions = winner.num_fusions,
            buffers = winner.num_used_buffers(),
            type_switches = winner.num_type_switches,
            "buffer assignment committed"
        );
    }
}

fn placement_of(in_buf: OperatingBuffer, out_buf: OperatingBuffer) -> Placement {
    if in_buf == out_buf {
        Placement::InPlace
    } else {
        Placement::NotInPlace
    }
}

#[cfg(test)]
mod tests {
    use alloc::vec;

    use gfp_catalog::{FunctionPool, Precision};
    use gfp_plan::TransformDesc;

    use super::*;

    #[test]
    fn array_type_equivalence() {
        use ArrayType::*;
        assert!(AssignmentPolicy::equivalent_array_type(Real, ComplexInterleaved));
        assert!(AssignmentPolicy::equivalent_array_type(
            HermitianInterleaved,
            ComplexInterleaved
        ));
        assert!(AssignmentPolicy::equivalent_array_type(ComplexPlanar, ComplexPlanar));
        assert!(!AssignmentPolicy::equivalent_array_type(ComplexPlanar, ComplexInterleaved));
        assert!(!AssignmentPolicy::equivalent_array_type(HermitianPlanar, ComplexInterleaved));
        assert!(!AssignmentPolicy::equivalent_array_type(ComplexInterleaved, Real));
    }

    #[test]
    fn temp_buffers_hold_interleaved_only() {
        let plan = ExecPlan::build(
            TransformDesc::new(TransformType::ComplexForward, Precision::Single, vec![64])
                .with_array_types(ArrayType::ComplexPlanar, ArrayType::ComplexPlanar),
            &FunctionPool::default(),
        )
        .unwrap();
        let holds = |b, t| AssignmentPolicy::buffer_holds_type(&plan, b, t);
        assert!(holds(OperatingBuffer::Temp, ArrayType::ComplexInterleaved));
        assert!(!holds(OperatingBuffer::Temp, ArrayType::ComplexPlanar));
        assert!(holds(OperatingBuffer::UserOut, ArrayType::ComplexPlanar));
        assert!(!holds(OperatingBuffer::UserOut, ArrayType::ComplexInterleaved));
    }

    #[test]
    fn planar_single_kernel_keeps_its_types() {
        let mut plan = ExecPlan::build(
            TransformDesc::new(TransformType::ComplexForward, Precision::Single, vec![64])
                .with_array_types(ArrayType::ComplexPlanar, ArrayType::ComplexPlanar),
            &FunctionPool::default(),
        )
        .unwrap();
        let mut policy = AssignmentPolicy::default();
        assert!(policy.assign_buffers(&mut plan));

        let root = &plan.tree[plan.root];
        assert_eq!((root.ob_in, root.ob_out), (OperatingBuffer::UserIn, OperatingBuffer::UserOut));
        assert_eq!(root.in_array_type, ArrayType::ComplexPlanar);
        assert_eq!(root.out_array_type, ArrayType::ComplexPlanar);
        assert_eq!(root.placement, Placement::NotInPlace);
    }

    #[test]
    fn winner_ranks_fusions_then_buffers_then_type_switches() {
        use gfp_plan::{Direction, ExecTree};
        use ArrayType::{ComplexInterleaved as Ci, ComplexPlanar as Cp};
        use OperatingBuffer::{Temp, UserIn, UserOut};

        let mut tree = ExecTree::new();
        let [first, second] = [(); 2].map(|_| {
            tree.add(TreeNode::new(
                ComputeScheme::KernelStockham,
                Precision::Single,
                Direction::Forward,
            ))
        });
        let mut policy = AssignmentPolicy::default();
        let root = policy.traces.add_root(UserIn, Ci);
        let mut path = |steps: [(OperatingBuffer, ArrayType, bool); 2]| {
            let mut cur = (root, UserIn, Ci);
            for (node, (out_buf, out_type, fused)) in [first, second].into_iter().zip(steps) {
                let id = policy.traces.add_branch(
                    cur.0,
                    KernelPlacement {
                        node,
                        in_buf: cur.1,
                        out_buf,
                        in_type: cur.2,
                        out_type,
                        pinned: false,
                        fused,
                    },
                );
                cur = (id, out_buf, out_type);
            }
            cur.0
        };

        let three_buffers = path([(Temp, Ci, false), (UserOut, Ci, false)]);
        let two_switches = path([(UserOut, Cp, false), (UserOut, Ci, false)]);
        let one_switch = path([(UserOut, Cp, false), (UserOut, Cp, false)]);
        let one_switch_again = path([(UserOut, Cp, false), (UserOut, Cp, false)]);
        let fused = path([(Temp, Ci, false), (UserOut, Ci, true)]);
        assert_eq!(policy.traces[three_buffers].num_used_buffers(), 3);
        assert_eq!(policy.traces[two_switches].num_used_buffers(), 2);
        assert_eq!(policy.traces[two_switches].num_type_switches, 2);

        let mut winner_of = |candidates: &[TraceId]| {
            policy.winner_candidates = candidates.to_vec();
            policy.pick_winner()
        };
        assert_eq!(winner_of(&[three_buffers, two_switches]), Some(two_switches));
        assert_eq!(winner_of(&[two_switches, one_switch]), Some(one_switch));
        assert_eq!(winner_of(&[one_switch, one_switch_again]), Some(one_switch));
        assert_eq!(winner_of(&[one_switch_again, one_switch]), Some(one_switch_again));
        assert_eq!(winner_of(&[two_switches, fused]), Some(fused));
        assert_eq!(winner_of(&[]), None);
    }

    #[test]
    fn state_is_reset_between_plans() {
        let pool = FunctionPool::default();
        let mut policy = AssignmentPolicy::default();

        let mut big = ExecPlan::build(
            TransformDesc::new(TransformType::ComplexForward, Precision::Double, vec![100003]),
            &pool,
        )
        .unwrap();
        assert!(policy.assign_buffers(&mut big));

        let mut small = ExecPlan::build(
            TransformDesc::new(TransformType::ComplexForward, Precision::Single, vec![64])
                .with_placement(Placement::InPlace),
            &pool,
        )
        .unwrap();
        assert!(policy.assign_buffers(&mut small));
        let root = &small.tree[small.root];
        assert_eq!((root.ob_in, root.ob_out), (OperatingBuffer::UserIn, OperatingBuffer::UserIn));
        assert!(!policy.available_buffers.contains(&OperatingBuffer::TempBluestein));
    }
}
