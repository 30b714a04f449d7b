use std::collections::BTreeSet;

use gfp_assignment::{AssignmentConfig, AssignmentPolicy, create_plan};
use gfp_catalog::{CatalogConfig, FunctionPool, Precision};
use gfp_plan::{
    ArrayType, ComputeScheme, ExecPlan, NodeId, OperatingBuffer, Placement, PlanError,
    TransformDesc, TransformType,
};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use tracing_forest::ForestLayer;
use tracing_forest::util::LevelFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Registry};

use OperatingBuffer::{Temp, TempBluestein, TempCmplxForReal, UserIn, UserOut};

fn init_tracing() {
    let env_filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::WARN.into())
        .from_env_lossy();

    // Every test calls this; only the first subscriber sticks.
    let _ = Registry::default()
        .with(env_filter)
        .with(ForestLayer::default())
        .try_init();
}

fn plan_with_budget(desc: TransformDesc, buffer_budget: usize) -> Result<ExecPlan, PlanError> {
    init_tracing();
    create_plan(
        desc,
        &FunctionPool::default(),
        &AssignmentConfig { buffer_budget },
    )
}

fn plan(desc: TransformDesc) -> ExecPlan {
    plan_with_budget(desc, AssignmentConfig::default().buffer_budget).unwrap()
}

fn complex(length: usize) -> TransformDesc {
    TransformDesc::new(TransformType::ComplexForward, Precision::Single, vec![length])
}

fn buffers(plan: &ExecPlan, id: NodeId) -> (OperatingBuffer, OperatingBuffer) {
    (plan.tree[id].ob_in, plan.tree[id].ob_out)
}

fn leaf_buffers(plan: &ExecPlan) -> Vec<(OperatingBuffer, OperatingBuffer)> {
    plan.exec_seq.iter().map(|&id| buffers(plan, id)).collect()
}

/// Checks the invariants every committed assignment must satisfy.
fn check_assignment(plan: &ExecPlan, budget: usize) {
    let root = &plan.tree[plan.root];
    assert_eq!(root.ob_in, UserIn);
    assert_eq!(root.ob_out, plan.root_out_buffer());

    let may_clobber_input =
        plan.is_in_place() || plan.desc.transform_type == TransformType::RealInverse;
    let mut stream = UserIn;
    let mut used = BTreeSet::new();
    for &id in &plan.exec_seq {
        let node = &plan.tree[id];
        used.extend([node.ob_in, node.ob_out]);
        if let Some(pinned) = node.pinned_buffer {
            assert_eq!((node.ob_in, node.ob_out), (pinned, pinned));
            continue;
        }
        assert_eq!(node.ob_in, stream, "{} breaks the data flow", node.scheme);
        if let Some(required) = node.scheme.required_out_buffer() {
            assert_eq!(node.ob_out, required);
        }
        if !node.allow_out_of_place {
            assert_eq!(node.ob_in, node.ob_out);
        }
        if !may_clobber_input {
            assert_ne!(node.ob_out, UserIn);
        }
        stream = node.ob_out;
    }
    assert_eq!(stream, plan.root_out_buffer());
    assert!(used.len() <= budget);
}

#[test]
fn single_kernel_out_of_place() {
    let plan = plan(complex(64));
    assert_eq!(leaf_buffers(&plan), vec![(UserIn, UserOut)]);
    assert_eq!(plan.tree[plan.root].placement, Placement::NotInPlace);
}

#[test]
fn single_kernel_in_place() {
    let plan = plan(complex(64).with_placement(Placement::InPlace));
    assert_eq!(leaf_buffers(&plan), vec![(UserIn, UserIn)]);
    assert_eq!(plan.tree[plan.root].placement, Placement::InPlace);
}

#[test]
fn large_1d_fuses_into_user_output() {
    let plan = plan(complex(1 << 18));
    assert_eq!(plan.tree[plan.root].scheme, ComputeScheme::L1dCc);
    // Fusable and touching only the user buffers.
    assert_eq!(
        leaf_buffers(&plan),
        vec![(UserIn, UserOut), (UserOut, UserOut)]
    );
    assert!(plan.fuse_shims[0].is_fusable(&plan.tree));
}

#[test]
fn large_1d_in_place_stays_in_the_user_buffer() {
    let plan = plan(complex(1 << 18).with_placement(Placement::InPlace));
    // Reading and writing UserIn rules out fusion, so the fewest buffers win.
    assert_eq!(leaf_buffers(&plan), vec![(UserIn, UserIn), (UserIn, UserIn)]);
    assert!(!plan.fuse_shims[0].is_fusable(&plan.tree));
    assert_eq!(plan.tree[plan.root].placement, Placement::InPlace);
}

#[test]
fn strided_output_keeps_column_pass_in_temp() {
    let n = 1 << 18;
    let desc = complex(n).with_layout((vec![1], n), (vec![2], 2 * n));
    let plan = plan(desc);
    assert_eq!(leaf_buffers(&plan), vec![(UserIn, Temp), (Temp, UserOut)]);
}

#[test]
fn bluestein_multi_kernel_runs_in_its_workspace() {
    let plan = plan(
        TransformDesc::new(TransformType::ComplexForward, Precision::Double, vec![100003])
            .with_batch(3),
    );
    check_assignment(&plan, 5);

    let children = plan.tree.children(plan.root).to_vec();
    assert_eq!(children.len(), 6);
    for &id in &children[..5] {
        assert_eq!(plan.tree[id].ob_out, TempBluestein);
    }
    assert_eq!(buffers(&plan, children[1]), (UserIn, TempBluestein));
    assert_eq!(buffers(&plan, children[5]), (TempBluestein, UserOut));
    assert_eq!(buffers(&plan, plan.root), (UserIn, UserOut));

    // The pairs inside the sub-transforms run in place and cannot fuse.
    assert_eq!(plan.fuse_shims.len(), 2);
    assert!(plan.fuse_shims.iter().all(|s| !s.is_fusable(&plan.tree)));
}

#[test]
fn bluestein_in_place() {
    let plan = plan(complex(100003).with_placement(Placement::InPlace));
    check_assignment(&plan, 5);
    let res_mul = *plan.exec_seq.last().unwrap();
    assert_eq!(buffers(&plan, res_mul), (TempBluestein, UserIn));
}

#[test]
fn bluestein_single_kernel() {
    let plan = plan(complex(19));
    check_assignment(&plan, 5);
    assert_eq!(
        leaf_buffers(&plan),
        vec![
            (TempBluestein, TempBluestein),
            (TempBluestein, TempBluestein),
            (UserIn, UserOut),
        ]
    );
    assert_eq!(buffers(&plan, plan.root), (UserIn, UserOut));
}

#[test]
fn bluestein_over_budget_is_rejected() {
    let desc = TransformDesc::new(TransformType::ComplexForward, Precision::Double, vec![100003]);
    assert_eq!(
        plan_with_budget(desc.clone(), 2).unwrap_err(),
        PlanError::NoValidAssignment
    );
    assert!(plan_with_budget(desc, 3).is_ok());
}

#[test]
fn policy_reports_failure_without_touching_the_plan() {
    init_tracing();
    let mut plan = ExecPlan::build(complex(100003), &FunctionPool::default()).unwrap();
    let mut policy = AssignmentPolicy::new(AssignmentConfig { buffer_budget: 1 });
    assert!(!policy.assign_buffers(&mut plan));
    assert_eq!(plan.tree[plan.root].ob_in, OperatingBuffer::Uninit);
}

#[test]
fn real_forward_goes_through_complex_scratch() {
    let desc = TransformDesc::new(TransformType::RealForward, Precision::Single, vec![16]);
    let plan = plan(desc.clone());
    check_assignment(&plan, 5);
    assert_eq!(
        leaf_buffers(&plan),
        vec![
            (UserIn, TempCmplxForReal),
            (TempCmplxForReal, TempCmplxForReal),
            (TempCmplxForReal, UserOut),
        ]
    );
    let copy_out = plan.exec_seq[2];
    assert_eq!(plan.tree[copy_out].in_array_type, ArrayType::ComplexInterleaved);
    assert_eq!(plan.tree[copy_out].out_array_type, ArrayType::HermitianInterleaved);

    assert_eq!(
        plan_with_budget(desc, 2).unwrap_err(),
        PlanError::NoValidAssignment
    );
}

#[test]
fn real_inverse_out_of_place() {
    let plan = plan(TransformDesc::new(
        TransformType::RealInverse,
        Precision::Single,
        vec![16],
    ));
    check_assignment(&plan, 5);
    let copy_out = *plan.exec_seq.last().unwrap();
    assert_eq!(plan.tree[copy_out].scheme, ComputeScheme::KernelCopyCmplxToR);
    assert_eq!(buffers(&plan, copy_out), (TempCmplxForReal, UserOut));
    assert_eq!(plan.tree[copy_out].out_array_type, ArrayType::Real);
}

#[test]
fn real_forward_in_place() {
    let plan = plan(
        TransformDesc::new(TransformType::RealForward, Precision::Single, vec![16])
            .with_placement(Placement::InPlace),
    );
    check_assignment(&plan, 5);
    assert_eq!(buffers(&plan, plan.root), (UserIn, UserIn));
    assert_eq!(plan.tree[plan.root].placement, Placement::InPlace);
}

#[test]
fn configs_from_json() {
    init_tracing();
    let catalog: CatalogConfig = serde_json::from_str(
        r#"{"largest_length": {"half": 256, "single": 256, "double": 256}}"#,
    )
    .unwrap();
    let config: AssignmentConfig = serde_json::from_str(r#"{"buffer_budget": 2}"#).unwrap();
    let pool = FunctionPool::new(catalog).unwrap();

    let plan = create_plan(complex(1000), &pool, &config).unwrap();
    assert_eq!(plan.tree[plan.root].scheme, ComputeScheme::L1dCc);
    assert_eq!(
        leaf_buffers(&plan),
        vec![(UserIn, UserOut), (UserOut, UserOut)]
    );
}

#[test]
fn random_transforms_satisfy_assignment_invariants() {
    init_tracing();
    let pool = FunctionPool::default();
    let config = AssignmentConfig::default();
    let types = [
        TransformType::ComplexForward,
        TransformType::ComplexInverse,
        TransformType::RealForward,
        TransformType::RealInverse,
    ];
    let mut rng = SmallRng::seed_from_u64(11);
    for _ in 0..60 {
        let length = rng.random_range(2..5000usize);
        let transform_type = types[rng.random_range(0..types.len())];
        let placement = if rng.random_bool(0.5) {
            Placement::InPlace
        } else {
            Placement::NotInPlace
        };
        let desc = TransformDesc::new(transform_type, Precision::Single, vec![length])
            .with_batch(rng.random_range(1..4))
            .with_placement(placement);

        let plan = create_plan(desc.clone(), &pool, &config)
            .unwrap_or_else(|e| panic!("{desc:?}: {e}"));
        check_assignment(&plan, config.buffer_budget);
        for id in plan.tree.pre_order(plan.root) {
            let node = &plan.tree[id];
            assert_ne!(node.ob_in, OperatingBuffer::Uninit, "{}", plan.describe());
            assert_ne!(node.ob_out, OperatingBuffer::Uninit, "{}", plan.describe());
        }
    }
}
