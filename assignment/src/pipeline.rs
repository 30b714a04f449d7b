use gfp_catalog::KernelCatalog;
use gfp_plan::{ExecPlan, PlanError, PlanResult, TransformDesc};
use tracing::{debug, instrument};

use crate::{AssignmentConfig, AssignmentPolicy};

/// Builds the execution tree for `desc` and assigns every kernel its buffers.
#[instrument(level = "debug", skip_all, fields(length = ?desc.length, placement = ?desc.placement))]
pub fn create_plan<C: KernelCatalog + ?Sized>(
    desc: TransformDesc,
    catalog: &C,
    config: &AssignmentConfig,
) -> PlanResult<ExecPlan> {
    let mut plan = ExecPlan::build(desc, catalog)?;

    let mut policy = AssignmentPolicy::new(config.clone());
    if !policy.assign_buffers(&mut plan) {
        return Err(PlanError::NoValidAssignment);
    }

    debug!("plan:\n{}", plan.describe());
    Ok(plan)
}
