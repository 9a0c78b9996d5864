use crate::math::RealNumber;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Residuals, objectives, and gap for one iterate, computed on the unscaled
/// problem. Never drives control flow directly; the restart and termination
/// tests consume the scalar fields below.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConvergenceInformation<T: RealNumber> {
    pub primal_objective: T,
    pub dual_objective: T,
    pub corrected_dual_objective: T,
    pub l2_primal_residual: T,
    pub l2_dual_residual: T,
    pub linf_primal_residual: T,
    pub linf_dual_residual: T,
    pub l2_relative_primal_residual: T,
    pub l2_relative_dual_residual: T,
    pub linf_relative_primal_residual: T,
    pub linf_relative_dual_residual: T,
    pub gap: T,
    pub relative_gap: T,
}

/// Ray-based infeasibility certificates, computed on the homogeneous problem
/// implied by an (approximately) unbounded direction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InfeasibilityInformation<T: RealNumber> {
    pub max_primal_ray_infeasibility: T,
    pub primal_ray_linear_objective: T,
    pub max_dual_ray_infeasibility: T,
    pub dual_ray_objective: T,
}

/// Everything computed at one termination-evaluation checkpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IterationStats<T: RealNumber> {
    pub iteration: usize,
    pub cumulative_kkt_passes: usize,
    pub elapsed: Duration,
    pub convergence_information: ConvergenceInformation<T>,
    pub infeasibility_information: Option<InfeasibilityInformation<T>>,
}
