use crate::math::{norm2, norm_inf, RealNumber};
use crate::problem::QuadraticProgrammingProblem;
use serde::{Deserialize, Serialize};

/// Norms of the original (unscaled) right-hand side and linear objective,
/// used as denominators in the relative-residual formulas of the
/// termination test. Convergence information is always reported in
/// original units, so this cache is built once from the caller's problem
/// before scaling, not from the preconditioned one.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ProblemCache<T: RealNumber> {
    pub l2_norm_rhs: T,
    pub linf_norm_rhs: T,
    pub l2_norm_objective_vector: T,
    pub linf_norm_objective_vector: T,
}

impl<T> ProblemCache<T>
where
    T: RealNumber,
{
    pub fn new(problem: &QuadraticProgrammingProblem<T>) -> Self {
        let rhs = &problem.right_hand_side;
        let obj = &problem.objective_vector;
        Self {
            l2_norm_rhs: norm2(rhs),
            linf_norm_rhs: norm_inf(rhs),
            l2_norm_objective_vector: norm2(obj),
            linf_norm_objective_vector: norm_inf(obj),
        }
    }
}
