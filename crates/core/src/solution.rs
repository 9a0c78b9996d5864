use crate::math::RealNumber;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum TerminationStatus {
    Unspecified,
    Optimal,
    PrimalInfeasible,
    DualInfeasible,
    TimeLimit,
    IterationLimit,
    KktMatrixPassLimit,
    NumericalError,
}

impl TerminationStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, TerminationStatus::Unspecified)
    }
}

/// The result of a solve, on the original (unscaled) primal/dual space.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaddlePointOutput<T: RealNumber> {
    pub primal: Vec<T>,
    pub dual: Vec<T>,
    pub termination_status: TerminationStatus,
    pub iteration_count: usize,
    pub cumulative_kkt_passes: usize,
    pub objective_value: T,
}
