use crate::math::RealNumber;
use crate::options::{RestartScheme, RestartToCurrentMetric, SolveOptions};
use crate::solution::TerminationStatus;
use serde::{Deserialize, Serialize};

/// The subset of `SolveOptions` the restart controller actually reads,
/// mirroring how the reference implementation builds a dedicated parameter
/// record instead of threading the whole configuration through.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RestartParameters<T: RealNumber> {
    pub restart_scheme: RestartScheme,
    pub restart_to_current_metric: RestartToCurrentMetric,
    pub restart_frequency_if_fixed: usize,
    pub artificial_restart_threshold: T,
    pub sufficient_reduction_for_restart: T,
    pub necessary_reduction_for_restart: T,
    pub primal_weight_update_smoothing: T,
}

impl<T> RestartParameters<T>
where
    T: RealNumber,
{
    pub fn from_options(options: &SolveOptions<T>) -> Self {
        Self {
            restart_scheme: options.restart_scheme,
            restart_to_current_metric: options.restart_to_current_metric,
            restart_frequency_if_fixed: options.restart_frequency_if_fixed,
            artificial_restart_threshold: options.artificial_restart_threshold,
            sufficient_reduction_for_restart: options.sufficient_reduction_for_restart,
            necessary_reduction_for_restart: options.necessary_reduction_for_restart,
            primal_weight_update_smoothing: options.primal_weight_update_smoothing,
        }
    }
}

/// Snapshot of the solver state taken at the last restart, used by the
/// adaptive-restart reduction-ratio test and by the primal-weight update.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RestartInfo<T: RealNumber> {
    pub primal_solution: Vec<T>,
    pub dual_solution: Vec<T>,
    pub primal_product: Vec<T>,
    pub dual_product: Vec<T>,
    pub last_restart_length: usize,
    pub primal_distance_moved: T,
    pub dual_distance_moved: T,
    pub last_restart_kkt_residual: T,
    pub last_reduction_ratio: T,
}

impl<T> RestartInfo<T>
where
    T: RealNumber,
{
    pub fn new(n: usize, m: usize) -> Self {
        Self {
            primal_solution: vec![T::zero(); n],
            dual_solution: vec![T::zero(); m],
            primal_product: vec![T::zero(); m],
            dual_product: vec![T::zero(); n],
            last_restart_length: 0,
            primal_distance_moved: T::zero(),
            dual_distance_moved: T::zero(),
            last_restart_kkt_residual: T::zero(),
            last_reduction_ratio: T::one(),
        }
    }
}

/// The full mutable state carried between PDHG iterations. Rewritten every
/// step; the only shared mutable data in the solver.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SolverState<T: RealNumber> {
    pub current_primal: Vec<T>,
    pub current_dual: Vec<T>,
    pub current_primal_product: Vec<T>,
    pub current_dual_product: Vec<T>,
    pub current_primal_obj_product: Vec<T>,

    pub avg_primal: Vec<T>,
    pub avg_dual: Vec<T>,
    pub avg_primal_product: Vec<T>,
    pub avg_dual_product: Vec<T>,
    pub weights_sum: T,
    pub solutions_count: usize,

    pub initial_primal: Vec<T>,
    pub initial_dual: Vec<T>,
    pub initial_primal_product: Vec<T>,
    pub initial_dual_product: Vec<T>,

    pub delta_primal: Vec<T>,
    pub delta_dual: Vec<T>,
    pub delta_primal_product: Vec<T>,

    pub step_size: T,
    pub primal_weight: T,
    pub initial_step_size: T,

    pub num_iterations: usize,
    pub num_steps_tried: usize,
    pub cumulative_kkt_passes: usize,
    pub numerical_error: bool,
    pub termination_status: TerminationStatus,
}

impl<T> SolverState<T>
where
    T: RealNumber,
{
    pub fn new(n: usize, m: usize, initial_step_size: T, primal_weight: T) -> Self {
        Self {
            current_primal: vec![T::zero(); n],
            current_dual: vec![T::zero(); m],
            current_primal_product: vec![T::zero(); m],
            current_dual_product: vec![T::zero(); n],
            current_primal_obj_product: vec![T::zero(); n],
            avg_primal: vec![T::zero(); n],
            avg_dual: vec![T::zero(); m],
            avg_primal_product: vec![T::zero(); m],
            avg_dual_product: vec![T::zero(); n],
            weights_sum: T::zero(),
            solutions_count: 0,
            initial_primal: vec![T::zero(); n],
            initial_dual: vec![T::zero(); m],
            initial_primal_product: vec![T::zero(); m],
            initial_dual_product: vec![T::zero(); n],
            delta_primal: vec![T::zero(); n],
            delta_dual: vec![T::zero(); m],
            delta_primal_product: vec![T::zero(); m],
            step_size: initial_step_size,
            primal_weight,
            initial_step_size,
            num_iterations: 0,
            num_steps_tried: 0,
            cumulative_kkt_passes: 0,
            numerical_error: false,
            termination_status: TerminationStatus::Unspecified,
        }
    }

    /// Resets the averaging accumulators and anchors the next restart epoch
    /// at `(primal, dual)`. Leaves `current_*` untouched — callers overwrite
    /// those with the chosen restart candidate first.
    pub fn reset_epoch(&mut self, primal: &[T], dual: &[T], primal_product: &[T], dual_product: &[T]) {
        self.weights_sum = T::zero();
        self.solutions_count = 0;
        self.avg_primal.iter_mut().for_each(|v| *v = T::zero());
        self.avg_dual.iter_mut().for_each(|v| *v = T::zero());
        self.avg_primal_product.iter_mut().for_each(|v| *v = T::zero());
        self.avg_dual_product.iter_mut().for_each(|v| *v = T::zero());
        self.initial_primal.copy_from_slice(primal);
        self.initial_dual.copy_from_slice(dual);
        self.initial_primal_product.copy_from_slice(primal_product);
        self.initial_dual_product.copy_from_slice(dual_product);
        self.initial_step_size = self.step_size;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::Scalar;

    #[test]
    fn reset_epoch_zeroes_averaging_buffers() {
        let mut state: SolverState<Scalar> = SolverState::new(2, 1, 1.0, 1.0);
        state.avg_primal = vec![5.0, 5.0];
        state.weights_sum = 3.0;
        state.solutions_count = 4;
        state.reset_epoch(&[1.0, 2.0], &[0.5], &[0.1], &[0.2, 0.3]);
        assert_eq!(state.solutions_count, 0);
        assert_eq!(state.weights_sum, 0.0);
        assert_eq!(state.avg_primal, vec![0.0, 0.0]);
        assert_eq!(state.initial_primal, vec![1.0, 2.0]);
    }
}
