//! Adaptive restart controller shared by both PDHG drivers: decides when to
//! reset the averaging epoch and re-estimates the primal weight when it does.

use pdhg_core::math::{dot, norm2, RealNumber};
use pdhg_core::state::{RestartInfo, RestartParameters};
use pdhg_core::stats::ConvergenceInformation;

/// `sqrt(omega*||primal||^2 + (1/omega)*||dual||^2)`, the norm the restart
/// scheme and the Halpern reconstruction both measure distance in.
pub fn weighted_norm<T: RealNumber>(primal_weight: T, primal: &[T], dual: &[T]) -> T {
    (primal_weight * dot(primal, primal) + dot(dual, dual) / primal_weight).sqrt()
}

/// Combines the primal residual, dual residual and duality gap into a single
/// scalar, weighted so that primal and dual errors are commensurable.
pub fn compute_weight_kkt_residual<T: RealNumber>(
    primal_weight: T,
    convergence: &ConvergenceInformation<T>,
) -> T {
    (primal_weight * convergence.l2_primal_residual * convergence.l2_primal_residual
        + convergence.l2_dual_residual * convergence.l2_dual_residual / primal_weight
        + convergence.gap * convergence.gap)
        .sqrt()
}

/// `||delta_primal||/tau` combined with `||delta_dual||/tau`, weighted the
/// same way as the KKT residual. Used by the Halpern-anchored driver, which
/// restarts on decrease of the fixed-point residual rather than the KKT one.
pub fn compute_fixed_point_residual<T: RealNumber>(
    primal_weight: T,
    step_size: T,
    delta_primal: &[T],
    delta_dual: &[T],
) -> T {
    weighted_norm(primal_weight, delta_primal, delta_dual) / step_size
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestartDecision {
    NoRestart,
    RestartToAverage,
    RestartToCurrent,
}

/// Sufficient / necessary-and-stalled / artificial-length restart test shared
/// by both the KKT-residual and fixed-point-residual variants: pass in
/// whichever scalar residual the driver measures progress with.
fn restart_criteria_met<T: RealNumber>(
    params: &RestartParameters<T>,
    restart_info: &RestartInfo<T>,
    candidate_residual: T,
    iterations_since_restart: usize,
    total_iterations: usize,
) -> bool {
    if iterations_since_restart == 0 {
        return false;
    }
    let reduction_ratio = if restart_info.last_restart_kkt_residual > T::zero() {
        candidate_residual / restart_info.last_restart_kkt_residual
    } else {
        T::zero()
    };

    let sufficient = reduction_ratio <= params.sufficient_reduction_for_restart;
    let necessary_and_stalled = reduction_ratio <= params.necessary_reduction_for_restart
        && reduction_ratio > restart_info.last_reduction_ratio;
    let total = T::from_usize(total_iterations.max(1)).unwrap();
    let since = T::from_usize(iterations_since_restart).unwrap();
    let artificial = since >= params.artificial_restart_threshold * total;

    sufficient || necessary_and_stalled || artificial
}

/// Chooses between no restart, restarting to the running average, or
/// restarting to the raw current iterate, following the reduction-ratio test
/// against the residual measured at the last restart.
#[allow(clippy::too_many_arguments)]
pub fn decide_restart<T: RealNumber>(
    params: &RestartParameters<T>,
    restart_info: &RestartInfo<T>,
    average_residual: T,
    current_residual: T,
    iterations_since_restart: usize,
    total_iterations: usize,
) -> RestartDecision {
    use pdhg_core::options::{RestartScheme, RestartToCurrentMetric};

    if matches!(params.restart_scheme, RestartScheme::NoRestarts) {
        return RestartDecision::NoRestart;
    }
    if matches!(params.restart_scheme, RestartScheme::FixedFrequency) {
        return if iterations_since_restart >= params.restart_frequency_if_fixed {
            RestartDecision::RestartToAverage
        } else {
            RestartDecision::NoRestart
        };
    }

    let candidate_residual = match params.restart_to_current_metric {
        RestartToCurrentMetric::NoSetAverage => average_residual,
        RestartToCurrentMetric::KktGreedy => average_residual.min(current_residual),
    };

    if !restart_criteria_met(
        params,
        restart_info,
        candidate_residual,
        iterations_since_restart,
        total_iterations,
    ) {
        return RestartDecision::NoRestart;
    }

    match params.restart_to_current_metric {
        RestartToCurrentMetric::NoSetAverage => RestartDecision::RestartToAverage,
        RestartToCurrentMetric::KktGreedy => {
            if current_residual < average_residual {
                RestartDecision::RestartToCurrent
            } else {
                RestartDecision::RestartToAverage
            }
        }
    }
}

/// Re-anchors `restart_info` at the chosen candidate so the next epoch's
/// reduction ratio is measured from here.
#[allow(clippy::too_many_arguments)]
pub fn record_restart<T: RealNumber>(
    restart_info: &mut RestartInfo<T>,
    primal: &[T],
    dual: &[T],
    primal_product: &[T],
    dual_product: &[T],
    kkt_residual: T,
    iterations_since_restart: usize,
    primal_distance_moved: T,
    dual_distance_moved: T,
) {
    restart_info.primal_solution.copy_from_slice(primal);
    restart_info.dual_solution.copy_from_slice(dual);
    restart_info.primal_product.copy_from_slice(primal_product);
    restart_info.dual_product.copy_from_slice(dual_product);
    restart_info.last_reduction_ratio = if restart_info.last_restart_kkt_residual > T::zero() {
        kkt_residual / restart_info.last_restart_kkt_residual
    } else {
        T::zero()
    };
    restart_info.last_restart_kkt_residual = kkt_residual;
    restart_info.last_restart_length = iterations_since_restart;
    restart_info.primal_distance_moved = primal_distance_moved;
    restart_info.dual_distance_moved = dual_distance_moved;
}

/// `omega_new = exp(s*log(d_dual/d_primal) + (1-s)*log(omega_old))`: geometric
/// blend of the old weight with the ratio of distances moved since the last
/// restart. Skipped (returns the old weight unchanged) when either distance
/// is degenerate, matching the reference guard against log(0).
pub fn compute_new_primal_weight<T: RealNumber>(
    current_primal_weight: T,
    primal_distance_moved: T,
    dual_distance_moved: T,
    smoothing: T,
) -> T {
    if primal_distance_moved > T::epsilon() && dual_distance_moved > T::epsilon() {
        let log_ratio = (dual_distance_moved / primal_distance_moved).ln();
        let blended = smoothing * log_ratio + (T::one() - smoothing) * current_primal_weight.ln();
        blended.exp()
    } else {
        current_primal_weight
    }
}

/// `primal_importance * (||c|| / ||b||)` when both norms are nonzero, falling
/// back to the bare importance factor otherwise, so degenerate objectives or
/// right-hand sides don't poison the initial scale.
pub fn select_initial_primal_weight<T: RealNumber>(
    objective_vector: &[T],
    right_hand_side: &[T],
    primal_importance: T,
) -> T {
    let obj_norm = norm2(objective_vector);
    let rhs_norm = norm2(right_hand_side);
    if obj_norm > T::zero() && rhs_norm > T::zero() {
        primal_importance * (obj_norm / rhs_norm)
    } else {
        primal_importance
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pdhg_core::math::Scalar;
    use pdhg_core::options::{RestartScheme, RestartToCurrentMetric};

    fn params() -> RestartParameters<Scalar> {
        RestartParameters {
            restart_scheme: RestartScheme::AdaptiveKkt,
            restart_to_current_metric: RestartToCurrentMetric::NoSetAverage,
            restart_frequency_if_fixed: 100,
            artificial_restart_threshold: 0.5,
            sufficient_reduction_for_restart: 0.1,
            necessary_reduction_for_restart: 0.9,
            primal_weight_update_smoothing: 0.5,
        }
    }

    #[test]
    fn sufficient_decrease_triggers_restart() {
        let mut info: RestartInfo<Scalar> = RestartInfo::new(2, 1);
        info.last_restart_kkt_residual = 1.0;
        let decision = decide_restart(&params(), &info, 0.01, 0.01, 10, 20);
        assert_eq!(decision, RestartDecision::RestartToAverage);
    }

    #[test]
    fn no_decrease_does_not_restart_early() {
        let mut info: RestartInfo<Scalar> = RestartInfo::new(2, 1);
        info.last_restart_kkt_residual = 1.0;
        info.last_reduction_ratio = 1.0;
        let decision = decide_restart(&params(), &info, 0.95, 0.95, 1, 100);
        assert_eq!(decision, RestartDecision::NoRestart);
    }

    #[test]
    fn primal_weight_update_is_geometric_mean_in_log_space() {
        let w = compute_new_primal_weight(1.0, 2.0, 2.0, 0.5);
        assert!((w - 1.0).abs() < 1e-9);
    }
}
