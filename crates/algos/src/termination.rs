//! Converts unscaled iterates into the residuals and ray certificates that
//! drive both termination and (via `restart.rs`) the restart controller.

use pdhg_core::cache::ProblemCache;
use pdhg_core::math::{dot, norm2, norm_inf, RealNumber};
use pdhg_core::options::SolveOptions;
use pdhg_core::problem::QuadraticProgrammingProblem;
use pdhg_core::solution::TerminationStatus;
use pdhg_core::stats::{ConvergenceInformation, InfeasibilityInformation};

/// `rc_j = max(g_j,0)*finite_lb_j + min(g_j,0)*finite_ub_j`, `violation = g - rc`.
fn reduced_costs_from_primal_gradient<T: RealNumber>(
    primal_gradient: &[T],
    isfinite_lb: &[bool],
    isfinite_ub: &[bool],
) -> (Vec<T>, Vec<T>) {
    let n = primal_gradient.len();
    let mut reduced_costs = vec![T::zero(); n];
    for i in 0..n {
        let g = primal_gradient[i];
        let mut rc = T::zero();
        if g > T::zero() && isfinite_lb[i] {
            rc = rc + g;
        }
        if g < T::zero() && isfinite_ub[i] {
            rc = rc + g;
        }
        reduced_costs[i] = rc;
    }
    let mut violation = vec![T::zero(); n];
    for i in 0..n {
        violation[i] = primal_gradient[i] - reduced_costs[i];
    }
    (reduced_costs, violation)
}

fn dual_objective_contribution<T: RealNumber>(
    lower: &[T],
    upper: &[T],
    reduced_costs: &[T],
) -> T {
    let mut acc = T::zero();
    for i in 0..reduced_costs.len() {
        let rc = reduced_costs[i];
        if rc > T::zero() {
            acc = acc + lower[i] * rc;
        } else if rc < T::zero() {
            acc = acc + upper[i] * rc;
        }
    }
    acc
}

fn constraint_violation<T: RealNumber>(
    target_minus_activity: &[T],
    equalities_mask: &[bool],
) -> Vec<T> {
    target_minus_activity
        .iter()
        .zip(equalities_mask.iter())
        .map(|(&v, &is_eq)| if is_eq { v } else { v.max(T::zero()) })
        .collect()
}

pub fn compute_convergence_information<T: RealNumber>(
    problem: &QuadraticProgrammingProblem<T>,
    cache: &ProblemCache<T>,
    eps_ratio: T,
    primal: &[T],
    dual: &[T],
    primal_product: &[T],
    dual_product: &[T],
    primal_obj_product: &[T],
) -> ConvergenceInformation<T> {
    let n = problem.nvars();

    let lower_violation: Vec<T> = problem
        .variable_lower_bound
        .iter()
        .zip(primal.iter())
        .map(|(&lb, &x)| (lb - x).max(T::zero()))
        .collect();
    let upper_violation: Vec<T> = primal
        .iter()
        .zip(problem.variable_upper_bound.iter())
        .map(|(&x, &ub)| (x - ub).max(T::zero()))
        .collect();

    let mut rhs_minus_activity = vec![T::zero(); problem.nconstraints()];
    for i in 0..problem.nconstraints() {
        rhs_minus_activity[i] = problem.right_hand_side[i] - primal_product[i];
    }
    let constraint_viol = constraint_violation(&rhs_minus_activity, &problem.equalities_mask);

    let mut primal_residual = constraint_viol.clone();
    primal_residual.extend_from_slice(&lower_violation);
    primal_residual.extend_from_slice(&upper_violation);

    let half = T::from_f64(0.5).unwrap();
    let mut primal_objective = problem.objective_constant + dot(&problem.objective_vector, primal);
    if problem.objective_matrix.is_some() {
        primal_objective = primal_objective + half * dot(primal, primal_obj_product);
    }

    let mut primal_gradient = vec![T::zero(); n];
    for i in 0..n {
        primal_gradient[i] = problem.objective_vector[i] - dual_product[i] + primal_obj_product[i];
    }
    let isfinite_lb = problem.isfinite_variable_lower_bound();
    let isfinite_ub = problem.isfinite_variable_upper_bound();
    let (reduced_costs, rc_violation) =
        reduced_costs_from_primal_gradient(&primal_gradient, &isfinite_lb, &isfinite_ub);

    let mut dual_objective = problem.objective_constant
        + dot(&problem.right_hand_side, dual)
        + dual_objective_contribution(
            &problem.variable_lower_bound,
            &problem.variable_upper_bound,
            &reduced_costs,
        );
    if problem.objective_matrix.is_some() {
        dual_objective = dual_objective - half * dot(primal, primal_obj_product);
    }

    let dual_cone_violation: Vec<T> = dual
        .iter()
        .zip(problem.equalities_mask.iter())
        .map(|(&y, &is_eq)| if is_eq { T::zero() } else { (-y).max(T::zero()) })
        .collect();
    let mut dual_residual = dual_cone_violation;
    dual_residual.extend_from_slice(&rc_violation);

    let l2_primal_residual = norm2(&primal_residual);
    let linf_primal_residual = norm_inf(&primal_residual);
    let l2_dual_residual = norm2(&dual_residual);
    let linf_dual_residual = norm_inf(&dual_residual);

    let l2_relative_primal_residual = l2_primal_residual / (eps_ratio + cache.l2_norm_rhs);
    let linf_relative_primal_residual = linf_primal_residual / (eps_ratio + cache.linf_norm_rhs);
    let l2_relative_dual_residual =
        l2_dual_residual / (eps_ratio + cache.l2_norm_objective_vector);
    let linf_relative_dual_residual =
        linf_dual_residual / (eps_ratio + cache.linf_norm_objective_vector);

    let corrected_dual_objective = if linf_dual_residual == T::zero() {
        dual_objective
    } else {
        T::neg_infinity()
    };

    let gap = (primal_objective - dual_objective).abs();
    let relative_gap =
        gap / (eps_ratio + primal_objective.abs() + dual_objective.abs());

    ConvergenceInformation {
        primal_objective,
        dual_objective,
        corrected_dual_objective,
        l2_primal_residual,
        l2_dual_residual,
        linf_primal_residual,
        linf_dual_residual,
        l2_relative_primal_residual,
        l2_relative_dual_residual,
        linf_relative_primal_residual,
        linf_relative_dual_residual,
        gap,
        relative_gap,
    }
}

/// Transformed bound for the homogeneous infeasibility problem: `0` when the
/// original bound is infinite, `-1/lb + 1` (or `1/ub - 1`) otherwise.
fn transformed_lower_bound<T: RealNumber>(lb: T) -> T {
    if lb.is_finite() {
        -T::one() / lb + T::one()
    } else {
        T::zero()
    }
}

fn transformed_upper_bound<T: RealNumber>(ub: T) -> T {
    if ub.is_finite() {
        T::one() / ub - T::one()
    } else {
        T::zero()
    }
}

pub fn compute_infeasibility_information<T: RealNumber>(
    problem: &QuadraticProgrammingProblem<T>,
    primal_ray: &[T],
    dual_ray: &[T],
    primal_ray_product: &[T],
    dual_ray_product: &[T],
) -> InfeasibilityInformation<T> {
    let ray_inf_norm = norm_inf(primal_ray);
    let (scaled_ray, scaled_ray_product): (Vec<T>, Vec<T>) = if ray_inf_norm == T::zero() {
        (primal_ray.to_vec(), primal_ray_product.to_vec())
    } else {
        (
            primal_ray.iter().map(|&v| v / ray_inf_norm).collect(),
            primal_ray_product.iter().map(|&v| v / ray_inf_norm).collect(),
        )
    };

    let lower_violation: Vec<T> = problem
        .variable_lower_bound
        .iter()
        .zip(scaled_ray.iter())
        .map(|(&lb, &x)| (transformed_lower_bound(lb) - x).max(T::zero()))
        .collect();
    let upper_violation: Vec<T> = scaled_ray
        .iter()
        .zip(problem.variable_upper_bound.iter())
        .map(|(&x, &ub)| (x - transformed_upper_bound(ub)).max(T::zero()))
        .collect();

    let neg_activity: Vec<T> = scaled_ray_product.iter().map(|&v| -v).collect();
    let constraint_viol = constraint_violation(&neg_activity, &problem.equalities_mask);

    let mut primal_violation = constraint_viol;
    primal_violation.extend_from_slice(&lower_violation);
    primal_violation.extend_from_slice(&upper_violation);
    let max_primal_ray_infeasibility = norm_inf(&primal_violation);

    let primal_ray_linear_objective = dot(&problem.objective_vector, &scaled_ray);

    let neg_dual_ray_product: Vec<T> = dual_ray_product.iter().map(|&v| -v).collect();
    let isfinite_lb = problem.isfinite_variable_lower_bound();
    let isfinite_ub = problem.isfinite_variable_upper_bound();
    let (reduced_costs, rc_violation) =
        reduced_costs_from_primal_gradient(&neg_dual_ray_product, &isfinite_lb, &isfinite_ub);

    let dual_cone_violation: Vec<T> = dual_ray
        .iter()
        .zip(problem.equalities_mask.iter())
        .map(|(&y, &is_eq)| if is_eq { T::zero() } else { (-y).max(T::zero()) })
        .collect();
    let mut dual_residual = dual_cone_violation;
    dual_residual.extend_from_slice(&rc_violation);

    let dual_objective = problem.objective_constant
        + dot(&problem.right_hand_side, dual_ray)
        + dual_objective_contribution(
            &problem.variable_lower_bound,
            &problem.variable_upper_bound,
            &reduced_costs,
        );

    let scaling_factor = norm_inf(dual_ray).max(norm_inf(&reduced_costs));
    let (max_dual_ray_infeasibility, dual_ray_objective) = if scaling_factor == T::zero() {
        (T::zero(), T::zero())
    } else {
        (
            norm_inf(&dual_residual) / scaling_factor,
            dual_objective / scaling_factor,
        )
    };

    InfeasibilityInformation {
        max_primal_ray_infeasibility,
        primal_ray_linear_objective,
        max_dual_ray_infeasibility,
        dual_ray_objective,
    }
}

/// Evaluates termination against the spec's combined optimal/infeasible/limit
/// tests. Returns `Unspecified` if none of the stopping conditions hold yet.
#[allow(clippy::too_many_arguments)]
pub fn check_termination<T: RealNumber>(
    options: &SolveOptions<T>,
    convergence: &ConvergenceInformation<T>,
    infeasibility: &InfeasibilityInformation<T>,
    num_iterations: usize,
    cumulative_kkt_passes: usize,
    elapsed_sec: T,
    numerical_error: bool,
) -> TerminationStatus {
    if numerical_error
        || !convergence.l2_primal_residual.is_finite()
        || !convergence.l2_dual_residual.is_finite()
        || !convergence.gap.is_finite()
    {
        return TerminationStatus::NumericalError;
    }

    let optimal = convergence.l2_relative_primal_residual <= options.eps_rel
        && convergence.l2_relative_dual_residual <= options.eps_rel
        && convergence.linf_relative_primal_residual <= options.eps_rel
        && convergence.linf_relative_dual_residual <= options.eps_rel
        && convergence.relative_gap <= options.eps_rel
        && convergence.l2_primal_residual <= options.eps_abs
        && convergence.l2_dual_residual <= options.eps_abs;
    if optimal {
        return TerminationStatus::Optimal;
    }

    if infeasibility.max_dual_ray_infeasibility <= options.eps_dual_infeasible
        && infeasibility.dual_ray_objective > T::zero()
    {
        return TerminationStatus::PrimalInfeasible;
    }
    if infeasibility.max_primal_ray_infeasibility <= options.eps_primal_infeasible
        && infeasibility.primal_ray_linear_objective < T::zero()
    {
        return TerminationStatus::DualInfeasible;
    }

    if num_iterations >= options.iteration_limit {
        return TerminationStatus::IterationLimit;
    }
    if cumulative_kkt_passes >= options.kkt_matrix_pass_limit {
        return TerminationStatus::KktMatrixPassLimit;
    }
    if elapsed_sec >= options.time_sec_limit {
        return TerminationStatus::TimeLimit;
    }

    TerminationStatus::Unspecified
}

#[cfg(test)]
mod tests {
    use super::*;
    use pdhg_core::math::Scalar;
    use pdhg_linsys::CsrMatrix;

    fn simple_lp() -> QuadraticProgrammingProblem<Scalar> {
        // min x + y s.t. x + y >= 1, x,y >= 0
        let a = CsrMatrix::from_triplets(1, 2, vec![(0, 0, 1.0), (0, 1, 1.0)]);
        QuadraticProgrammingProblem::new(
            vec![1.0, 1.0],
            0.0,
            None,
            a,
            vec![1.0],
            vec![0.0, 0.0],
            vec![Scalar::INFINITY, Scalar::INFINITY],
            0,
        )
        .unwrap()
    }

    #[test]
    fn optimal_point_has_zero_residuals() {
        let problem = simple_lp();
        let cache = ProblemCache::new(&problem);
        let primal = vec![1.0, 0.0];
        let mut primal_product = vec![0.0];
        problem.constraint_matrix.mat_vec(&primal, &mut primal_product);
        let dual = vec![1.0];
        let mut dual_product = vec![0.0; 2];
        problem.constraint_matrix_t.mat_vec(&dual, &mut dual_product);
        let info = compute_convergence_information(
            &problem,
            &cache,
            1.0,
            &primal,
            &dual,
            &primal_product,
            &dual_product,
            &vec![0.0; 2],
        );
        assert!(info.l2_primal_residual < 1e-9);
        assert!(info.l2_dual_residual < 1e-9);
        assert!((info.primal_objective - 1.0).abs() < 1e-9);
        assert!((info.dual_objective - 1.0).abs() < 1e-9);
    }
}
