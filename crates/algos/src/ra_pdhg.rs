//! Restarted averaged PDHG: maintains a step-size-weighted running average of
//! the iterates and periodically restarts the average to either itself or
//! the raw current iterate, whichever the KKT residual favors.

use pdhg_core::cache::ProblemCache;
use pdhg_core::math::{subtract, RealNumber, Timer};
use pdhg_core::options::SolveOptions;
use pdhg_core::problem::QuadraticProgrammingProblem;
use pdhg_core::scaling::{RuizPockChambollePreconditioner, ScaledProblem};
use pdhg_core::solution::{SaddlePointOutput, TerminationStatus};
use pdhg_core::state::{RestartInfo, RestartParameters, SolverState};
use pdhg_core::traits::Preconditioner;
use tracing::{debug, info};

use crate::kernel::{adaptive_step, estimate_constraint_matrix_norm};
use crate::restart::{
    compute_new_primal_weight, compute_weight_kkt_residual, decide_restart,
    record_restart, select_initial_primal_weight, RestartDecision,
};
use crate::termination::{check_termination, compute_convergence_information, compute_infeasibility_information};

fn mat_vec_t<T: RealNumber>(problem: &QuadraticProgrammingProblem<T>, y: &[T], out: &mut [T]) {
    problem.constraint_matrix_t.mat_vec(y, out);
}

/// Updates the step-size-weighted running average in place:
/// `avg <- (weights_sum_old * avg + step_weight * current) / weights_sum_new`.
fn accumulate_average<T: RealNumber>(avg: &mut [T], current: &[T], weights_sum_old: T, step_weight: T, weights_sum_new: T) {
    for (a, &c) in avg.iter_mut().zip(current.iter()) {
        *a = (*a * weights_sum_old + step_weight * c) / weights_sum_new;
    }
}

struct UnscaledIterate<T: RealNumber> {
    primal: Vec<T>,
    dual: Vec<T>,
    primal_product: Vec<T>,
    dual_product: Vec<T>,
}

fn unscale_iterate<T: RealNumber>(
    scaled: &ScaledProblem<T>,
    primal: &[T],
    dual: &[T],
    primal_product: &[T],
    dual_product: &[T],
) -> UnscaledIterate<T> {
    UnscaledIterate {
        primal: scaled.unscale_primal(primal),
        dual: scaled.unscale_dual(dual),
        primal_product: scaled.unscale_primal_product(primal_product),
        dual_product: scaled.unscale_dual_product(dual_product),
    }
}

/// Runs raPDHG to termination (optimality, a certificate of infeasibility, or
/// a resource limit) and returns the solution in the caller's original
/// (unscaled) problem space.
pub fn solve<T: RealNumber>(
    problem: &QuadraticProgrammingProblem<T>,
    options: &SolveOptions<T>,
) -> anyhow::Result<SaddlePointOutput<T>> {
    options.validate()?;
    let timer = Timer::start();

    let preconditioner = RuizPockChambollePreconditioner {
        l_inf_ruiz_iterations: options.l_inf_ruiz_iterations,
        l2_norm_rescaling: options.l2_norm_rescaling,
        pock_chambolle_alpha: options.pock_chambolle_alpha,
    };
    let scaled = preconditioner.precondition(problem)?;
    let scaled_qp = &scaled.scaled_qp;
    let cache = ProblemCache::new(problem);

    let n = scaled_qp.nvars();
    let m = scaled_qp.nconstraints();

    let primal_weight = if options.scale_invariant_initial_primal_weight {
        select_initial_primal_weight(
            &scaled_qp.objective_vector,
            &scaled_qp.right_hand_side,
            options.primal_importance,
        )
    } else {
        options.primal_importance
    };
    let matrix_norm = estimate_constraint_matrix_norm(scaled_qp).max(T::from_f64(1e-12).unwrap());
    let initial_step_size = T::one() / matrix_norm;

    let mut state = SolverState::new(n, m, initial_step_size, primal_weight);
    let mut restart_info: RestartInfo<T> = RestartInfo::new(n, m);
    let restart_params = RestartParameters::from_options(options);

    let mut iterations_since_restart = 0usize;
    let mut final_status = TerminationStatus::Unspecified;

    loop {
        let outcome = adaptive_step(scaled_qp, &state, options, state.num_steps_tried);
        state.num_steps_tried += outcome.trials;
        state.cumulative_kkt_passes += outcome.trials + 1;

        if outcome.numerical_error {
            final_status = TerminationStatus::NumericalError;
            break;
        }

        let tau = outcome.accepted_step_size;
        for i in 0..n {
            state.current_primal[i] = state.current_primal[i] + outcome.delta_primal[i];
        }
        for i in 0..m {
            state.current_primal_product[i] += outcome.delta_primal_product[i];
            state.current_dual[i] = state.current_dual[i] + outcome.delta_dual[i];
        }
        state.current_primal_obj_product = outcome.next_primal_obj_product;

        let mut delta_dual_product = vec![T::zero(); n];
        mat_vec_t(scaled_qp, &outcome.delta_dual, &mut delta_dual_product);
        for i in 0..n {
            state.current_dual_product[i] += delta_dual_product[i];
        }

        let weights_sum_old = state.weights_sum;
        let weights_sum_new = weights_sum_old + tau;
        accumulate_average(&mut state.avg_primal, &state.current_primal, weights_sum_old, tau, weights_sum_new);
        accumulate_average(&mut state.avg_dual, &state.current_dual, weights_sum_old, tau, weights_sum_new);
        accumulate_average(&mut state.avg_primal_product, &state.current_primal_product, weights_sum_old, tau, weights_sum_new);
        accumulate_average(&mut state.avg_dual_product, &state.current_dual_product, weights_sum_old, tau, weights_sum_new);
        state.weights_sum = weights_sum_new;
        state.solutions_count += 1;

        state.step_size = outcome.next_initial_step_size;
        state.num_iterations += 1;
        iterations_since_restart += 1;

        let should_evaluate = state.num_iterations % options.termination_evaluation_frequency == 0;
        if !should_evaluate {
            continue;
        }

        let current_scaled_conv = compute_convergence_information(
            scaled_qp,
            &cache,
            T::one(),
            &state.current_primal,
            &state.current_dual,
            &state.current_primal_product,
            &state.current_dual_product,
            &state.current_primal_obj_product,
        );
        let mut avg_scaled_primal_obj_product = vec![T::zero(); n];
        if let Some(q) = &scaled_qp.objective_matrix {
            q.mat_vec(&state.avg_primal, &mut avg_scaled_primal_obj_product);
        }
        let avg_scaled_conv = compute_convergence_information(
            scaled_qp,
            &cache,
            T::one(),
            &state.avg_primal,
            &state.avg_dual,
            &state.avg_primal_product,
            &state.avg_dual_product,
            &avg_scaled_primal_obj_product,
        );
        let current_kkt = compute_weight_kkt_residual(state.primal_weight, &current_scaled_conv);
        let avg_kkt = compute_weight_kkt_residual(state.primal_weight, &avg_scaled_conv);

        let unscaled_avg = unscale_iterate(
            &scaled,
            &state.avg_primal,
            &state.avg_dual,
            &state.avg_primal_product,
            &state.avg_dual_product,
        );
        let mut avg_primal_obj_product = vec![T::zero(); n];
        if let Some(q) = &problem.objective_matrix {
            q.mat_vec(&unscaled_avg.primal, &mut avg_primal_obj_product);
        }
        let avg_convergence = compute_convergence_information(
            problem,
            &cache,
            options.eps_ratio(),
            &unscaled_avg.primal,
            &unscaled_avg.dual,
            &unscaled_avg.primal_product,
            &unscaled_avg.dual_product,
            &avg_primal_obj_product,
        );
        let avg_infeasibility = compute_infeasibility_information(
            problem,
            &unscaled_avg.primal,
            &unscaled_avg.dual,
            &unscaled_avg.primal_product,
            &unscaled_avg.dual_product,
        );

        let status = check_termination(
            options,
            &avg_convergence,
            &avg_infeasibility,
            state.num_iterations,
            state.cumulative_kkt_passes,
            T::from_f64(timer.elapsed().as_secs_f64()).unwrap(),
            state.numerical_error,
        );

        if options.display_frequency > 0
            && (state.num_iterations / options.termination_evaluation_frequency) % options.display_frequency == 0
        {
            debug!(
                iteration = state.num_iterations,
                primal_obj = ?avg_convergence.primal_objective.to_f64(),
                dual_obj = ?avg_convergence.dual_objective.to_f64(),
                gap = ?avg_convergence.relative_gap.to_f64(),
                "raPDHG checkpoint"
            );
        }

        if status.is_terminal() {
            final_status = status;
            state.current_primal = unscaled_avg.primal;
            state.current_dual = unscaled_avg.dual;
            break;
        }

        let decision = decide_restart(
            &restart_params,
            &restart_info,
            avg_kkt,
            current_kkt,
            iterations_since_restart,
            state.num_iterations,
        );
        if !matches!(decision, RestartDecision::NoRestart) {
            let (restart_primal, restart_dual, restart_primal_product, restart_dual_product, restart_kkt) =
                match decision {
                    RestartDecision::RestartToCurrent => (
                        state.current_primal.clone(),
                        state.current_dual.clone(),
                        state.current_primal_product.clone(),
                        state.current_dual_product.clone(),
                        current_kkt,
                    ),
                    _ => (
                        state.avg_primal.clone(),
                        state.avg_dual.clone(),
                        state.avg_primal_product.clone(),
                        state.avg_dual_product.clone(),
                        avg_kkt,
                    ),
                };

            let mut diff = vec![T::zero(); n];
            subtract(&restart_primal, &state.initial_primal, &mut diff);
            let primal_distance_moved = pdhg_core::math::norm2(&diff);
            let mut diff_d = vec![T::zero(); m];
            subtract(&restart_dual, &state.initial_dual, &mut diff_d);
            let dual_distance_moved = pdhg_core::math::norm2(&diff_d);

            state.primal_weight = compute_new_primal_weight(
                state.primal_weight,
                primal_distance_moved,
                dual_distance_moved,
                restart_params.primal_weight_update_smoothing,
            );

            state.current_primal = restart_primal.clone();
            state.current_dual = restart_dual.clone();
            state.current_primal_product = restart_primal_product.clone();
            state.current_dual_product = restart_dual_product.clone();
            state.current_primal_obj_product = match &scaled_qp.objective_matrix {
                Some(q) => {
                    let mut qx = vec![T::zero(); n];
                    q.mat_vec(&restart_primal, &mut qx);
                    qx
                }
                None => vec![T::zero(); n],
            };
            state.reset_epoch(&restart_primal, &restart_dual, &restart_primal_product, &restart_dual_product);

            record_restart(
                &mut restart_info,
                &restart_primal,
                &restart_dual,
                &restart_primal_product,
                &restart_dual_product,
                restart_kkt,
                iterations_since_restart,
                primal_distance_moved,
                dual_distance_moved,
            );
            iterations_since_restart = 0;
        }
    }

    let final_primal = scaled.unscale_primal(&state.current_primal);
    let objective_value = {
        let mut obj = problem.objective_constant + pdhg_core::math::dot(&problem.objective_vector, &final_primal);
        if let Some(q) = &problem.objective_matrix {
            let mut qx = vec![T::zero(); n];
            q.mat_vec(&final_primal, &mut qx);
            obj = obj + T::from_f64(0.5).unwrap() * pdhg_core::math::dot(&final_primal, &qx);
        }
        obj
    };

    info!(
        status = ?final_status,
        iterations = state.num_iterations,
        "raPDHG finished"
    );

    Ok(SaddlePointOutput {
        primal: final_primal,
        dual: scaled.unscale_dual(&state.current_dual),
        termination_status: final_status,
        iteration_count: state.num_iterations,
        cumulative_kkt_passes: state.cumulative_kkt_passes,
        objective_value,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pdhg_core::math::Scalar;
    use pdhg_linsys::CsrMatrix;

    fn simple_lp() -> QuadraticProgrammingProblem<Scalar> {
        // min x + y s.t. x + y >= 1, 0 <= x,y
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
    fn solves_simple_lp_to_optimality() {
        let problem = simple_lp();
        let mut options: SolveOptions<Scalar> = SolveOptions::default();
        options.termination_evaluation_frequency = 8;
        options.iteration_limit = 5_000;
        let result = solve(&problem, &options).unwrap();
        assert_eq!(result.termination_status, TerminationStatus::Optimal);
        assert!((result.objective_value - 1.0).abs() < 1e-4);
    }
}
