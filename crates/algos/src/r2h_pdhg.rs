//! Halpern-anchored PDHG: instead of averaging, every iterate is pulled back
//! toward the anchor point fixed at the last restart. Restarting reconstructs
//! the raw PDHG iterate the Halpern combination was built from and takes one
//! fresh PDHG step from it to re-anchor the next epoch.

use pdhg_core::cache::ProblemCache;
use pdhg_core::math::{dot, norm2, subtract, RealNumber, Timer};
use pdhg_core::options::SolveOptions;
use pdhg_core::problem::QuadraticProgrammingProblem;
use pdhg_core::scaling::{RuizPockChambollePreconditioner, ScaledProblem};
use pdhg_core::solution::{SaddlePointOutput, TerminationStatus};
use pdhg_core::state::{RestartInfo, RestartParameters, SolverState};
use pdhg_core::traits::Preconditioner;
use tracing::{debug, info};

use crate::kernel::{adaptive_step, estimate_constraint_matrix_norm};
use crate::restart::{
    compute_fixed_point_residual, compute_new_primal_weight, decide_restart, record_restart,
    select_initial_primal_weight, RestartDecision,
};
use crate::termination::{check_termination, compute_convergence_information, compute_infeasibility_information};

fn mat_vec_t<T: RealNumber>(problem: &QuadraticProgrammingProblem<T>, y: &[T], out: &mut [T]) {
    problem.constraint_matrix_t.mat_vec(y, out);
}

/// `weight*(current + 2*delta) + (1-weight)*initial`.
fn halpern_combine<T: RealNumber>(weight: T, current: &[T], delta: &[T], initial: &[T]) -> Vec<T> {
    let two = T::from_f64(2.0).unwrap();
    current
        .iter()
        .zip(delta.iter())
        .zip(initial.iter())
        .map(|((&c, &d), &i0)| weight * (c + two * d) + (T::one() - weight) * i0)
        .collect()
}

/// Inverts `halpern_combine` for the raw PDHG iterate it was built from:
/// `(1+w)*current - w*initial - delta`, with `w = initial_step_size/weights_sum`.
fn reconstruct_pre_halpern<T: RealNumber>(weight: T, current: &[T], initial: &[T], delta: &[T]) -> Vec<T> {
    current
        .iter()
        .zip(initial.iter())
        .zip(delta.iter())
        .map(|((&c, &i0), &d)| (T::one() + weight) * c - weight * i0 - d)
        .collect()
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
        let fixed_point_residual = compute_fixed_point_residual(
            state.primal_weight,
            tau,
            &outcome.delta_primal,
            &outcome.delta_dual,
        );

        let mut delta_dual_product = vec![T::zero(); n];
        mat_vec_t(scaled_qp, &outcome.delta_dual, &mut delta_dual_product);

        let weights_sum_new = state.weights_sum + tau;
        let weight = weights_sum_new / (weights_sum_new + state.initial_step_size);

        let next_primal = halpern_combine(weight, &state.current_primal, &outcome.delta_primal, &state.initial_primal);
        let next_dual = halpern_combine(weight, &state.current_dual, &outcome.delta_dual, &state.initial_dual);
        let next_primal_product = halpern_combine(
            weight,
            &state.current_primal_product,
            &outcome.delta_primal_product,
            &state.initial_primal_product,
        );
        let next_dual_product = halpern_combine(
            weight,
            &state.current_dual_product,
            &delta_dual_product,
            &state.initial_dual_product,
        );

        state.delta_primal = outcome.delta_primal;
        state.delta_dual = outcome.delta_dual;
        state.delta_primal_product = outcome.delta_primal_product;

        state.current_primal = next_primal;
        state.current_dual = next_dual;
        state.current_primal_product = next_primal_product;
        state.current_dual_product = next_dual_product;
        state.current_primal_obj_product = outcome.next_primal_obj_product;

        state.weights_sum = weights_sum_new;
        state.step_size = outcome.next_initial_step_size;
        state.num_iterations += 1;
        iterations_since_restart += 1;

        if state.num_iterations % options.termination_evaluation_frequency != 0 {
            continue;
        }

        let unscaled_current = unscale_iterate(
            &scaled,
            &state.current_primal,
            &state.current_dual,
            &state.current_primal_product,
            &state.current_dual_product,
        );
        let mut primal_obj_product = vec![T::zero(); n];
        if let Some(q) = &problem.objective_matrix {
            q.mat_vec(&unscaled_current.primal, &mut primal_obj_product);
        }
        let convergence = compute_convergence_information(
            problem,
            &cache,
            options.eps_ratio(),
            &unscaled_current.primal,
            &unscaled_current.dual,
            &unscaled_current.primal_product,
            &unscaled_current.dual_product,
            &primal_obj_product,
        );
        let infeasibility = compute_infeasibility_information(
            problem,
            &unscaled_current.primal,
            &unscaled_current.dual,
            &unscaled_current.primal_product,
            &unscaled_current.dual_product,
        );

        let status = check_termination(
            options,
            &convergence,
            &infeasibility,
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
                primal_obj = ?convergence.primal_objective.to_f64(),
                dual_obj = ?convergence.dual_objective.to_f64(),
                gap = ?convergence.relative_gap.to_f64(),
                "r2HPDHG checkpoint"
            );
        }

        if status.is_terminal() {
            final_status = status;
            break;
        }

        let decision = decide_restart(
            &restart_params,
            &restart_info,
            fixed_point_residual,
            fixed_point_residual,
            iterations_since_restart,
            state.num_iterations,
        );
        if !matches!(decision, RestartDecision::NoRestart) {
            let weight_recon = if state.weights_sum > T::zero() {
                state.initial_step_size / state.weights_sum
            } else {
                T::zero()
            };
            let reconstructed_primal = reconstruct_pre_halpern(
                weight_recon,
                &state.current_primal,
                &state.initial_primal,
                &state.delta_primal,
            );
            let reconstructed_dual = reconstruct_pre_halpern(
                weight_recon,
                &state.current_dual,
                &state.initial_dual,
                &state.delta_dual,
            );
            let reconstructed_primal_product = reconstruct_pre_halpern(
                weight_recon,
                &state.current_primal_product,
                &state.initial_primal_product,
                &state.delta_primal_product,
            );
            let mut reconstructed_dual_delta = vec![T::zero(); n];
            mat_vec_t(scaled_qp, &state.delta_dual, &mut reconstructed_dual_delta);
            let reconstructed_dual_product = reconstruct_pre_halpern(
                weight_recon,
                &state.current_dual_product,
                &state.initial_dual_product,
                &reconstructed_dual_delta,
            );

            let mut anchor_state = SolverState::new(n, m, state.step_size, state.primal_weight);
            anchor_state.current_primal = reconstructed_primal;
            anchor_state.current_dual = reconstructed_dual;
            anchor_state.current_primal_product = reconstructed_primal_product;
            anchor_state.current_dual_product = reconstructed_dual_product;
            let mut reconstructed_obj_product = vec![T::zero(); n];
            if let Some(q) = &scaled_qp.objective_matrix {
                q.mat_vec(&anchor_state.current_primal, &mut reconstructed_obj_product);
            }
            anchor_state.current_primal_obj_product = reconstructed_obj_product;

            let anchor_outcome = adaptive_step(scaled_qp, &anchor_state, options, state.num_steps_tried);
            state.num_steps_tried += anchor_outcome.trials;
            state.cumulative_kkt_passes += anchor_outcome.trials + 1;

            let fresh_primal: Vec<T> = anchor_state
                .current_primal
                .iter()
                .zip(anchor_outcome.delta_primal.iter())
                .map(|(&x, &d)| x + d)
                .collect();
            let fresh_dual: Vec<T> = anchor_state
                .current_dual
                .iter()
                .zip(anchor_outcome.delta_dual.iter())
                .map(|(&y, &d)| y + d)
                .collect();
            let fresh_primal_product: Vec<T> = anchor_state
                .current_primal_product
                .iter()
                .zip(anchor_outcome.delta_primal_product.iter())
                .map(|(&p, &d)| p + d)
                .collect();
            let mut fresh_delta_dual_product = vec![T::zero(); n];
            mat_vec_t(scaled_qp, &anchor_outcome.delta_dual, &mut fresh_delta_dual_product);
            let fresh_dual_product: Vec<T> = anchor_state
                .current_dual_product
                .iter()
                .zip(fresh_delta_dual_product.iter())
                .map(|(&p, &d)| p + d)
                .collect();

            let mut diff = vec![T::zero(); n];
            subtract(&fresh_primal, &state.initial_primal, &mut diff);
            let primal_distance_moved = norm2(&diff);
            let mut diff_d = vec![T::zero(); m];
            subtract(&fresh_dual, &state.initial_dual, &mut diff_d);
            let dual_distance_moved = norm2(&diff_d);
            state.primal_weight = compute_new_primal_weight(
                state.primal_weight,
                primal_distance_moved,
                dual_distance_moved,
                restart_params.primal_weight_update_smoothing,
            );

            state.current_primal = fresh_primal.clone();
            state.current_dual = fresh_dual.clone();
            state.current_primal_product = fresh_primal_product.clone();
            state.current_dual_product = fresh_dual_product.clone();
            state.current_primal_obj_product = anchor_outcome.next_primal_obj_product;
            state.step_size = anchor_outcome.next_initial_step_size;
            state.reset_epoch(&fresh_primal, &fresh_dual, &fresh_primal_product, &fresh_dual_product);

            record_restart(
                &mut restart_info,
                &fresh_primal,
                &fresh_dual,
                &fresh_primal_product,
                &fresh_dual_product,
                fixed_point_residual,
                iterations_since_restart,
                primal_distance_moved,
                dual_distance_moved,
            );
            iterations_since_restart = 0;
        }
    }

    let final_primal = scaled.unscale_primal(&state.current_primal);
    let objective_value = {
        let mut obj = problem.objective_constant + dot(&problem.objective_vector, &final_primal);
        if let Some(q) = &problem.objective_matrix {
            let mut qx = vec![T::zero(); n];
            q.mat_vec(&final_primal, &mut qx);
            obj = obj + T::from_f64(0.5).unwrap() * dot(&final_primal, &qx);
        }
        obj
    };

    info!(
        status = ?final_status,
        iterations = state.num_iterations,
        "r2HPDHG finished"
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
        options.method = pdhg_core::options::Method::R2hPdhg;
        options.termination_evaluation_frequency = 8;
        options.iteration_limit = 5_000;
        let result = solve(&problem, &options).unwrap();
        assert_eq!(result.termination_status, TerminationStatus::Optimal);
        assert!((result.objective_value - 1.0).abs() < 1e-3);
    }
}
