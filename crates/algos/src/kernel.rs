//! The PDHG step kernel: one primal update, one dual update, and the
//! adaptive line search that chooses a step size for them.

use pdhg_core::math::{dot, project_dual_cone, project_box, subtract, RealNumber};
use pdhg_core::options::SolveOptions;
use pdhg_core::problem::QuadraticProgrammingProblem;
use pdhg_core::state::SolverState;

/// The result of one accepted PDHG trial: the raw step, before any averaging
/// or Halpern combination is layered on top by the driver.
pub struct StepOutcome<T: RealNumber> {
    pub delta_primal: Vec<T>,
    pub delta_primal_product: Vec<T>,
    pub delta_dual: Vec<T>,
    pub next_primal_obj_product: Vec<T>,
    pub accepted_step_size: T,
    pub next_initial_step_size: T,
    pub trials: usize,
    pub numerical_error: bool,
}

struct Trial<T: RealNumber> {
    delta_primal: Vec<T>,
    delta_primal_product: Vec<T>,
    delta_dual: Vec<T>,
    next_primal_obj_product: Vec<T>,
    movement: T,
    interaction: T,
}

fn mat_vec<T: RealNumber>(problem: &QuadraticProgrammingProblem<T>, x: &[T], y: &mut Vec<T>) {
    y.resize(problem.nconstraints(), T::zero());
    problem.constraint_matrix.mat_vec(x, y);
}

fn mat_vec_t<T: RealNumber>(problem: &QuadraticProgrammingProblem<T>, y: &[T], x: &mut Vec<T>) {
    x.resize(problem.nvars(), T::zero());
    problem.constraint_matrix_t.mat_vec(y, x);
}

/// One trial of the PDHG primal/dual update at a fixed step size `tau`.
fn try_step<T: RealNumber>(
    problem: &QuadraticProgrammingProblem<T>,
    state: &SolverState<T>,
    tau: T,
    extrapolation_coefficient: T,
) -> Trial<T> {
    let n = problem.nvars();
    let omega = state.primal_weight;

    // primal_grad = c - Aᵀy + Qx
    let mut primal_grad = problem.objective_vector.clone();
    for i in 0..n {
        primal_grad[i] = primal_grad[i] - state.current_dual_product[i]
            + state.current_primal_obj_product[i];
    }

    let step_over_omega = tau / omega;
    let mut x_new: Vec<T> = state
        .current_primal
        .iter()
        .zip(primal_grad.iter())
        .map(|(&x, &g)| x - step_over_omega * g)
        .collect();
    project_box(&mut x_new, &problem.variable_lower_bound, &problem.variable_upper_bound);

    let mut delta_primal = vec![T::zero(); n];
    subtract(&x_new, &state.current_primal, &mut delta_primal);

    let mut delta_primal_product = vec![T::zero(); problem.nconstraints()];
    mat_vec(problem, &delta_primal, &mut delta_primal_product);

    let next_primal_obj_product = match &problem.objective_matrix {
        Some(q) => {
            let mut qx_new = vec![T::zero(); n];
            q.mat_vec(&x_new, &mut qx_new);
            qx_new
        }
        None => vec![T::zero(); n],
    };

    let one = T::one();
    let tau_omega = tau * omega;
    let mut y_new = vec![T::zero(); problem.nconstraints()];
    for i in 0..problem.nconstraints() {
        let reflected = state.current_primal_product[i]
            + (one + extrapolation_coefficient) * delta_primal_product[i];
        y_new[i] = state.current_dual[i] + tau_omega * (problem.right_hand_side[i] - reflected);
    }
    project_dual_cone(&mut y_new, &problem.equalities_mask);

    let mut delta_dual = vec![T::zero(); problem.nconstraints()];
    subtract(&y_new, &state.current_dual, &mut delta_dual);

    let half = T::from_f64(0.5).unwrap();
    let movement = half * omega * dot(&delta_primal, &delta_primal)
        + half / omega * dot(&delta_dual, &delta_dual);

    let mut interaction = dot(&delta_dual, &delta_primal_product).abs();
    if let Some(_q) = &problem.objective_matrix {
        let mut delta_primal_obj_product = vec![T::zero(); n];
        subtract(
            &next_primal_obj_product,
            &state.current_primal_obj_product,
            &mut delta_primal_obj_product,
        );
        interaction = interaction + half * dot(&delta_primal, &delta_primal_obj_product).abs();
    }

    Trial {
        delta_primal,
        delta_primal_product,
        delta_dual,
        next_primal_obj_product,
        movement,
        interaction,
    }
}

/// Power iteration on `AᵀA` to estimate `||A||_2`, used to pick the initial
/// step size. Deterministic (starts from the all-ones vector) so repeated
/// solves of the same problem are reproducible.
pub fn estimate_constraint_matrix_norm<T: RealNumber>(
    problem: &QuadraticProgrammingProblem<T>,
) -> T {
    let n = problem.nvars();
    let m = problem.nconstraints();
    if n == 0 || m == 0 {
        return T::one();
    }
    let mut v = vec![T::one(); n];
    let v_norm = dot(&v, &v).sqrt();
    for vi in v.iter_mut() {
        *vi = *vi / v_norm;
    }

    let mut lambda = T::one();
    for _ in 0..20 {
        let mut av = vec![T::zero(); m];
        mat_vec(problem, &v, &mut av);
        let mut at_av = vec![T::zero(); n];
        mat_vec_t(problem, &av, &mut at_av);
        let norm = dot(&at_av, &at_av).sqrt();
        if norm == T::zero() {
            return T::zero();
        }
        lambda = norm;
        for i in 0..n {
            v[i] = at_av[i] / norm;
        }
    }
    lambda.sqrt()
}

const MAX_LINE_SEARCH_TRIALS: usize = 60;

/// Runs the adaptive step-size line search to produce one accepted step.
/// `total_steps` is the total count of accepted steps taken so far in this
/// solve, used in the growth/reduction exponent schedule.
pub fn adaptive_step<T: RealNumber>(
    problem: &QuadraticProgrammingProblem<T>,
    state: &SolverState<T>,
    options: &SolveOptions<T>,
    total_steps: usize,
) -> StepOutcome<T> {
    let mut tau = state.step_size;
    let mut trials = 0usize;
    let count = T::from_usize(total_steps + 1).unwrap();

    loop {
        trials += 1;
        let trial = try_step(problem, state, tau, T::one());

        if !trial.movement.is_finite() || !trial.interaction.is_finite() {
            return StepOutcome {
                delta_primal: trial.delta_primal,
                delta_primal_product: trial.delta_primal_product,
                delta_dual: trial.delta_dual,
                next_primal_obj_product: trial.next_primal_obj_product,
                accepted_step_size: tau,
                next_initial_step_size: tau,
                trials,
                numerical_error: true,
            };
        }

        let accepted = tau * tau * trial.interaction <= trial.movement;
        if accepted || !options.adaptive_step_size {
            let tau_limit = if trial.interaction > T::zero() {
                trial.movement / trial.interaction
            } else {
                T::infinity()
            };
            let growth_exp = options.adaptive_step_size_growth_exponent;
            let reduction_exp = options.adaptive_step_size_reduction_exponent;
            let tau_grow = (T::one() + count.powf(-growth_exp)) * tau;
            let tau_reduce = (T::one() - count.powf(-reduction_exp)) * tau_limit;
            let next_tau = tau_grow.min(tau_reduce);
            return StepOutcome {
                delta_primal: trial.delta_primal,
                delta_primal_product: trial.delta_primal_product,
                delta_dual: trial.delta_dual,
                next_primal_obj_product: trial.next_primal_obj_product,
                accepted_step_size: tau,
                next_initial_step_size: next_tau,
                trials,
                numerical_error: false,
            };
        }

        if trials >= MAX_LINE_SEARCH_TRIALS {
            return StepOutcome {
                delta_primal: trial.delta_primal,
                delta_primal_product: trial.delta_primal_product,
                delta_dual: trial.delta_dual,
                next_primal_obj_product: trial.next_primal_obj_product,
                accepted_step_size: tau,
                next_initial_step_size: tau,
                trials,
                numerical_error: true,
            };
        }

        let tau_limit = if trial.interaction > T::zero() {
            trial.movement / trial.interaction
        } else {
            T::infinity()
        };
        let reduction_exp = options.adaptive_step_size_reduction_exponent;
        let tau_reduce = (T::one() - count.powf(-reduction_exp)) * tau_limit;
        tau = tau_reduce.min(tau * options.adaptive_step_size_limit_coef);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pdhg_core::math::Scalar;
    use pdhg_linsys::CsrMatrix;

    fn box_lp() -> QuadraticProgrammingProblem<Scalar> {
        let a = CsrMatrix::zeros(0, 2);
        QuadraticProgrammingProblem::new(
            vec![-1.0, -1.0],
            0.0,
            None,
            a,
            vec![],
            vec![0.0, 0.0],
            vec![1.0, 1.0],
            0,
        )
        .unwrap()
    }

    #[test]
    fn step_moves_toward_upper_bound_when_unconstrained() {
        let problem = box_lp();
        let options: SolveOptions<Scalar> = SolveOptions::default();
        let state = SolverState::new(2, 0, 0.5, 1.0);
        let outcome = adaptive_step(&problem, &state, &options, 0);
        assert!(!outcome.numerical_error);
        assert!(outcome.delta_primal.iter().all(|&d| d > 0.0));
    }
}
