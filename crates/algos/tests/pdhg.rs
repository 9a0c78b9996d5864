//! End-to-end scenarios exercising both driver loops against the six
//! concrete cases used to validate termination correctness: a trivial
//! feasible point, a simple LP, an infeasible LP, an unbounded LP, a
//! diagonal QP, and a deliberately starved iteration limit.

use pdhg_core::math::Scalar;
use pdhg_core::options::{Method, SolveOptions};
use pdhg_core::problem::QuadraticProgrammingProblem;
use pdhg_core::solution::TerminationStatus;
use pdhg_linsys::CsrMatrix;

fn options(method: Method) -> SolveOptions<Scalar> {
    let mut options = SolveOptions::default();
    options.method = method;
    options.termination_evaluation_frequency = 8;
    options.iteration_limit = 20_000;
    options
}

#[test]
fn trivial_zero_problem_is_optimal_quickly() {
    let a = CsrMatrix::from_triplets(1, 1, vec![(0, 0, 0.0)]);
    let problem = QuadraticProgrammingProblem::new(
        vec![0.0],
        0.0,
        None,
        a,
        vec![0.0],
        vec![0.0],
        vec![1.0],
        1,
    )
    .unwrap();

    let mut opts = options(Method::RaPdhg);
    opts.termination_evaluation_frequency = 1;
    let result = pdhg_algos::solve(&problem, &opts).unwrap();
    assert_eq!(result.termination_status, TerminationStatus::Optimal);
    assert!(result.iteration_count <= 10);
    assert!(result.primal[0].abs() < 1e-6);
    assert!(result.dual[0].abs() < 1e-6);
}

#[test]
fn simple_lp_reaches_known_optimum_ra_pdhg() {
    let a = CsrMatrix::from_triplets(1, 2, vec![(0, 0, 1.0), (0, 1, 1.0)]);
    let problem = QuadraticProgrammingProblem::new(
        vec![1.0, 1.0],
        0.0,
        None,
        a,
        vec![1.0],
        vec![0.0, 0.0],
        vec![Scalar::INFINITY, Scalar::INFINITY],
        0,
    )
    .unwrap();

    let result = pdhg_algos::solve(&problem, &options(Method::RaPdhg)).unwrap();
    assert_eq!(result.termination_status, TerminationStatus::Optimal);
    assert!((result.objective_value - 1.0).abs() < 1e-4);
}

#[test]
fn simple_lp_reaches_known_optimum_r2h_pdhg() {
    let a = CsrMatrix::from_triplets(1, 2, vec![(0, 0, 1.0), (0, 1, 1.0)]);
    let problem = QuadraticProgrammingProblem::new(
        vec![1.0, 1.0],
        0.0,
        None,
        a,
        vec![1.0],
        vec![0.0, 0.0],
        vec![Scalar::INFINITY, Scalar::INFINITY],
        0,
    )
    .unwrap();

    let result = pdhg_algos::solve(&problem, &options(Method::R2hPdhg)).unwrap();
    assert_eq!(result.termination_status, TerminationStatus::Optimal);
    assert!((result.objective_value - 1.0).abs() < 1e-3);
}

#[test]
fn infeasible_lp_is_detected() {
    // x <= -1, x >= 0, written as -x >= 1 in the >= convention.
    let a = CsrMatrix::from_triplets(1, 1, vec![(0, 0, -1.0)]);
    let problem = QuadraticProgrammingProblem::new(
        vec![0.0],
        0.0,
        None,
        a,
        vec![1.0],
        vec![0.0],
        vec![Scalar::INFINITY],
        0,
    )
    .unwrap();

    let result = pdhg_algos::solve(&problem, &options(Method::RaPdhg)).unwrap();
    assert_eq!(result.termination_status, TerminationStatus::PrimalInfeasible);
}

#[test]
fn unbounded_lp_is_dual_infeasible() {
    let a = CsrMatrix::zeros(0, 1);
    let problem = QuadraticProgrammingProblem::new(
        vec![-1.0],
        0.0,
        None,
        a,
        vec![],
        vec![0.0],
        vec![Scalar::INFINITY],
        0,
    )
    .unwrap();

    let result = pdhg_algos::solve(&problem, &options(Method::RaPdhg)).unwrap();
    assert_eq!(result.termination_status, TerminationStatus::DualInfeasible);
}

#[test]
fn diagonal_qp_reaches_known_optimum() {
    let a = CsrMatrix::zeros(0, 1);
    let q = CsrMatrix::identity(1);
    let problem = QuadraticProgrammingProblem::new(
        vec![-1.0],
        0.0,
        Some(q),
        a,
        vec![],
        vec![0.0],
        vec![2.0],
        0,
    )
    .unwrap();

    let result = pdhg_algos::solve(&problem, &options(Method::RaPdhg)).unwrap();
    assert_eq!(result.termination_status, TerminationStatus::Optimal);
    assert!((result.primal[0] - 1.0).abs() < 1e-3);
    assert!((result.objective_value - (-0.5)).abs() < 1e-3);
}

#[test]
fn starved_iteration_limit_returns_finite_iterate() {
    let a = CsrMatrix::from_triplets(
        3,
        5,
        vec![
            (0, 0, 1.0),
            (0, 1, 2.0),
            (1, 1, 1.0),
            (1, 2, 1.0),
            (2, 2, 1.0),
            (2, 3, 1.0),
            (2, 4, 1.0),
        ],
    );
    let problem = QuadraticProgrammingProblem::new(
        vec![1.0, 2.0, 3.0, 1.0, 1.0],
        0.0,
        None,
        a,
        vec![1.0, 1.0, 1.0],
        vec![0.0; 5],
        vec![Scalar::INFINITY; 5],
        0,
    )
    .unwrap();

    let mut opts = options(Method::RaPdhg);
    opts.iteration_limit = 5;
    opts.termination_evaluation_frequency = 1;
    let result = pdhg_algos::solve(&problem, &opts).unwrap();
    assert_eq!(result.termination_status, TerminationStatus::IterationLimit);
    assert_eq!(result.iteration_count, 5);
    assert!(result.primal.iter().all(|v| v.is_finite()));
    assert!(result.dual.iter().all(|v| v.is_finite()));
    assert!(result.objective_value.is_finite());
}
