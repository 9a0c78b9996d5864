#![forbid(unsafe_code)]

use anyhow::Result;
use pdhg_core::math::RealNumber;
use pdhg_core::problem::{ProblemError, QuadraticProgrammingProblem};
use pdhg_linsys::CsrMatrix;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use pdhg_core::options::{Method, SolveOptions};
pub use pdhg_core::solution::{SaddlePointOutput, TerminationStatus};

#[derive(Debug, Error)]
pub enum SolverError {
    #[error("problem validation failed: {0}")]
    InvalidProblem(#[from] ProblemError),
    #[error("invalid solver configuration: {0}")]
    InvalidConfig(#[from] pdhg_core::options::ConfigError),
}

/// A single linear or quadratic constraint block: a sparse matrix in
/// (row, col, value) triplet form plus its right-hand side.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConstraintBlock<T: RealNumber> {
    pub triplets: Vec<(usize, usize, T)>,
    pub rhs: Vec<T>,
}

/// Builds a `QuadraticProgrammingProblem` from separate equality/inequality
/// blocks and box bounds, mirroring the teacher's `QpBuilder` but emitting the
/// unified CSR-backed problem type instead of a CSC `ProblemQP`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QpBuilder<T: RealNumber> {
    nvars: usize,
    objective_matrix: Option<Vec<(usize, usize, T)>>,
    objective_vector: Option<Vec<T>>,
    objective_constant: T,
    equality: Option<ConstraintBlock<T>>,
    inequality: Option<ConstraintBlock<T>>,
    lower_bound: Option<Vec<T>>,
    upper_bound: Option<Vec<T>>,
}

impl<T> QpBuilder<T>
where
    T: RealNumber,
{
    pub fn new(nvars: usize) -> Self {
        Self {
            nvars,
            objective_matrix: None,
            objective_vector: None,
            objective_constant: T::zero(),
            equality: None,
            inequality: None,
            lower_bound: None,
            upper_bound: None,
        }
    }

    pub fn p(mut self, triplets: Vec<(usize, usize, T)>) -> Self {
        self.objective_matrix = Some(triplets);
        self
    }

    pub fn q(mut self, objective_vector: Vec<T>) -> Self {
        self.objective_vector = Some(objective_vector);
        self
    }

    pub fn objective_constant(mut self, value: T) -> Self {
        self.objective_constant = value;
        self
    }

    pub fn equality(mut self, triplets: Vec<(usize, usize, T)>, rhs: Vec<T>) -> Self {
        self.equality = Some(ConstraintBlock { triplets, rhs });
        self
    }

    /// `Ax >= rhs` rows, in the solver's native inequality direction.
    pub fn inequality_ge(mut self, triplets: Vec<(usize, usize, T)>, rhs: Vec<T>) -> Self {
        self.inequality = Some(ConstraintBlock { triplets, rhs });
        self
    }

    pub fn bounds(mut self, lower: Vec<T>, upper: Vec<T>) -> Self {
        self.lower_bound = Some(lower);
        self.upper_bound = Some(upper);
        self
    }

    pub fn build(self) -> Result<QuadraticProgrammingProblem<T>, SolverError> {
        let n = self.nvars;
        let objective_vector = self.objective_vector.unwrap_or_else(|| vec![T::zero(); n]);
        let objective_matrix = self
            .objective_matrix
            .map(|triplets| CsrMatrix::from_triplets(n, n, triplets));

        let equality = self.equality.unwrap_or(ConstraintBlock {
            triplets: vec![],
            rhs: vec![],
        });
        let inequality = self.inequality.unwrap_or(ConstraintBlock {
            triplets: vec![],
            rhs: vec![],
        });
        let num_equalities = equality.rhs.len();
        let m = num_equalities + inequality.rhs.len();

        let mut triplets = equality.triplets;
        triplets.extend(
            inequality
                .triplets
                .into_iter()
                .map(|(row, col, val)| (row + num_equalities, col, val)),
        );
        let constraint_matrix = CsrMatrix::from_triplets(m, n, triplets);

        let mut rhs = equality.rhs;
        rhs.extend(inequality.rhs);

        let lower_bound = self
            .lower_bound
            .unwrap_or_else(|| vec![T::zero(); n]);
        let upper_bound = self
            .upper_bound
            .unwrap_or_else(|| vec![T::infinity(); n]);

        let problem = QuadraticProgrammingProblem::new(
            objective_vector,
            self.objective_constant,
            objective_matrix,
            constraint_matrix,
            rhs,
            lower_bound,
            upper_bound,
            num_equalities,
        )?;
        Ok(problem)
    }
}

/// Builds a pure linear program: a `QpBuilder` with no quadratic term.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LpBuilder<T: RealNumber> {
    inner: QpBuilder<T>,
}

impl<T> LpBuilder<T>
where
    T: RealNumber,
{
    pub fn new(nvars: usize) -> Self {
        Self {
            inner: QpBuilder::new(nvars),
        }
    }

    pub fn c(mut self, cost: Vec<T>) -> Self {
        self.inner = self.inner.q(cost);
        self
    }

    pub fn equality(mut self, triplets: Vec<(usize, usize, T)>, rhs: Vec<T>) -> Self {
        self.inner = self.inner.equality(triplets, rhs);
        self
    }

    pub fn inequality_ge(mut self, triplets: Vec<(usize, usize, T)>, rhs: Vec<T>) -> Self {
        self.inner = self.inner.inequality_ge(triplets, rhs);
        self
    }

    pub fn bounds(mut self, lower: Vec<T>, upper: Vec<T>) -> Self {
        self.inner = self.inner.bounds(lower, upper);
        self
    }

    pub fn build(self) -> Result<QuadraticProgrammingProblem<T>, SolverError> {
        self.inner.build()
    }
}

/// Thin wrapper over `pdhg_algos::solve`, holding the configured method and
/// options the way the teacher's `Solver` holds a scaler and warm start.
pub struct Solver<T: RealNumber> {
    options: SolveOptions<T>,
}

impl<T> Solver<T>
where
    T: RealNumber,
{
    pub fn new() -> Self {
        Self {
            options: SolveOptions::default(),
        }
    }

    pub fn method(mut self, method: Method) -> Self {
        self.options.method = method;
        self
    }

    pub fn options(mut self, options: SolveOptions<T>) -> Self {
        self.options = options;
        self
    }

    pub fn solve(&self, problem: &QuadraticProgrammingProblem<T>) -> anyhow::Result<SaddlePointOutput<T>> {
        self.options.validate().map_err(SolverError::from)?;
        pdhg_algos::solve(problem, &self.options)
    }
}

impl<T> Default for Solver<T>
where
    T: RealNumber,
{
    fn default() -> Self {
        Self::new()
    }
}

pub fn solve<T: RealNumber>(
    problem: &QuadraticProgrammingProblem<T>,
    options: SolveOptions<T>,
) -> anyhow::Result<SaddlePointOutput<T>> {
    Solver::new().options(options).solve(problem)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pdhg_core::math::Scalar;

    #[test]
    fn builds_and_solves_a_simple_lp() {
        let problem = LpBuilder::<Scalar>::new(2)
            .c(vec![1.0, 1.0])
            .inequality_ge(vec![(0, 0, 1.0), (0, 1, 1.0)], vec![1.0])
            .bounds(vec![0.0, 0.0], vec![Scalar::INFINITY, Scalar::INFINITY])
            .build()
            .unwrap();

        let result = Solver::new().solve(&problem).unwrap();
        assert_eq!(result.termination_status, TerminationStatus::Optimal);
        assert!((result.objective_value - 1.0).abs() < 1e-4);
    }
}
