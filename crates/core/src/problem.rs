use crate::math::RealNumber;
use pdhg_linsys::CsrMatrix;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProblemError {
    #[error("dimension mismatch: {0}")]
    DimensionMismatch(String),
    #[error("invalid structure: {0}")]
    InvalidStructure(String),
    #[error("sparse matrix error: {0}")]
    Sparse(#[from] pdhg_linsys::SparseError),
}

pub type ProblemResult<T> = Result<T, ProblemError>;

/// An LP or convex QP in the standard form this solver expects:
///
/// ```text
/// minimize    c0 + c'x + 1/2 x'Qx
/// subject to  (Ax)_i  = rhs_i       for equality rows
///             (Ax)_i >= rhs_i       for inequality rows
///             lb <= x <= ub
/// ```
///
/// `Q` is `None` (and `is_lp` is `true`) for a pure linear program.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuadraticProgrammingProblem<T: RealNumber> {
    pub objective_vector: Vec<T>,
    pub objective_constant: T,
    pub objective_matrix: Option<CsrMatrix<T>>,
    pub is_lp: bool,
    pub constraint_matrix: CsrMatrix<T>,
    pub constraint_matrix_t: CsrMatrix<T>,
    pub right_hand_side: Vec<T>,
    pub variable_lower_bound: Vec<T>,
    pub variable_upper_bound: Vec<T>,
    pub equalities_mask: Vec<bool>,
    pub num_equalities: usize,
}

impl<T> QuadraticProgrammingProblem<T>
where
    T: RealNumber,
{
    /// Builds a problem from its constraint matrix (transpose computed on
    /// demand), validating every dimension before returning.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        objective_vector: Vec<T>,
        objective_constant: T,
        objective_matrix: Option<CsrMatrix<T>>,
        constraint_matrix: CsrMatrix<T>,
        right_hand_side: Vec<T>,
        variable_lower_bound: Vec<T>,
        variable_upper_bound: Vec<T>,
        num_equalities: usize,
    ) -> ProblemResult<Self> {
        constraint_matrix.validate()?;
        let m = constraint_matrix.nrows;
        let equalities_mask = (0..m).map(|row| row < num_equalities).collect();
        let constraint_matrix_t = constraint_matrix.transpose();
        let is_lp = objective_matrix.is_none();
        let problem = Self {
            objective_vector,
            objective_constant,
            objective_matrix,
            is_lp,
            constraint_matrix,
            constraint_matrix_t,
            right_hand_side,
            variable_lower_bound,
            variable_upper_bound,
            equalities_mask,
            num_equalities,
        };
        problem.validate()?;
        Ok(problem)
    }

    pub fn nvars(&self) -> usize {
        self.objective_vector.len()
    }

    pub fn nconstraints(&self) -> usize {
        self.right_hand_side.len()
    }

    pub fn isfinite_variable_lower_bound(&self) -> Vec<bool> {
        self.variable_lower_bound
            .iter()
            .map(|v| v.is_finite())
            .collect()
    }

    pub fn isfinite_variable_upper_bound(&self) -> Vec<bool> {
        self.variable_upper_bound
            .iter()
            .map(|v| v.is_finite())
            .collect()
    }

    pub fn inequalities_mask(&self) -> Vec<bool> {
        self.equalities_mask.iter().map(|&eq| !eq).collect()
    }

    pub fn validate(&self) -> ProblemResult<()> {
        let n = self.nvars();
        let m = self.right_hand_side.len();

        if self.constraint_matrix.nrows != m || self.constraint_matrix.ncols != n {
            return Err(ProblemError::DimensionMismatch(format!(
                "constraint matrix is {}x{}, expected {m}x{n}",
                self.constraint_matrix.nrows, self.constraint_matrix.ncols
            )));
        }
        self.constraint_matrix.validate()?;
        if self.constraint_matrix_t.nrows != n || self.constraint_matrix_t.ncols != m {
            return Err(ProblemError::DimensionMismatch(format!(
                "constraint matrix transpose is {}x{}, expected {n}x{m}",
                self.constraint_matrix_t.nrows, self.constraint_matrix_t.ncols
            )));
        }
        self.constraint_matrix_t.validate()?;
        if self.variable_lower_bound.len() != n || self.variable_upper_bound.len() != n {
            return Err(ProblemError::DimensionMismatch(format!(
                "bounds length {}/{} != nvars {n}",
                self.variable_lower_bound.len(),
                self.variable_upper_bound.len()
            )));
        }
        for (i, (lo, hi)) in self
            .variable_lower_bound
            .iter()
            .zip(self.variable_upper_bound.iter())
            .enumerate()
        {
            if lo > hi {
                return Err(ProblemError::InvalidStructure(format!(
                    "lower bound exceeds upper bound at index {i}"
                )));
            }
        }
        if self.equalities_mask.len() != m {
            return Err(ProblemError::DimensionMismatch(format!(
                "equalities mask length {} != nconstraints {m}",
                self.equalities_mask.len()
            )));
        }
        if self.num_equalities > m {
            return Err(ProblemError::InvalidStructure(format!(
                "num_equalities {} exceeds nconstraints {m}",
                self.num_equalities
            )));
        }
        if let Some(q) = &self.objective_matrix {
            q.validate()?;
            if q.nrows != n || q.ncols != n {
                return Err(ProblemError::DimensionMismatch(format!(
                    "objective matrix must be square {n}x{n}, got {}x{}",
                    q.nrows, q.ncols
                )));
            }
        }
        for (i, &v) in self.objective_vector.iter().enumerate() {
            if !v.is_finite() {
                return Err(ProblemError::InvalidStructure(format!(
                    "objective coefficient at index {i} is not finite"
                )));
            }
        }
        for (i, &v) in self.right_hand_side.iter().enumerate() {
            if !v.is_finite() {
                return Err(ProblemError::InvalidStructure(format!(
                    "right-hand side at index {i} is not finite"
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::Scalar;

    fn identity(n: usize) -> CsrMatrix<Scalar> {
        CsrMatrix::identity(n)
    }

    #[test]
    fn builds_valid_box_constrained_qp() {
        let n = 2;
        let problem = QuadraticProgrammingProblem::new(
            vec![-1.0, -1.0],
            0.0,
            Some(identity(n)),
            CsrMatrix::zeros(0, n),
            vec![],
            vec![0.0, 0.0],
            vec![1.0, 1.0],
            0,
        )
        .unwrap();
        assert_eq!(problem.nvars(), 2);
        assert!(!problem.is_lp);
        assert_eq!(problem.isfinite_variable_lower_bound(), vec![true, true]);
    }

    #[test]
    fn detects_bound_mismatch() {
        let n = 2;
        let result = QuadraticProgrammingProblem::new(
            vec![1.0, 2.0],
            0.0,
            None,
            CsrMatrix::zeros(0, n),
            vec![],
            vec![0.0],
            vec![1.0, 1.0],
            0,
        );
        assert!(result.is_err());
    }

    #[test]
    fn equalities_mask_follows_first_k_convention() {
        let n = 2;
        let a = CsrMatrix::<Scalar>::from_triplets(2, n, vec![(0, 0, 1.0), (1, 1, 1.0)]);
        let problem = QuadraticProgrammingProblem::new(
            vec![1.0, 1.0],
            0.0,
            None,
            a,
            vec![1.0, 0.0],
            vec![Scalar::NEG_INFINITY, Scalar::NEG_INFINITY],
            vec![Scalar::INFINITY, Scalar::INFINITY],
            1,
        )
        .unwrap();
        assert_eq!(problem.equalities_mask, vec![true, false]);
        assert_eq!(problem.inequalities_mask(), vec![false, true]);
    }
}
