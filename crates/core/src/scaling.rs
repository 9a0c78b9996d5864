use crate::math::RealNumber;
use crate::problem::{ProblemResult, QuadraticProgrammingProblem};
use crate::traits::Preconditioner;
use pdhg_linsys::CsrMatrix;
use serde::{Deserialize, Serialize};

/// A problem after Ruiz/L2/Pock-Chambolle rescaling, plus the vectors needed
/// to map a scaled solution back to the original space.
///
/// `scaled.constraint_matrix = diag(1/constraint_rescaling) * original.A * diag(1/variable_rescaling)`.
/// Unscaling: `primal = scaled_primal / variable_rescaling`, `dual = scaled_dual / constraint_rescaling`,
/// `Ax = scaled_primal_product * constraint_rescaling`, `Aᵀy = scaled_dual_product * variable_rescaling`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScaledProblem<T: RealNumber> {
    pub scaled_qp: QuadraticProgrammingProblem<T>,
    pub variable_rescaling: Vec<T>,
    pub constraint_rescaling: Vec<T>,
}

impl<T> ScaledProblem<T>
where
    T: RealNumber,
{
    pub fn unscale_primal(&self, scaled_primal: &[T]) -> Vec<T> {
        scaled_primal
            .iter()
            .zip(self.variable_rescaling.iter())
            .map(|(&x, &s)| x / s)
            .collect()
    }

    pub fn unscale_dual(&self, scaled_dual: &[T]) -> Vec<T> {
        scaled_dual
            .iter()
            .zip(self.constraint_rescaling.iter())
            .map(|(&y, &s)| y / s)
            .collect()
    }

    pub fn unscale_primal_product(&self, scaled_primal_product: &[T]) -> Vec<T> {
        scaled_primal_product
            .iter()
            .zip(self.constraint_rescaling.iter())
            .map(|(&ax, &s)| ax * s)
            .collect()
    }

    pub fn unscale_dual_product(&self, scaled_dual_product: &[T]) -> Vec<T> {
        scaled_dual_product
            .iter()
            .zip(self.variable_rescaling.iter())
            .map(|(&aty, &s)| aty * s)
            .collect()
    }
}

fn sqrt_or_one<T: RealNumber>(value: T) -> T {
    if value > T::zero() {
        value.sqrt()
    } else {
        T::one()
    }
}

/// One equilibration pass: `r_i = sqrt(row norm_i)`, `c_j = sqrt(col norm_j)`
/// of the current constraint matrix, with zero norms mapped to 1.
fn equilibration_pass<T: RealNumber>(
    a: &mut CsrMatrix<T>,
    a_t: &mut CsrMatrix<T>,
    rhs: &mut [T],
    objective_vector: &mut [T],
    objective_matrix: &mut Option<CsrMatrix<T>>,
    variable_lower_bound: &mut [T],
    variable_upper_bound: &mut [T],
    variable_rescaling: &mut [T],
    constraint_rescaling: &mut [T],
    row_norms: impl Fn(&CsrMatrix<T>) -> Vec<T>,
    col_norms: impl Fn(&CsrMatrix<T>) -> Vec<T>,
) {
    let r: Vec<T> = row_norms(a).into_iter().map(sqrt_or_one).collect();
    let c: Vec<T> = col_norms(a_t).into_iter().map(sqrt_or_one).collect();

    let inv_r: Vec<T> = r.iter().map(|&v| T::one() / v).collect();
    let inv_c: Vec<T> = c.iter().map(|&v| T::one() / v).collect();

    a.scale_rows_cols(&inv_r, &inv_c);
    *a_t = a.transpose();

    for (rhs_i, &inv_r_i) in rhs.iter_mut().zip(inv_r.iter()) {
        *rhs_i = *rhs_i * inv_r_i;
    }
    for (obj_j, &inv_c_j) in objective_vector.iter_mut().zip(inv_c.iter()) {
        *obj_j = *obj_j * inv_c_j;
    }
    for (lo, &c_j) in variable_lower_bound.iter_mut().zip(c.iter()) {
        if lo.is_finite() {
            *lo = *lo * c_j;
        }
    }
    for (hi, &c_j) in variable_upper_bound.iter_mut().zip(c.iter()) {
        if hi.is_finite() {
            *hi = *hi * c_j;
        }
    }
    if let Some(q) = objective_matrix.as_mut() {
        q.scale_rows_cols(&inv_c, &inv_c);
    }
    for (cr, &r_i) in constraint_rescaling.iter_mut().zip(r.iter()) {
        *cr = *cr * r_i;
    }
    for (vr, &c_j) in variable_rescaling.iter_mut().zip(c.iter()) {
        *vr = *vr * c_j;
    }
}

/// Runs Ruiz equilibration, an optional L2 rescaling pass, and Pock-Chambolle
/// rescaling, in that order, accumulating `variable_rescaling` /
/// `constraint_rescaling` across all three.
#[derive(Debug, Clone, Copy)]
pub struct RuizPockChambollePreconditioner<T: RealNumber> {
    pub l_inf_ruiz_iterations: usize,
    pub l2_norm_rescaling: bool,
    pub pock_chambolle_alpha: Option<T>,
}

impl<T> RuizPockChambollePreconditioner<T>
where
    T: RealNumber,
{
    pub fn new(l_inf_ruiz_iterations: usize, l2_norm_rescaling: bool) -> Self {
        Self {
            l_inf_ruiz_iterations,
            l2_norm_rescaling,
            pock_chambolle_alpha: Some(T::from_f64(1.0).unwrap()),
        }
    }
}

impl<T> Default for RuizPockChambollePreconditioner<T>
where
    T: RealNumber,
{
    fn default() -> Self {
        Self::new(10, false)
    }
}

impl<T> Preconditioner<T> for RuizPockChambollePreconditioner<T>
where
    T: RealNumber,
{
    fn precondition(
        &self,
        problem: &QuadraticProgrammingProblem<T>,
    ) -> ProblemResult<ScaledProblem<T>> {
        let n = problem.nvars();
        let m = problem.nconstraints();
        let mut scaled = problem.clone();
        let mut variable_rescaling = vec![T::one(); n];
        let mut constraint_rescaling = vec![T::one(); m];

        for _ in 0..self.l_inf_ruiz_iterations {
            equilibration_pass(
                &mut scaled.constraint_matrix,
                &mut scaled.constraint_matrix_t,
                &mut scaled.right_hand_side,
                &mut scaled.objective_vector,
                &mut scaled.objective_matrix,
                &mut scaled.variable_lower_bound,
                &mut scaled.variable_upper_bound,
                &mut variable_rescaling,
                &mut constraint_rescaling,
                |mat| mat.row_inf_norms(),
                |mat| mat.row_inf_norms(),
            );
        }

        if self.l2_norm_rescaling {
            equilibration_pass(
                &mut scaled.constraint_matrix,
                &mut scaled.constraint_matrix_t,
                &mut scaled.right_hand_side,
                &mut scaled.objective_vector,
                &mut scaled.objective_matrix,
                &mut scaled.variable_lower_bound,
                &mut scaled.variable_upper_bound,
                &mut variable_rescaling,
                &mut constraint_rescaling,
                |mat| mat.row_l2_norms(),
                |mat| mat.row_l2_norms(),
            );
        }

        if let Some(alpha) = self.pock_chambolle_alpha {
            let two_minus_alpha = T::from_f64(2.0).unwrap() - alpha;
            equilibration_pass(
                &mut scaled.constraint_matrix,
                &mut scaled.constraint_matrix_t,
                &mut scaled.right_hand_side,
                &mut scaled.objective_vector,
                &mut scaled.objective_matrix,
                &mut scaled.variable_lower_bound,
                &mut scaled.variable_upper_bound,
                &mut variable_rescaling,
                &mut constraint_rescaling,
                |mat| mat.row_pow_sums(two_minus_alpha),
                |mat| mat.row_pow_sums(alpha),
            );
        }

        scaled.validate()?;
        Ok(ScaledProblem {
            scaled_qp: scaled,
            variable_rescaling,
            constraint_rescaling,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::Scalar;

    fn sample_problem() -> QuadraticProgrammingProblem<Scalar> {
        let a = CsrMatrix::from_triplets(2, 2, vec![(0, 0, 4.0), (0, 1, 2.0), (1, 1, 1.0)]);
        QuadraticProgrammingProblem::new(
            vec![1.0, 1.0],
            0.0,
            None,
            a,
            vec![1.0, 1.0],
            vec![0.0, 0.0],
            vec![10.0, 10.0],
            0,
        )
        .unwrap()
    }

    #[test]
    fn preconditioning_produces_consistent_rescaling_lengths() {
        let problem = sample_problem();
        let pre = RuizPockChambollePreconditioner::new(4, true);
        let scaled = pre.precondition(&problem).unwrap();
        assert_eq!(scaled.variable_rescaling.len(), 2);
        assert_eq!(scaled.constraint_rescaling.len(), 2);
        assert!(scaled.variable_rescaling.iter().all(|&v| v > 0.0));
        assert!(scaled.constraint_rescaling.iter().all(|&v| v > 0.0));
    }

    #[test]
    fn unscale_round_trips_a_fixed_point() {
        let problem = sample_problem();
        let pre = RuizPockChambollePreconditioner::new(5, false);
        let scaled = pre.precondition(&problem).unwrap();
        let scaled_x = vec![1.0, 1.0];
        let unscaled_x = scaled.unscale_primal(&scaled_x);
        let rescaled_back: Vec<Scalar> = unscaled_x
            .iter()
            .zip(scaled.variable_rescaling.iter())
            .map(|(&x, &s)| x * s)
            .collect();
        for (a, b) in rescaled_back.iter().zip(scaled_x.iter()) {
            assert!((a - b).abs() < 1e-9);
        }
    }
}
