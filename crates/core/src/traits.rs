use crate::math::RealNumber;
use crate::problem::{ProblemResult, QuadraticProgrammingProblem};
use crate::scaling::ScaledProblem;

/// Transforms a problem into a numerically well-scaled form, recording the
/// rescaling vectors needed to map solutions back to the original space.
pub trait Preconditioner<T: RealNumber> {
    fn precondition(
        &self,
        problem: &QuadraticProgrammingProblem<T>,
    ) -> ProblemResult<ScaledProblem<T>>;
}
