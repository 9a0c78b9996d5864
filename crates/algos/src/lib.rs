#![forbid(unsafe_code)]

pub mod kernel;
pub mod ra_pdhg;
pub mod r2h_pdhg;
pub mod restart;
pub mod termination;

use pdhg_core::math::RealNumber;
use pdhg_core::options::{Method, SolveOptions};
use pdhg_core::problem::QuadraticProgrammingProblem;
use pdhg_core::solution::SaddlePointOutput;

/// Dispatches to the configured method's driver loop.
pub fn solve<T: RealNumber>(
    problem: &QuadraticProgrammingProblem<T>,
    options: &SolveOptions<T>,
) -> anyhow::Result<SaddlePointOutput<T>> {
    match options.method {
        Method::RaPdhg => ra_pdhg::solve(problem, options),
        Method::R2hPdhg => r2h_pdhg::solve(problem, options),
    }
}
