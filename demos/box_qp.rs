
use anyhow::Result;
use pdhg_api::{Method, QpBuilder, Solver};
use pdhg_core::math::Scalar;
use pdhg_core::options::SolveOptions;

fn main() -> Result<()> {
    let p = diagonal(&[2.0, 4.0, 6.0]);
    let q = vec![-2.0, -5.0, -3.0];
    let lower = vec![0.0, -1.0, 0.0];
    let upper = vec![1.0, 2.0, 4.0];
    let problem = QpBuilder::new(3).p(p).q(q).bounds(lower, upper).build()?;
    let solver = Solver::<Scalar>::new()
        .method(Method::RaPdhg)
        .options(SolveOptions::default());
    let solution = solver.solve(&problem)?;

    println!("status: {:?}", solution.termination_status);
    println!("x: {:?}", solution.primal);
    println!("objective: {:.6}", solution.objective_value);
    Ok(())
}

fn diagonal(diag: &[Scalar]) -> Vec<(usize, usize, Scalar)> {
    diag.iter().enumerate().map(|(i, &v)| (i, i, v)).collect()
}
