
use anyhow::Result;
use pdhg_api::{Method, QpBuilder, Solver};
use pdhg_core::math::Scalar;
use pdhg_core::options::SolveOptions;

fn main() -> Result<()> {
    let returns = vec![0.12, 0.10, 0.07, 0.03];
    let cov_diag = vec![0.05, 0.02, 0.01, 0.005];
    let target_return = 0.08;
    let n = returns.len();

    let p = diagonal(&cov_diag);
    let q = vec![0.0; n];

    let mut equality = Vec::with_capacity(2 * n);
    for (col, &ret) in returns.iter().enumerate() {
        equality.push((0, col, 1.0));
        equality.push((1, col, ret));
    }
    let rhs = vec![1.0, target_return];

    let problem = QpBuilder::new(n)
        .p(p)
        .q(q)
        .equality(equality, rhs)
        .bounds(vec![0.0; n], vec![1.0; n])
        .build()?;
    let solver = Solver::<Scalar>::new()
        .method(Method::RaPdhg)
        .options(SolveOptions::default());
    let solution = solver.solve(&problem)?;

    println!("status: {:?}", solution.termination_status);
    println!("weights: {:?}", solution.primal);
    println!("objective: {:.6}", solution.objective_value);
    Ok(())
}

fn diagonal(diag: &[Scalar]) -> Vec<(usize, usize, Scalar)> {
    diag.iter().enumerate().map(|(i, &v)| (i, i, v)).collect()
}
