
use anyhow::Result;
use pdhg_api::{LpBuilder, Method, Solver};
use pdhg_core::math::Scalar;
use pdhg_core::options::SolveOptions;

fn main() -> Result<()> {
    let cost = vec![2.0, 3.0, 1.5, 2.5, 4.0, 3.5, 3.0, 2.0, 1.0];
    let a = supply_demand_constraints();
    let b = vec![80.0, 65.0, 75.0, 70.0, 60.0, 90.0];
    let lower = vec![0.0; 9];
    let upper = vec![Scalar::INFINITY; 9];

    let problem = LpBuilder::new(9)
        .c(cost)
        .equality(a, b)
        .bounds(lower, upper)
        .build()?;
    let solver = Solver::<Scalar>::new()
        .method(Method::RaPdhg)
        .options(SolveOptions::default());
    let solution = solver.solve(&problem)?;

    println!("status: {:?}", solution.termination_status);
    println!("flows: {:?}", solution.primal);
    println!("objective: {:.6}", solution.objective_value);
    Ok(())
}

/// Variable `source * 3 + sink` is the flow from `source` to `sink`; rows 0-2
/// fix each source's outflow, rows 3-5 fix each sink's inflow.
fn supply_demand_constraints() -> Vec<(usize, usize, Scalar)> {
    let mut triplets = Vec::with_capacity(18);
    for source in 0..3 {
        for sink in 0..3 {
            triplets.push((source, source * 3 + sink, 1.0));
            triplets.push((3 + sink, source * 3 + sink, 1.0));
        }
    }
    triplets
}
