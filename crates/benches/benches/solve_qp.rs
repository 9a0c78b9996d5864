use criterion::{criterion_group, criterion_main, BatchSize, Criterion};
use pdhg_api::{Method, QpBuilder, Solver};
use pdhg_core::math::Scalar;
use pdhg_core::options::SolveOptions;
use rand::{rngs::SmallRng, Rng, SeedableRng};

fn random_spd_triplets(n: usize, rng: &mut SmallRng) -> Vec<(usize, usize, Scalar)> {
    (0..n)
        .map(|i| (i, i, 1.0 + rng.gen::<Scalar>() * 0.1))
        .collect()
}

fn random_constraint_triplets(m: usize, n: usize, rng: &mut SmallRng) -> Vec<(usize, usize, Scalar)> {
    let mut triplets = Vec::with_capacity(m * n);
    for row in 0..m {
        for col in 0..n {
            triplets.push((row, col, rng.gen::<Scalar>() * 0.5 - 0.25));
        }
    }
    triplets
}

fn build_problem(n: usize, m: usize, rng: &mut SmallRng) -> QpBuilder<Scalar> {
    let p = random_spd_triplets(n, rng);
    let q = (0..n)
        .map(|_| rng.gen::<Scalar>() - 0.5)
        .collect::<Vec<_>>();
    let a = random_constraint_triplets(m, n, rng);
    let b = (0..m)
        .map(|_| rng.gen::<Scalar>() + 0.5)
        .collect::<Vec<_>>();
    let lower = vec![-1.0; n];
    let upper = vec![1.0; n];
    QpBuilder::new(n).p(p).q(q).inequality_ge(a, b).bounds(lower, upper)
}

fn solve_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("pdhg_qp_solve");
    let mut rng = SmallRng::seed_from_u64(42);
    group.bench_function("n=50_m=75", |b| {
        b.iter_batched(
            || build_problem(50, 75, &mut rng).build().unwrap(),
            |problem| {
                let solver = Solver::<Scalar>::new()
                    .method(Method::RaPdhg)
                    .options(SolveOptions::default());
                let _ = solver.solve(&problem).unwrap();
            },
            BatchSize::SmallInput,
        );
    });
    group.finish();
}

criterion_group!(benches, solve_benchmark);
criterion_main!(benches);
