#![forbid(unsafe_code)]

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use pdhg_api::{Method, Solver};
use pdhg_core::math::Scalar;
use pdhg_core::options::SolveOptions;
use pdhg_core::solution::SaddlePointOutput;
use pdhg_io::{read_json_problem, write_solution, JsonProblem};
use std::io::Write;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "pdhg")]
#[command(version, about = "Matrix-free PDHG-family LP/QP solver")]
struct Cli {
    #[arg(long)]
    log_json: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    Solve {
        #[arg(long)]
        problem: PathBuf,
        #[arg(long, default_value = "ra-pdhg")]
        method: MethodArg,
        #[arg(long)]
        tol: Option<f64>,
        #[arg(long)]
        max_iters: Option<usize>,
        #[arg(long)]
        time_limit: Option<u64>,
        #[arg(long)]
        output: Option<PathBuf>,
        #[arg(long)]
        log_json: bool,
    },
    Check {
        #[arg(long)]
        problem: PathBuf,
    },
    Bench {},
}

#[derive(Clone, Copy, ValueEnum)]
enum MethodArg {
    RaPdhg,
    R2hPdhg,
}

impl From<MethodArg> for Method {
    fn from(arg: MethodArg) -> Method {
        match arg {
            MethodArg::RaPdhg => Method::RaPdhg,
            MethodArg::R2hPdhg => Method::R2hPdhg,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    initialize_tracing(cli.log_json)?;
    match cli.command {
        Commands::Solve {
            problem,
            method,
            tol,
            max_iters,
            time_limit,
            output,
            log_json,
        } => solve_command(
            problem,
            method.into(),
            tol,
            max_iters,
            time_limit,
            output,
            log_json,
        ),
        Commands::Check { problem } => check_command(problem),
        Commands::Bench {} => {
            println!("Benchmarks are available via `cargo bench -p pdhg-benches`.");
            Ok(())
        }
    }
}

fn initialize_tracing(log_json: bool) -> Result<()> {
    if log_json {
        tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env())
            .json()
            .try_init()
            .ok();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env())
            .try_init()
            .ok();
    }
    Ok(())
}

fn solve_command(
    path: PathBuf,
    method: Method,
    tol: Option<f64>,
    max_iters: Option<usize>,
    time_limit: Option<u64>,
    output: Option<PathBuf>,
    output_json: bool,
) -> Result<()> {
    let mut options = SolveOptions::<Scalar>::default();
    if let Some(tolerance) = tol {
        options.eps_abs = tolerance;
        options.eps_rel = tolerance;
    }
    if let Some(iters) = max_iters {
        options.iteration_limit = iters;
    }
    if let Some(limit) = time_limit {
        options.time_sec_limit = limit as Scalar;
    }
    options.method = method;

    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase();

    match extension.as_str() {
        "json" => match read_json_problem(&path)? {
            JsonProblem::Problem { problem } => {
                let solver = Solver::<Scalar>::new().options(options);
                let solution = solver.solve(&problem)?;
                emit_solution(solution, output, output_json)?;
            }
        },
        "mps" => {
            anyhow::bail!("MPS parsing is not implemented yet.");
        }
        _ => {
            anyhow::bail!("Unsupported file extension: {}", extension);
        }
    }
    Ok(())
}

fn emit_solution(
    solution: SaddlePointOutput<Scalar>,
    output: Option<PathBuf>,
    output_json: bool,
) -> Result<()> {
    if output_json {
        let stdout = std::io::stdout();
        let mut handle = stdout.lock();
        serde_json::to_writer_pretty(&mut handle, &solution)?;
        handle.write_all(b"\n")?;
        handle.flush()?;
    } else {
        println!(
            "status: {:?}\nobjective: {:.6}\niters: {}",
            solution.termination_status, solution.objective_value, solution.iteration_count
        );
    }
    if let Some(path) = output {
        write_solution(path, &solution)?;
    }
    Ok(())
}

fn check_command(path: PathBuf) -> Result<()> {
    match read_json_problem(&path)? {
        JsonProblem::Problem { problem } => {
            problem.validate().context("problem validation failed")?;
            println!("validation succeeded.");
        }
    }
    Ok(())
}
