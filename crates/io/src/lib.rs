#![forbid(unsafe_code)]

use anyhow::{anyhow, Context, Result};
use pdhg_core::math::Scalar;
use pdhg_core::problem::QuadraticProgrammingProblem;
use pdhg_core::solution::SaddlePointOutput;
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

/// A problem on disk, tagged so `check`/`solve` can tell a stray solution
/// file from an actual problem before attempting to parse it as one.
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum JsonProblem {
    Problem {
        problem: QuadraticProgrammingProblem<Scalar>,
    },
}

pub fn read_json_problem<P: AsRef<Path>>(path: P) -> Result<JsonProblem> {
    let path = path.as_ref();
    let file = File::open(path).with_context(|| format!("failed to open {:?}", path))?;
    let mut reader = BufReader::new(file);
    let mut contents = String::new();
    reader
        .read_to_string(&mut contents)
        .with_context(|| format!("failed to read {:?}", path))?;

    match serde_json::from_str::<JsonProblem>(&contents) {
        Ok(problem) => Ok(problem),
        Err(parse_err) => {
            if serde_json::from_str::<SaddlePointOutput<Scalar>>(&contents).is_ok() {
                Err(anyhow!(
                    "JSON file contains a solver solution, but a problem (with a 'kind' field) was expected."
                ))
            } else {
                Err(parse_err).context("failed to parse JSON problem")
            }
        }
    }
}

pub fn write_json_problem<P: AsRef<Path>>(path: P, problem: &JsonProblem) -> Result<()> {
    let file = File::create(path.as_ref())
        .with_context(|| format!("failed to create {:?}", path.as_ref()))?;
    let writer = BufWriter::new(file);
    serde_json::to_writer_pretty(writer, problem).context("failed to serialise problem")?;
    Ok(())
}

pub fn write_solution<P: AsRef<Path>>(path: P, solution: &SaddlePointOutput<Scalar>) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create parent directory {:?}", parent))?;
        }
    }

    let file = File::create(path).with_context(|| format!("failed to create {:?}", path))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, solution).context("failed to serialise solution")?;
    writer
        .flush()
        .with_context(|| format!("failed to write solution into {:?}", path))?;
    Ok(())
}

pub fn read_mps_problem<P: AsRef<Path>>(_path: P) -> Result<QuadraticProgrammingProblem<Scalar>> {
    anyhow::bail!("MPS parsing is not yet implemented.");
}

#[cfg(test)]
mod tests {
    use super::*;
    use pdhg_linsys::CsrMatrix;

    #[test]
    fn json_roundtrip() {
        let problem = QuadraticProgrammingProblem::new(
            vec![1.0, 2.0],
            0.0,
            None,
            CsrMatrix::zeros(0, 2),
            vec![],
            vec![0.0, 0.0],
            vec![Scalar::INFINITY, Scalar::INFINITY],
            0,
        )
        .unwrap();
        let wrapped = JsonProblem::Problem { problem };
        let mut buffer = Vec::new();
        serde_json::to_writer(&mut buffer, &wrapped).unwrap();
        let parsed: JsonProblem = serde_json::from_slice(&buffer).unwrap();
        let JsonProblem::Problem { problem } = parsed;
        assert_eq!(problem.nvars(), 2);
    }
}
