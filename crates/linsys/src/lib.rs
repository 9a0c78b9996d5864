#![forbid(unsafe_code)]

pub mod csr;

pub use csr::{CsrMatrix, Numeric, SparseError, SparseResult};
