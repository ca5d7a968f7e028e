#![doc = include_str!("../README.md")]

pub mod pool;
pub mod result;
pub mod simplify;
pub mod solver;
pub mod verifier;

pub use result::{Counterexample, SAFE_WITNESS};
pub use simplify::simplify;
pub use solver::{Solver, SolverError};
pub use verifier::Verifier;
