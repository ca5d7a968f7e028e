#![doc = include_str!("../README.md")]

pub mod cnf;
pub mod cube;
pub mod literal;
pub mod transition_system;
pub mod variable;

pub use cnf::CnfFormula;
pub use cube::Cube;
pub use literal::Literal;
pub use transition_system::{TransitionSystem, VarKind};
pub use variable::{Variable, VariableRange, VariableStore};
