#![doc = include_str!("../README.md")]

pub mod aig;
pub mod builder;
pub mod parser;

pub use aig::{Aig, AigerLit, AndGate, Latch, Reset};
pub use builder::{build_from_aiger, BuildError};
pub use parser::{parse, parse_ascii, parse_binary, ParseError};
