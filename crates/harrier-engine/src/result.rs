//! Verification results and AIGER witness formatting.

use serde::Serialize;

use harrier_logic::{Literal, TransitionSystem};

/// The witness body printed for a safe circuit.
pub const SAFE_WITNESS: &str = "0\nb0\n.\n";

/// A concrete counterexample trace.
///
/// Row `i` holds one literal per input variable and drives the circuit
/// from the state reached after `i` cycles to the next one; the final
/// row supplies the inputs of the cycle in which the error output is
/// asserted. The initial state itself is given by the transition
/// system's initial cube.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Counterexample {
    inputs: Vec<Vec<Literal>>,
}

impl Counterexample {
    pub(crate) fn new(inputs: Vec<Vec<Literal>>) -> Self {
        debug_assert!(!inputs.is_empty());
        Counterexample { inputs }
    }

    /// The input rows, one per cycle.
    pub fn inputs(&self) -> &[Vec<Literal>] {
        &self.inputs
    }

    pub fn len(&self) -> usize {
        self.inputs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inputs.is_empty()
    }

    /// Renders the trace in the AIGER witness format: the satisfied
    /// property (`b0`), the initial latch values in file order, then
    /// one input vector per cycle, terminated by `.`.
    ///
    /// Inputs the solver left unconstrained are printed as 0.
    pub fn to_aiger_witness(&self, system: &TransitionSystem) -> String {
        let mut out = String::from("1\nb0\n");

        for &bit in system.initial_cube() {
            out.push(if bit { '1' } else { '0' });
        }
        out.push('\n');

        for row in &self.inputs {
            for var in system.input_vars().iter() {
                let positive = row
                    .iter()
                    .find(|lit| lit.var() == var)
                    .map(|lit| lit.is_positive())
                    .unwrap_or(false);
                out.push(if positive { '1' } else { '0' });
            }
            out.push('\n');
        }

        out.push_str(".\n");
        out
    }
}
