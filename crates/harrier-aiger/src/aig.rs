//! The in-memory And-Inverter Graph model.

/// An AIGER literal: `2 * var` for the positive phase, `2 * var + 1`
/// for the negated phase. Literal 0 is constant false, literal 1
/// constant true.
pub type AigerLit = u32;

pub const AIGER_FALSE: AigerLit = 0;
pub const AIGER_TRUE: AigerLit = 1;

/// Flips the phase of a literal.
#[inline]
pub fn aiger_not(lit: AigerLit) -> AigerLit {
    lit ^ 1
}

/// The variable index of a literal.
#[inline]
pub fn aiger_var(lit: AigerLit) -> u32 {
    lit >> 1
}

#[inline]
pub fn aiger_sign(lit: AigerLit) -> bool {
    lit & 1 == 1
}

/// The reset behavior of a latch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reset {
    Zero,
    One,
    /// The latch powers up nondeterministically (AIGER 1.9 encodes
    /// this as a reset equal to the latch's own literal).
    Nondet,
}

/// A state-holding element: `lit` holds the current value, `next` is
/// the next-state function.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Latch {
    pub lit: AigerLit,
    pub next: AigerLit,
    pub reset: Reset,
}

/// A two-input AND gate defining `lhs = rhs0 & rhs1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AndGate {
    pub lhs: AigerLit,
    pub rhs0: AigerLit,
    pub rhs1: AigerLit,
}

/// A parsed And-Inverter Graph.
///
/// Gates appear in file order. Reencoded AIGER files keep that order
/// topological, with every gate defined after its operands.
#[derive(Debug, Clone, Default)]
pub struct Aig {
    pub max_var: u32,
    pub inputs: Vec<AigerLit>,
    pub latches: Vec<Latch>,
    pub outputs: Vec<AigerLit>,
    pub bad: Vec<AigerLit>,
    /// Invariant constraints. Parsed for completeness; the builder
    /// rejects circuits that use them.
    pub constraints: Vec<AigerLit>,
    /// Justice properties, one literal list each. Parsed for
    /// completeness; the builder rejects circuits that use them.
    pub justice: Vec<Vec<AigerLit>>,
    /// Fairness constraints. Parsed for completeness; the builder
    /// rejects circuits that use them.
    pub fairness: Vec<AigerLit>,
    pub ands: Vec<AndGate>,
}

impl Aig {
    pub fn num_inputs(&self) -> usize {
        self.inputs.len()
    }

    pub fn num_latches(&self) -> usize {
        self.latches.len()
    }

    pub fn num_ands(&self) -> usize {
        self.ands.len()
    }
}
