//! A lightweight incremental-solver API over CaDiCaL.
//!
//! Asserted formulas and learned clauses persist across queries;
//! assumptions are scoped to a single query and cleared by the solver
//! on the next `solve` call.

use thiserror::Error;

use harrier_logic::{CnfFormula, Literal, Variable, VariableRange};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SolverError {
    /// Every query this engine issues is free of resource limits, so
    /// an UNKNOWN verdict is a fatal incident rather than a result.
    #[error("the SAT solver returned UNKNOWN on a query without resource limits")]
    Unknown,
}

/// A persistent incremental SAT solver instance.
pub struct Solver {
    inner: cadical::Solver,
}

impl Solver {
    pub fn new() -> Self {
        Solver {
            inner: cadical::Solver::new(),
        }
    }

    /// Permanently asserts all clauses of `formula`.
    pub fn assert_formula(&mut self, formula: &CnfFormula) {
        for clause in formula.clauses() {
            self.inner.add_clause(clause.iter().map(|l| l.code()));
        }
    }

    /// Starts building an assumption-scoped query.
    pub fn query(&mut self) -> QueryBuilder<'_> {
        QueryBuilder {
            solver: self,
            assumptions: Vec::new(),
        }
    }

    /// Whether `var` is assigned true by the model of the last
    /// satisfiable query. Unconstrained variables read as false.
    pub fn is_true_in_model(&mut self, var: Variable) -> bool {
        self.inner.value(var.id()).unwrap_or(false)
    }

    /// The model restricted to `range`, one literal per variable.
    pub fn model(&mut self, range: VariableRange) -> Vec<Literal> {
        range
            .iter()
            .map(|var| {
                let positive = self.is_true_in_model(var);
                Literal::with_polarity(var, positive)
            })
            .collect()
    }

    /// The literals of `literals` that appear in the failed-assumption
    /// core of the last unsatisfiable query.
    pub fn core_of(&mut self, literals: &[Literal]) -> Vec<Literal> {
        literals
            .iter()
            .copied()
            .filter(|lit| self.inner.failed(lit.code()))
            .collect()
    }

    /// The failed-assumption core restricted to `range`, trying both
    /// polarities of each variable.
    pub fn core_over(&mut self, range: VariableRange) -> Vec<Literal> {
        let mut core = Vec::new();
        for var in range.iter() {
            let lit = Literal::positive(var);
            if self.inner.failed(lit.code()) {
                core.push(lit);
            } else if self.inner.failed((!lit).code()) {
                core.push(!lit);
            }
        }
        core
    }
}

impl Default for Solver {
    fn default() -> Self {
        Self::new()
    }
}

/// Accumulates assumptions for one query.
pub struct QueryBuilder<'a> {
    solver: &'a mut Solver,
    assumptions: Vec<Literal>,
}

impl QueryBuilder<'_> {
    pub fn assume(mut self, lit: Literal) -> Self {
        debug_assert!(!lit.is_separator());
        self.assumptions.push(lit);
        self
    }

    pub fn assume_all(mut self, literals: &[Literal]) -> Self {
        self.assumptions.extend_from_slice(literals);
        self
    }

    pub fn assume_mapped(mut self, literals: &[Literal], f: impl Fn(Literal) -> Literal) -> Self {
        self.assumptions.extend(literals.iter().map(|&l| f(l)));
        self
    }

    /// Runs the query. The assumptions do not outlive it.
    pub fn is_sat(self) -> Result<bool, SolverError> {
        self.solver
            .inner
            .solve_with(self.assumptions.iter().map(|l| l.code()))
            .ok_or(SolverError::Unknown)
    }
}
