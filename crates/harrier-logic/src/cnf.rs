//! Flat CNF formulas with separator-terminated clauses.

use std::fmt;

use crate::cube::Cube;
use crate::literal::Literal;

/// A CNF formula stored as a flat literal sequence.
///
/// Each clause is followed by [`Literal::SEPARATOR`], so an empty
/// formula (the constant true) is an empty vector and a formula
/// containing a single empty clause (the constant false) is a lone
/// separator.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CnfFormula {
    literals: Vec<Literal>,
}

impl CnfFormula {
    pub fn new() -> Self {
        CnfFormula::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        CnfFormula {
            literals: Vec::with_capacity(capacity),
        }
    }

    /// The flat literal storage, separators included.
    pub fn literals(&self) -> &[Literal] {
        &self.literals
    }

    pub fn is_empty(&self) -> bool {
        self.literals.is_empty()
    }

    pub fn clause_count(&self) -> usize {
        self.literals.iter().filter(|l| l.is_separator()).count()
    }

    pub fn add_clause(&mut self, clause: &[Literal]) {
        debug_assert!(clause.iter().all(|l| !l.is_separator()));

        self.literals.extend_from_slice(clause);
        self.literals.push(Literal::SEPARATOR);
    }

    pub fn add_clause_lits(&mut self, clause: impl IntoIterator<Item = Literal>) {
        for lit in clause {
            debug_assert!(!lit.is_separator());
            self.literals.push(lit);
        }
        self.literals.push(Literal::SEPARATOR);
    }

    /// Appends all clauses of `other`.
    pub fn add_formula(&mut self, other: &CnfFormula) {
        self.literals.extend_from_slice(&other.literals);
    }

    /// Iterates over clauses as literal slices, separators stripped.
    pub fn clauses(&self) -> Clauses<'_> {
        Clauses {
            rest: &self.literals,
        }
    }

    /// A new formula with `f` applied to every non-separator literal.
    pub fn map(&self, f: impl Fn(Literal) -> Literal) -> CnfFormula {
        CnfFormula {
            literals: self
                .literals
                .iter()
                .map(|&l| if l.is_separator() { l } else { f(l) })
                .collect(),
        }
    }

    /// Applies `f` to every non-separator literal in place.
    pub fn transform(&mut self, f: impl Fn(Literal) -> Literal) {
        for lit in &mut self.literals {
            if !lit.is_separator() {
                *lit = f(*lit);
            }
        }
    }

    /// The formula `activator -> self`: every clause gains the literal
    /// `!activator`, so the original clauses only bite when `activator`
    /// is asserted.
    pub fn activate(&self, activator: Literal) -> CnfFormula {
        let mut result = CnfFormula::with_capacity(self.literals.len() + self.clause_count());

        for clause in self.clauses() {
            result.literals.push(!activator);
            result.literals.extend_from_slice(clause);
            result.literals.push(Literal::SEPARATOR);
        }

        result
    }

    /// Interprets a conjunction of unit clauses as a cube.
    ///
    /// Precondition: every clause of the formula is a unit.
    pub fn as_cube(&self) -> Cube {
        let mut literals = Vec::with_capacity(self.literals.len() / 2);

        for clause in self.clauses() {
            debug_assert_eq!(clause.len(), 1, "as_cube requires unit clauses");
            literals.extend_from_slice(clause);
        }

        Cube::new(literals)
    }
}

/// Iterator over the clauses of a [`CnfFormula`].
pub struct Clauses<'a> {
    rest: &'a [Literal],
}

impl<'a> Iterator for Clauses<'a> {
    type Item = &'a [Literal];

    fn next(&mut self) -> Option<&'a [Literal]> {
        if self.rest.is_empty() {
            return None;
        }

        let end = self
            .rest
            .iter()
            .position(|l| l.is_separator())
            .unwrap_or(self.rest.len());
        let clause = &self.rest[..end];
        self.rest = &self.rest[(end + 1).min(self.rest.len())..];

        Some(clause)
    }
}

impl fmt::Display for CnfFormula {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first_clause = true;
        for clause in self.clauses() {
            if !first_clause {
                write!(f, " ")?;
            }
            first_clause = false;

            write!(f, "(")?;
            for (i, lit) in clause.iter().enumerate() {
                if i > 0 {
                    write!(f, " ")?;
                }
                write!(f, "{lit}")?;
            }
            write!(f, ")")?;
        }
        Ok(())
    }
}
