//! Cubes: sorted conjunctions of literals.

use std::fmt;

use crate::cnf::CnfFormula;
use crate::literal::Literal;
use crate::variable::Variable;

/// A conjunction of literals, kept sorted under the cube order
/// (by variable id, negative before positive on a tie).
///
/// A cube is equivalently a partial assignment of its variables. Both
/// polarities of a variable may appear only transiently, while a cube
/// is being grown during generalization.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Cube {
    literals: Vec<Literal>,
}

impl Cube {
    /// Builds a cube from an arbitrary literal collection, sorting and
    /// deduplicating it.
    pub fn new(mut literals: Vec<Literal>) -> Self {
        debug_assert!(literals.iter().all(|l| !l.is_separator()));

        literals.sort_unstable();
        literals.dedup();
        Cube { literals }
    }

    pub fn literals(&self) -> &[Literal] {
        &self.literals
    }

    pub fn len(&self) -> usize {
        self.literals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.literals.is_empty()
    }

    pub fn contains(&self, lit: Literal) -> bool {
        self.literals.binary_search(&lit).is_ok()
    }

    /// The literal of `var` in this cube, if the cube constrains it.
    ///
    /// If both polarities are transiently present, the negative one is
    /// returned.
    pub fn find(&self, var: Variable) -> Option<Literal> {
        let probe = Literal::negative(var);
        match self.literals.binary_search(&probe) {
            Ok(i) => Some(self.literals[i]),
            Err(i) => match self.literals.get(i) {
                Some(&lit) if lit.var() == var => Some(lit),
                _ => None,
            },
        }
    }

    /// Inserts a literal, keeping the cube sorted.
    pub fn insert(&mut self, lit: Literal) {
        debug_assert!(!lit.is_separator());

        if let Err(i) = self.literals.binary_search(&lit) {
            self.literals.insert(i, lit);
        }
    }

    /// Literal-multiset inclusion: every literal of `self` appears in
    /// `other`. Entailment runs the other way: `other => self`.
    pub fn subsumes(&self, other: &Cube) -> bool {
        if self.literals.len() > other.literals.len() {
            return false;
        }

        let mut i = 0;
        for &lit in &other.literals {
            if i == self.literals.len() {
                break;
            }
            if self.literals[i] == lit {
                i += 1;
            } else if self.literals[i] < lit {
                return false;
            }
        }

        i == self.literals.len()
    }

    /// Whether some assignment satisfies both cubes, i.e. no variable
    /// occurs in the two cubes with opposite polarities.
    pub fn intersects(&self, other: &Cube) -> bool {
        self.literals.iter().all(|&lit| !other.contains(!lit))
    }

    /// The clause `!self`: one disjunction with every literal flipped.
    pub fn negate(&self) -> CnfFormula {
        let mut formula = CnfFormula::with_capacity(self.literals.len() + 1);
        formula.add_clause_lits(self.literals.iter().map(|&l| !l));
        formula
    }
}

impl fmt::Display for Cube {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, lit) in self.literals.iter().enumerate() {
            if i > 0 {
                write!(f, " ")?;
            }
            write!(f, "{lit}")?;
        }
        write!(f, "}}")
    }
}
