//! Syntactic pre-simplification of the transition system.
//!
//! Each formula is simplified in isolation under a frozen variable
//! set: the variables other formulas or the verifier can observe.
//! Unit propagation runs to a fixpoint; frozen units are kept as unit
//! clauses while auxiliary units are substituted away, which preserves
//! equivalence over the frozen variables (the auxiliary variables are
//! existentially quantified Tseitin names). Satisfied clauses, false
//! literals, duplicate literals, tautologies and duplicate clauses are
//! removed.

use std::collections::{HashMap, HashSet};

use tracing::debug;

use harrier_logic::{CnfFormula, Literal, TransitionSystem, Variable, VariableRange};

/// Simplifies the three formulas of `system`, keeping the variable
/// ranges and the initial cube untouched.
pub fn simplify(system: &TransitionSystem) -> TransitionSystem {
    let init = simplify_formula(system.init(), &[system.state_vars()]);
    let trans = simplify_formula(
        system.trans(),
        &[
            system.state_vars(),
            system.next_state_vars(),
            system.input_vars(),
        ],
    );
    let error = simplify_formula(
        system.error(),
        &[system.state_vars(), system.input_vars()],
    );

    debug!(
        init = init.clause_count(),
        trans = trans.clause_count(),
        error = error.clause_count(),
        "simplified transition system"
    );

    TransitionSystem::new(
        system.input_vars(),
        system.state_vars(),
        system.next_state_vars(),
        system.aux_vars(),
        system.initial_cube().to_vec(),
        init,
        trans,
        error,
    )
}

fn simplify_formula(formula: &CnfFormula, frozen: &[VariableRange]) -> CnfFormula {
    let is_frozen = |var: Variable| frozen.iter().any(|range| range.contains(var));

    // Fixpoint unit propagation over the clause list.
    let mut assignment: HashMap<Variable, bool> = HashMap::new();
    loop {
        let mut changed = false;

        for clause in formula.clauses() {
            match reduce_clause(clause, &assignment) {
                ReducedClause::Satisfied | ReducedClause::Tautology => {}
                ReducedClause::Conflict => return falsum(),
                ReducedClause::Open(literals) => {
                    if let [unit] = literals[..] {
                        match assignment.get(&unit.var()) {
                            Some(&value) if value != unit.is_positive() => return falsum(),
                            Some(_) => {}
                            None => {
                                assignment.insert(unit.var(), unit.is_positive());
                                changed = true;
                            }
                        }
                    }
                }
            }
        }

        if !changed {
            break;
        }
    }

    // Rebuild: frozen units first, then the surviving clauses.
    let mut result = CnfFormula::new();

    let mut frozen_units: Vec<Literal> = assignment
        .iter()
        .filter(|(&var, _)| is_frozen(var))
        .map(|(&var, &value)| Literal::with_polarity(var, value))
        .collect();
    frozen_units.sort_unstable();
    for unit in frozen_units {
        result.add_clause(&[unit]);
    }

    let mut seen: HashSet<Vec<Literal>> = HashSet::new();
    for clause in formula.clauses() {
        let literals = match reduce_clause(clause, &assignment) {
            ReducedClause::Satisfied | ReducedClause::Tautology => continue,
            ReducedClause::Conflict => return falsum(),
            ReducedClause::Open(literals) => literals,
        };

        // Units were already emitted (frozen) or substituted away.
        if literals.len() <= 1 {
            continue;
        }

        let mut key = literals.clone();
        key.sort_unstable();
        if seen.insert(key) {
            result.add_clause(&literals);
        }
    }

    result
}

enum ReducedClause {
    Satisfied,
    Tautology,
    Conflict,
    Open(Vec<Literal>),
}

/// Evaluates a clause under a partial assignment, dropping false and
/// duplicate literals.
fn reduce_clause(clause: &[Literal], assignment: &HashMap<Variable, bool>) -> ReducedClause {
    let mut literals: Vec<Literal> = Vec::with_capacity(clause.len());

    for &lit in clause {
        match assignment.get(&lit.var()) {
            Some(&value) if value == lit.is_positive() => return ReducedClause::Satisfied,
            Some(_) => continue,
            None => {}
        }
        if literals.contains(&!lit) {
            return ReducedClause::Tautology;
        }
        if !literals.contains(&lit) {
            literals.push(lit);
        }
    }

    if literals.is_empty() {
        ReducedClause::Conflict
    } else {
        ReducedClause::Open(literals)
    }
}

fn falsum() -> CnfFormula {
    let mut formula = CnfFormula::new();
    formula.add_clause(&[]);
    formula
}
