//! The symbolic transition system extracted from a sequential circuit.

use crate::cnf::CnfFormula;
use crate::literal::Literal;
use crate::variable::{Variable, VariableRange};

/// The role a variable plays in the transition system.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VarKind {
    Input,
    State,
    NextState,
    Auxiliary,
}

/// A symbolic transition system over four disjoint variable ranges.
///
/// `init` and `error` range over the state variables (plus inputs and
/// auxiliary Tseitin variables for `error`); `trans` additionally
/// ranges over the next-state variables. The value is immutable after
/// construction.
#[derive(Debug, Clone)]
pub struct TransitionSystem {
    input_vars: VariableRange,
    state_vars: VariableRange,
    next_state_vars: VariableRange,
    aux_vars: VariableRange,

    // One entry per latch of the original circuit, in file order. This
    // can be wider than `state_vars`: latches outside the error cone of
    // influence are pruned from the formulas but their reset values are
    // still needed to print the initial state of a counterexample.
    initial_cube: Vec<bool>,

    init: CnfFormula,
    trans: CnfFormula,
    error: CnfFormula,
}

impl TransitionSystem {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        input_vars: VariableRange,
        state_vars: VariableRange,
        next_state_vars: VariableRange,
        aux_vars: VariableRange,
        initial_cube: Vec<bool>,
        init: CnfFormula,
        trans: CnfFormula,
        error: CnfFormula,
    ) -> Self {
        debug_assert_eq!(state_vars.size(), next_state_vars.size());

        TransitionSystem {
            input_vars,
            state_vars,
            next_state_vars,
            aux_vars,
            initial_cube,
            init,
            trans,
            error,
        }
    }

    pub fn input_vars(&self) -> VariableRange {
        self.input_vars
    }

    pub fn state_vars(&self) -> VariableRange {
        self.state_vars
    }

    pub fn next_state_vars(&self) -> VariableRange {
        self.next_state_vars
    }

    pub fn aux_vars(&self) -> VariableRange {
        self.aux_vars
    }

    pub fn initial_cube(&self) -> &[bool] {
        &self.initial_cube
    }

    pub fn init(&self) -> &CnfFormula {
        &self.init
    }

    pub fn trans(&self) -> &CnfFormula {
        &self.trans
    }

    pub fn error(&self) -> &CnfFormula {
        &self.error
    }

    /// The kind of `var` and its position within its range.
    pub fn var_info(&self, var: Variable) -> (VarKind, usize) {
        if self.input_vars.contains(var) {
            (VarKind::Input, self.input_vars.offset(var))
        } else if self.state_vars.contains(var) {
            (VarKind::State, self.state_vars.offset(var))
        } else if self.next_state_vars.contains(var) {
            (VarKind::NextState, self.next_state_vars.offset(var))
        } else if self.aux_vars.contains(var) {
            (VarKind::Auxiliary, self.aux_vars.offset(var))
        } else {
            debug_assert!(false, "variable {} outside the transition system", var.id());
            unreachable!()
        }
    }

    /// Shifts a state literal to the next-state literal at the same
    /// offset.
    pub fn prime(&self, lit: Literal) -> Literal {
        let (kind, pos) = self.var_info(lit.var());
        debug_assert_eq!(kind, VarKind::State);

        lit.substitute(self.next_state_vars.nth(pos))
    }

    /// Inverse of [`TransitionSystem::prime`].
    pub fn unprime(&self, lit: Literal) -> Literal {
        let (kind, pos) = self.var_info(lit.var());
        debug_assert_eq!(kind, VarKind::NextState);

        lit.substitute(self.state_vars.nth(pos))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::variable::VariableStore;

    fn make_system(input_vars: usize, state_vars: usize, aux_vars: usize) -> TransitionSystem {
        let mut store = VariableStore::new();

        TransitionSystem::new(
            store.make_range(input_vars),
            store.make_range(state_vars),
            store.make_range(state_vars),
            store.make_range(aux_vars),
            vec![false; state_vars],
            CnfFormula::new(),
            CnfFormula::new(),
            CnfFormula::new(),
        )
    }

    #[test]
    fn var_info_with_only_state_variables() {
        let system = make_system(0, 2, 0);

        assert_eq!(
            system.var_info(system.state_vars().nth(0)),
            (VarKind::State, 0)
        );
        assert_eq!(
            system.var_info(system.state_vars().nth(1)),
            (VarKind::State, 1)
        );
        assert_eq!(
            system.var_info(system.next_state_vars().nth(0)),
            (VarKind::NextState, 0)
        );
        assert_eq!(
            system.var_info(system.next_state_vars().nth(1)),
            (VarKind::NextState, 1)
        );
    }

    #[test]
    fn var_info_with_all_kinds_of_variables() {
        let system = make_system(3, 2, 5);

        assert_eq!(
            system.var_info(system.input_vars().nth(0)),
            (VarKind::Input, 0)
        );
        assert_eq!(
            system.var_info(system.state_vars().nth(1)),
            (VarKind::State, 1)
        );
        assert_eq!(
            system.var_info(system.next_state_vars().nth(0)),
            (VarKind::NextState, 0)
        );
        assert_eq!(
            system.var_info(system.aux_vars().nth(0)),
            (VarKind::Auxiliary, 0)
        );
        assert_eq!(
            system.var_info(system.aux_vars().nth(3)),
            (VarKind::Auxiliary, 3)
        );
    }

    #[test]
    fn priming_shifts_state_to_next_state() {
        let system = make_system(3, 3, 5);

        for i in 0..3 {
            let s = Literal::positive(system.state_vars().nth(i));
            let n = Literal::positive(system.next_state_vars().nth(i));

            assert_eq!(system.prime(s), n);
            assert_eq!(system.prime(!s), !n);
            assert_eq!(system.unprime(n), s);
            assert_eq!(system.unprime(!n), !s);
            assert_eq!(system.unprime(system.prime(s)), s);
        }
    }
}
