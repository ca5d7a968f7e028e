//! The backward-reachability verifier.
//!
//! The verifier maintains a growing sequence of frames. Frame `k`
//! stands for the overapproximating transition relation `TF[k]`:
//! `TF[0]` admits zero or one concrete steps, and `TF[k]` chains two
//! copies of `TF[k-1]` through a midpoint state, constrained by the
//! arrows blocked at level `k`. A path of up to `2^k` concrete steps
//! is therefore contained in `TF[k]`.
//!
//! Error states reachable under the current frame constraints spawn
//! proof obligations, resolved by recursion: an arrow `s -> t` is real
//! if `s == t`, if one concrete transition connects the cubes, or if
//! some midpoint `u` splits it into two real arrows one level below.
//! Refuted arrows are generalized via unsat cores and blocked in every
//! solver, and blocked arrows that stay refuted one level higher are
//! propagated forward when the frame sequence grows. Safety is proved
//! the moment an intermediate frame holds no blocked arrows.
//!
//! Both persistent solver instances gate every retractable formula
//! behind an activation literal, so a query enables exactly the frame
//! suffix it needs through unit assumptions and nothing is ever
//! retracted.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, info, trace};

use harrier_logic::{
    Cube, CnfFormula, Literal, TransitionSystem, VarKind, VariableRange, VariableStore,
};

use crate::pool::{CexHandle, CexPool, ProofObligation};
use crate::result::Counterexample;
use crate::solver::{Solver, SolverError};

/// A pair of state cubes `(s, t)` proven to admit no `s -> t` path
/// within the transition frame it is stored at.
#[derive(Debug, Clone)]
struct BlockedArrow {
    s: Cube,
    t: Cube,
}

/// The verification engine. One instance checks one transition system.
pub struct Verifier<'a> {
    store: &'a mut VariableStore,
    system: &'a TransitionSystem,

    /// Solves `Init(X) /\ BLOCK /\ Error(X')`.
    error_solver: Solver,
    /// Solves transition queries: one concrete step, or two chained
    /// copies through the midpoint state.
    cons_solver: Solver,

    /// X°, the midpoint state of a doubled step.
    middle_vars: VariableRange,
    /// Y2, the inputs of the right transition copy.
    right_input_vars: VariableRange,
    /// A2, the Tseitin variables of the right transition copy.
    right_aux_vars: VariableRange,

    /// T(X, Y, X°).
    left_trans: CnfFormula,
    /// T(X°, Y2, X', A2).
    right_trans: CnfFormula,

    /// Blocked arrows per frame, free of subsumed pairs.
    blocked: Vec<Vec<BlockedArrow>>,
    /// One activation literal per frame, allocated on frame push and
    /// never retracted.
    activators: Vec<Literal>,
    /// Gates the plain one-step transition relation.
    trans_activator: Literal,

    cexes: CexPool,
    rng: StdRng,
}

impl<'a> Verifier<'a> {
    pub fn new(store: &'a mut VariableStore, system: &'a TransitionSystem, seed: u32) -> Self {
        debug_assert_eq!(
            system.state_vars().size(),
            system.next_state_vars().size()
        );

        let middle_vars = store.make_range(system.state_vars().size());
        let right_input_vars = store.make_range(system.input_vars().size());
        let right_aux_vars = store.make_range(system.aux_vars().size());

        // T(X, Y, X') -> T(X, Y, X°): only the next state moves.
        let left_trans = system.trans().map(|lit| {
            let (kind, pos) = system.var_info(lit.var());
            match kind {
                VarKind::NextState => lit.substitute(middle_vars.nth(pos)),
                _ => lit,
            }
        });

        // T(X, Y, X') -> T(X°, Y2, X', A2): the source state becomes
        // the midpoint and the copy gets private inputs and Tseitin
        // variables so the two copies cannot interfere.
        let right_trans = system.trans().map(|lit| {
            let (kind, pos) = system.var_info(lit.var());
            match kind {
                VarKind::State => lit.substitute(middle_vars.nth(pos)),
                VarKind::Input => lit.substitute(right_input_vars.nth(pos)),
                VarKind::Auxiliary => lit.substitute(right_aux_vars.nth(pos)),
                VarKind::NextState => lit,
            }
        });

        let trans_activator = Literal::positive(store.make_var());

        Verifier {
            store,
            system,
            error_solver: Solver::new(),
            cons_solver: Solver::new(),
            middle_vars,
            right_input_vars,
            right_aux_vars,
            left_trans,
            right_trans,
            blocked: Vec::new(),
            activators: Vec::new(),
            trans_activator,
            cexes: CexPool::new(),
            rng: StdRng::seed_from_u64(u64::from(seed)),
        }
    }

    /// Runs the verification to completion. `None` means the circuit
    /// is safe; otherwise the returned trace drives it into an error
    /// state.
    pub fn run(mut self) -> Result<Option<Counterexample>, SolverError> {
        self.initialize();
        self.check()
    }

    fn initialize(&mut self) {
        self.push_frame(); // frame 0

        self.error_solver.assert_formula(self.system.init());
        let primed_error = self.system.error().map(|lit| {
            let (kind, _) = self.system.var_info(lit.var());
            match kind {
                VarKind::State => self.system.prime(lit),
                _ => lit,
            }
        });
        self.error_solver.assert_formula(&primed_error);

        let trans = self.system.trans().activate(self.trans_activator);
        self.cons_solver.assert_formula(&trans);

        // Both doubled-step copies hang off the frame 0 activator,
        // which every doubled query asserts.
        let left = self.left_trans.activate(self.activators[0]);
        self.cons_solver.assert_formula(&left);
        let right = self.right_trans.activate(self.activators[0]);
        self.cons_solver.assert_formula(&right);

        debug!(
            state_vars = self.system.state_vars().size(),
            input_vars = self.system.input_vars().size(),
            aux_vars = self.system.aux_vars().size(),
            "verifier initialized"
        );
    }

    fn check(&mut self) -> Result<Option<Counterexample>, SolverError> {
        if let Some(cex) = self.check_trivial_cases()? {
            info!(len = cex.len(), "counterexample found in a trivial case");
            return Ok(Some(cex));
        }

        self.push_frame(); // frame 1

        loop {
            if let Some((root, error_inputs)) = self.get_error_cex()? {
                let po = ProofObligation::new(self.depth(), root);
                if self.solve_obligation(po)? {
                    let cex = self.build_counterexample(root, &error_inputs);
                    info!(len = cex.len(), "counterexample found");
                    return Ok(Some(cex));
                }
            } else {
                self.push_frame();
                info!(depth = self.depth(), "no error at this depth, extending");
                if self.propagate()? {
                    return Ok(None);
                }
            }

            self.cexes.clear();
        }
    }

    /// Counterexamples of length 0 and 1 need no frames; two throwaway
    /// solver instances decide them up front.
    fn check_trivial_cases(&mut self) -> Result<Option<Counterexample>, SolverError> {
        // Init(X) /\ Error(X, Y): the initial state is already bad.
        let mut solver = Solver::new();
        solver.assert_formula(self.system.init());
        solver.assert_formula(self.system.error());
        if solver.query().is_sat()? {
            let row = solver.model(self.system.input_vars());
            return Ok(Some(Counterexample::new(vec![row])));
        }

        // Init(X) /\ T(X, Y, X') /\ Error(X', Y2): bad after one step.
        // The error formula gets private inputs and Tseitin variables,
        // exactly like the right transition copy.
        let mut solver = Solver::new();
        solver.assert_formula(self.system.init());
        solver.assert_formula(self.system.trans());
        let shifted_error = self.system.error().map(|lit| {
            let (kind, pos) = self.system.var_info(lit.var());
            match kind {
                VarKind::State => self.system.prime(lit),
                VarKind::Input => lit.substitute(self.right_input_vars.nth(pos)),
                VarKind::Auxiliary => lit.substitute(self.right_aux_vars.nth(pos)),
                VarKind::NextState => lit,
            }
        });
        solver.assert_formula(&shifted_error);
        if solver.query().is_sat()? {
            let first = solver.model(self.system.input_vars());
            let second = shift_literals(
                self.right_input_vars,
                self.system.input_vars(),
                &solver.model(self.right_input_vars),
            );
            return Ok(Some(Counterexample::new(vec![first, second])));
        }

        Ok(None)
    }

    fn depth(&self) -> usize {
        debug_assert!(!self.blocked.is_empty());
        self.blocked.len() - 1
    }

    fn push_frame(&mut self) {
        debug_assert_eq!(self.blocked.len(), self.activators.len());

        self.blocked.push(Vec::new());
        self.activators
            .push(Literal::positive(self.store.make_var()));
    }

    /// Queries for an error state reachable under the current frames.
    /// A hit allocates the root counterexample node and returns it
    /// with the inputs of the error cycle.
    fn get_error_cex(&mut self) -> Result<Option<(CexHandle, Cube)>, SolverError> {
        // The full active suffix: every frame from level 1 upward.
        let activators = &self.activators[1..];
        let sat = self.error_solver.query().assume_all(activators).is_sat()?;
        if !sat {
            return Ok(None);
        }

        let s = Cube::new(self.error_solver.model(self.system.state_vars()));
        let t = Cube::new(shift_literals(
            self.system.next_state_vars(),
            self.system.state_vars(),
            &self.error_solver.model(self.system.next_state_vars()),
        ));
        let error_inputs = Cube::new(self.error_solver.model(self.system.input_vars()));

        trace!(%s, %t, "error cex candidate");
        let root = self.cexes.make(s, t, None);
        Ok(Some((root, error_inputs)))
    }

    /// Decides whether the arrow of `po` is real under the frame at
    /// `po.level()`. Returns false only after a generalized version of
    /// the arrow has been blocked.
    fn solve_obligation(&mut self, po: ProofObligation) -> Result<bool, SolverError> {
        let level = po.level();
        let handle = po.handle();
        trace!(level, handle, "solving obligation");

        // Identical cubes are trivially connected by zero steps.
        {
            let entry = self.cexes.get(handle);
            if entry.s_state == entry.t_state {
                return Ok(true);
            }
        }

        if self.has_concrete_edge(handle)? {
            return Ok(true);
        }

        // At level 0, `TF[0] = Id \/ T` is fully decided by the two
        // checks above. The caller blocks at its own level.
        if level == 0 {
            return Ok(false);
        }

        if level == 1 {
            if self.has_path_of_length_two(handle)? {
                return Ok(true);
            }
        } else {
            loop {
                let Some((left_po, right_po)) = self.split_in_the_middle(po)? else {
                    break;
                };
                if self.solve_obligation(left_po)? && self.solve_obligation(right_po)? {
                    return Ok(true);
                }
                // A refuted child has blocked a new arrow, so the next
                // query cannot return the same midpoint.
            }
        }

        let (c, d) = self.generalize_blocked_arrow(handle, level)?;
        debug!(level, c = %c, d = %d, "blocking arrow");
        self.block_arrow_at(&c, &d, level, 1);
        Ok(false)
    }

    /// One concrete transition from `s` to `t`. Records the connecting
    /// inputs in the node on success.
    fn has_concrete_edge(&mut self, handle: CexHandle) -> Result<bool, SolverError> {
        let (s, t) = {
            let entry = self.cexes.get(handle);
            (entry.s_state.clone(), entry.t_state.clone())
        };

        let system = self.system;
        let sat = self
            .cons_solver
            .query()
            .assume(self.trans_activator)
            .assume_all(s.literals())
            .assume_mapped(t.literals(), |lit| system.prime(lit))
            .is_sat()?;
        if !sat {
            return Ok(false);
        }

        let inputs = Cube::new(self.cons_solver.model(self.system.input_vars()));
        self.cexes.get_mut(handle).inputs = Some(inputs);
        Ok(true)
    }

    /// Two chained concrete transitions from `s` to `t`, the base case
    /// of the doubled step. On success the node becomes an inner node
    /// whose children are both concrete edges.
    fn has_path_of_length_two(&mut self, handle: CexHandle) -> Result<bool, SolverError> {
        let (s, t) = {
            let entry = self.cexes.get(handle);
            (entry.s_state.clone(), entry.t_state.clone())
        };

        let system = self.system;
        let activators = &self.activators[..];
        let sat = self
            .cons_solver
            .query()
            .assume_all(activators)
            .assume_all(s.literals())
            .assume_mapped(t.literals(), |lit| system.prime(lit))
            .is_sat()?;
        if !sat {
            return Ok(false);
        }

        let u = self.extract_midpoint();
        let first_inputs = Cube::new(self.cons_solver.model(self.system.input_vars()));
        let second_inputs = Cube::new(shift_literals(
            self.right_input_vars,
            self.system.input_vars(),
            &self.cons_solver.model(self.right_input_vars),
        ));

        let left = self.cexes.make(s, u.clone(), Some(first_inputs));
        let right = self.cexes.make(u, t, Some(second_inputs));

        let entry = self.cexes.get_mut(handle);
        entry.left = Some(left);
        entry.right = Some(right);
        entry.inputs = None;
        Ok(true)
    }

    /// Queries the doubled step at `po.level()` and, when satisfiable,
    /// splits the obligation at the discovered midpoint into two
    /// obligations one level below.
    fn split_in_the_middle(
        &mut self,
        po: ProofObligation,
    ) -> Result<Option<(ProofObligation, ProofObligation)>, SolverError> {
        let level = po.level();
        let handle = po.handle();
        debug_assert!(level >= 2);

        let (s, t) = {
            let entry = self.cexes.get(handle);
            (entry.s_state.clone(), entry.t_state.clone())
        };

        let system = self.system;
        let trans_copies = self.activators[0];
        let activators = &self.activators[level - 1..];
        let sat = self
            .cons_solver
            .query()
            .assume(trans_copies)
            .assume_all(activators)
            .assume_all(s.literals())
            .assume_mapped(t.literals(), |lit| system.prime(lit))
            .is_sat()?;
        if !sat {
            return Ok(None);
        }

        let u = self.extract_midpoint();
        trace!(level, u = %u, "split at midpoint");

        let left = self.cexes.make(s, u.clone(), None);
        let right = self.cexes.make(u, t, None);

        let entry = self.cexes.get_mut(handle);
        entry.left = Some(left);
        entry.right = Some(right);
        entry.inputs = None;

        Ok(Some((
            ProofObligation::new(level - 1, left),
            ProofObligation::new(level - 1, right),
        )))
    }

    /// The midpoint state of the last satisfiable doubled-step query,
    /// renamed back to the state variables.
    fn extract_midpoint(&mut self) -> Cube {
        let model = self.cons_solver.model(self.middle_vars);
        Cube::new(shift_literals(
            self.middle_vars,
            self.system.state_vars(),
            &model,
        ))
    }

    /// Weakens a refuted arrow `(s, t)` to a subcube pair `(c, d)`
    /// that is still refuted, so the blocked arrow prunes more states.
    ///
    /// Precondition: the consecution solver just reported UNSAT for
    /// the doubled step of this arrow at `level`, so its failed
    /// assumptions are the cores of `s` and `prime(t)`.
    fn generalize_blocked_arrow(
        &mut self,
        handle: CexHandle,
        level: usize,
    ) -> Result<(Cube, Cube), SolverError> {
        let (s, t) = {
            let entry = self.cexes.get(handle);
            (entry.s_state.clone(), entry.t_state.clone())
        };

        let mut c = Cube::new(self.cons_solver.core_of(s.literals()));

        let primed_t: Vec<Literal> = t.literals().iter().map(|&l| self.system.prime(l)).collect();
        let mut d = Cube::new(
            self.cons_solver
                .core_of(&primed_t)
                .into_iter()
                .map(|l| self.system.unprime(l))
                .collect(),
        );

        // The cores may have lost every conflicting variable pair, in
        // which case some state satisfies both cubes and the arrow
        // would block the identity. Reinstate the first variable on
        // which the original full cubes disagree; it exists because
        // `s != t`.
        if c.intersects(&d) {
            let conflict = s
                .literals()
                .iter()
                .copied()
                .find(|&lit| t.contains(!lit))
                .expect("distinct full assignments disagree somewhere");
            c.insert(conflict);
            d.insert(!conflict);
        }

        // Unsat cores refute the doubled step only; the weakened pair
        // may still admit a concrete one-step edge. Grow the cubes
        // until it does not, flipping a seeded coin whenever both
        // sides could absorb the conflict.
        loop {
            let system = self.system;
            let sat = self
                .cons_solver
                .query()
                .assume(self.trans_activator)
                .assume_all(c.literals())
                .assume_mapped(d.literals(), |lit| system.prime(lit))
                .is_sat()?;
            if !sat {
                break;
            }

            let ss = Cube::new(self.cons_solver.model(self.system.state_vars()));
            let tt = Cube::new(shift_literals(
                self.system.next_state_vars(),
                self.system.state_vars(),
                &self.cons_solver.model(self.system.next_state_vars()),
            ));

            let lc = s.literals().iter().copied().find(|&l| ss.contains(!l));
            let ld = t.literals().iter().copied().find(|&l| tt.contains(!l));

            match (lc, ld) {
                (Some(grow_c), Some(grow_d)) => {
                    if self.rng.gen() {
                        c.insert(grow_c);
                    } else {
                        d.insert(grow_d);
                    }
                }
                (Some(grow_c), None) => c.insert(grow_c),
                (None, Some(grow_d)) => d.insert(grow_d),
                (None, None) => {
                    unreachable!("a concrete edge from s to t contradicts the refuted arrow")
                }
            }
        }

        if cfg!(debug_assertions) {
            debug_assert!(!c.intersects(&d));
            let system = self.system;
            let trans_copies = self.activators[0];
            let activators = &self.activators[level - 1..];
            let still_blocked = !self
                .cons_solver
                .query()
                .assume(trans_copies)
                .assume_all(activators)
                .assume_all(c.literals())
                .assume_mapped(d.literals(), |lit| system.prime(lit))
                .is_sat()?;
            debug_assert!(still_blocked);
        }

        Ok((c, d))
    }

    /// Records a blocked arrow at `level` and asserts its activated
    /// blocking clauses into both solvers.
    fn block_arrow_at(&mut self, s: &Cube, t: &Cube, level: usize, start_from: usize) {
        // Drop every arrow the new one subsumes, in any frame that can
        // still see it.
        for frame in start_from..=self.depth() {
            let arrows = &mut self.blocked[frame];
            let mut i = 0;
            while i < arrows.len() {
                if s.subsumes(&arrows[i].s) && t.subsumes(&arrows[i].t) {
                    arrows.swap_remove(i);
                } else {
                    i += 1;
                }
            }
        }

        self.blocked[level].push(BlockedArrow {
            s: s.clone(),
            t: t.clone(),
        });

        let activator = self.activators[level];

        // Blocking must survive every expansion of the frame: the
        // arrow is excluded as a full step, as the left half of a
        // doubled step and as the right half. Omitting either half
        // form lets spurious midpoints reappear one level up.
        let one_step: Vec<Literal> = s
            .literals()
            .iter()
            .map(|&l| !l)
            .chain(t.literals().iter().map(|&l| !self.system.prime(l)))
            .collect();
        let left_half: Vec<Literal> = s
            .literals()
            .iter()
            .map(|&l| !l)
            .chain(t.literals().iter().map(|&l| !self.circle(l)))
            .collect();
        let right_half: Vec<Literal> = t
            .literals()
            .iter()
            .map(|&l| !self.system.prime(l))
            .chain(s.literals().iter().map(|&l| !self.circle(l)))
            .collect();

        let mut clause = CnfFormula::new();
        clause.add_clause(&one_step);
        let activated = clause.activate(activator);
        self.error_solver.assert_formula(&activated);
        self.cons_solver.assert_formula(&activated);

        let mut halves = CnfFormula::new();
        halves.add_clause(&left_half);
        halves.add_clause(&right_half);
        self.cons_solver.assert_formula(&halves.activate(activator));
    }

    /// Pushes arrows still refuted one level higher into the next
    /// frame. Returns true when some intermediate frame runs empty,
    /// which certifies safety.
    fn propagate(&mut self) -> Result<bool, SolverError> {
        for frame in 1..self.depth() {
            let snapshot: Vec<BlockedArrow> = self.blocked[frame].clone();

            for arrow in snapshot {
                let system = self.system;
                let trans_copies = self.activators[0];
                let activators = &self.activators[frame..];
                let sat = self
                    .cons_solver
                    .query()
                    .assume(trans_copies)
                    .assume_all(activators)
                    .assume_all(arrow.s.literals())
                    .assume_mapped(arrow.t.literals(), |lit| system.prime(lit))
                    .is_sat()?;
                if !sat {
                    // Starting the subsumption sweep at this frame
                    // lets the pushed arrow displace its old copy.
                    self.block_arrow_at(&arrow.s, &arrow.t, frame + 1, frame);
                }
            }

            if self.blocked[frame].is_empty() {
                info!(frame, "frame ran empty, the property is invariant");
                return Ok(true);
            }
        }

        Ok(false)
    }

    /// X -> X°.
    fn circle(&self, lit: Literal) -> Literal {
        let (kind, pos) = self.system.var_info(lit.var());
        debug_assert_eq!(kind, VarKind::State);
        lit.substitute(self.middle_vars.nth(pos))
    }

    /// Collects the witness rows of a resolved counterexample tree:
    /// concrete-edge inputs in chronological order, then the inputs of
    /// the error cycle itself.
    fn build_counterexample(&self, root: CexHandle, error_inputs: &Cube) -> Counterexample {
        let mut rows = Vec::new();
        self.append_rows(root, &mut rows);
        rows.push(self.input_row(error_inputs));
        Counterexample::new(rows)
    }

    fn append_rows(&self, handle: CexHandle, rows: &mut Vec<Vec<Literal>>) {
        let entry = self.cexes.get(handle);
        if let (Some(left), Some(right)) = (entry.left, entry.right) {
            self.append_rows(left, rows);
            self.append_rows(right, rows);
        } else if let Some(inputs) = &entry.inputs {
            rows.push(self.input_row(inputs));
        }
        // A bare node is an identity edge and contributes no cycle.
    }

    /// One witness row: a literal per input variable, negative when
    /// the cube does not constrain it.
    fn input_row(&self, inputs: &Cube) -> Vec<Literal> {
        self.system
            .input_vars()
            .iter()
            .map(|var| inputs.find(var).unwrap_or(Literal::negative(var)))
            .collect()
    }
}

/// Renames the literals of `from`-range variables into `to`-range
/// variables at identical offsets, dropping literals outside `from`.
fn shift_literals(from: VariableRange, to: VariableRange, literals: &[Literal]) -> Vec<Literal> {
    literals
        .iter()
        .filter(|lit| from.contains(lit.var()))
        .map(|&lit| lit.substitute(to.nth(from.offset(lit.var()))))
        .collect()
}
