//! Lowering of an And-Inverter Graph to a symbolic transition system.
//!
//! The lowering runs in three stages. Preprocessing computes the set
//! of literals that are constant throughout any computation and the
//! set of latches inside the cone of influence of the error literal.
//! `make_context` then allocates the four variable ranges, skipping
//! pruned latches and gates. Finally `build_from_context` clausifies
//! the `Init`, `Trans` and `Error` formulas via Tseitin encoding.

use std::collections::{HashMap, HashSet};

use indexmap::IndexSet;
use miette::Diagnostic;
use thiserror::Error;
use tracing::debug;

use harrier_logic::{
    CnfFormula, Literal, TransitionSystem, VariableRange, VariableStore,
};

use crate::aig::{aiger_not, aiger_sign, aiger_var, Aig, AigerLit, Reset, AIGER_TRUE};

#[derive(Debug, Clone, Error, Diagnostic)]
pub enum BuildError {
    #[error("the AIG declares neither outputs nor bad-state properties")]
    #[diagnostic(
        code(harrier::build::no_property),
        help("the checker needs exactly one output or bad-state literal to verify")
    )]
    NoProperty,

    #[error("{feature} are not supported")]
    #[diagnostic(code(harrier::build::unsupported))]
    Unsupported { feature: &'static str },
}

/// Preprocessing results: constant literals and the error cone of
/// influence.
#[derive(Debug)]
pub struct AigerInfo<'a> {
    pub aig: &'a Aig,

    /// Literals that are necessarily true; for any member, its
    /// negation is necessarily false. Seeded with the constant true
    /// and propagated through the gate list once, in file order.
    pub true_literals: HashSet<AigerLit>,

    /// Uncomplemented literals of the latches that can influence the
    /// error literal, directly or through later cycles. Latches
    /// outside this set are dropped from the transition system.
    pub error_coi: IndexSet<AigerLit>,
}

/// Variable allocation for one lowering run.
#[derive(Debug)]
pub struct Context<'a> {
    pub info: AigerInfo<'a>,

    pub input_vars: VariableRange,
    pub state_vars: VariableRange,
    pub next_state_vars: VariableRange,
    pub and_vars: VariableRange,

    input_index: HashMap<u32, usize>,
    state_index: HashMap<u32, usize>,
    and_index: HashMap<u32, usize>,

    /// Indices into `aig.latches` of the kept latches, in file order.
    coi_latches: Vec<usize>,
}

/// Builds the transition system of an AIG in one call.
pub fn build_from_aiger(
    store: &mut VariableStore,
    aig: &Aig,
) -> Result<TransitionSystem, BuildError> {
    let info = make_aiger_info(aig)?;
    let ctx = make_context(store, info);
    Ok(build_from_context(&ctx))
}

/// Preprocesses the AIG: checks the property shape, propagates
/// constants and computes the error cone of influence.
pub fn make_aiger_info(aig: &Aig) -> Result<AigerInfo<'_>, BuildError> {
    if !aig.constraints.is_empty() {
        return Err(BuildError::Unsupported {
            feature: "invariant constraints",
        });
    }
    if !aig.justice.is_empty() {
        return Err(BuildError::Unsupported {
            feature: "justice properties",
        });
    }
    if !aig.fairness.is_empty() {
        return Err(BuildError::Unsupported {
            feature: "fairness constraints",
        });
    }
    if aig.outputs.is_empty() && aig.bad.is_empty() {
        return Err(BuildError::NoProperty);
    }
    if aig.outputs.len() > 1 || aig.bad.len() > 1 {
        return Err(BuildError::Unsupported {
            feature: "multiple error outputs",
        });
    }

    let mut info = AigerInfo {
        aig,
        true_literals: HashSet::new(),
        error_coi: IndexSet::new(),
    };

    propagate_trues(&mut info);
    compute_error_coi(&mut info);

    debug!(
        latches = aig.num_latches(),
        coi = info.error_coi.len(),
        constants = info.true_literals.len() - 1,
        "preprocessed aig"
    );

    Ok(info)
}

/// The literal whose assertion marks an error state.
pub fn get_error_literal(info: &AigerInfo<'_>) -> AigerLit {
    if info.aig.outputs.is_empty() {
        info.aig.bad[0]
    } else {
        info.aig.outputs[0]
    }
}

fn is_true(info: &AigerInfo<'_>, lit: AigerLit) -> bool {
    info.true_literals.contains(&lit)
}

fn is_false(info: &AigerInfo<'_>, lit: AigerLit) -> bool {
    info.true_literals.contains(&aiger_not(lit))
}

fn is_decided(info: &AigerInfo<'_>, lit: AigerLit) -> bool {
    is_true(info, lit) || is_false(info, lit)
}

/// One forward pass over the gate list suffices, because gates are
/// defined after their operands.
fn propagate_trues(info: &mut AigerInfo<'_>) {
    info.true_literals.insert(AIGER_TRUE);

    for and in &info.aig.ands {
        if is_true(info, and.rhs0) && is_true(info, and.rhs1) {
            info.true_literals.insert(and.lhs);
        } else if is_false(info, and.rhs0) || is_false(info, and.rhs1) {
            info.true_literals.insert(aiger_not(and.lhs));
        }
    }
}

/// Fixpoint walk from the error literal: the combinational support of
/// the error formula seeds the cone, and every latch in the cone pulls
/// in the support of its next-state function.
fn compute_error_coi(info: &mut AigerInfo<'_>) {
    let aig = info.aig;
    let latch_by_var: HashMap<u32, usize> = aig
        .latches
        .iter()
        .enumerate()
        .map(|(i, latch)| (aiger_var(latch.lit), i))
        .collect();
    let and_by_var: HashMap<u32, usize> = aig
        .ands
        .iter()
        .enumerate()
        .map(|(i, and)| (aiger_var(and.lhs), i))
        .collect();

    let mut queue = vec![get_error_literal(info)];
    let mut visited_gates = HashSet::new();

    while let Some(lit) = queue.pop() {
        if is_decided(info, lit) {
            continue;
        }

        let var = aiger_var(lit);
        if let Some(&i) = latch_by_var.get(&var) {
            let latch = aig.latches[i];
            if info.error_coi.insert(latch.lit) {
                queue.push(latch.next);
            }
        } else if let Some(&i) = and_by_var.get(&var) {
            if visited_gates.insert(var) {
                queue.push(aig.ands[i].rhs0);
                queue.push(aig.ands[i].rhs1);
            }
        }
    }
}

/// Allocates variable ranges for the pruned circuit.
pub fn make_context<'a>(store: &mut VariableStore, info: AigerInfo<'a>) -> Context<'a> {
    let aig = info.aig;

    let coi_latches: Vec<usize> = aig
        .latches
        .iter()
        .enumerate()
        .filter(|(_, latch)| info.error_coi.contains(&latch.lit))
        .map(|(i, _)| i)
        .collect();

    // Gates get an auxiliary variable only when some emitted cone can
    // reach them and constant propagation has not decided them.
    let mut roots = vec![get_error_literal(&info)];
    roots.extend(coi_latches.iter().map(|&i| aig.latches[i].next));
    let needed_gates = reachable_gates(&info, &roots);

    let input_vars = store.make_range(aig.num_inputs());
    let state_vars = store.make_range(coi_latches.len());
    let next_state_vars = store.make_range(coi_latches.len());
    let and_vars = store.make_range(needed_gates.len());

    let input_index = aig
        .inputs
        .iter()
        .enumerate()
        .map(|(i, &lit)| (aiger_var(lit), i))
        .collect();
    let state_index = coi_latches
        .iter()
        .enumerate()
        .map(|(pos, &i)| (aiger_var(aig.latches[i].lit), pos))
        .collect();
    let and_index = aig
        .ands
        .iter()
        .filter(|and| needed_gates.contains(&aiger_var(and.lhs)))
        .enumerate()
        .map(|(pos, and)| (aiger_var(and.lhs), pos))
        .collect();

    Context {
        info,
        input_vars,
        state_vars,
        next_state_vars,
        and_vars,
        input_index,
        state_index,
        and_index,
        coi_latches,
    }
}

/// The undecided gates reachable from `roots`, as a set of variable
/// indices.
fn reachable_gates(info: &AigerInfo<'_>, roots: &[AigerLit]) -> HashSet<u32> {
    let and_by_var: HashMap<u32, usize> = info
        .aig
        .ands
        .iter()
        .enumerate()
        .map(|(i, and)| (aiger_var(and.lhs), i))
        .collect();

    let mut reached = HashSet::new();
    let mut queue: Vec<AigerLit> = roots.to_vec();

    while let Some(lit) = queue.pop() {
        if is_decided(info, lit) {
            continue;
        }
        let var = aiger_var(lit);
        if let Some(&i) = and_by_var.get(&var) {
            if reached.insert(var) {
                queue.push(info.aig.ands[i].rhs0);
                queue.push(info.aig.ands[i].rhs1);
            }
        }
    }

    reached
}

/// A mapped AIGER literal: decided constant or a solver literal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MappedLit {
    True,
    False,
    Lit(Literal),
}

impl MappedLit {
    fn negate(self) -> MappedLit {
        match self {
            MappedLit::True => MappedLit::False,
            MappedLit::False => MappedLit::True,
            MappedLit::Lit(lit) => MappedLit::Lit(!lit),
        }
    }
}

fn map_lit(ctx: &Context<'_>, lit: AigerLit) -> MappedLit {
    if is_true(&ctx.info, lit) {
        return MappedLit::True;
    }
    if is_false(&ctx.info, lit) {
        return MappedLit::False;
    }

    let var = aiger_var(lit);
    let mapped = if let Some(&i) = ctx.input_index.get(&var) {
        Literal::positive(ctx.input_vars.nth(i))
    } else if let Some(&i) = ctx.state_index.get(&var) {
        Literal::positive(ctx.state_vars.nth(i))
    } else if let Some(&i) = ctx.and_index.get(&var) {
        Literal::positive(ctx.and_vars.nth(i))
    } else {
        panic!("aiger literal {lit} was pruned from the transition system")
    };

    if aiger_sign(lit) {
        MappedLit::Lit(!mapped)
    } else {
        MappedLit::Lit(mapped)
    }
}

/// Maps an undecided AIGER literal to its solver literal.
pub fn from_aiger_lit(ctx: &Context<'_>, lit: AigerLit) -> Literal {
    match map_lit(ctx, lit) {
        MappedLit::Lit(mapped) => mapped,
        _ => panic!("aiger literal {lit} is constant"),
    }
}

/// Emits the Tseitin definitions for all not-yet-emitted gates in the
/// cone of `root`, in file order.
fn emit_cone(ctx: &Context<'_>, root: AigerLit, emitted: &mut HashSet<u32>, out: &mut CnfFormula) {
    let cone = reachable_gates(&ctx.info, &[root]);

    for and in &ctx.info.aig.ands {
        let var = aiger_var(and.lhs);
        if !cone.contains(&var) || !emitted.insert(var) {
            continue;
        }

        let gate = from_aiger_lit(ctx, and.lhs);
        let operands = [map_lit(ctx, and.rhs0), map_lit(ctx, and.rhs1)];

        // gate -> operand for each operand; true operands drop out,
        // and a false operand cannot occur on an undecided gate.
        let mut converse = vec![];
        for operand in operands {
            match operand {
                MappedLit::True => {}
                MappedLit::False => unreachable!("undecided gate with a false operand"),
                MappedLit::Lit(lit) => {
                    out.add_clause(&[!gate, lit]);
                    converse.push(!lit);
                }
            }
        }

        // operands -> gate.
        converse.push(gate);
        out.add_clause(&converse);
    }
}

/// Emits a clause from mapped literals, folding constants: a true
/// member satisfies the clause, a false member drops out.
fn add_mapped_clause(out: &mut CnfFormula, mapped: &[MappedLit]) {
    let mut clause = Vec::with_capacity(mapped.len());
    for &m in mapped {
        match m {
            MappedLit::True => return,
            MappedLit::False => {}
            MappedLit::Lit(lit) => clause.push(lit),
        }
    }
    out.add_clause(&clause);
}

/// Clausifies the three formulas of the transition system.
pub fn build_from_context(ctx: &Context<'_>) -> TransitionSystem {
    let aig = ctx.info.aig;

    let mut init = CnfFormula::new();
    for &i in &ctx.coi_latches {
        let latch = aig.latches[i];
        let state = from_aiger_lit(ctx, latch.lit);
        match latch.reset {
            Reset::Zero => init.add_clause(&[!state]),
            Reset::One => init.add_clause(&[state]),
            Reset::Nondet => {}
        }
    }

    let mut trans = CnfFormula::new();
    let mut emitted = HashSet::new();
    for &i in &ctx.coi_latches {
        let latch = aig.latches[i];
        emit_cone(ctx, latch.next, &mut emitted, &mut trans);

        let pos = ctx.state_index[&aiger_var(latch.lit)];
        let next_state = Literal::positive(ctx.next_state_vars.nth(pos));
        let next_fn = map_lit(ctx, latch.next);

        add_mapped_clause(&mut trans, &[MappedLit::Lit(!next_state), next_fn]);
        add_mapped_clause(&mut trans, &[MappedLit::Lit(next_state), next_fn.negate()]);
    }

    let mut error = CnfFormula::new();
    let error_lit = get_error_literal(&ctx.info);
    let mut emitted = HashSet::new();
    emit_cone(ctx, error_lit, &mut emitted, &mut error);
    match map_lit(ctx, error_lit) {
        // A constant-true error makes every state bad: the formula is
        // the empty conjunction. A constant-false error is
        // unfalsifiable: a single empty clause.
        MappedLit::True => {}
        MappedLit::False => error.add_clause(&[]),
        MappedLit::Lit(lit) => error.add_clause(&[lit]),
    }

    let initial_cube = aig
        .latches
        .iter()
        .map(|latch| latch.reset == Reset::One)
        .collect();

    debug!(
        init_clauses = init.clause_count(),
        trans_clauses = trans.clause_count(),
        error_clauses = error.clause_count(),
        "clausified transition system"
    );

    TransitionSystem::new(
        ctx.input_vars,
        ctx.state_vars,
        ctx.next_state_vars,
        ctx.and_vars,
        initial_cube,
        init,
        trans,
        error,
    )
}
