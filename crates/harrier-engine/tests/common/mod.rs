#![allow(dead_code)]

use harrier_aiger::aig::{aiger_sign, aiger_var, Aig, AigerLit, Reset};
use harrier_aiger::builder::build_from_aiger;
use harrier_aiger::parser::parse_ascii;
use harrier_engine::{Counterexample, Verifier};
use harrier_logic::{TransitionSystem, VariableStore};

pub const SEED: u32 = 0x5555_5555;

pub const COUNTER4: &str = include_str!("../../testdata/counter4.aag");
pub const SHORTP0: &str = include_str!("../../testdata/shortp0.aag");
pub const PDTPMSARBITER: &str = include_str!("../../testdata/pdtpmsarbiter.aag");

/// Parses, builds and verifies an AIGER fixture in one go.
pub fn verify_aig(source: &str) -> (Aig, TransitionSystem, Option<Counterexample>) {
    let aig = parse_ascii(source).expect("fixture must parse");
    let mut store = VariableStore::new();
    let system = build_from_aiger(&mut store, &aig).expect("fixture must build");
    let result = Verifier::new(&mut store, &system, SEED)
        .run()
        .expect("the solver must not fail");
    (aig, system, result)
}

fn lit_value(values: &[bool], lit: AigerLit) -> bool {
    values[aiger_var(lit) as usize] ^ aiger_sign(lit)
}

/// Replays a counterexample through the circuit, cycle by cycle, and
/// reports whether the error literal holds in the final cycle.
pub fn replay_hits_error(aig: &Aig, system: &TransitionSystem, cex: &Counterexample) -> bool {
    let error_lit = if aig.outputs.is_empty() {
        aig.bad[0]
    } else {
        aig.outputs[0]
    };

    let mut state: Vec<bool> = aig
        .latches
        .iter()
        .map(|latch| latch.reset == Reset::One)
        .collect();

    let rows = cex.inputs();
    assert!(!rows.is_empty(), "a counterexample has at least one row");

    for (cycle, row) in rows.iter().enumerate() {
        // Literal 1 is constant true, so variable 0 must read false.
        let mut values = vec![false; aig.max_var as usize + 1];

        for lit in row {
            let offset = system.input_vars().offset(lit.var());
            values[aiger_var(aig.inputs[offset]) as usize] = lit.is_positive();
        }
        for (i, latch) in aig.latches.iter().enumerate() {
            values[aiger_var(latch.lit) as usize] = state[i];
        }
        for and in &aig.ands {
            values[aiger_var(and.lhs) as usize] =
                lit_value(&values, and.rhs0) && lit_value(&values, and.rhs1);
        }

        if cycle + 1 == rows.len() {
            return lit_value(&values, error_lit);
        }

        state = aig
            .latches
            .iter()
            .map(|latch| lit_value(&values, latch.next))
            .collect();
    }

    unreachable!()
}
