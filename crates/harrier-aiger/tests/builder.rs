//! Lowering tests against hand-computed CNF encodings.
//!
//! The fixtures are reencoded AIGER files, so variable numbering and
//! operand order survive `make_context` unchanged and the expected
//! formulas can be written out literal by literal.

use harrier_aiger::builder::{
    build_from_aiger, build_from_context, from_aiger_lit, get_error_literal, make_aiger_info,
    make_context, BuildError,
};
use harrier_aiger::parser::parse_ascii;
use harrier_aiger::Aig;
use harrier_logic::{Literal, VariableStore};

fn read(source: &str) -> Aig {
    parse_ascii(source).expect("fixture must parse")
}

const SEP: Literal = Literal::SEPARATOR;

#[test]
fn empty_aig_has_no_property() {
    let aig = read("aag 0 0 0 0 0\n");
    let mut store = VariableStore::new();

    assert!(matches!(
        build_from_aiger(&mut store, &aig),
        Err(BuildError::NoProperty)
    ));
}

#[test]
fn multiple_bad_properties_are_rejected() {
    let aig = read("aag 2 0 2 0 0 2\n2 2\n4 4\n2\n4\n");
    let mut store = VariableStore::new();

    assert!(matches!(
        build_from_aiger(&mut store, &aig),
        Err(BuildError::Unsupported {
            feature: "multiple error outputs"
        })
    ));
}

#[test]
fn liveness_sections_are_rejected_by_the_builder() {
    let mut store = VariableStore::new();

    // An invariant constraint next to an ordinary bad property.
    let aig = read("aag 1 0 1 0 0 1 1\n2 2\n2\n3\n");
    assert!(matches!(
        build_from_aiger(&mut store, &aig),
        Err(BuildError::Unsupported {
            feature: "invariant constraints"
        })
    ));

    // A justice property.
    let aig = read("aag 1 0 1 0 0 0 0 1\n2 2\n1\n2\n");
    assert!(matches!(
        build_from_aiger(&mut store, &aig),
        Err(BuildError::Unsupported {
            feature: "justice properties"
        })
    ));

    // A fairness constraint.
    let aig = read("aag 1 0 1 0 0 1 0 0 1\n2 2\n2\n3\n");
    assert!(matches!(
        build_from_aiger(&mut store, &aig),
        Err(BuildError::Unsupported {
            feature: "fairness constraints"
        })
    ));
}

#[test]
fn buffer_gate() {
    let aig = read("aag 1 1 0 1 0\n2\n2\n");
    let mut store = VariableStore::new();

    let info = make_aiger_info(&aig).unwrap();
    assert_eq!(info.true_literals.len(), 1);
    assert!(info.error_coi.is_empty());

    let ctx = make_context(&mut store, info);

    assert_eq!(ctx.input_vars.size(), 1);
    assert_eq!(ctx.state_vars.size(), 0);
    assert_eq!(ctx.next_state_vars.size(), 0);
    assert_eq!(ctx.and_vars.size(), 0);

    let input = Literal::positive(ctx.input_vars.nth(0));
    assert_eq!(from_aiger_lit(&ctx, 2), input);
    assert_eq!(from_aiger_lit(&ctx, 3), !input);

    let system = build_from_context(&ctx);
    assert!(system.init().is_empty());
    assert!(system.trans().is_empty());
    assert_eq!(system.error().literals(), &[input, SEP]);
    assert!(system.initial_cube().is_empty());
}

#[test]
fn inverter_gate() {
    let aig = read("aag 1 1 0 1 0\n2\n3\n");
    let mut store = VariableStore::new();

    let info = make_aiger_info(&aig).unwrap();
    let ctx = make_context(&mut store, info);
    let input = Literal::positive(ctx.input_vars.nth(0));

    let system = build_from_context(&ctx);
    assert_eq!(system.error().literals(), &[!input, SEP]);
}

#[test]
fn and_gate() {
    let aig = read("aag 3 2 0 1 1\n2\n4\n6\n6 4 2\n");
    let mut store = VariableStore::new();

    let info = make_aiger_info(&aig).unwrap();
    let ctx = make_context(&mut store, info);

    assert_eq!(ctx.input_vars.size(), 2);
    assert_eq!(ctx.and_vars.size(), 1);

    let x = Literal::positive(ctx.input_vars.nth(0));
    let y = Literal::positive(ctx.input_vars.nth(1));
    let z = Literal::positive(ctx.and_vars.nth(0));

    assert_eq!(from_aiger_lit(&ctx, 6), z);
    assert_eq!(from_aiger_lit(&ctx, 7), !z);

    // z = y /\ x as implications:
    // (z -> y) /\ (z -> x) /\ (y /\ x -> z), then the error unit.
    let system = build_from_context(&ctx);
    assert_eq!(
        system.error().literals(),
        &[!z, y, SEP, !z, x, SEP, !y, !x, z, SEP, z, SEP]
    );
}

#[test]
fn or_gate() {
    let aig = read("aag 3 2 0 1 1\n2\n4\n7\n6 5 3\n");
    let mut store = VariableStore::new();

    let info = make_aiger_info(&aig).unwrap();
    let ctx = make_context(&mut store, info);

    let x = Literal::positive(ctx.input_vars.nth(0));
    let y = Literal::positive(ctx.input_vars.nth(1));
    let z = Literal::positive(ctx.and_vars.nth(0));

    let system = build_from_context(&ctx);
    assert_eq!(
        system.error().literals(),
        &[!z, !y, SEP, !z, !x, SEP, y, x, z, SEP, !z, SEP]
    );
}

#[test]
fn single_latch_with_constant_next() {
    // 0 -> 1, initial 0, error when the latch is 0.
    let aig = read("aag 1 0 1 1 0\n2 1\n3\n");
    let mut store = VariableStore::new();

    let info = make_aiger_info(&aig).unwrap();
    assert_eq!(info.error_coi.len(), 1);

    let ctx = make_context(&mut store, info);
    assert_eq!(ctx.state_vars.size(), 1);
    assert_eq!(ctx.next_state_vars.size(), 1);
    assert_eq!(ctx.and_vars.size(), 0);

    let x = Literal::positive(ctx.state_vars.nth(0));
    let xp = Literal::positive(ctx.next_state_vars.nth(0));

    let system = build_from_context(&ctx);
    assert_eq!(system.init().literals(), &[!x, SEP]);
    assert_eq!(system.trans().literals(), &[xp, SEP]);
    assert_eq!(system.error().literals(), &[!x, SEP]);
    assert_eq!(system.initial_cube(), &[false]);
}

#[test]
fn self_loop_latch() {
    let aig = read("aag 1 0 1 1 0\n2 2\n2\n");
    let mut store = VariableStore::new();
    let system = build_from_aiger(&mut store, &aig).unwrap();

    let x = Literal::positive(system.state_vars().nth(0));
    let xp = Literal::positive(system.next_state_vars().nth(0));

    assert_eq!(system.init().literals(), &[!x, SEP]);
    assert_eq!(system.trans().literals(), &[!xp, x, SEP, xp, !x, SEP]);
    assert_eq!(system.error().literals(), &[x, SEP]);
}

#[test]
fn latches_outside_the_cone_of_influence_are_pruned() {
    // Two latches; only the first feeds the error output. The second
    // still contributes to the initial cube.
    let aig = read("aag 2 0 2 1 0\n2 2\n4 4 1\n2\n");
    let mut store = VariableStore::new();

    let info = make_aiger_info(&aig).unwrap();
    assert_eq!(info.error_coi.len(), 1);

    let ctx = make_context(&mut store, info);
    assert_eq!(ctx.state_vars.size(), 1);

    let system = build_from_context(&ctx);
    assert_eq!(system.state_vars().size(), 1);
    assert_eq!(system.initial_cube(), &[false, true]);
}

#[test]
fn transitive_cone_of_influence_is_kept() {
    // The error watches latch 2, whose next state is latch 4: both
    // latches stay in the system.
    let aig = read("aag 2 0 2 1 0\n2 4\n4 4\n2\n");
    let mut store = VariableStore::new();

    let info = make_aiger_info(&aig).unwrap();
    assert_eq!(info.error_coi.len(), 2);

    let ctx = make_context(&mut store, info);
    assert_eq!(ctx.state_vars.size(), 2);
}

#[test]
fn constant_gates_are_folded() {
    // Gate 6 = input /\ false is constant false; the error formula
    // reduces to a single empty clause and needs no auxiliary vars.
    let aig = read("aag 3 1 0 1 1\n2\n6\n6 2 0\n");
    let mut store = VariableStore::new();

    let info = make_aiger_info(&aig).unwrap();
    assert!(info.true_literals.contains(&7));

    let ctx = make_context(&mut store, info);
    assert_eq!(ctx.and_vars.size(), 0);

    let system = build_from_context(&ctx);
    assert_eq!(system.error().literals(), &[SEP]);
}

#[test]
fn constant_true_error_is_the_empty_formula() {
    let aig = read("aag 1 1 0 1 0\n2\n1\n");
    let mut store = VariableStore::new();
    let system = build_from_aiger(&mut store, &aig).unwrap();

    assert!(system.error().is_empty());
}

#[test]
fn nondet_reset_leaves_init_unconstrained() {
    let aig = read("aag 1 0 1 1 0\n2 2 2\n2\n");
    let mut store = VariableStore::new();
    let system = build_from_aiger(&mut store, &aig).unwrap();

    assert!(system.init().is_empty());
    assert_eq!(system.initial_cube(), &[false]);
}

#[test]
fn error_literal_prefers_outputs_over_bad() {
    let aig = read("aag 1 0 1 1 0 1\n2 2\n2\n3\n");
    let info = make_aiger_info(&aig).unwrap();
    assert_eq!(get_error_literal(&info), 2);

    let aig = read("aag 1 0 1 0 0 1\n2 2\n3\n");
    let info = make_aiger_info(&aig).unwrap();
    assert_eq!(get_error_literal(&info), 3);
}
