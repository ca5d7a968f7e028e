use criterion::{black_box, criterion_group, criterion_main, Criterion};

use harrier_aiger::builder::build_from_aiger;
use harrier_aiger::parser::parse_ascii;
use harrier_engine::Verifier;
use harrier_logic::VariableStore;

const COUNTER4: &str = include_str!("../testdata/counter4.aag");
const SHORTP0: &str = include_str!("../testdata/shortp0.aag");

fn run_checker(source: &str) -> usize {
    let aig = parse_ascii(source).unwrap();
    let mut store = VariableStore::new();
    let system = build_from_aiger(&mut store, &aig).unwrap();

    Verifier::new(&mut store, &system, 0x5555_5555)
        .run()
        .unwrap()
        .map(|cex| cex.len())
        .unwrap_or(0)
}

fn bench_counter(c: &mut Criterion) {
    c.bench_function("verify_counter4", |b| {
        b.iter(|| run_checker(black_box(COUNTER4)))
    });
}

fn bench_shortp0(c: &mut Criterion) {
    c.bench_function("verify_shortp0", |b| {
        b.iter(|| run_checker(black_box(SHORTP0)))
    });
}

criterion_group!(benches, bench_counter, bench_shortp0);
criterion_main!(benches);
