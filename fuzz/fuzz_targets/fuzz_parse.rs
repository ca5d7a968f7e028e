#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // The reader must never panic on any input, ASCII or binary.
    let _ = harrier_aiger::parser::parse(data);
});
