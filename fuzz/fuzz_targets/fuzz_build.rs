#![no_main]
use libfuzzer_sys::fuzz_target;

use harrier_logic::VariableStore;

fuzz_target!(|data: &[u8]| {
    if let Ok(aig) = harrier_aiger::parser::parse(data) {
        let mut store = VariableStore::new();
        // Any parsed circuit must lower without panicking.
        let _ = harrier_aiger::builder::build_from_aiger(&mut store, &aig);
    }
});
