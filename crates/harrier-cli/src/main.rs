//! The `harrier` binary: reads an AIGER circuit, runs the verifier and
//! prints either a safety verdict or a counterexample witness in the
//! AIGER witness format.

use std::fs;
use std::path::PathBuf;

use clap::Parser;
use miette::{IntoDiagnostic, WrapErr};
use tracing_subscriber::EnvFilter;

use harrier_aiger::builder::build_from_aiger;
use harrier_aiger::parser;
use harrier_engine::{simplify, Counterexample, Verifier, SAFE_WITNESS};
use harrier_logic::{TransitionSystem, VariableStore};

#[derive(Parser)]
#[command(name = "harrier")]
#[command(about = "SAT-based safety model checker for AIGER circuits")]
#[command(version)]
struct Cli {
    /// Report progress on stderr
    #[arg(short, long)]
    verbose: bool,

    /// Report detailed engine activity on stderr
    #[arg(short, long)]
    debug: bool,

    /// Seed for the generalization tie-break randomness
    #[arg(short = 's', value_name = "SEED", default_value_t = 0)]
    seed: u32,

    /// Emit the verdict as JSON instead of the witness format
    #[arg(long)]
    json: bool,

    /// Input circuit in ASCII or binary AIGER format
    input: PathBuf,
}

fn main() -> miette::Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.debug {
        "debug"
    } else if cli.verbose {
        "info"
    } else {
        "error"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let bytes = fs::read(&cli.input)
        .into_diagnostic()
        .wrap_err_with(|| format!("cannot read {}", cli.input.display()))?;

    let aig = parser::parse(&bytes)?;

    let mut store = VariableStore::new();
    let system = build_from_aiger(&mut store, &aig)?;
    let system = simplify(&system);

    let result = Verifier::new(&mut store, &system, cli.seed)
        .run()
        .into_diagnostic()?;

    let output = match (&result, cli.json) {
        (None, false) => SAFE_WITNESS.to_string(),
        (None, true) => format!("{}\n", serde_json::json!({ "status": "safe" })),
        (Some(cex), false) => cex.to_aiger_witness(&system),
        (Some(cex), true) => format!("{}\n", json_verdict(cex, &system)),
    };
    print!("{output}");

    Ok(())
}

fn json_verdict(cex: &Counterexample, system: &TransitionSystem) -> serde_json::Value {
    let initial: String = system
        .initial_cube()
        .iter()
        .map(|&bit| if bit { '1' } else { '0' })
        .collect();

    let inputs: Vec<String> = cex
        .inputs()
        .iter()
        .map(|row| {
            system
                .input_vars()
                .iter()
                .map(|var| {
                    let positive = row
                        .iter()
                        .find(|lit| lit.var() == var)
                        .map(|lit| lit.is_positive())
                        .unwrap_or(false);
                    if positive {
                        '1'
                    } else {
                        '0'
                    }
                })
                .collect()
        })
        .collect();

    serde_json::json!({
        "status": "unsafe",
        "length": cex.len(),
        "initial": initial,
        "inputs": inputs,
    })
}
