//! Loads a CSV transaction ledger, runs the forensics pipeline, and prints
//! the resulting report as JSON.
//!
//! ```text
//! cargo run --example run_forensics -- ledger.csv
//! ```

use std::env;
use std::process::ExitCode;

use fraud_forensics_engine::{analyze, ingest, DetectionConfig};

fn main() -> ExitCode {
    tracing_subscriber::fmt::init();

    let Some(path) = env::args().nth(1) else {
        eprintln!("usage: run_forensics <ledger.csv>");
        return ExitCode::FAILURE;
    };

    let transactions = match ingest::load_csv(&path) {
        Ok(txs) => txs,
        Err(err) => {
            eprintln!("failed to load `{path}`: {err}");
            return ExitCode::FAILURE;
        }
    };

    let report = analyze(&transactions, &DetectionConfig::default());
    match report.to_json() {
        Ok(json) => {
            println!("{json}");
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("failed to serialize report: {err}");
            ExitCode::FAILURE
        }
    }
}
