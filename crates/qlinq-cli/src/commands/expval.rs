//! Expectation-value command implementation.

use anyhow::Result;
use console::style;
use serde::Serialize;

use super::common::{RunOptions, build_simulator, load_circuit, load_operator};

/// JSON output of the expval command.
#[derive(Debug, Serialize)]
struct ExpectationReport<'a> {
    backend: &'a str,
    shots: Option<u64>,
    terms: usize,
    real: f64,
    imag: f64,
}

/// Execute the expval command.
pub fn execute(circuit_path: &str, operator_path: &str, run: &RunOptions, format: &str) -> Result<()> {
    let circuit = load_circuit(circuit_path)?;
    let operator = load_operator(operator_path)?;
    let sim = build_simulator(run)?;

    let value = sim.expectation_value(&operator, &circuit, None)?;

    match format {
        "json" => {
            let report = ExpectationReport {
                backend: sim.backend().name(),
                shots: sim.shots(),
                terms: operator.n_terms(),
                real: value.re,
                imag: value.im,
            };
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        "table" => {
            println!(
                "{} Evaluating {} terms of {} on {} with {}",
                style("→").cyan().bold(),
                operator.n_terms(),
                style(operator_path).green(),
                style(circuit_path).green(),
                style(sim.backend().name()).yellow()
            );
            match sim.shots() {
                Some(shots) => println!("  Shots: {shots}"),
                None => println!("  Shots: exact"),
            }
            if value.im == 0.0 {
                println!("\n{} <H> = {}", style("✓").green().bold(), style(value.re).bold());
            } else {
                println!(
                    "\n{} <H> = {} {:+}i",
                    style("✓").green().bold(),
                    style(value.re).bold(),
                    value.im
                );
            }
        }
        other => anyhow::bail!("Unknown output format: '{other}'. Available: table, json"),
    }

    Ok(())
}
