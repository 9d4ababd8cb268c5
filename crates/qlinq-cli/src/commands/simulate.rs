//! Simulate command implementation.

use anyhow::Result;
use console::style;
use num_complex::Complex64;
use serde::Serialize;

use qlinq_hal::Frequencies;

use super::common::{RunOptions, build_simulator, load_circuit, print_frequencies};

/// JSON output of the simulate command.
#[derive(Debug, Serialize)]
struct SimulationReport<'a> {
    backend: &'a str,
    shots: Option<u64>,
    frequencies: &'a Frequencies,
    #[serde(skip_serializing_if = "Option::is_none")]
    statevector: Option<&'a [Complex64]>,
}

/// Execute the simulate command.
pub fn execute(circuit_path: &str, run: &RunOptions, statevector: bool, format: &str) -> Result<()> {
    let circuit = load_circuit(circuit_path)?;
    let sim = build_simulator(run)?;
    let result = sim.simulate(&circuit, statevector, None)?;

    match format {
        "json" => {
            let report = SimulationReport {
                backend: sim.backend().name(),
                shots: sim.shots(),
                frequencies: &result.frequencies,
                statevector: result.statevector.as_deref(),
            };
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        "table" => {
            println!(
                "{} Simulated {} on {} ({} qubits, {} instructions)",
                style("→").cyan().bold(),
                style(circuit_path).green(),
                style(sim.backend().name()).yellow(),
                circuit.width(),
                circuit.size()
            );

            let header = match sim.shots() {
                Some(shots) => format!("Frequencies ({shots} shots):"),
                None => "Exact frequencies:".to_string(),
            };
            println!("\n{} {}", style("✓").green().bold(), header);
            print_frequencies(&result.frequencies);

            if let Some(sv) = &result.statevector {
                println!("\n{} Statevector:", style("✓").green().bold());
                for (i, amplitude) in sv.iter().enumerate().filter(|(_, a)| a.norm_sqr() > 0.0) {
                    println!(
                        "  [{:>4}] {:+.6} {:+.6}i",
                        style(i).cyan(),
                        amplitude.re,
                        amplitude.im
                    );
                }
            }
        }
        other => anyhow::bail!("Unknown output format: '{other}'. Available: table, json"),
    }

    Ok(())
}
