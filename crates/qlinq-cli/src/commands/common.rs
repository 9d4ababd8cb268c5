//! Shared helpers for CLI commands.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use clap::Args;
use console::style;
use tracing::debug;

use qlinq_hal::{BackendRegistry, Frequencies, QubitOperator, Simulator, SimulatorConfig};
use qlinq_ir::Circuit;

/// Backend selection and simulator settings shared by `simulate` and `expval`.
#[derive(Debug, Args)]
pub struct RunOptions {
    /// Backend to use
    #[arg(short, long, default_value = "statevector")]
    pub backend: String,

    /// Number of shots (exact results when omitted and the backend allows it)
    #[arg(short, long)]
    pub shots: Option<u64>,

    /// RNG seed for reproducible sampling
    #[arg(long)]
    pub seed: Option<u64>,

    /// Simulator configuration file (YAML or JSON)
    #[arg(long, env = "QLINQ_CONFIG")]
    pub config: Option<String>,
}

fn read_source(path: &str) -> Result<String> {
    if !Path::new(path).exists() {
        anyhow::bail!("File not found: {path}");
    }
    fs::read_to_string(path).with_context(|| format!("Failed to read file: {path}"))
}

fn extension(path: &str) -> String {
    Path::new(path)
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase()
}

/// Load a circuit from a JSON file.
pub fn load_circuit(path: &str) -> Result<Circuit> {
    let source = read_source(path)?;
    match extension(path).as_str() {
        "json" | "" => {
            serde_json::from_str(&source).with_context(|| format!("Invalid circuit in {path}"))
        }
        other => anyhow::bail!("Unsupported circuit format: '.{other}' (expected .json)"),
    }
}

/// Load an operator from a JSON list of `{"term": "X0 Z1", "coeff": [re, im]}`.
pub fn load_operator(path: &str) -> Result<QubitOperator> {
    let source = read_source(path)?;
    serde_json::from_str(&source).with_context(|| format!("Invalid operator in {path}"))
}

/// Read the configuration file, if any, and apply command-line overrides.
pub fn load_config(options: &RunOptions) -> Result<SimulatorConfig> {
    let mut config = match options.config.as_deref() {
        Some(path) => {
            let source = read_source(path)?;
            match extension(path).as_str() {
                "yaml" | "yml" => serde_yaml_ng::from_str(&source)
                    .with_context(|| format!("Invalid YAML configuration in {path}"))?,
                "json" => serde_json::from_str(&source)
                    .with_context(|| format!("Invalid JSON configuration in {path}"))?,
                other => anyhow::bail!(
                    "Unsupported configuration format: '.{other}' (expected .yaml, .yml or .json)"
                ),
            }
        }
        None => SimulatorConfig::new(),
    };

    if let Some(shots) = options.shots {
        config.shots = Some(shots);
    }
    if let Some(seed) = options.seed {
        config.seed = Some(seed);
    }
    debug!(?config, "Resolved simulator configuration");
    Ok(config)
}

/// Registry with every backend compiled into this binary.
pub fn build_registry() -> BackendRegistry {
    #[allow(unused_mut)]
    let mut registry = BackendRegistry::new();
    #[cfg(feature = "sim")]
    qlinq_adapter_sim::register_backends(&mut registry);
    registry
}

/// Create the simulator selected by `options`.
pub fn build_simulator(options: &RunOptions) -> Result<Simulator> {
    let config = load_config(options)?;
    let registry = build_registry();
    if !registry.has_backend(&options.backend) {
        anyhow::bail!(
            "Unknown backend: '{}'. Available: {}",
            options.backend,
            registry.available_backends().join(", ")
        );
    }
    registry
        .simulator(&options.backend, config)
        .with_context(|| format!("Failed to create backend '{}'", options.backend))
}

/// Print frequencies as a table with bars, most likely outcomes first.
pub fn print_frequencies(frequencies: &Frequencies) {
    let mut sorted: Vec<_> = frequencies.iter().collect();
    sorted.sort_by(|a, b| b.1.total_cmp(a.1).then_with(|| a.0.cmp(b.0)));

    for (bitstring, probability) in sorted.iter().take(16) {
        let percent = **probability * 100.0;
        let bar_len = (percent / 2.0).round() as usize;
        let bar: String = "█".repeat(bar_len);

        println!(
            "  {}: {:>8.6} ({:>6.2}%) {}",
            style(bitstring).cyan(),
            probability,
            percent,
            style(bar).green()
        );
    }

    if sorted.len() > 16 {
        println!("  ... and {} more outcomes", sorted.len() - 16);
    }
}
