//! Qlinq Command-Line Interface
//!
//! The main entry point for the Qlinq CLI tool.
//!
//! ```text
//! qlinq backends
//! qlinq simulate -c bell.json -s 1000 --seed 7
//! qlinq expval -c ansatz.json -o hamiltonian.json --config noisy.yaml -b trajectory
//! ```

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

use clap::{Parser, Subcommand};
use console::style;
use tracing_subscriber::EnvFilter;

mod commands;

use commands::common::RunOptions;
use commands::{backends, expval, simulate, version};

/// Qlinq - quantum circuit simulation and expectation values across backends
#[derive(Parser)]
#[command(name = "qlinq")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Simulate a circuit and print outcome frequencies
    Simulate {
        /// Circuit file (JSON)
        #[arg(short, long)]
        circuit: String,

        #[command(flatten)]
        run: RunOptions,

        /// Also print the final statevector
        #[arg(long)]
        statevector: bool,

        /// Output format (table, json)
        #[arg(short, long, default_value = "table")]
        format: String,
    },

    /// Compute the expectation value of an operator
    Expval {
        /// Circuit file (JSON)
        #[arg(short, long)]
        circuit: String,

        /// Operator file (JSON list of terms)
        #[arg(short, long)]
        operator: String,

        #[command(flatten)]
        run: RunOptions,

        /// Output format (table, json)
        #[arg(short, long, default_value = "table")]
        format: String,
    },

    /// List available backends and their capabilities
    Backends,

    /// Show version information
    Version,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let filter = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    // Execute command
    let result = match cli.command {
        Commands::Simulate {
            circuit,
            run,
            statevector,
            format,
        } => simulate::execute(&circuit, &run, statevector, &format),

        Commands::Expval {
            circuit,
            operator,
            run,
            format,
        } => expval::execute(&circuit, &operator, &run, &format),

        Commands::Backends => backends::execute(),

        Commands::Version => {
            version::execute();
            Ok(())
        }
    };

    // Handle errors
    if let Err(e) = result {
        eprintln!("{} {:#}", style("Error:").red().bold(), e);
        std::process::exit(1);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_simulate() {
        let cli = Cli::try_parse_from([
            "qlinq", "-vv", "simulate", "-c", "bell.json", "-s", "100", "--seed", "3",
        ])
        .unwrap();
        assert_eq!(cli.verbose, 2);
        match cli.command {
            Commands::Simulate { circuit, run, statevector, format } => {
                assert_eq!(circuit, "bell.json");
                assert_eq!(run.backend, "statevector");
                assert_eq!(run.shots, Some(100));
                assert_eq!(run.seed, Some(3));
                assert!(!statevector);
                assert_eq!(format, "table");
            }
            _ => panic!("expected simulate"),
        }
    }

    #[test]
    fn test_parse_expval_requires_operator() {
        assert!(Cli::try_parse_from(["qlinq", "expval", "-c", "c.json"]).is_err());
        let cli = Cli::try_parse_from([
            "qlinq", "expval", "-c", "c.json", "-o", "h.json", "-b", "trajectory",
        ])
        .unwrap();
        match cli.command {
            Commands::Expval { operator, run, .. } => {
                assert_eq!(operator, "h.json");
                assert_eq!(run.backend, "trajectory");
                assert!(run.config.is_none());
            }
            _ => panic!("expected expval"),
        }
    }
}
