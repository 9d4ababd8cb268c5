//! Backends command implementation.

use anyhow::Result;
use console::style;

use qlinq_hal::BackendInfo;

use super::common::build_registry;

fn yes_no(flag: bool) -> console::StyledObject<&'static str> {
    if flag {
        style("yes").green()
    } else {
        style("no").dim()
    }
}

fn print_backend(name: &str, info: &BackendInfo) {
    println!("  {} {}", style("●").green(), style(name).bold());
    println!("    Noisy simulation: {}", yes_no(info.noisy_simulation));
    println!("    Statevector:      {}", yes_no(info.statevector_available));
    println!("    Amplitude order:  {}", info.statevector_order);
    println!();
}

/// Execute the backends command.
pub fn execute() -> Result<()> {
    println!("{} Available backends:\n", style("Qlinq").cyan().bold());

    let registry = build_registry();
    let snapshot = registry.backend_info();

    for (name, info) in snapshot {
        print_backend(name, info);
    }

    for name in registry.available_backends() {
        if !snapshot.contains_key(&name) {
            println!(
                "  {} {} (failed to initialise, run with -v for details)",
                style("○").red(),
                style(&name).dim()
            );
            println!();
        }
    }

    #[cfg(not(feature = "sim"))]
    {
        println!(
            "  {} {} (not compiled)",
            style("○").dim(),
            style("statevector, trajectory").dim()
        );
        println!("    Rebuild with --features sim to enable");
        println!();
    }

    Ok(())
}
