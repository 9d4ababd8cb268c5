//! Version command implementation.

use console::style;

/// Execute the version command.
pub fn execute() {
    let version = env!("CARGO_PKG_VERSION");

    println!(
        "{} {} - circuit simulation and expectation values across backends",
        style("Qlinq").cyan().bold(),
        style(format!("v{version}")).yellow()
    );
    println!();
    println!("Components:");
    println!("  qlinq-ir           Circuit and noise-model representation");
    println!("  qlinq-hal          Simulation abstraction layer and expectation engine");
    #[cfg(feature = "sim")]
    println!("  qlinq-adapter-sim  Local statevector and trajectory simulators");
    println!("  qlinq-cli          Command-line interface");
    println!();
    println!(
        "Repository: {}",
        style(env!("CARGO_PKG_REPOSITORY")).underlined()
    );
    println!("License:    {}", style(env!("CARGO_PKG_LICENSE")).dim());
}
