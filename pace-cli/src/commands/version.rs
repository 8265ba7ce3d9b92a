//! Version command - show version information.

use anyhow::Result;

/// Version information.
const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Run the version command.
pub fn run() -> Result<()> {
    println!("pace - cooperative chains of deferred steps");
    println!();
    println!("Version:     {}", VERSION);
    println!(
        "Platform:    {} / {}",
        std::env::consts::OS,
        std::env::consts::ARCH
    );
    println!();
    println!("Components:");
    println!("  pace-core   Chains, scheduler clock, speeds, verb registry");
    println!("  pace-flow   Iteration driver, parallel and sequence combinators");
    println!("  pace-cli    Command-line interface");

    Ok(())
}
