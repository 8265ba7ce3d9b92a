//! pace CLI - inspect speed tables and benchmark the iteration driver.

mod commands;
mod observability;

use anyhow::Result;
use clap::{Parser, Subcommand};
use observability::{LogFormat, TracingConfig, TracingGuard, init_tracing};

/// pace - cooperative chains of deferred steps.
#[derive(Parser)]
#[command(name = "pace")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the effective speed table
    Speeds {
        /// Path to a scheduler config YAML file
        #[arg(short, long)]
        config: Option<String>,

        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Time a deferred for_each over N items
    Bench {
        /// Number of items to iterate
        #[arg(short = 'n', long, default_value = "1000")]
        items: usize,

        /// Speed name or milliseconds (e.g., "fast", "250ms")
        #[arg(short, long, default_value = "normal")]
        speed: String,

        /// Print JSON instead of a summary
        #[arg(long)]
        json: bool,
    },

    /// Show version information
    Version,
}

fn setup_logging(verbosity: u8) -> Result<TracingGuard> {
    // Check for explicit log format override, otherwise auto-detect
    let log_format = std::env::var("PACE_LOG_FORMAT")
        .ok()
        .and_then(|s| s.parse::<LogFormat>().ok())
        .unwrap_or_else(|| {
            if std::io::IsTerminal::is_terminal(&std::io::stderr()) {
                LogFormat::Pretty
            } else {
                LogFormat::Compact
            }
        });

    // RUST_LOG wins over -v
    let log_filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| TracingConfig::filter_for(verbosity).to_string());

    let include_location = std::env::var("PACE_LOG_LOCATION")
        .map(|s| s == "true" || s == "1")
        .unwrap_or(false);

    let config = TracingConfig::builder()
        .log_format(log_format)
        .log_filter(log_filter)
        .include_location(include_location)
        .build();

    init_tracing(config)
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let _tracing_guard = setup_logging(cli.verbose)?;

    match cli.command {
        Commands::Speeds { config, json } => commands::speeds::run(config.as_deref(), json),
        Commands::Bench { items, speed, json } => commands::bench::run(items, &speed, json).await,
        Commands::Version => commands::version::run(),
    }
}
