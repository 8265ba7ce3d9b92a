//! Speeds command - print the effective speed table.

use anyhow::{Context, Result};
use pace_core::{SchedulerConfig, Speed};
use serde::Serialize;

#[derive(Debug, Serialize)]
struct SpeedRow {
    speed: String,
    same_turn: bool,
    delay_ms: u64,
    chunk: usize,
}

/// Load the configuration from `config` (or the environment) and print
/// one row per named speed.
pub fn run(config: Option<&str>, json: bool) -> Result<()> {
    let config = match config {
        Some(path) => SchedulerConfig::load(path)
            .with_context(|| format!("Failed to load scheduler config from {path}"))?,
        None => SchedulerConfig::from_env(),
    };
    config.validate().context("Invalid speed table")?;
    tracing::info!(default_speed = %config.default_speed, "Loaded scheduler config");

    let rows: Vec<SpeedRow> = Speed::NAMED
        .iter()
        .map(|&speed| {
            let cadence = config.speeds.cadence(speed);
            SpeedRow {
                speed: speed.to_string(),
                same_turn: cadence.same_turn,
                delay_ms: cadence.delay_ms,
                chunk: cadence.chunk,
            }
        })
        .collect();

    if json {
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(());
    }

    println!("Default speed: {}", config.default_speed);
    println!("Async mode:    {}", config.async_mode);
    println!("Till interval: {}ms", config.till_interval_ms);
    println!();
    println!("{:<8} {:<10} {:>9} {:>22}", "SPEED", "SAME TURN", "DELAY", "CHUNK");
    println!("{}", "-".repeat(52));
    for row in &rows {
        let marker = if row.speed == config.default_speed.to_string() {
            " *"
        } else {
            ""
        };
        println!(
            "{:<8} {:<10} {:>7}ms {:>22}{}",
            row.speed,
            if row.same_turn { "yes" } else { "no" },
            row.delay_ms,
            row.chunk,
            marker
        );
    }

    Ok(())
}
