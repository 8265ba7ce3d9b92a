//! Bench command - time a deferred `for_each` on the tokio clock.

use anyhow::{Context, Result};
use pace_core::{Scheduler, Settled, Speed, Value};
use pace_flow::{LoopControl, Stepper};
use serde::Serialize;
use std::cell::Cell;
use std::rc::Rc;
use std::time::Instant;
use tokio::task::LocalSet;

#[derive(Debug, Serialize)]
struct BenchReport {
    speed: String,
    items: usize,
    processed: i64,
    chunk: usize,
    ticks: usize,
    checksum: i64,
    elapsed_ms: f64,
    clock_ms: u128,
}

/// Run the bench command.
pub async fn run(items: usize, speed: &str, json: bool) -> Result<()> {
    let speed: Speed = speed
        .parse()
        .with_context(|| format!("Invalid speed: {speed}"))?;
    tracing::info!(items, speed = %speed, "Starting benchmark");

    let local = LocalSet::new();
    let report = local.run_until(measure(items, speed)).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    let title = format!("Benchmark: for_each over {} items", report.items);
    println!("{title}");
    println!("{}", "=".repeat(title.len()));
    println!();
    println!("Speed:      {}", report.speed);
    println!("Chunk:      {}", report.chunk);
    println!("Ticks:      {}", report.ticks);
    println!("Processed:  {}", report.processed);
    println!("Checksum:   {}", report.checksum);
    println!("Clock:      {}ms", report.clock_ms);
    println!("Wall time:  {:.3}ms", report.elapsed_ms);
    Ok(())
}

async fn measure(items: usize, speed: Speed) -> Result<BenchReport> {
    let scheduler = Scheduler::tokio();
    let source = Value::array((0..items).map(Value::from));
    let checksum = Rc::new(Cell::new(0i64));
    let sum = checksum.clone();

    let started = Instant::now();
    let chain = Stepper::new(&scheduler)
        .speed(speed)
        .for_each(&source, move |item, _, _| {
            sum.set(sum.get().wrapping_add(item.as_i64().unwrap_or_default()));
            Ok(LoopControl::Continue(()))
        });
    let settled = chain.settled().await;
    let elapsed = started.elapsed();

    let processed = match settled {
        Settled::Fired(Ok(count)) => count.as_i64().unwrap_or_default(),
        Settled::Fired(Err(error)) => return Err(error).context("Benchmark chain failed"),
        Settled::Canceled => anyhow::bail!("Benchmark chain was canceled"),
    };
    let chunk = scheduler.chunk_size(speed);
    tracing::debug!(chain = %chain.id(), processed, "Benchmark finished");

    Ok(BenchReport {
        speed: speed.to_string(),
        items,
        processed,
        chunk,
        ticks: items.div_ceil(chunk).max(1),
        checksum: checksum.get(),
        elapsed_ms: elapsed.as_secs_f64() * 1000.0,
        clock_ms: scheduler.now().as_millis(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn measure_counts_every_item() {
        let local = LocalSet::new();
        let report = local.run_until(measure(20, Speed::Slow)).await.unwrap();
        assert_eq!(report.processed, 20);
        assert_eq!(report.checksum, (0..20).sum::<i64>());
        assert_eq!(report.ticks, 20);
        assert!(report.clock_ms >= 20 * 16);
    }

    #[tokio::test]
    async fn ninja_finishes_in_one_tick() {
        let local = LocalSet::new();
        let report = local.run_until(measure(100, Speed::Ninja)).await.unwrap();
        assert_eq!(report.processed, 100);
        assert_eq!(report.ticks, 1);
    }
}
