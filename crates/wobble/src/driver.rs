//! Fixed-rate scheduler driving the wobble task
//!
//! Ticks never overlap: each one runs to completion on the blocking pool
//! (including an idle backoff) before the next interval tick is awaited.
//! Shutdown is only observed between ticks.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use parking_lot::Mutex;
use tokio::time::MissedTickBehavior;
use wobble_control::{BrokerClient, PublishOutcome, Sleeper, WobbleTask};
use wobble_core::TopologyProvider;

/// Counters over the lifetime of one driver run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickStats {
    pub delivered: u64,
    pub idle: u64,
    pub failed: u64,
    /// Events handed to the broker across all delivered ticks
    pub events: u64,
}

impl TickStats {
    pub fn ticks(&self) -> u64 {
        self.delivered + self.idle + self.failed
    }
}

/// Collapses a streak of identical tick failures into one log line
#[derive(Debug, Default)]
struct FailureLog {
    last: Option<String>,
    streak: u64,
}

impl FailureLog {
    /// Record a failure; true when it differs from the previous one
    fn failed(&mut self, reason: String) -> bool {
        self.streak += 1;
        if self.last.as_deref() == Some(reason.as_str()) {
            return false;
        }
        self.last = Some(reason);
        true
    }

    /// Record a good tick; returns the length of the streak it ended
    fn recovered(&mut self) -> Option<u64> {
        self.last.take()?;
        Some(std::mem::take(&mut self.streak))
    }
}

/// Run `task` every `send_rate` until `shutdown` resolves
///
/// A failed tick is logged and the next tick runs as usual. Repeats of the
/// same failure are only counted until a tick succeeds again.
pub async fn run<P, B, S>(
    task: WobbleTask<P, B, S>,
    send_rate: Duration,
    shutdown: impl Future<Output = ()>,
) -> Result<TickStats>
where
    P: TopologyProvider + Send + 'static,
    B: BrokerClient + Send + 'static,
    S: Sleeper + Send + 'static,
{
    let task = Arc::new(Mutex::new(task));
    let mut stats = TickStats::default();
    let mut failures = FailureLog::default();

    let mut interval = tokio::time::interval(send_rate);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    tokio::pin!(shutdown);

    tracing::info!("Wobble driver started, tick every {:?}", send_rate);

    loop {
        tokio::select! {
            biased;
            _ = &mut shutdown => {
                tracing::info!("Shutdown requested");
                break;
            }
            _ = interval.tick() => {}
        }

        let tick_task = Arc::clone(&task);
        let outcome = match tokio::task::spawn_blocking(move || tick_task.lock().tick()).await {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(e)) => {
                stats.failed += 1;
                if failures.failed(e.to_string()) {
                    tracing::error!("Wobble tick failed: {}", e);
                }
                continue;
            }
            Err(e) => {
                stats.failed += 1;
                if failures.failed(e.to_string()) {
                    tracing::error!("Wobble tick aborted: {}", e);
                }
                continue;
            }
        };

        if let Some(streak) = failures.recovered() {
            tracing::info!("Wobble ticks recovered after {} failures", streak);
        }
        match outcome {
            PublishOutcome::Delivered(n) => {
                stats.delivered += 1;
                stats.events += n as u64;
            }
            PublishOutcome::Idle => stats.idle += 1,
        }
    }

    tracing::info!(
        "Wobble driver stopped after {} ticks ({} delivered, {} idle, {} failed, {} events)",
        stats.ticks(),
        stats.delivered,
        stats.idle,
        stats.failed,
        stats.events
    );
    Ok(stats)
}
