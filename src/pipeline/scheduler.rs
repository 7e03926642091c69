// src/pipeline/scheduler.rs

//! Fixed-interval cycle runner.

use std::panic::AssertUnwindSafe;
use std::time::Duration;

use futures::FutureExt;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::pipeline::check::{PermitChecker, panic_message};

/// Runs one poll cycle immediately and then every `interval` until shutdown.
///
/// Cycles never overlap: a cycle that overruns the interval delays the next
/// tick instead of queueing a burst.
#[derive(Debug, Clone)]
pub struct Scheduler {
    interval: Duration,
    shutdown: CancellationToken,
}

impl Scheduler {
    pub fn new(interval: Duration, shutdown: CancellationToken) -> Self {
        Self { interval, shutdown }
    }

    /// Drive `checker` until the shutdown token fires. Returns the number of
    /// cycles started.
    pub async fn run(&self, checker: &mut PermitChecker) -> usize {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        log::info!(
            "Scheduler started: checking {} permit(s) every {}s",
            checker.permits().len(),
            self.interval.as_secs()
        );

        let mut cycles = 0;
        loop {
            tokio::select! {
                biased;
                _ = self.shutdown.cancelled() => break,
                _ = ticker.tick() => {}
            }

            cycles += 1;
            let outcome = AssertUnwindSafe(checker.run_cycle()).catch_unwind().await;
            if let Err(panic) = outcome {
                log::error!(
                    "Poll cycle {} panicked: {}",
                    cycles,
                    panic_message(panic.as_ref())
                );
            }

            if self.shutdown.is_cancelled() {
                break;
            }
        }

        log::info!("Scheduler stopped after {} cycle(s)", cycles);
        cycles
    }
}
