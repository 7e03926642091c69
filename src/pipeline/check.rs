// src/pipeline/check.rs

//! Poll cycle orchestration.
//!
//! One cycle sweeps expired alerts, then walks the permit catalog in order:
//! fetch → interpret → match target dates → gate → (maybe) notify. A failure
//! or panic while handling one permit is logged and never stops the others.

use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::FutureExt;
use tokio_util::sync::CancellationToken;

use crate::error::Result;
use crate::models::{AvailabilityResult, MonitoredPermit};
use crate::pipeline::gate::{GateDecision, NotificationGate, NotificationKey};
use crate::services::{AvailabilitySource, Notifier, interpret};

/// What happened to one permit in a cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermitOutcome {
    /// Alert sent
    Notified,
    /// Gate approved an alert but delivery failed; not retried
    NotifyFailed,
    /// Alert already sent for this event
    Suppressed,
    /// Live alerts for this permit were withdrawn
    Retracted(usize),
    /// Open date outside the target set
    NotMatched,
    /// Open entry whose date could not be determined
    UnknownDate,
    /// Nothing open
    Unavailable,
}

/// Counters for one cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleReport {
    pub checked: usize,
    pub expired: usize,
    pub fetch_failures: usize,
    pub notified: usize,
    pub notify_failures: usize,
    pub suppressed: usize,
    pub retracted: usize,
    /// Shutdown stopped the cycle before every permit was checked
    pub interrupted: bool,
}

impl CycleReport {
    fn record(&mut self, outcome: PermitOutcome) {
        match outcome {
            PermitOutcome::Notified => self.notified += 1,
            PermitOutcome::NotifyFailed => self.notify_failures += 1,
            PermitOutcome::Suppressed => self.suppressed += 1,
            PermitOutcome::Retracted(n) => self.retracted += n,
            PermitOutcome::NotMatched
            | PermitOutcome::UnknownDate
            | PermitOutcome::Unavailable => {}
        }
    }
}

impl fmt::Display for CycleReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "checked={} fetch_failures={} notified={} notify_failures={} suppressed={} retracted={} expired={}",
            self.checked,
            self.fetch_failures,
            self.notified,
            self.notify_failures,
            self.suppressed,
            self.retracted,
            self.expired
        )?;
        if self.interrupted {
            f.write_str(" (interrupted)")?;
        }
        Ok(())
    }
}

/// Alert text for an open permit.
pub fn alert_message(permit: &MonitoredPermit, result: &AvailabilityResult) -> String {
    let mut message = format!(
        "{} permit is available for date: {} with {} permits remaining!",
        permit.name,
        result.date_label(),
        result.remaining
    );
    if !permit.url.is_empty() {
        message.push_str(" Book: ");
        message.push_str(&permit.url);
    }
    message
}

/// Drives one poll cycle over the permit catalog.
pub struct PermitChecker {
    permits: Arc<[MonitoredPermit]>,
    source: Box<dyn AvailabilitySource>,
    notifier: Box<dyn Notifier>,
    gate: NotificationGate,
    request_delay: Duration,
    shutdown: CancellationToken,
}

impl PermitChecker {
    pub fn new(
        permits: Vec<MonitoredPermit>,
        source: Box<dyn AvailabilitySource>,
        notifier: Box<dyn Notifier>,
        gate: NotificationGate,
    ) -> Self {
        Self {
            permits: permits.into(),
            source,
            notifier,
            gate,
            request_delay: Duration::from_secs(1),
            shutdown: CancellationToken::new(),
        }
    }

    /// Pause between consecutive permits; skipped after the last one.
    pub fn with_request_delay(mut self, delay: Duration) -> Self {
        self.request_delay = delay;
        self
    }

    /// Token that stops the cycle at its next pause.
    pub fn with_shutdown(mut self, shutdown: CancellationToken) -> Self {
        self.shutdown = shutdown;
        self
    }

    pub fn permits(&self) -> &[MonitoredPermit] {
        &self.permits
    }

    pub fn gate(&self) -> &NotificationGate {
        &self.gate
    }

    /// Run one cycle at the current wall-clock time.
    pub async fn run_cycle(&mut self) -> CycleReport {
        self.run_cycle_at(Utc::now()).await
    }

    /// Run one cycle treating `now` as the current time.
    pub async fn run_cycle_at(&mut self, now: DateTime<Utc>) -> CycleReport {
        let mut report = CycleReport {
            expired: self.gate.sweep(now),
            ..CycleReport::default()
        };
        if report.expired > 0 {
            log::debug!("Expired {} notification(s) past TTL", report.expired);
        }

        let permits = Arc::clone(&self.permits);
        for (idx, permit) in permits.iter().enumerate() {
            log::info!(
                "Checking {} permit availability at: {}",
                permit.name,
                now.format("%Y-%m-%dT%H:%M:%S")
            );

            let checked = AssertUnwindSafe(self.check_permit(permit, now))
                .catch_unwind()
                .await;
            match checked {
                Ok(Ok(outcome)) => {
                    report.checked += 1;
                    report.record(outcome);
                }
                Ok(Err(e)) if e.is_cancelled() => {
                    log::info!("Shutdown requested while checking {}", permit.name);
                    report.interrupted = true;
                    break;
                }
                Ok(Err(e)) => {
                    report.fetch_failures += 1;
                    log::error!("Error checking permit {}: {}", permit.name, e);
                }
                Err(panic) => {
                    report.fetch_failures += 1;
                    log::error!(
                        "Checking permit {} panicked: {}",
                        permit.name,
                        panic_message(panic.as_ref())
                    );
                }
            }

            let is_last = idx + 1 == permits.len();
            if !is_last && !self.request_delay.is_zero() {
                tokio::select! {
                    biased;
                    _ = self.shutdown.cancelled() => {
                        report.interrupted = true;
                        break;
                    }
                    _ = tokio::time::sleep(self.request_delay) => {}
                }
            }
        }

        log::info!("Cycle complete: {}", report);
        report
    }

    async fn check_permit(
        &mut self,
        permit: &MonitoredPermit,
        now: DateTime<Utc>,
    ) -> Result<PermitOutcome> {
        let payload = self.source.fetch(&permit.id).await?;
        let result = interpret(permit.category, &payload);
        log::debug!("{} availability: {:?}", permit.name, result);

        if !result.available {
            let retracted = self.gate.retract_permit(&permit.id, now);
            for key in &retracted {
                log::info!(
                    "Removed {} permit for date {} from notified dates as it's no longer available",
                    permit.name,
                    key.date
                );
            }
            return Ok(if retracted.is_empty() {
                PermitOutcome::Unavailable
            } else {
                PermitOutcome::Retracted(retracted.len())
            });
        }

        let Some(date) = result.observed_date() else {
            log::warn!(
                "{} reports {} permits open on '{}', which is not a date; not alerting",
                permit.name,
                result.remaining,
                result.date_label()
            );
            return Ok(PermitOutcome::UnknownDate);
        };

        let key = NotificationKey::new(permit.id.as_str(), date);
        if !permit.wants_date(date) {
            log::debug!("{} open on {}, outside target dates", permit.name, date);
            return Ok(match self.gate.observe(&key, false, now) {
                GateDecision::Retracted => PermitOutcome::Retracted(1),
                _ => PermitOutcome::NotMatched,
            });
        }

        match self.gate.observe(&key, true, now) {
            GateDecision::ShouldNotify => {
                let message = alert_message(permit, &result);
                log::info!("{}", message);
                match self.notifier.send(&message).await {
                    Ok(()) => Ok(PermitOutcome::Notified),
                    Err(e) => {
                        log::error!(
                            "Failed to send permit availability notification for permit {} via {}: {}",
                            permit.id,
                            self.notifier.name(),
                            e
                        );
                        Ok(PermitOutcome::NotifyFailed)
                    }
                }
            }
            _ => {
                log::info!(
                    "Already notified about {} permit for date {}",
                    permit.name,
                    date
                );
                Ok(PermitOutcome::Suppressed)
            }
        }
    }
}

/// Best-effort text of a panic payload.
pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
