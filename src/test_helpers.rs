//! Stub collaborators shared by unit tests.

use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::NaiveDate;
use serde_json::json;
use tokio_util::sync::CancellationToken;

use crate::error::{AppError, Result};
use crate::models::{AvailabilityPayload, MonitoredPermit, PermitCategory};
use crate::services::{AvailabilitySource, Notifier};

pub fn date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

pub fn enchantments(dates: &[&str]) -> MonitoredPermit {
    MonitoredPermit::new(
        "233260",
        "Enchantments",
        "https://www.recreation.gov/permits/233260",
        dates.iter().map(|d| date(d)).collect::<BTreeSet<_>>(),
        PermitCategory::Enchantments,
    )
}

pub fn whitney() -> MonitoredPermit {
    MonitoredPermit::new(
        "445859",
        "Mount Whitney",
        "",
        BTreeSet::new(),
        PermitCategory::MountWhitney,
    )
}

/// `{"availability": [{"date": d, "remaining": n}, ...]}`
pub fn payload(entries: &[(&str, i64)]) -> AvailabilityPayload {
    let list: Vec<_> = entries
        .iter()
        .map(|(d, n)| json!({"date": d, "remaining": n}))
        .collect();
    json!({ "availability": list })
}

/// Canned response for one permit id.
#[derive(Debug, Clone)]
pub enum Scripted {
    Payload(AvailabilityPayload),
    /// Every attempt failed with a 503
    Exhausted,
    Malformed,
    /// Shutdown arrived during a retry backoff sleep
    Cancelled,
    Panic,
}

#[derive(Default)]
struct SourceState {
    responses: HashMap<String, Scripted>,
    calls: Vec<String>,
}

/// Availability source answering from a per-id script.
#[derive(Clone, Default)]
pub struct ScriptedSource {
    state: Arc<Mutex<SourceState>>,
    cancel_after: Arc<Mutex<Option<(usize, CancellationToken)>>>,
}

impl ScriptedSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, permit_id: &str, response: Scripted) {
        self.state
            .lock()
            .unwrap()
            .responses
            .insert(permit_id.to_string(), response);
    }

    /// Cancel `token` once `fetches` calls have been made.
    pub fn cancel_after(&self, fetches: usize, token: CancellationToken) {
        *self.cancel_after.lock().unwrap() = Some((fetches, token));
    }

    /// Permit ids fetched so far, in order.
    pub fn calls(&self) -> Vec<String> {
        self.state.lock().unwrap().calls.clone()
    }
}

#[async_trait]
impl AvailabilitySource for ScriptedSource {
    async fn fetch(&self, permit_id: &str) -> Result<AvailabilityPayload> {
        let (response, call_count) = {
            let mut state = self.state.lock().unwrap();
            state.calls.push(permit_id.to_string());
            (state.responses.get(permit_id).cloned(), state.calls.len())
        };

        if let Some((limit, token)) = self.cancel_after.lock().unwrap().as_ref() {
            if call_count >= *limit {
                token.cancel();
            }
        }

        match response {
            Some(Scripted::Payload(p)) => Ok(p),
            Some(Scripted::Exhausted) | None => Err(AppError::RetriesExhausted {
                attempts: 3,
                source: Box::new(AppError::UpstreamStatus { code: 503 }),
            }),
            Some(Scripted::Malformed) => Err(AppError::malformed("expected value at line 1")),
            Some(Scripted::Cancelled) => Err(AppError::Cancelled),
            Some(Scripted::Panic) => panic!("scripted panic for {permit_id}"),
        }
    }
}

/// Notifier that records every message; can be switched to fail.
#[derive(Clone, Default)]
pub struct RecordingNotifier {
    sent: Arc<Mutex<Vec<String>>>,
    attempts: Arc<AtomicUsize>,
    failing: Arc<AtomicBool>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Successfully delivered messages.
    pub fn sent(&self) -> Vec<String> {
        self.sent.lock().unwrap().clone()
    }

    /// Send calls, successful or not.
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    fn name(&self) -> &str {
        "recording"
    }

    async fn send(&self, body: &str) -> Result<()> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            return Err(AppError::notification("carrier rejected message"));
        }
        self.sent.lock().unwrap().push(body.to_string());
        Ok(())
    }
}
