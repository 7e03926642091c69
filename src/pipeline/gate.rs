//! Notification gate.
//!
//! Time-bounded deduplication of availability alerts keyed by
//! `(permit id, date)`.
//!
//! ## Invariant
//!
//! > A key is present if and only if an alert for that exact event was
//! > approved and has been neither swept by TTL nor retracted. While present,
//! > no second alert for the key is approved.
//!
//! The entry is inserted when the gate approves a send, before delivery is
//! attempted, and is not rolled back if delivery fails. A flaky transport can
//! lose an alert but cannot cause a burst of duplicates.

use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, Duration, NaiveDate, Utc};

/// Identity of one availability event.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NotificationKey {
    pub permit_id: String,
    pub date: NaiveDate,
}

impl NotificationKey {
    pub fn new(permit_id: impl Into<String>, date: NaiveDate) -> Self {
        Self {
            permit_id: permit_id.into(),
            date,
        }
    }
}

impl fmt::Display for NotificationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.permit_id, self.date)
    }
}

/// What the gate decided for one observation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    /// New event; the caller must send exactly one alert
    ShouldNotify,
    /// Event already alerted and still live
    SuppressedDuplicate,
    /// Event disappeared; its entry was removed
    Retracted,
    /// Nothing to do
    NoOp,
}

/// In-memory dedup cache owned by the poll cycle.
#[derive(Debug, Clone)]
pub struct NotificationGate {
    ttl: Duration,
    entries: HashMap<NotificationKey, DateTime<Utc>>,
}

impl NotificationGate {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: HashMap::new(),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Drop every entry whose `notified_at + ttl < now`. Returns how many expired.
    pub fn sweep(&mut self, now: DateTime<Utc>) -> usize {
        let ttl = self.ttl;
        let before = self.entries.len();
        self.entries
            .retain(|_, notified_at| *notified_at + ttl >= now);
        before - self.entries.len()
    }

    /// Record one observation of `key`.
    pub fn observe(
        &mut self,
        key: &NotificationKey,
        still_available: bool,
        now: DateTime<Utc>,
    ) -> GateDecision {
        if !still_available {
            return match self.entries.remove(key) {
                Some(_) => GateDecision::Retracted,
                None => GateDecision::NoOp,
            };
        }

        if self.entries.contains_key(key) {
            return GateDecision::SuppressedDuplicate;
        }
        self.entries.insert(key.clone(), now);
        GateDecision::ShouldNotify
    }

    /// Retract every live key for a permit that reported nothing open.
    pub fn retract_permit(&mut self, permit_id: &str, now: DateTime<Utc>) -> Vec<NotificationKey> {
        let mut keys: Vec<_> = self
            .entries
            .keys()
            .filter(|key| key.permit_id == permit_id)
            .cloned()
            .collect();
        keys.sort();
        keys.retain(|key| self.observe(key, false, now) == GateDecision::Retracted);
        keys
    }

    pub fn contains(&self, key: &NotificationKey) -> bool {
        self.entries.contains_key(key)
    }

    /// When `key` was last approved, if live.
    pub fn notified_at(&self, key: &NotificationKey) -> Option<DateTime<Utc>> {
        self.entries.get(key).copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
