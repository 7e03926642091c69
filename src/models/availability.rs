//! Availability data structures.

use chrono::NaiveDate;
use serde::Serialize;

/// Raw availability document as returned by the upstream API.
pub type AvailabilityPayload = serde_json::Value;

/// Placeholder date used when an open entry carries no date.
pub const UNKNOWN_DATE: &str = "Unknown date";

/// Outcome of interpreting one availability document for one permit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AvailabilityResult {
    pub available: bool,
    /// Present only when `available` is true
    pub date: Option<String>,
    /// Zero unless `available` is true
    pub remaining: u32,
}

impl AvailabilityResult {
    pub fn unavailable() -> Self {
        Self {
            available: false,
            date: None,
            remaining: 0,
        }
    }

    pub fn open(date: impl Into<String>, remaining: u32) -> Self {
        Self {
            available: true,
            date: Some(date.into()),
            remaining,
        }
    }

    /// The reported date as a calendar date, if it can be determined.
    pub fn observed_date(&self) -> Option<NaiveDate> {
        if !self.available {
            return None;
        }
        let raw = self.date.as_deref()?.trim();
        // Upstream sometimes sends full timestamps
        let day = raw.split('T').next().unwrap_or(raw);
        NaiveDate::parse_from_str(day, "%Y-%m-%d").ok()
    }

    /// Date text for messages and logs.
    pub fn date_label(&self) -> &str {
        self.date.as_deref().unwrap_or(UNKNOWN_DATE)
    }
}
