//! Monitored permit definitions.

use std::collections::BTreeSet;
use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Response dialect of a permit's availability endpoint.
///
/// Resolved once at startup. `Unknown` permits are always reported
/// unavailable rather than guessed at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PermitCategory {
    Enchantments,
    MountWhitney,
    Unknown,
}

impl PermitCategory {
    /// Infer the category from a well-known Recreation.gov permit id.
    pub fn from_permit_id(id: &str) -> Self {
        match id {
            "233260" => Self::Enchantments,
            "445859" => Self::MountWhitney,
            _ => Self::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Enchantments => "enchantments",
            Self::MountWhitney => "mount_whitney",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for PermitCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A permit being watched for open dates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonitoredPermit {
    /// Upstream lookup key
    pub id: String,
    pub name: String,
    /// Booking page
    pub url: String,
    /// Dates of interest; empty means any date qualifies
    pub target_dates: BTreeSet<NaiveDate>,
    pub category: PermitCategory,
}

impl MonitoredPermit {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        url: impl Into<String>,
        target_dates: BTreeSet<NaiveDate>,
        category: PermitCategory,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            url: url.into(),
            target_dates,
            category,
        }
    }

    pub fn has_target_dates(&self) -> bool {
        !self.target_dates.is_empty()
    }

    /// True when `date` is one this permit should alert on.
    pub fn wants_date(&self, date: NaiveDate) -> bool {
        !self.has_target_dates() || self.target_dates.contains(&date)
    }

    /// Parse `YYYY-MM-DD` strings, returning the first offending input on failure.
    pub fn parse_dates<S: AsRef<str>>(
        dates: &[S],
    ) -> std::result::Result<BTreeSet<NaiveDate>, String> {
        dates
            .iter()
            .map(|raw| {
                let raw = raw.as_ref().trim();
                NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|_| raw.to_string())
            })
            .collect()
    }
}
