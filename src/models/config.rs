//! Application configuration structures.

use std::collections::HashSet;
use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::models::{MonitoredPermit, PermitCategory};
use crate::utils::retry::RetryPolicy;

/// Upper bound for `notification.ttl_hours` (one year).
const MAX_TTL_HOURS: u64 = 24 * 366;

/// Upper bound for `scheduler.interval_minutes` (one week).
const MAX_INTERVAL_MINUTES: u64 = 7 * 24 * 60;

/// Root application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Polling cadence
    #[serde(default)]
    pub scheduler: SchedulerConfig,

    /// Upstream availability API settings
    #[serde(default)]
    pub api: ApiConfig,

    /// Backoff settings for availability fetches
    #[serde(default)]
    pub retry: RetryConfig,

    /// Alert deduplication and transport settings
    #[serde(default)]
    pub notification: NotificationConfig,

    #[serde(default)]
    pub logging: LoggingConfig,

    /// Permit catalog
    #[serde(default)]
    pub permits: Vec<PermitConfig>,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            AppError::config(format!("Cannot read config {}: {}", path.display(), e))
        })?;
        Self::from_toml(&content)
    }

    /// Parse configuration from TOML text.
    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Validate configuration values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        if self.scheduler.interval_minutes == 0
            || self.scheduler.interval_minutes > MAX_INTERVAL_MINUTES
        {
            return Err(AppError::validation(format!(
                "scheduler.interval_minutes must be between 1 and {MAX_INTERVAL_MINUTES}"
            )));
        }
        if self.api.user_agent.trim().is_empty() {
            return Err(AppError::validation("api.user_agent is empty"));
        }
        if self.api.timeout_secs == 0 {
            return Err(AppError::validation("api.timeout_secs must be > 0"));
        }
        crate::utils::parse_base_url(&self.api.base_url)
            .map_err(|e| AppError::validation(format!("api.base_url is invalid: {e}")))?;
        if self.retry.max_attempts == 0 {
            return Err(AppError::validation("retry.max_attempts must be > 0"));
        }
        if self.retry.initial_delay_ms > self.retry.max_delay_ms {
            return Err(AppError::validation(
                "retry.initial_delay_ms must not exceed retry.max_delay_ms",
            ));
        }
        if self.notification.ttl_hours == 0 || self.notification.ttl_hours > MAX_TTL_HOURS {
            return Err(AppError::validation(format!(
                "notification.ttl_hours must be between 1 and {MAX_TTL_HOURS}"
            )));
        }
        self.monitored_permits()?;
        Ok(())
    }

    /// Build the immutable permit catalog, resolving categories and dates.
    pub fn monitored_permits(&self) -> Result<Vec<MonitoredPermit>> {
        if self.permits.is_empty() {
            return Err(AppError::validation("No permits defined"));
        }

        let mut seen = HashSet::new();
        let mut permits = Vec::with_capacity(self.permits.len());
        for entry in &self.permits {
            if entry.id.trim().is_empty() {
                return Err(AppError::validation("permit id is empty"));
            }
            if entry.name.trim().is_empty() {
                return Err(AppError::validation(format!(
                    "permit {} has an empty name",
                    entry.id
                )));
            }
            if !seen.insert(entry.id.trim()) {
                return Err(AppError::validation(format!(
                    "permit {} is defined more than once",
                    entry.id
                )));
            }
            permits.push(entry.to_permit()?);
        }
        Ok(permits)
    }
}

/// Scheduler loop settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Minutes between the start of consecutive cycles
    #[serde(default = "defaults::interval_minutes")]
    pub interval_minutes: u64,
}

impl SchedulerConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_minutes.saturating_mul(60))
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            interval_minutes: defaults::interval_minutes(),
        }
    }
}

/// Upstream availability API settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Base URL; `<permit id>/availability` is appended
    #[serde(default = "defaults::base_url")]
    pub base_url: String,

    /// User-Agent header for HTTP requests
    #[serde(default = "defaults::user_agent")]
    pub user_agent: String,

    /// Per-attempt connect and read timeout in seconds
    #[serde(default = "defaults::timeout")]
    pub timeout_secs: u64,

    /// Pause between permits within a cycle in milliseconds
    #[serde(default = "defaults::request_delay")]
    pub request_delay_ms: u64,
}

impl ApiConfig {
    pub fn request_delay(&self) -> Duration {
        Duration::from_millis(self.request_delay_ms)
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: defaults::base_url(),
            user_agent: defaults::user_agent(),
            timeout_secs: defaults::timeout(),
            request_delay_ms: defaults::request_delay(),
        }
    }
}

/// Backoff settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    #[serde(default = "defaults::max_attempts")]
    pub max_attempts: u32,

    #[serde(default = "defaults::initial_delay")]
    pub initial_delay_ms: u64,

    #[serde(default = "defaults::max_delay")]
    pub max_delay_ms: u64,
}

impl RetryConfig {
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.max_attempts,
            Duration::from_millis(self.initial_delay_ms),
            Duration::from_millis(self.max_delay_ms),
        )
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: defaults::max_attempts(),
            initial_delay_ms: defaults::initial_delay(),
            max_delay_ms: defaults::max_delay(),
        }
    }
}

/// Notification settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationConfig {
    /// How long a sent alert suppresses repeats for the same permit and date
    #[serde(default = "defaults::ttl_hours")]
    pub ttl_hours: u64,

    /// Log messages instead of sending SMS; no credentials required
    #[serde(default)]
    pub test_mode: bool,
}

impl NotificationConfig {
    pub fn ttl(&self) -> chrono::Duration {
        chrono::Duration::hours(self.ttl_hours.min(MAX_TTL_HOURS) as i64)
    }
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            ttl_hours: defaults::ttl_hours(),
            test_mode: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "defaults::log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: defaults::log_level(),
        }
    }
}

/// One `[[permits]]` entry as written in the config file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PermitConfig {
    /// Recreation.gov permit id
    pub id: String,

    /// Display name used in alerts
    pub name: String,

    /// Booking page included in alerts
    #[serde(default)]
    pub url: String,

    /// Dates of interest (YYYY-MM-DD); empty means any date
    #[serde(default)]
    pub dates: Vec<String>,

    /// Response dialect; inferred from the id when omitted
    #[serde(default)]
    pub category: Option<PermitCategory>,
}

impl PermitConfig {
    fn to_permit(&self) -> Result<MonitoredPermit> {
        let id = self.id.trim();
        let category = self
            .category
            .unwrap_or_else(|| PermitCategory::from_permit_id(id));
        let target_dates = MonitoredPermit::parse_dates(&self.dates).map_err(|bad| {
            AppError::validation(format!("permit {id} has an invalid date '{bad}'"))
        })?;

        Ok(MonitoredPermit::new(
            id,
            self.name.trim(),
            self.url.trim(),
            target_dates,
            category,
        ))
    }
}

mod defaults {
    pub fn interval_minutes() -> u64 {
        5
    }

    // API defaults
    pub fn base_url() -> String {
        "https://www.recreation.gov/api/permits/".into()
    }
    pub fn user_agent() -> String {
        "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
         (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36"
            .into()
    }
    pub fn timeout() -> u64 {
        10
    }
    pub fn request_delay() -> u64 {
        1000
    }

    // Retry defaults
    pub fn max_attempts() -> u32 {
        3
    }
    pub fn initial_delay() -> u64 {
        1000
    }
    pub fn max_delay() -> u64 {
        10_000
    }

    pub fn ttl_hours() -> u64 {
        24
    }

    pub fn log_level() -> String {
        "info".into()
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use chrono::NaiveDate;

    use super::*;

    const SAMPLE: &str = r#"
        [scheduler]
        interval_minutes = 10

        [retry]
        max_attempts = 4

        [[permits]]
        id = "233260"
        name = "Enchantments"
        url = "https://www.recreation.gov/permits/233260"
        dates = ["2024-08-01", "2024-08-02"]

        [[permits]]
        id = "999999"
        name = "Somewhere Else"
        category = "mount_whitney"
    "#;

    fn sample() -> Config {
        Config::from_toml(SAMPLE).unwrap()
    }

    #[test]
    fn parses_sample_with_defaults() {
        let config = sample();
        assert_eq!(config.scheduler.interval(), Duration::from_secs(600));
        assert_eq!(config.retry.max_attempts, 4);
        assert_eq!(config.retry.initial_delay_ms, 1000);
        assert_eq!(config.api.timeout_secs, 10);
        assert_eq!(config.api.request_delay(), Duration::from_secs(1));
        assert_eq!(config.notification.ttl(), chrono::Duration::hours(24));
        assert!(!config.notification.test_mode);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn builds_catalog_with_categories_and_dates() {
        let permits = sample().monitored_permits().unwrap();
        assert_eq!(permits.len(), 2);

        assert_eq!(permits[0].category, PermitCategory::Enchantments);
        assert!(permits[0].has_target_dates());
        assert!(
            permits[0]
                .target_dates
                .contains(&NaiveDate::from_ymd_opt(2024, 8, 2).unwrap())
        );

        assert_eq!(permits[1].category, PermitCategory::MountWhitney);
        assert!(!permits[1].has_target_dates());
    }

    #[test]
    fn validate_rejects_empty_catalog() {
        let config = Config::default();
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_bad_date() {
        let mut config = sample();
        config.permits[0].dates.push("2024-13-45".into());
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("2024-13-45"));
    }

    #[test]
    fn validate_rejects_duplicate_ids() {
        let mut config = sample();
        let dup = config.permits[0].clone();
        config.permits.push(dup);
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_inverted_delays() {
        let mut config = sample();
        config.retry.initial_delay_ms = 20_000;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_zero_interval() {
        let mut config = sample();
        config.scheduler.interval_minutes = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_oversized_interval() {
        let mut config = sample();
        config.scheduler.interval_minutes = 4_611_686_018_427_387_904;
        assert!(matches!(config.validate(), Err(AppError::Validation(_))));
        // Never panics, even for values validation would reject
        assert_eq!(
            config.scheduler.interval(),
            Duration::from_secs(u64::MAX)
        );

        config.scheduler.interval_minutes = MAX_INTERVAL_MINUTES;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn load_reads_file_and_reports_missing() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();
        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.permits.len(), 2);

        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("absent.toml");
        assert!(matches!(Config::load(&missing), Err(AppError::Config(_))));
    }

    #[test]
    fn load_rejects_unparseable_toml() {
        assert!(matches!(
            Config::from_toml("[[permits]]\nid = 5"),
            Err(AppError::Toml(_))
        ));
    }
}
