// src/models/mod.rs

//! Domain models for the permit watcher.

mod availability;
mod config;
mod permit;

// Re-export all public types
pub use availability::{AvailabilityPayload, AvailabilityResult, UNKNOWN_DATE};
pub use config::{
    ApiConfig, Config, LoggingConfig, NotificationConfig, PermitConfig, RetryConfig,
    SchedulerConfig,
};
pub use permit::{MonitoredPermit, PermitCategory};
