//! Pipeline entry points for the permit watcher.
//!
//! - `run_watcher`: poll every permit on a schedule until shutdown
//! - `check_once`: run a single poll cycle and return its report
//! - `send_test_message`: verify the notification transport

pub mod check;
pub mod gate;
pub mod scheduler;

pub use check::{CycleReport, PermitChecker, PermitOutcome, alert_message};
pub use gate::{GateDecision, NotificationGate, NotificationKey};
pub use scheduler::Scheduler;

use tokio_util::sync::CancellationToken;

use crate::error::Result;
use crate::models::{Config, MonitoredPermit, PermitCategory};
use crate::services::{
    AvailabilityClient, LogNotifier, Notifier, TEST_MESSAGE, TwilioCredentials, TwilioNotifier,
};

/// Pick the notification transport for `config`.
///
/// Test mode logs messages instead of sending them. Otherwise Twilio
/// credentials must be present in the environment.
pub fn build_notifier(config: &Config) -> Result<Box<dyn Notifier>> {
    if config.notification.test_mode {
        log::info!("Test mode enabled: notifications will be logged, not sent");
        return Ok(Box::new(LogNotifier::new()));
    }

    let credentials = TwilioCredentials::from_env()?;
    log::info!(
        "Twilio client initialized (account {}, sending to {})",
        credentials.account_sid,
        credentials.to_number
    );
    Ok(Box::new(TwilioNotifier::new(credentials)?))
}

/// Validate `config` and assemble a checker wired to the real upstream.
pub fn build_checker(config: &Config, shutdown: CancellationToken) -> Result<PermitChecker> {
    config.validate()?;
    let permits = config.monitored_permits()?;
    warn_unknown_categories(&permits);

    let notifier = build_notifier(config)?;
    let source = AvailabilityClient::new(&config.api, config.retry.policy(), shutdown.clone())?;

    Ok(PermitChecker::new(
        permits,
        Box::new(source),
        notifier,
        NotificationGate::new(config.notification.ttl()),
    )
    .with_request_delay(config.api.request_delay())
    .with_shutdown(shutdown))
}

fn warn_unknown_categories(permits: &[MonitoredPermit]) {
    for permit in permits {
        if permit.category == PermitCategory::Unknown {
            log::warn!(
                "Permit {} ({}) has no known response format; it will always be reported unavailable",
                permit.id,
                permit.name
            );
        }
    }
}

/// Poll every configured permit until `shutdown` fires. Returns the number of
/// cycles run.
pub async fn run_watcher(config: &Config, shutdown: CancellationToken) -> Result<usize> {
    let mut checker = build_checker(config, shutdown.clone())?;

    for permit in checker.permits() {
        if permit.has_target_dates() {
            let dates: Vec<String> = permit.target_dates.iter().map(|d| d.to_string()).collect();
            log::info!("Monitoring {} for dates: {}", permit.name, dates.join(", "));
        } else {
            log::info!("Monitoring {} for any open date", permit.name);
        }
    }

    let scheduler = Scheduler::new(config.scheduler.interval(), shutdown);
    Ok(scheduler.run(&mut checker).await)
}

/// Run a single poll cycle.
pub async fn check_once(config: &Config, shutdown: CancellationToken) -> Result<CycleReport> {
    let mut checker = build_checker(config, shutdown)?;
    Ok(checker.run_cycle().await)
}

/// Send the fixed test message through the configured transport.
pub async fn send_test_message(config: &Config) -> Result<()> {
    let notifier = build_notifier(config)?;
    notifier.send(TEST_MESSAGE).await?;
    log::info!("Test message sent via {}", notifier.name());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_mode_config() -> Config {
        Config::from_toml(
            r#"
            [notification]
            test_mode = true

            [[permits]]
            id = "233260"
            name = "Enchantments"
            url = "https://www.recreation.gov/permits/233260"
            dates = ["2024-08-01"]

            [[permits]]
            id = "999"
            name = "Somewhere"
            "#,
        )
        .unwrap()
    }

    #[test]
    fn test_mode_uses_log_notifier() {
        let notifier = build_notifier(&test_mode_config()).unwrap();
        assert_eq!(notifier.name(), "log");
    }

    #[test]
    fn build_checker_resolves_catalog() {
        let checker = build_checker(&test_mode_config(), CancellationToken::new()).unwrap();

        let permits = checker.permits();
        assert_eq!(permits.len(), 2);
        assert_eq!(permits[0].category, PermitCategory::Enchantments);
        assert_eq!(permits[1].category, PermitCategory::Unknown);
        assert_eq!(checker.gate().ttl(), chrono::Duration::hours(24));
    }

    #[test]
    fn build_checker_rejects_empty_catalog() {
        let config = Config::from_toml("[notification]\ntest_mode = true\n").unwrap();
        assert!(build_checker(&config, CancellationToken::new()).is_err());
    }

    #[tokio::test]
    async fn test_message_goes_through_log_notifier() {
        send_test_message(&test_mode_config()).await.unwrap();
    }
}
