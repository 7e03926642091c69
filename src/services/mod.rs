//! Service layer for the permit watcher.
//!
//! This module contains:
//! - Upstream availability fetching (`AvailabilityClient`)
//! - Response interpretation per permit category (`interpret`)
//! - Alert delivery (`TwilioNotifier`, `LogNotifier`)

mod availability;
mod interpreter;
mod notifier;

pub use availability::{AvailabilityClient, AvailabilitySource};
pub use interpreter::interpret;
pub use notifier::{LogNotifier, Notifier, TEST_MESSAGE, TwilioCredentials, TwilioNotifier};
