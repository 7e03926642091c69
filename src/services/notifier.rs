// src/services/notifier.rs

//! Outbound text notifications.
//!
//! - `TwilioNotifier`: sends SMS through the Twilio REST API
//! - `LogNotifier`: test mode, logs and records messages instead of sending

use std::sync::Mutex;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use crate::error::{AppError, Result};
use crate::utils::http::create_notify_client;

const TWILIO_API_BASE: &str = "https://api.twilio.com/2010-04-01";
const SEND_TIMEOUT_SECS: u64 = 15;

/// Body of the message sent by the `test-sms` command.
pub const TEST_MESSAGE: &str = "Test message from Permit Status Checker. \
     If you receive this, SMS notifications are working correctly!";

/// A transport for one-line text alerts.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Short transport name for logs
    fn name(&self) -> &str;

    /// Deliver `body` to the configured destination.
    async fn send(&self, body: &str) -> Result<()>;
}

/// Twilio account and phone numbers.
#[derive(Clone)]
pub struct TwilioCredentials {
    pub account_sid: String,
    pub api_key_sid: String,
    pub api_key_secret: String,
    /// Sending Twilio number
    pub from_number: String,
    /// Destination phone number
    pub to_number: String,
}

impl TwilioCredentials {
    /// Read credentials from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read credentials through `lookup`, failing on the first missing or blank value.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let require = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .ok_or_else(|| AppError::config(format!("{key} environment variable is not set")))
        };

        Ok(Self {
            account_sid: require("TWILIO_ACCOUNT_SID")?,
            api_key_sid: require("TWILIO_API_KEY_SID")?,
            api_key_secret: require("TWILIO_API_KEY_SECRET")?,
            from_number: require("TWILIO_PHONE_NUMBER")?,
            to_number: require("NOTIFICATION_PHONE_NUMBER")?,
        })
    }
}

impl std::fmt::Debug for TwilioCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TwilioCredentials")
            .field("account_sid", &self.account_sid)
            .field("api_key_sid", &self.api_key_sid)
            .field("api_key_secret", &"***")
            .field("from_number", &self.from_number)
            .field("to_number", &self.to_number)
            .finish()
    }
}

#[derive(Debug, Deserialize)]
struct MessageResource {
    sid: String,
}

/// SMS notifier backed by the Twilio Messages API.
pub struct TwilioNotifier {
    client: Client,
    credentials: TwilioCredentials,
    api_base: String,
}

impl TwilioNotifier {
    pub fn new(credentials: TwilioCredentials) -> Result<Self> {
        Self::with_api_base(credentials, TWILIO_API_BASE)
    }

    /// Point the notifier at a different API root.
    pub fn with_api_base(credentials: TwilioCredentials, api_base: &str) -> Result<Self> {
        Ok(Self {
            client: create_notify_client(SEND_TIMEOUT_SECS)?,
            credentials,
            api_base: api_base.trim_end_matches('/').to_string(),
        })
    }

    fn messages_url(&self) -> String {
        format!(
            "{}/Accounts/{}/Messages.json",
            self.api_base, self.credentials.account_sid
        )
    }
}

#[async_trait]
impl Notifier for TwilioNotifier {
    fn name(&self) -> &str {
        "twilio"
    }

    async fn send(&self, body: &str) -> Result<()> {
        let form = [
            ("To", self.credentials.to_number.as_str()),
            ("From", self.credentials.from_number.as_str()),
            ("Body", body),
        ];

        let response = self
            .client
            .post(self.messages_url())
            .basic_auth(
                &self.credentials.api_key_sid,
                Some(&self.credentials.api_key_secret),
            )
            .form(&form)
            .send()
            .await
            .map_err(AppError::notification)?;

        let status = response.status();
        let text = response.text().await.map_err(AppError::notification)?;
        if !status.is_success() {
            return Err(AppError::notification(format!(
                "Twilio returned HTTP {}: {}",
                status.as_u16(),
                text.trim()
            )));
        }

        match serde_json::from_str::<MessageResource>(&text) {
            Ok(message) => log::info!("SMS notification sent. Message SID: {}", message.sid),
            Err(_) => log::info!("SMS notification sent."),
        }
        Ok(())
    }
}

/// Test-mode notifier: logs each message and keeps the last one.
#[derive(Debug, Default)]
pub struct LogNotifier {
    last_message: Mutex<Option<String>>,
}

impl LogNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Most recent message body, if any.
    pub fn last_message(&self) -> Option<String> {
        self.last_message
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl Notifier for LogNotifier {
    fn name(&self) -> &str {
        "log"
    }

    async fn send(&self, body: &str) -> Result<()> {
        log::info!("[TEST MODE] SMS notification would be sent: {}", body);
        if let Ok(mut last) = self.last_message.lock() {
            *last = Some(body.to_string());
        }
        Ok(())
    }
}
