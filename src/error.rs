// src/error.rs

//! Unified error handling for the permit watcher.

use std::fmt;

use thiserror::Error;

use crate::utils::retry::RetryError;

/// Result type alias for watcher operations.
pub type Result<T> = std::result::Result<T, AppError>;

/// Unified application error type.
#[derive(Error, Debug)]
pub enum AppError {
    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Upstream could not be reached (connect, timeout, or body read failure)
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Upstream answered with a non-success status
    #[error("Upstream returned HTTP {code}")]
    UpstreamStatus { code: u16 },

    /// Upstream answered with a success status but no body
    #[error("Empty response from upstream")]
    EmptyResponse,

    /// Response body is not a well-formed availability document
    #[error("Malformed payload: {0}")]
    MalformedPayload(String),

    /// Every attempt allowed by the retry budget failed
    #[error("Gave up after {attempts} attempts: {source}")]
    RetriesExhausted {
        attempts: u32,
        #[source]
        source: Box<AppError>,
    },

    /// Shutdown was requested while waiting
    #[error("Operation cancelled by shutdown")]
    Cancelled,

    /// Outbound notification could not be delivered
    #[error("Notification error: {0}")]
    Notification(String),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing failed
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// URL parsing failed
    #[error("URL parse error: {0}")]
    Url(#[from] url::ParseError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Data validation error
    #[error("Validation error: {0}")]
    Validation(String),
}

impl AppError {
    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Create a malformed payload error.
    pub fn malformed(message: impl fmt::Display) -> Self {
        Self::MalformedPayload(message.to_string())
    }

    /// Create a notification delivery error.
    pub fn notification(message: impl fmt::Display) -> Self {
        Self::Notification(message.to_string())
    }

    /// True when the retry budget ran out.
    pub fn is_exhausted(&self) -> bool {
        matches!(self, Self::RetriesExhausted { .. })
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

impl From<RetryError<AppError>> for AppError {
    fn from(err: RetryError<AppError>) -> Self {
        match err {
            RetryError::Exhausted {
                attempts,
                last_error,
            } => Self::RetriesExhausted {
                attempts,
                source: Box::new(last_error),
            },
            RetryError::Cancelled => Self::Cancelled,
        }
    }
}
