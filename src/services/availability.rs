// src/services/availability.rs

//! Recreation.gov availability client.
//!
//! Fetches `GET <base>/<permit id>/availability`. Transport failures,
//! non-success statuses and empty bodies are retried with exponential
//! backoff; a body that is not a JSON object fails immediately.

use async_trait::async_trait;
use reqwest::Client;
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::error::{AppError, Result};
use crate::models::{ApiConfig, AvailabilityPayload};
use crate::utils::http::create_async_client;
use crate::utils::retry::{RetryPolicy, retry};
use crate::utils::{parse_base_url, resolve_url};

/// Anything that can produce a raw availability document for a permit id.
#[async_trait]
pub trait AvailabilitySource: Send + Sync {
    async fn fetch(&self, permit_id: &str) -> Result<AvailabilityPayload>;
}

/// HTTP client for the upstream availability API.
pub struct AvailabilityClient {
    client: Client,
    base_url: Url,
    retry: RetryPolicy,
    shutdown: CancellationToken,
}

impl AvailabilityClient {
    /// Create a client from API settings.
    ///
    /// `shutdown` aborts a pending backoff sleep; a request already in
    /// flight is allowed to finish.
    pub fn new(config: &ApiConfig, retry: RetryPolicy, shutdown: CancellationToken) -> Result<Self> {
        Ok(Self {
            client: create_async_client(config)?,
            base_url: parse_base_url(&config.base_url)?,
            retry,
            shutdown,
        })
    }

    /// Endpoint for a single permit.
    pub fn availability_url(&self, permit_id: &str) -> Result<Url> {
        resolve_url(&self.base_url, &format!("{}/availability", permit_id.trim()))
    }

    /// One attempt: returns the raw body text.
    async fn fetch_body(&self, url: &Url) -> Result<String> {
        let response = self.client.get(url.clone()).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(AppError::UpstreamStatus {
                code: status.as_u16(),
            });
        }

        let body = response.text().await?;
        if body.trim().is_empty() {
            return Err(AppError::EmptyResponse);
        }
        Ok(body)
    }

    fn parse_body(body: &str) -> Result<AvailabilityPayload> {
        let payload: AvailabilityPayload = serde_json::from_str(body).map_err(AppError::malformed)?;
        if !payload.is_object() {
            return Err(AppError::malformed("expected a JSON object at top level"));
        }
        Ok(payload)
    }
}

#[async_trait]
impl AvailabilitySource for AvailabilityClient {
    async fn fetch(&self, permit_id: &str) -> Result<AvailabilityPayload> {
        let url = self.availability_url(permit_id)?;
        log::debug!("Fetching permit availability from {}", url);

        let url = &url;
        let body = retry(&self.retry, &self.shutdown, || async move {
            self.fetch_body(url).await.inspect_err(|e| {
                log::debug!("Availability request for {} failed: {}", permit_id, e);
            })
        })
        .await?;

        Self::parse_body(&body)
    }
}
