//! HTTP client for the FRED observations endpoint.
//!
//! Implements [`ObservationProvider`] against
//! `GET {base_url}/observations?series_id=…&observation_start=…&api_key=…&file_type=json`.
//!
//! # Response shape
//!
//! ```json
//! { "observations": [ { "date": "2020-01-01", "value": "21000" },
//!                     { "date": "2020-02-01", "value": "." } ] }
//! ```
//!
//! A response without an `observations` key is zero results, not an error.
//! Values are passed through unparsed; the job maps them with
//! [`fred_sync_core::observation::parse_value`].
//!
//! # Retry Strategy
//!
//! - HTTP 429 (rate limited) and 5xx (server error) → retry
//! - HTTP 4xx (client error, not 429) → fail immediately
//! - Network errors and timeouts → retry
//! - Backoff: base, 2×base, 4×base, … (capped at 2^5 × base; base = 1s)
//!
//! The API key is a query parameter, so request URLs are stripped from
//! transport errors before they are returned or logged.

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use chrono::NaiveDate;
use serde::Deserialize;
use std::time::Duration;

use fred_sync_core::models::ProviderObservation;
use fred_sync_core::provider::ObservationProvider;

use crate::config::Config;

/// FRED observations client.
pub struct FredClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    max_retries: u32,
    backoff_base: Duration,
}

impl FredClient {
    /// Build a client from configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if no API key is configured or the HTTP client
    /// cannot be built.
    pub fn from_config(config: &Config) -> Result<Self> {
        let api_key = config.api_key()?;
        Self::new(
            &config.provider.base_url,
            api_key,
            Duration::from_secs(config.provider.timeout_secs),
            config.provider.max_retries,
        )
    }

    pub fn new(
        base_url: &str,
        api_key: impl Into<String>,
        timeout: Duration,
        max_retries: u32,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            max_retries,
            backoff_base: Duration::from_secs(1),
        })
    }

    /// Override the first retry delay (doubles per attempt).
    pub fn with_backoff_base(mut self, base: Duration) -> Self {
        self.backoff_base = base;
        self
    }

    fn endpoint(&self) -> String {
        format!("{}/observations", self.base_url)
    }
}

#[derive(Deserialize)]
struct ObservationsResponse {
    #[serde(default)]
    observations: Option<Vec<RawObservation>>,
}

#[derive(Deserialize)]
struct RawObservation {
    date: String,
    #[serde(default)]
    value: serde_json::Value,
}

#[derive(Deserialize)]
struct ErrorResponse {
    #[serde(default)]
    error_message: Option<String>,
}

/// Decode a successful response body into provider points.
fn parse_observations_body(body: &str) -> Result<Vec<ProviderObservation>> {
    let parsed: ObservationsResponse =
        serde_json::from_str(body).context("Failed to decode observations response")?;

    parsed
        .observations
        .unwrap_or_default()
        .into_iter()
        .map(|raw| {
            let date = NaiveDate::parse_from_str(&raw.date, "%Y-%m-%d")
                .with_context(|| format!("invalid observation date: {}", raw.date))?;
            let raw_value = match raw.value {
                serde_json::Value::String(s) => s,
                serde_json::Value::Number(n) => n.to_string(),
                _ => ".".to_string(),
            };
            Ok(ProviderObservation { date, raw_value })
        })
        .collect()
}

/// Best-effort extraction of the provider's error message.
fn error_message(status: reqwest::StatusCode, body: &str) -> String {
    serde_json::from_str::<ErrorResponse>(body)
        .ok()
        .and_then(|e| e.error_message)
        .map(|m| format!("provider error {}: {}", status, m))
        .unwrap_or_else(|| format!("provider error {}", status))
}

#[async_trait]
impl ObservationProvider for FredClient {
    async fn fetch_observations(
        &self,
        series_id: &str,
        observation_start: NaiveDate,
    ) -> Result<Vec<ProviderObservation>> {
        let start = observation_start.format("%Y-%m-%d").to_string();
        let url = self.endpoint();
        let mut last_err = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let delay = self.backoff_base * (1u32 << (attempt - 1).min(5));
                tracing::debug!(series_id, attempt, delay_ms = delay.as_millis() as u64, "retrying provider request");
                tokio::time::sleep(delay).await;
            }

            let resp = self
                .client
                .get(&url)
                .query(&[
                    ("series_id", series_id),
                    ("observation_start", start.as_str()),
                    ("api_key", self.api_key.as_str()),
                    ("file_type", "json"),
                ])
                .send()
                .await;

            match resp {
                Ok(response) => {
                    let status = response.status();
                    let body = response
                        .text()
                        .await
                        .map_err(|e| anyhow!("failed to read provider response: {}", e.without_url()))?;

                    if status.is_success() {
                        return parse_observations_body(&body);
                    }

                    // Rate limited or server error: retry
                    if status.as_u16() == 429 || status.is_server_error() {
                        last_err = Some(anyhow!(error_message(status, &body)));
                        continue;
                    }

                    // Client error (not 429): fail now
                    bail!(error_message(status, &body));
                }
                Err(e) => {
                    last_err = Some(anyhow!("provider request failed: {}", e.without_url()));
                    continue;
                }
            }
        }

        Err(last_err.unwrap_or_else(|| anyhow!("provider request failed after retries")))
    }
}
