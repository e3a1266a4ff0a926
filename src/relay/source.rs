//! HTTP client for reading the source relay's known registrations.
//!
//! The source client is a pure I/O boundary: one bounded-timeout GET per
//! call, no retries. Retry policy belongs to the sync engine.

use super::types::{SignedRegistration, SourceError, ValidatorEntry};
use async_trait::async_trait;
use reqwest::{Client, Url};
use std::time::Duration;
use tracing::{debug, warn};

/// Read side of the sync loop: the current set of registrations known to the
/// source relay.
#[async_trait]
pub trait SourceRelay: Send + Sync {
    async fn fetch_all(&self) -> Result<Vec<SignedRegistration>, SourceError>;
}

/// Source relay client over the builder validators endpoint.
pub struct SourceClient {
    http_client: Client,
    url: Url,
}

impl SourceClient {
    /// `request_timeout` must be strictly shorter than the scheduler interval
    /// so a slow fetch cannot overrun the next scheduled tick.
    pub fn new(url: Url, request_timeout: Duration) -> Self {
        let http_client = Client::builder()
            .timeout(request_timeout)
            .build()
            .expect("Failed to create HTTP client");

        Self { http_client, url }
    }
}

#[async_trait]
impl SourceRelay for SourceClient {
    async fn fetch_all(&self) -> Result<Vec<SignedRegistration>, SourceError> {
        debug!(url = %self.url, "fetching registrations from source relay");

        let response = self
            .http_client
            .get(self.url.clone())
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|e| SourceError::Unavailable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::Unavailable(format!("HTTP {status}")));
        }

        let body = response
            .text()
            .await
            .map_err(|e| SourceError::Unavailable(e.to_string()))?;

        let raw: Vec<serde_json::Value> =
            serde_json::from_str(&body).map_err(|e| SourceError::Format(e.to_string()))?;

        // Entries that do not match the registration schema are dropped
        // individually rather than failing the whole fetch.
        let mut records = Vec::with_capacity(raw.len());
        let mut dropped = 0usize;
        for value in raw {
            match serde_json::from_value::<ValidatorEntry>(value) {
                Ok(entry) => records.push(entry.entry),
                Err(e) => {
                    debug!("skipping source entry with unexpected structure: {e}");
                    dropped += 1;
                }
            }
        }
        if dropped > 0 {
            warn!(dropped, "dropped source entries with unexpected structure");
        }

        debug!(count = records.len(), "fetched registrations");
        Ok(records)
    }
}
