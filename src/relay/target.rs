//! HTTP client for submitting registration batches to the target relay.

use super::types::{SignedRegistration, SubmissionOutcome, SubmitStatus, TargetError};
use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;
use tracing::debug;

/// Write side of the sync loop. A single record's rejection never fails the
/// whole call; the outcome sequence covers every record in the batch so the
/// caller can retry selectively. Only a connection-level failure (or a
/// non-success status) fails the call as a whole.
#[async_trait]
pub trait TargetRelay: Send + Sync {
    async fn submit(
        &self,
        batch: &[SignedRegistration],
    ) -> Result<Vec<SubmissionOutcome>, TargetError>;
}

/// Per-record status entry some relays return for a batch submission.
#[derive(Debug, Deserialize)]
struct OutcomeEntry {
    pubkey: String,
    status: String,
    #[serde(default)]
    reason: Option<String>,
}

/// Target relay client over the builder validators endpoint.
pub struct TargetClient {
    http_client: Client,
    url: Url,
}

impl TargetClient {
    pub fn new(url: Url, request_timeout: Duration) -> Self {
        let http_client = Client::builder()
            .timeout(request_timeout)
            .build()
            .expect("Failed to create HTTP client");

        Self { http_client, url }
    }
}

#[async_trait]
impl TargetRelay for TargetClient {
    async fn submit(
        &self,
        batch: &[SignedRegistration],
    ) -> Result<Vec<SubmissionOutcome>, TargetError> {
        debug!(url = %self.url, count = batch.len(), "posting registrations to target relay");

        let response = self
            .http_client
            .post(self.url.clone())
            .json(&batch)
            .send()
            .await
            .map_err(|e| TargetError::Unavailable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let snippet: String = body.chars().take(200).collect();
            return Err(TargetError::Unavailable(format!("HTTP {status}: {snippet}")));
        }

        let body = response
            .text()
            .await
            .map_err(|e| TargetError::Unavailable(e.to_string()))?;

        // A bare 2xx with no outcome body means the relay accepted the whole
        // batch. When a per-record body is present, map it; records the relay
        // did not mention are accepted, unknown status strings stay
        // unresolved and get retried next cycle.
        let reported: Vec<OutcomeEntry> = if body.trim().is_empty() {
            Vec::new()
        } else {
            serde_json::from_str(&body).unwrap_or_default()
        };

        let mut by_pubkey: HashMap<String, SubmitStatus> = HashMap::new();
        for entry in reported {
            let status = match entry.status.as_str() {
                "accepted" => SubmitStatus::Accepted,
                "rejected" => SubmitStatus::Rejected(
                    entry.reason.unwrap_or_else(|| "unspecified".to_string()),
                ),
                other => {
                    debug!(pubkey = %entry.pubkey, status = other, "unrecognized outcome status");
                    SubmitStatus::Transient
                }
            };
            by_pubkey.insert(entry.pubkey, status);
        }

        let outcomes = batch
            .iter()
            .map(|record| SubmissionOutcome {
                pubkey: record.message.pubkey.clone(),
                status: by_pubkey
                    .remove(&record.message.pubkey)
                    .unwrap_or(SubmitStatus::Accepted),
            })
            .collect();

        Ok(outcomes)
    }
}
