//! Configuration surface for the sync daemon.
//!
//! Validation here is the only fatal error path in the process: a malformed
//! relay URL or a zero interval ends the run at startup, while everything
//! after startup is retried cycle by cycle.

use reqwest::Url;
use std::time::Duration;

/// Path on the source relay serving the known registration set.
const SOURCE_VALIDATORS_PATH: &str = "/relay/v1/builder/validators";
/// Path on the target relay accepting registration batches.
const TARGET_VALIDATORS_PATH: &str = "/eth/v1/builder/validators";

/// Validated endpoints and timing for the sync loop.
#[derive(Debug, Clone)]
pub struct Config {
    /// Full source read endpoint. Credentials embedded in the URL are passed
    /// through unmodified.
    pub source_url: Url,
    /// Full target write endpoint.
    pub target_url: Url,
    /// Wall-clock interval between cycles.
    pub interval: Duration,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid {name} relay URL {url:?}: {reason}")]
    InvalidUrl {
        name: &'static str,
        url: String,
        reason: String,
    },

    #[error("interval must be a positive number of seconds")]
    NonPositiveInterval,
}

impl Config {
    pub fn new(source: &str, target: &str, interval_secs: u64) -> Result<Self, ConfigError> {
        if interval_secs == 0 {
            return Err(ConfigError::NonPositiveInterval);
        }

        let source_url = parse_endpoint("source", source, SOURCE_VALIDATORS_PATH)?;
        let target_url = parse_endpoint("target", target, TARGET_VALIDATORS_PATH)?;

        Ok(Self {
            source_url,
            target_url,
            interval: Duration::from_secs(interval_secs),
        })
    }

    /// Timeout for one relay call, strictly shorter than the interval so a
    /// slow fetch or post cannot overrun the next scheduled tick.
    pub fn request_timeout(&self) -> Duration {
        self.interval * 4 / 5
    }
}

/// Append the well-known endpoint path when the operator supplied a bare
/// relay URL.
fn parse_endpoint(name: &'static str, url: &str, path: &str) -> Result<Url, ConfigError> {
    let trimmed = url.trim_end_matches('/');
    let full = if trimmed.ends_with(path) {
        trimmed.to_string()
    } else {
        format!("{trimmed}{path}")
    };

    Url::parse(&full).map_err(|e| ConfigError::InvalidUrl {
        name,
        url: url.to_string(),
        reason: e.to_string(),
    })
}
