//! One fetch→filter→submit→reconcile cycle against the relay pair.
//!
//! The engine owns the sync state and drives a single cycle at a time:
//! fetch the full registration set from the source, drop malformed records,
//! keep only records strictly newer than what was already forwarded, submit
//! that delta in one batch (retrying connection-level failures under a fixed
//! bound), and fold the per-record outcomes back into the state. A cycle
//! always terminates in a `CycleResult`; nothing here ends the process.

use crate::relay::{
    SignedRegistration, SourceRelay, SubmissionOutcome, SubmitStatus, TargetError, TargetRelay,
};
use crate::sync::state::SyncState;
use std::collections::HashMap;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Retry bounds for target submission within one cycle.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts, including the first one.
    pub max_attempts: u32,
    /// Delay before the second attempt.
    pub base_delay: Duration,
    /// Multiplier applied to the delay after each failed attempt.
    pub factor: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
            factor: 2,
        }
    }
}

/// How a cycle ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    /// Fetch and submission both completed; individual records may still
    /// have been rejected.
    Completed,
    /// The source could not be read or decoded; nothing was submitted and
    /// the state is untouched.
    SourceFailed,
    /// The delta could not be delivered within the retry bound; the state is
    /// untouched for those keys.
    TargetFailed,
}

/// Per-cycle counters, produced once per tick and consumed by logging only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CycleResult {
    pub outcome: CycleOutcome,
    /// Records returned by the source.
    pub fetched: usize,
    /// Records accepted by the target this cycle.
    pub forwarded: usize,
    /// Records already up to date, not submitted.
    pub skipped: usize,
    /// Records dropped as malformed, rejected, unresolved, or undelivered.
    pub failed: usize,
}

impl CycleResult {
    fn source_failed() -> Self {
        Self {
            outcome: CycleOutcome::SourceFailed,
            fetched: 0,
            forwarded: 0,
            skipped: 0,
            failed: 0,
        }
    }
}

/// Drives fetch→filter→submit→reconcile cycles and owns the sync state.
pub struct SyncEngine<S, T> {
    source: S,
    target: T,
    state: SyncState,
    retry: RetryPolicy,
}

impl<S: SourceRelay, T: TargetRelay> SyncEngine<S, T> {
    pub fn new(source: S, target: T) -> Self {
        Self {
            source,
            target,
            state: SyncState::new(),
            retry: RetryPolicy::default(),
        }
    }

    #[cfg(test)]
    pub(crate) fn state(&self) -> &SyncState {
        &self.state
    }

    /// Run one cycle. `deadline` is the start of the next scheduled tick;
    /// submission backoff never sleeps past it.
    pub async fn run_cycle(&mut self, deadline: Instant) -> CycleResult {
        let records = match self.source.fetch_all().await {
            Ok(records) => records,
            Err(e) => {
                warn!("cycle aborted, source fetch failed: {e}");
                return CycleResult::source_failed();
            }
        };
        let fetched = records.len();

        if self.state.is_empty() && fetched > 0 {
            info!(fetched, "nothing forwarded yet, the full source set is the delta");
        }

        let mut failed = 0usize;
        let mut skipped = 0usize;
        let mut delta: HashMap<String, SignedRegistration> = HashMap::new();
        for record in records {
            if let Err(e) = record.validate() {
                warn!(pubkey = %record.message.pubkey, "dropping malformed registration: {e}");
                failed += 1;
                continue;
            }
            if !self
                .state
                .needs_forward(&record.message.pubkey, record.message.timestamp)
            {
                skipped += 1;
                continue;
            }
            // The source can list the same validator more than once (one
            // entry per upcoming proposal slot); keep the newest per pubkey.
            match delta.get_mut(&record.message.pubkey) {
                Some(existing) => {
                    if record.is_newer_than(existing) {
                        *existing = record;
                    }
                    skipped += 1;
                }
                None => {
                    delta.insert(record.message.pubkey.clone(), record);
                }
            }
        }
        let delta: Vec<SignedRegistration> = delta.into_values().collect();

        if delta.is_empty() {
            debug!(fetched, skipped, "no new or updated registrations this cycle");
            return CycleResult {
                outcome: CycleOutcome::Completed,
                fetched,
                forwarded: 0,
                skipped,
                failed,
            };
        }

        let outcomes = match self.submit_with_retry(&delta, deadline).await {
            Ok(outcomes) => outcomes,
            Err(e) => {
                warn!(delta = delta.len(), "delta not delivered within retry bound: {e}");
                return CycleResult {
                    outcome: CycleOutcome::TargetFailed,
                    fetched,
                    forwarded: 0,
                    skipped,
                    failed: failed + delta.len(),
                };
            }
        };

        let submitted: HashMap<&str, u64> = delta
            .iter()
            .map(|r| (r.message.pubkey.as_str(), r.message.timestamp))
            .collect();

        let mut forwarded = 0usize;
        for outcome in outcomes {
            let Some(&timestamp) = submitted.get(outcome.pubkey.as_str()) else {
                debug!(pubkey = %outcome.pubkey, "target reported a record outside the batch");
                continue;
            };
            match outcome.status {
                SubmitStatus::Accepted => {
                    self.state.record_forwarded(&outcome.pubkey, timestamp);
                    forwarded += 1;
                }
                SubmitStatus::Rejected(reason) => {
                    warn!(pubkey = %outcome.pubkey, %reason, "target rejected registration");
                    failed += 1;
                }
                SubmitStatus::Transient => {
                    debug!(pubkey = %outcome.pubkey, "unresolved submission, retrying next cycle");
                    failed += 1;
                }
            }
        }

        debug!(tracked = self.state.len(), "cycle reconciled");
        CycleResult {
            outcome: CycleOutcome::Completed,
            fetched,
            forwarded,
            skipped,
            failed,
        }
    }

    /// Submit the delta, retrying connection-level failures with exponential
    /// backoff. Sleeps are capped at the time remaining before `deadline`;
    /// once the deadline is reached no further attempt is made.
    async fn submit_with_retry(
        &self,
        delta: &[SignedRegistration],
        deadline: Instant,
    ) -> Result<Vec<SubmissionOutcome>, TargetError> {
        let mut delay = self.retry.base_delay;
        let mut attempt = 1u32;
        loop {
            match self.target.submit(delta).await {
                Ok(outcomes) => return Ok(outcomes),
                Err(err) => {
                    if attempt >= self.retry.max_attempts {
                        return Err(err);
                    }
                    let now = Instant::now();
                    if now >= deadline {
                        warn!(attempt, "no time left before the next tick, abandoning retries");
                        return Err(err);
                    }
                    let sleep_for = delay.min(deadline - now);
                    debug!(attempt, ?sleep_for, "target unavailable, backing off: {err}");
                    tokio::time::sleep(sleep_for).await;
                    delay *= self.retry.factor;
                    attempt += 1;
                }
            }
        }
    }
}
