//! Liveness reporting for the sync control loop.

use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;

/// Shared liveness handle for an external process supervisor to poll.
///
/// The daemon is healthy as long as the control loop has completed a cycle
/// (success or failure) within the grace window. Before the first cycle the
/// window is measured from process start, so a freshly started daemon is not
/// reported unhealthy while its first cycle runs.
#[derive(Debug, Clone)]
pub struct LivenessProbe {
    inner: Arc<Mutex<ProbeState>>,
    grace: Duration,
}

#[derive(Debug)]
struct ProbeState {
    started_at: Instant,
    last_cycle_at: Option<Instant>,
    cycles_completed: u64,
}

impl LivenessProbe {
    /// `grace_intervals` is how many scheduler intervals a cycle may be
    /// overdue before the daemon is reported unhealthy.
    pub fn new(interval: Duration, grace_intervals: u32) -> Self {
        Self {
            inner: Arc::new(Mutex::new(ProbeState {
                started_at: Instant::now(),
                last_cycle_at: None,
                cycles_completed: 0,
            })),
            grace: interval * grace_intervals,
        }
    }

    /// Mark a completed cycle, healthy or not.
    pub(crate) fn record_cycle(&self) {
        let mut state = self.inner.lock().unwrap();
        state.last_cycle_at = Some(Instant::now());
        state.cycles_completed += 1;
    }

    pub fn is_healthy(&self) -> bool {
        let state = self.inner.lock().unwrap();
        let reference = state.last_cycle_at.unwrap_or(state.started_at);
        reference.elapsed() < self.grace
    }

    pub fn cycles_completed(&self) -> u64 {
        self.inner.lock().unwrap().cycles_completed
    }
}
