//! Fixed-interval driver for the sync engine.
//!
//! Exactly one cycle runs at a time: the cycle is awaited inline between
//! ticks, so a new fetch/submit pair can never overlap a previous one and
//! per-pubkey submission order stays monotonic. Ticks that fall due while a
//! cycle is still running are skipped and counted, never queued. Shutdown is
//! observed only at tick boundaries, letting the in-flight cycle run to
//! completion so the sync state never reflects a half-reconciled batch.

use crate::relay::{SourceRelay, TargetRelay};
use crate::sync::engine::{CycleOutcome, SyncEngine};
use crate::sync::health::LivenessProbe;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{info, warn};

/// Intervals a cycle may be overdue before liveness turns unhealthy.
const LIVENESS_GRACE_INTERVALS: u32 = 3;

/// Runs engine cycles on a fixed wall-clock interval until signaled to stop.
pub struct Scheduler<S, T> {
    engine: SyncEngine<S, T>,
    interval: Duration,
    probe: LivenessProbe,
    ticks_skipped: u64,
}

impl<S: SourceRelay, T: TargetRelay> Scheduler<S, T> {
    pub fn new(engine: SyncEngine<S, T>, interval: Duration) -> Self {
        Self {
            engine,
            interval,
            probe: LivenessProbe::new(interval, LIVENESS_GRACE_INTERVALS),
            ticks_skipped: 0,
        }
    }

    /// Handle for external liveness polling.
    pub fn liveness_probe(&self) -> LivenessProbe {
        self.probe.clone()
    }

    /// Run cycles until `shutdown` fires. The first cycle starts immediately.
    pub async fn run(&mut self, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        info!(interval = ?self.interval, "scheduler started");

        loop {
            tokio::select! {
                _ = ticker.tick() => {}
                _ = shutdown.changed() => {
                    info!("shutdown requested, stopping scheduler");
                    break;
                }
            }

            let started = Instant::now();
            let result = self.engine.run_cycle(started + self.interval).await;
            self.probe.record_cycle();

            let elapsed = started.elapsed();
            if elapsed > self.interval {
                // Ticks that fell due while the cycle ran are dropped by the
                // ticker; account for them.
                let skipped = (elapsed.as_nanos() / self.interval.as_nanos()) as u64;
                self.ticks_skipped += skipped;
                warn!(
                    skipped,
                    total_skipped = self.ticks_skipped,
                    cycle_time = ?elapsed,
                    "cycle overran the interval, skipping missed ticks"
                );
            }

            match result.outcome {
                CycleOutcome::Completed => info!(
                    fetched = result.fetched,
                    forwarded = result.forwarded,
                    skipped = result.skipped,
                    failed = result.failed,
                    "cycle completed"
                ),
                CycleOutcome::SourceFailed => {
                    warn!("cycle failed: source unavailable, retrying next tick")
                }
                CycleOutcome::TargetFailed => warn!(
                    fetched = result.fetched,
                    failed = result.failed,
                    "cycle failed: target unavailable, retrying next tick"
                ),
            }

            if *shutdown.borrow() {
                info!("shutdown requested, stopping scheduler");
                break;
            }
        }

        info!(
            cycles = self.probe.cycles_completed(),
            skipped_ticks = self.ticks_skipped,
            "scheduler stopped"
        );
    }

    #[cfg(test)]
    pub(crate) fn ticks_skipped(&self) -> u64 {
        self.ticks_skipped
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::relay::{
        Registration, SignedRegistration, SourceError, SubmissionOutcome, SubmitStatus,
        TargetError,
    };
    use async_trait::async_trait;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const INTERVAL: Duration = Duration::from_secs(1);

    fn registration(tag: u8, timestamp: u64) -> SignedRegistration {
        SignedRegistration {
            message: Registration {
                pubkey: format!("0x{}", hex::encode(vec![tag; 48])),
                fee_recipient: format!("0x{}", hex::encode(vec![tag; 20])),
                gas_limit: 30_000_000,
                timestamp,
            },
            signature: format!("0x{}", hex::encode(vec![0xee; 96])),
        }
    }

    /// Source fake that takes `delay` to answer, counting fetches through a
    /// handle the test keeps.
    struct SlowSource {
        delay: Duration,
        fetches: Arc<AtomicUsize>,
        records: Vec<SignedRegistration>,
    }

    impl SlowSource {
        fn new(delay: Duration, records: Vec<SignedRegistration>) -> (Self, Arc<AtomicUsize>) {
            let fetches = Arc::new(AtomicUsize::new(0));
            (
                Self {
                    delay,
                    fetches: fetches.clone(),
                    records,
                },
                fetches,
            )
        }
    }

    #[async_trait]
    impl SourceRelay for SlowSource {
        async fn fetch_all(&self) -> Result<Vec<SignedRegistration>, SourceError> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            Ok(self.records.clone())
        }
    }

    struct CountingTarget {
        submissions: Arc<AtomicUsize>,
    }

    impl CountingTarget {
        fn new() -> (Self, Arc<AtomicUsize>) {
            let submissions = Arc::new(AtomicUsize::new(0));
            (
                Self {
                    submissions: submissions.clone(),
                },
                submissions,
            )
        }
    }

    #[async_trait]
    impl TargetRelay for CountingTarget {
        async fn submit(
            &self,
            batch: &[SignedRegistration],
        ) -> Result<Vec<SubmissionOutcome>, TargetError> {
            self.submissions.fetch_add(1, Ordering::SeqCst);
            Ok(batch
                .iter()
                .map(|r| SubmissionOutcome {
                    pubkey: r.message.pubkey.clone(),
                    status: SubmitStatus::Accepted,
                })
                .collect())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn overrunning_cycles_skip_ticks_instead_of_overlapping() {
        // Each cycle takes 2.5 intervals, so ticks at t=1s and t=2s are
        // skipped and the second cycle starts at t=3s.
        let (source, fetches) = SlowSource::new(INTERVAL * 5 / 2, vec![registration(0xaa, 100)]);
        let (target, _) = CountingTarget::new();
        let mut scheduler = Scheduler::new(SyncEngine::new(source, target), INTERVAL);

        let (_tx, rx) = watch::channel(false);
        {
            let run = scheduler.run(rx);
            tokio::pin!(run);
            tokio::select! {
                _ = &mut run => unreachable!("scheduler stopped without shutdown"),
                _ = tokio::time::sleep(INTERVAL * 5) => {}
            }
        }

        // Cycles started at t=0 and t=3; a third would start at t=6.
        assert_eq!(fetches.load(Ordering::SeqCst), 2);
        assert_eq!(scheduler.ticks_skipped(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_lets_the_inflight_cycle_finish() {
        let (source, fetches) = SlowSource::new(INTERVAL * 2, vec![registration(0xaa, 100)]);
        let (target, submissions) = CountingTarget::new();
        let mut scheduler = Scheduler::new(SyncEngine::new(source, target), INTERVAL);
        let probe = scheduler.liveness_probe();

        let (tx, rx) = watch::channel(false);
        let run = scheduler.run(rx);
        let signal = async {
            tokio::time::sleep(INTERVAL / 2).await;
            tx.send(true).unwrap();
        };
        tokio::join!(run, signal);

        // The cycle that was in flight when shutdown arrived completed its
        // submission, and no new tick was scheduled afterwards.
        assert_eq!(fetches.load(Ordering::SeqCst), 1);
        assert_eq!(submissions.load(Ordering::SeqCst), 1);
        assert_eq!(probe.cycles_completed(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn probe_reports_healthy_while_cycles_complete() {
        let (source, _) = SlowSource::new(Duration::from_millis(10), vec![]);
        let (target, _) = CountingTarget::new();
        let mut scheduler = Scheduler::new(SyncEngine::new(source, target), INTERVAL);
        let probe = scheduler.liveness_probe();

        let (_tx, rx) = watch::channel(false);
        {
            let run = scheduler.run(rx);
            tokio::pin!(run);
            tokio::select! {
                _ = &mut run => unreachable!("scheduler stopped without shutdown"),
                _ = tokio::time::sleep(INTERVAL * 10) => {}
            }
        }

        assert!(probe.is_healthy());
        assert!(probe.cycles_completed() >= 9);
        assert_eq!(scheduler.ticks_skipped(), 0);
    }
}
