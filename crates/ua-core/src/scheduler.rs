//! The sample tick loop.
//!
//! # Tick Summary
//!
//! 1. Ask the probe how long the user has been idle; above the threshold, record nothing
//! 2. Otherwise credit the focused application with one sample interval
//! 3. Sleep one sample interval (fixed pause, no compensation for work done)
//! 4. Advance the flush clock; when due, snapshot the aggregator and flush synchronously
//!
//! Idle ticks still advance the flush clock.

use std::time::Duration;

use tracing::{debug, info, trace, warn};

use crate::clock::FlushClock;
use crate::flush::{FlushOutcome, Flusher, UsageSink};
use crate::probe::EnvironmentProbe;
use crate::shutdown::ShutdownToken;
use crate::types::{ApplicationId, ValidationError};
use crate::usage::{UsageAggregator, UsageBatch};

/// Timing configuration for the scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulerConfig {
    /// Pause between ticks, and the credit given per recorded tick.
    pub sample_interval: Duration,
    /// Elapsed time after which the batch is flushed.
    pub flush_interval: Duration,
    /// Idle time above which ticks are not recorded.
    pub idle_threshold: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            sample_interval: Duration::from_secs(10),
            flush_interval: Duration::from_secs(60),
            idle_threshold: Duration::from_secs(60),
        }
    }
}

impl SchedulerConfig {
    /// Creates a validated configuration.
    ///
    /// The sample interval must be a positive whole number of seconds and the
    /// flush interval at least one sample interval.
    pub fn new(
        sample_interval: Duration,
        flush_interval: Duration,
        idle_threshold: Duration,
    ) -> Result<Self, ValidationError> {
        if sample_interval.is_zero() {
            return Err(ValidationError::ZeroDuration {
                field: "sample interval",
            });
        }
        if sample_interval.subsec_nanos() != 0 {
            return Err(ValidationError::FractionalInterval {
                millis: sample_interval.as_millis(),
            });
        }
        if flush_interval.is_zero() {
            return Err(ValidationError::ZeroDuration {
                field: "flush interval",
            });
        }
        if flush_interval < sample_interval {
            return Err(ValidationError::FlushShorterThanSample {
                flush_secs: flush_interval.as_secs(),
                sample_secs: sample_interval.as_secs(),
            });
        }
        Ok(Self {
            sample_interval,
            flush_interval,
            idle_threshold,
        })
    }

    /// Seconds credited to an application per recorded tick.
    pub const fn seconds_per_tick(&self) -> u64 {
        self.sample_interval.as_secs()
    }
}

/// Result of sampling the environment once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    /// The user has been idle longer than the threshold.
    Idle { idle_for: Duration },
    /// No focused application could be determined.
    NoApplication,
    /// The application was credited with one sample interval.
    Recorded(ApplicationId),
}

/// Counters kept across the lifetime of a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub ticks: u64,
    pub recorded_ticks: u64,
    pub idle_ticks: u64,
    pub flushes: u64,
    pub dropped_batches: u64,
}

impl RunSummary {
    fn count_tick(&mut self, outcome: &TickOutcome) {
        self.ticks += 1;
        match outcome {
            TickOutcome::Idle { .. } => self.idle_ticks += 1,
            TickOutcome::Recorded(_) => self.recorded_ticks += 1,
            TickOutcome::NoApplication => {}
        }
    }

    fn count_flush(&mut self, outcome: FlushOutcome) {
        self.flushes += 1;
        if matches!(outcome, FlushOutcome::Dropped { .. }) {
            self.dropped_batches += 1;
        }
    }
}

/// Owns the aggregator and drives sampling and flushing.
#[derive(Debug)]
pub struct SampleScheduler<P> {
    config: SchedulerConfig,
    probe: P,
    aggregator: UsageAggregator,
    clock: FlushClock,
}

impl<P: EnvironmentProbe> SampleScheduler<P> {
    pub fn new(probe: P, config: SchedulerConfig) -> Self {
        Self {
            aggregator: UsageAggregator::new(config.seconds_per_tick()),
            clock: FlushClock::new(config.flush_interval),
            config,
            probe,
        }
    }

    /// Samples the environment once and records the result (steps 1 and 2).
    pub fn sample(&mut self) -> TickOutcome {
        let idle_for = self.probe.idle_duration();
        if idle_for > self.config.idle_threshold {
            trace!(idle_secs = idle_for.as_secs(), "user idle, skipping tick");
            return TickOutcome::Idle { idle_for };
        }

        let Some(raw) = self.probe.active_application() else {
            trace!("no active application");
            return TickOutcome::NoApplication;
        };
        let Ok(application_id) = ApplicationId::new(raw) else {
            trace!("probe returned a blank application name");
            return TickOutcome::NoApplication;
        };

        trace!(application = %application_id, "recording tick");
        self.aggregator.record_tick(application_id.clone());
        TickOutcome::Recorded(application_id)
    }

    /// Advances the flush clock by one sample interval (step 4).
    ///
    /// Returns the snapshotted batch when a flush is due. The aggregator has
    /// already been reset by the time this returns.
    pub fn advance(&mut self) -> Option<UsageBatch> {
        if self.clock.advance(self.config.sample_interval) {
            return Some(self.aggregator.snapshot_and_reset());
        }
        None
    }

    /// Takes whatever has accumulated, regardless of the flush clock.
    pub fn drain(&mut self) -> UsageBatch {
        self.aggregator.snapshot_and_reset()
    }

    /// Time accumulated toward the next flush.
    pub const fn elapsed(&self) -> Duration {
        self.clock.elapsed()
    }

    /// Runs the tick loop until `shutdown` fires.
    ///
    /// Flushes are awaited inline, so sampling pauses while a send is in
    /// flight. When `flush_on_shutdown` is set, whatever accumulated since the
    /// last flush is sent once more before returning.
    pub async fn run<S: UsageSink>(
        mut self,
        flusher: &Flusher<S>,
        mut shutdown: ShutdownToken,
        flush_on_shutdown: bool,
    ) -> RunSummary {
        if !self.probe.is_supported() {
            warn!(
                platform = %self.probe.platform(),
                "active window detection is not supported on this platform, no usage will be recorded"
            );
        }
        info!(
            sample_secs = self.config.sample_interval.as_secs(),
            flush_secs = self.config.flush_interval.as_secs(),
            idle_threshold_secs = self.config.idle_threshold.as_secs(),
            "sampling started"
        );

        let mut summary = RunSummary::default();
        while !shutdown.is_shutdown() {
            let outcome = self.sample();
            summary.count_tick(&outcome);

            tokio::select! {
                () = tokio::time::sleep(self.config.sample_interval) => {}
                () = shutdown.wait() => break,
            }

            if let Some(batch) = self.advance() {
                debug!(records = batch.len(), "flush due");
                let outcome = flusher.flush(batch).await;
                summary.count_flush(outcome);
            }
        }

        if flush_on_shutdown {
            let batch = self.drain();
            if !batch.is_empty() {
                info!(records = batch.len(), "flushing partial batch before exit");
                let outcome = flusher.flush(batch).await;
                summary.count_flush(outcome);
            }
        }

        info!(
            ticks = summary.ticks,
            flushes = summary.flushes,
            dropped_batches = summary.dropped_batches,
            "sampling stopped"
        );
        summary
    }
}

#[cfg(test)]
mod tests {
    use std::cell::{Cell, RefCell};
    use std::collections::VecDeque;

    use super::*;
    use crate::flush::testing::RecordingSink;
    use crate::shutdown::shutdown_channel;
    use crate::types::Platform;

    /// Replays a fixed script of readings, then repeats the fallback reading.
    #[derive(Debug)]
    struct ScriptedProbe {
        script: RefCell<VecDeque<(Duration, Option<&'static str>)>>,
        fallback: (Duration, Option<&'static str>),
        current: Cell<(Duration, Option<&'static str>)>,
    }

    impl ScriptedProbe {
        fn constant(idle: Duration, app: Option<&'static str>) -> Self {
            Self::scripted(Vec::new(), (idle, app))
        }

        fn scripted(
            script: Vec<(Duration, Option<&'static str>)>,
            fallback: (Duration, Option<&'static str>),
        ) -> Self {
            Self {
                script: RefCell::new(script.into()),
                fallback,
                current: Cell::new(fallback),
            }
        }
    }

    impl EnvironmentProbe for ScriptedProbe {
        // Each tick reads idle time first, so that is where the script advances.
        fn idle_duration(&self) -> Duration {
            let next = self
                .script
                .borrow_mut()
                .pop_front()
                .unwrap_or(self.fallback);
            self.current.set(next);
            next.0
        }

        fn active_application(&self) -> Option<String> {
            self.current.get().1.map(str::to_string)
        }

        fn platform(&self) -> Platform {
            Platform::Linux
        }
    }

    fn one_second_config() -> SchedulerConfig {
        SchedulerConfig::new(
            Duration::from_secs(1),
            Duration::from_secs(60),
            Duration::from_secs(60),
        )
        .unwrap()
    }

    fn active(app: &'static str) -> (Duration, Option<&'static str>) {
        (Duration::ZERO, Some(app))
    }

    /// Runs `ticks` full ticks without sleeping, collecting any flushed batches.
    fn run_ticks<P: EnvironmentProbe>(
        scheduler: &mut SampleScheduler<P>,
        ticks: usize,
    ) -> Vec<(usize, UsageBatch)> {
        let mut flushed = Vec::new();
        for tick in 1..=ticks {
            scheduler.sample();
            if let Some(batch) = scheduler.advance() {
                flushed.push((tick, batch));
            }
        }
        flushed
    }

    #[test]
    fn config_rejects_zero_sample_interval() {
        let err = SchedulerConfig::new(
            Duration::ZERO,
            Duration::from_secs(60),
            Duration::from_secs(60),
        )
        .unwrap_err();
        assert!(matches!(err, ValidationError::ZeroDuration { .. }));
    }

    #[test]
    fn config_rejects_fractional_sample_interval() {
        let err = SchedulerConfig::new(
            Duration::from_millis(1500),
            Duration::from_secs(60),
            Duration::from_secs(60),
        )
        .unwrap_err();
        assert_eq!(err, ValidationError::FractionalInterval { millis: 1500 });
    }

    #[test]
    fn config_rejects_flush_shorter_than_sample() {
        let err = SchedulerConfig::new(
            Duration::from_secs(10),
            Duration::from_secs(5),
            Duration::from_secs(60),
        )
        .unwrap_err();
        assert_eq!(
            err,
            ValidationError::FlushShorterThanSample {
                flush_secs: 5,
                sample_secs: 10
            }
        );
    }

    #[test]
    fn same_application_accumulates_ticks_times_interval() {
        let config = SchedulerConfig::new(
            Duration::from_secs(5),
            Duration::from_secs(3600),
            Duration::from_secs(60),
        )
        .unwrap();
        let probe = ScriptedProbe::constant(Duration::ZERO, Some("Editor"));
        let mut scheduler = SampleScheduler::new(probe, config);

        for _ in 0..17 {
            assert_eq!(
                scheduler.sample(),
                TickOutcome::Recorded(ApplicationId::new("Editor").unwrap())
            );
        }
        assert_eq!(scheduler.drain().seconds_for("Editor"), Some(85));
    }

    #[test]
    fn idle_ticks_record_nothing() {
        let probe = ScriptedProbe::constant(Duration::from_secs(61), Some("Editor"));
        let mut scheduler = SampleScheduler::new(probe, one_second_config());

        let outcome = scheduler.sample();
        assert_eq!(
            outcome,
            TickOutcome::Idle {
                idle_for: Duration::from_secs(61)
            }
        );
        assert!(scheduler.drain().is_empty());
    }

    #[test]
    fn idle_exactly_at_threshold_still_records() {
        let probe = ScriptedProbe::constant(Duration::from_secs(60), Some("Editor"));
        let mut scheduler = SampleScheduler::new(probe, one_second_config());

        assert!(matches!(scheduler.sample(), TickOutcome::Recorded(_)));
    }

    #[test]
    fn missing_or_blank_application_is_skipped() {
        let probe = ScriptedProbe::scripted(
            vec![(Duration::ZERO, None), (Duration::ZERO, Some("   "))],
            active("Editor"),
        );
        let mut scheduler = SampleScheduler::new(probe, one_second_config());

        assert_eq!(scheduler.sample(), TickOutcome::NoApplication);
        assert_eq!(scheduler.sample(), TickOutcome::NoApplication);
        assert!(scheduler.drain().is_empty());
    }

    #[test]
    fn idle_throughout_flushes_empty_batch() {
        let probe = ScriptedProbe::constant(Duration::from_secs(600), Some("Editor"));
        let mut scheduler = SampleScheduler::new(probe, one_second_config());

        let flushed = run_ticks(&mut scheduler, 60);
        assert_eq!(flushed.len(), 1);
        let (tick, batch) = &flushed[0];
        assert_eq!(*tick, 60);
        assert!(batch.is_empty());
    }

    #[test]
    fn continuous_focus_flushes_one_record() {
        let probe = ScriptedProbe::constant(Duration::ZERO, Some("Editor"));
        let mut scheduler = SampleScheduler::new(probe, one_second_config());

        let flushed = run_ticks(&mut scheduler, 60);
        assert_eq!(flushed.len(), 1);
        let (tick, batch) = &flushed[0];
        assert_eq!(*tick, 60);
        assert_eq!(batch.len(), 1);
        assert_eq!(batch.seconds_for("Editor"), Some(60));

        assert_eq!(scheduler.elapsed(), Duration::ZERO);
        assert!(scheduler.drain().is_empty());
    }

    #[test]
    fn switching_application_splits_the_window() {
        let mut script = vec![active("A"); 10];
        script.extend(vec![active("B"); 50]);
        let probe = ScriptedProbe::scripted(script, (Duration::from_secs(600), None));
        let mut scheduler = SampleScheduler::new(probe, one_second_config());

        let flushed = run_ticks(&mut scheduler, 60);
        let (_, batch) = &flushed[0];
        assert_eq!(batch.len(), 2);
        assert_eq!(batch.seconds_for("A"), Some(10));
        assert_eq!(batch.seconds_for("B"), Some(50));
    }

    #[test]
    fn flush_never_fires_before_interval() {
        let probe = ScriptedProbe::constant(Duration::ZERO, Some("Editor"));
        let mut scheduler = SampleScheduler::new(probe, one_second_config());

        assert!(run_ticks(&mut scheduler, 59).is_empty());
        assert_eq!(scheduler.elapsed(), Duration::from_secs(59));
    }

    #[test]
    fn idle_ticks_still_advance_flush_clock() {
        let mut script = vec![active("Editor"); 30];
        script.extend(vec![(Duration::from_secs(120), Some("Editor")); 30]);
        let probe = ScriptedProbe::scripted(script, active("Editor"));
        let mut scheduler = SampleScheduler::new(probe, one_second_config());

        let flushed = run_ticks(&mut scheduler, 60);
        assert_eq!(flushed.len(), 1);
        assert_eq!(flushed[0].0, 60);
        assert_eq!(flushed[0].1.seconds_for("Editor"), Some(30));
    }

    #[test]
    fn consecutive_windows_do_not_share_ticks() {
        let mut script = vec![active("A"); 60];
        script.extend(vec![active("B"); 60]);
        let probe = ScriptedProbe::scripted(script, active("C"));
        let mut scheduler = SampleScheduler::new(probe, one_second_config());

        let flushed = run_ticks(&mut scheduler, 120);
        assert_eq!(flushed.len(), 2);
        assert_eq!(flushed[0].1.seconds_for("A"), Some(60));
        assert_eq!(flushed[0].1.seconds_for("B"), None);
        assert_eq!(flushed[1].1.seconds_for("A"), None);
        assert_eq!(flushed[1].1.seconds_for("B"), Some(60));
    }

    #[tokio::test(start_paused = true)]
    async fn run_flushes_on_schedule_until_shutdown() {
        let config = SchedulerConfig::new(
            Duration::from_secs(10),
            Duration::from_secs(60),
            Duration::from_secs(60),
        )
        .unwrap();
        let probe = ScriptedProbe::constant(Duration::ZERO, Some("Editor"));
        let scheduler = SampleScheduler::new(probe, config);
        let flusher = Flusher::new(RecordingSink::default(), None, Platform::Linux);
        let (sender, token) = shutdown_channel();

        let stop = async {
            // Two full flush windows plus half a tick into the third.
            tokio::time::sleep(Duration::from_secs(125)).await;
            sender.shutdown();
        };
        let (summary, ()) = tokio::join!(scheduler.run(&flusher, token, false), stop);

        assert_eq!(summary.flushes, 2);
        assert_eq!(summary.dropped_batches, 0);
        let reports = flusher.sink().reports.borrow();
        assert_eq!(reports.len(), 2);
        assert!(
            reports
                .iter()
                .all(|report| report.batch.seconds_for("Editor") == Some(60))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn run_flushes_partial_batch_on_shutdown() {
        let config = SchedulerConfig::new(
            Duration::from_secs(10),
            Duration::from_secs(60),
            Duration::from_secs(60),
        )
        .unwrap();
        let probe = ScriptedProbe::constant(Duration::ZERO, Some("Editor"));
        let scheduler = SampleScheduler::new(probe, config);
        let flusher = Flusher::new(
            RecordingSink::default(),
            Some("devbox".to_string()),
            Platform::Linux,
        );
        let (sender, token) = shutdown_channel();

        let stop = async {
            tokio::time::sleep(Duration::from_secs(25)).await;
            sender.shutdown();
        };
        let (summary, ()) = tokio::join!(scheduler.run(&flusher, token, true), stop);

        // Ticks at t=0, 10 and 20 were sampled before shutdown at t=25.
        assert_eq!(summary.ticks, 3);
        assert_eq!(summary.flushes, 1);
        let reports = flusher.sink().reports.borrow();
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].batch.seconds_for("Editor"), Some(30));
        assert_eq!(reports[0].identity.as_deref(), Some("devbox"));
    }

    #[tokio::test(start_paused = true)]
    async fn transport_failures_do_not_stop_the_loop() {
        let probe = ScriptedProbe::constant(Duration::ZERO, Some("Editor"));
        let scheduler = SampleScheduler::new(probe, one_second_config());
        let flusher = Flusher::new(RecordingSink::failing(), None, Platform::Linux);
        let (sender, token) = shutdown_channel();

        let stop = async {
            tokio::time::sleep(Duration::from_millis(180_500)).await;
            sender.shutdown();
        };
        let (summary, ()) = tokio::join!(scheduler.run(&flusher, token, false), stop);

        assert_eq!(summary.flushes, 3);
        assert_eq!(summary.dropped_batches, 3);
        assert_eq!(summary.recorded_ticks, summary.ticks);
    }
}
