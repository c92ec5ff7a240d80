//! Load test execution engine.
//!
//! [`LoadRunner`] is the top-level orchestrator that:
//! - Spawns `min(concurrency, total_requests)` worker tasks via
//!   [`tokio_util::task::TaskTracker`]
//! - Hands out request slots through a shared [`SlotCounter`]
//! - Collects outcomes through a bounded mpsc channel into a single aggregator
//! - Publishes [`RunProgress`] through a watch channel for live display
//!
//! Configuration is validated when the runner is built, so a bad config never
//! reaches the network. A run always issues every request; there is no
//! cancellation or overall deadline at this level.

use crate::loadtest::client::HttpTransport;
use crate::loadtest::config::LoadTestConfig;
use crate::loadtest::error::LoadTestError;
use crate::loadtest::metrics::{MetricsRecorder, RunProgress, SampleReport};
use crate::loadtest::sampler::Transport;
use crate::loadtest::stats::{self, Percentiles};
use crate::loadtest::worker::{worker_loop, ActiveWorkerCounter, SlotCounter};

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, watch};
use tokio_util::task::TaskTracker;

/// How often the aggregator publishes a progress snapshot.
const PROGRESS_INTERVAL: Duration = Duration::from_millis(250);

/// Upper bound on the outcome channel buffer.
const MAX_CHANNEL_BUFFER: usize = 65_536;

/// Compile-time Send bounds verification for channel-transported types.
fn _assert_send<T: Send>() {}
#[allow(dead_code)]
fn _check_send_bounds() {
    _assert_send::<SampleReport>();
    _assert_send::<RunProgress>();
    _assert_send::<LoadTestResult>();
}

/// Result of a completed load test run.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadTestResult {
    /// Requests issued (echoed from config).
    pub total_requests: u64,
    /// Configured concurrency (echoed from config, even when fewer workers ran).
    pub concurrency: u32,
    /// Requests that ended in a failure.
    pub error_count: u64,
    /// Wall-clock duration of the whole dispatch-and-collect phase.
    pub total_elapsed: Duration,
    /// Mean success latency in seconds, 0.0 with no successes.
    pub average_latency: f64,
    /// Success latency percentiles in seconds.
    pub percentiles: Percentiles,
    /// Success latencies in seconds, sorted ascending.
    pub latencies: Vec<f64>,
    /// Failure counts keyed by category.
    pub error_categories: BTreeMap<String, u64>,
}

impl LoadTestResult {
    /// Builds the result from a finished recorder.
    fn from_recorder(
        recorder: MetricsRecorder,
        config: &LoadTestConfig,
        total_elapsed: Duration,
    ) -> Self {
        let (mut latencies, error_count, error_categories) = recorder.into_parts();
        stats::sort_latencies(&mut latencies);

        Self {
            total_requests: config.total_requests,
            concurrency: config.concurrency,
            error_count,
            total_elapsed,
            average_latency: stats::mean(&latencies),
            percentiles: Percentiles::from_sorted(&latencies),
            latencies,
            error_categories,
        }
    }

    /// Number of successful requests.
    pub fn success_count(&self) -> u64 {
        self.latencies.len() as u64
    }

    /// Fraction of requests that failed (0.0..=1.0).
    pub fn error_rate(&self) -> f64 {
        if self.total_requests == 0 {
            return 0.0;
        }
        self.error_count as f64 / self.total_requests as f64
    }

    /// Completed requests per second over the whole run.
    pub fn throughput(&self) -> f64 {
        let secs = self.total_elapsed.as_secs_f64();
        if secs <= 0.0 {
            return 0.0;
        }
        self.total_requests as f64 / secs
    }

    /// Fastest success latency in seconds, 0.0 with no successes.
    pub fn min_latency(&self) -> f64 {
        self.latencies
            .first()
            .copied()
            .unwrap_or(stats::LATENCY_SENTINEL)
    }

    /// Slowest success latency in seconds, 0.0 with no successes.
    pub fn max_latency(&self) -> f64 {
        self.latencies
            .last()
            .copied()
            .unwrap_or(stats::LATENCY_SENTINEL)
    }
}

/// Drives one load test: a fixed pool of workers issuing `total_requests`
/// requests against one target.
pub struct LoadRunner {
    config: Arc<LoadTestConfig>,
    transport: Arc<dyn Transport>,
}

impl LoadRunner {
    /// Validates `config` and builds a runner backed by a reqwest transport.
    pub fn new(config: LoadTestConfig) -> Result<Self, LoadTestError> {
        config.validate()?;
        let transport = HttpTransport::from_config(&config)?;
        Ok(Self {
            config: Arc::new(config),
            transport: Arc::new(transport),
        })
    }

    /// Validates `config` and builds a runner using the given transport.
    pub fn with_transport(
        config: LoadTestConfig,
        transport: Arc<dyn Transport>,
    ) -> Result<Self, LoadTestError> {
        config.validate()?;
        Ok(Self {
            config: Arc::new(config),
            transport,
        })
    }

    /// Returns a reference to the runner's configuration.
    pub fn config(&self) -> &LoadTestConfig {
        &self.config
    }

    /// Run the load test to completion.
    pub async fn run(&self) -> LoadTestResult {
        let (progress_tx, _progress_rx) = watch::channel(RunProgress::default());
        self.run_with_progress(progress_tx).await
    }

    /// Run the load test, publishing progress snapshots to `progress_tx`.
    ///
    /// The final snapshot is published before this returns and always has
    /// `completed == total_requests`.
    pub async fn run_with_progress(
        &self,
        progress_tx: watch::Sender<RunProgress>,
    ) -> LoadTestResult {
        let total = self.config.total_requests;
        let concurrency = self.config.concurrency;

        tracing::info!(
            url = %self.config.target,
            method = %self.config.method,
            total_requests = total,
            concurrency,
            "starting load test"
        );

        let tracker = TaskTracker::new();
        let slots = SlotCounter::new(total);
        let active_workers = ActiveWorkerCounter::new();

        let workers = spawned_workers(total, concurrency);
        let buffer_size = (workers as usize)
            .saturating_mul(100)
            .clamp(1, MAX_CHANNEL_BUFFER);
        let (sample_tx, sample_rx) = mpsc::channel::<SampleReport>(buffer_size);

        let started = Instant::now();
        for worker_id in 0..workers {
            tracker.spawn(worker_loop(
                worker_id,
                self.config.clone(),
                self.transport.clone(),
                slots.clone(),
                sample_tx.clone(),
                active_workers.clone(),
            ));
        }
        tracker.close();

        // Drop original sender -- workers hold their own clones
        drop(sample_tx);

        let (recorder, ()) = tokio::join!(
            metrics_aggregator(sample_rx, progress_tx, total, active_workers, workers),
            tracker.wait()
        );
        let total_elapsed = started.elapsed();

        if recorder.completed() != total {
            tracing::error!(
                completed = recorder.completed(),
                total_requests = total,
                "not every request reported an outcome"
            );
        }

        let result = LoadTestResult::from_recorder(recorder, &self.config, total_elapsed);
        tracing::info!(
            successes = result.success_count(),
            errors = result.error_count,
            elapsed_secs = result.total_elapsed.as_secs_f64(),
            average_latency = result.average_latency,
            "load test finished"
        );
        result
    }
}

/// Number of worker tasks a run spawns.
fn spawned_workers(total_requests: u64, concurrency: u32) -> u32 {
    u32::try_from(total_requests).map_or(concurrency, |total| total.min(concurrency))
}

/// Metrics aggregator: the only owner of the [`MetricsRecorder`].
///
/// Uses `biased;` select so the tick branch is checked first, preventing
/// progress starvation when the channel is busy. Returns once every worker
/// has dropped its sender.
async fn metrics_aggregator(
    mut sample_rx: mpsc::Receiver<SampleReport>,
    progress_tx: watch::Sender<RunProgress>,
    total_requests: u64,
    active_workers: ActiveWorkerCounter,
    workers: u32,
) -> MetricsRecorder {
    let publish = |recorder: &MetricsRecorder| {
        progress_tx.send_replace(RunProgress {
            active_workers: active_workers.get(),
            workers,
            ..recorder.progress()
        });
    };

    let mut recorder = MetricsRecorder::new(total_requests);
    publish(&recorder);

    let mut tick = tokio::time::interval(PROGRESS_INTERVAL);
    tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;

            _ = tick.tick() => {
                // Drain all available samples before publishing
                while let Ok(report) = sample_rx.try_recv() {
                    record_report(&mut recorder, &report);
                }
                publish(&recorder);
            }
            received = sample_rx.recv() => {
                match received {
                    Some(report) => record_report(&mut recorder, &report),
                    None => {
                        // All senders dropped -- workers are done
                        publish(&recorder);
                        break;
                    }
                }
            }
        }
    }

    recorder
}

fn record_report(recorder: &mut MetricsRecorder, report: &SampleReport) {
    tracing::trace!(
        slot = report.slot,
        success = report.outcome.is_success(),
        "outcome recorded"
    );
    recorder.record(&report.outcome);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loadtest::config::{HttpMethod, RequestBody};
    use crate::loadtest::error::RequestFailure;
    use crate::loadtest::sampler::SampleOutcome;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU64, Ordering};

    /// Returns 200 for the first `ok_calls` calls and 500 afterwards.
    struct ScriptedTransport {
        calls: AtomicU64,
        ok_calls: u64,
    }

    impl ScriptedTransport {
        fn new(ok_calls: u64) -> Self {
            Self {
                calls: AtomicU64::new(0),
                ok_calls,
            }
        }
    }

    #[async_trait]
    impl Transport for ScriptedTransport {
        async fn send(
            &self,
            _method: HttpMethod,
            _target: &str,
            _body: Option<&RequestBody>,
        ) -> Result<u16, RequestFailure> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call < self.ok_calls {
                Ok(200)
            } else {
                Ok(500)
            }
        }
    }

    fn config(total: u64, concurrency: u32) -> LoadTestConfig {
        LoadTestConfig::new("http://localhost:8080/", total, concurrency)
    }

    #[tokio::test]
    async fn test_run_counts_every_request() {
        let transport = Arc::new(ScriptedTransport::new(u64::MAX));
        let runner = LoadRunner::with_transport(config(25, 4), transport.clone()).unwrap();
        let result = runner.run().await;

        assert_eq!(result.total_requests, 25);
        assert_eq!(result.concurrency, 4);
        assert_eq!(result.error_count, 0);
        assert_eq!(result.success_count(), 25);
        assert_eq!(transport.calls.load(Ordering::SeqCst), 25);
    }

    #[tokio::test]
    async fn test_run_mixed_outcomes() {
        let transport = Arc::new(ScriptedTransport::new(8));
        let runner = LoadRunner::with_transport(config(10, 2), transport).unwrap();
        let result = runner.run().await;

        assert_eq!(result.error_count, 2);
        assert_eq!(result.latencies.len(), 8);
        assert_eq!(result.error_categories.get("http"), Some(&2));
        assert!((result.error_rate() - 0.2).abs() < f64::EPSILON);
        assert!(result.latencies.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(result.percentiles, Percentiles::from_sorted(&result.latencies));
    }

    #[tokio::test]
    async fn test_run_all_failures_reports_sentinels() {
        let transport = Arc::new(ScriptedTransport::new(0));
        let runner = LoadRunner::with_transport(config(6, 3), transport).unwrap();
        let result = runner.run().await;

        assert_eq!(result.error_count, 6);
        assert_eq!(result.average_latency, 0.0);
        assert_eq!(result.percentiles, Percentiles::default());
        assert_eq!(result.min_latency(), 0.0);
        assert_eq!(result.max_latency(), 0.0);
    }

    #[tokio::test]
    async fn test_concurrency_above_total() {
        let transport = Arc::new(ScriptedTransport::new(u64::MAX));
        let runner = LoadRunner::with_transport(config(3, 16), transport.clone()).unwrap();
        let result = runner.run().await;

        assert_eq!(result.success_count(), 3);
        assert_eq!(transport.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_invalid_config_makes_no_calls() {
        let transport = Arc::new(ScriptedTransport::new(u64::MAX));
        let err = LoadRunner::with_transport(config(0, 1), transport.clone())
            .err()
            .expect("zero requests must be rejected");
        assert!(matches!(err, LoadTestError::ConfigValidation { .. }));
        assert_eq!(transport.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_run_with_progress_publishes_final_snapshot() {
        let transport = Arc::new(ScriptedTransport::new(4));
        let runner = LoadRunner::with_transport(config(5, 2), transport).unwrap();
        let (progress_tx, progress_rx) = watch::channel(RunProgress::default());

        runner.run_with_progress(progress_tx).await;

        let progress = progress_rx.borrow().clone();
        assert_eq!(progress.completed, 5);
        assert_eq!(progress.success_count, 4);
        assert_eq!(progress.error_count, 1);
        assert_eq!(progress.workers, 2);
        assert_eq!(progress.active_workers, 0);
        assert!(progress.is_finished());
    }

    #[test]
    fn test_spawned_workers_capped_at_total() {
        assert_eq!(spawned_workers(10, 4), 4);
        assert_eq!(spawned_workers(3, 16), 3);
        assert_eq!(spawned_workers(1, 1_000_000), 1);
        assert_eq!(spawned_workers(u64::MAX, 8), 8);
    }

    #[tokio::test]
    async fn test_metrics_aggregator_processes_reports() {
        let (sample_tx, sample_rx) = mpsc::channel::<SampleReport>(16);
        let (progress_tx, progress_rx) = watch::channel(RunProgress::default());

        for slot in 0..5 {
            let outcome = SampleOutcome::Success {
                latency: Duration::from_millis(10),
            };
            sample_tx
                .send(SampleReport::new(slot, outcome))
                .await
                .unwrap();
        }
        drop(sample_tx);

        let recorder =
            metrics_aggregator(sample_rx, progress_tx, 5, ActiveWorkerCounter::new(), 1).await;
        assert_eq!(recorder.success_count(), 5);
        assert_eq!(progress_rx.borrow().completed, 5);
        assert_eq!(progress_rx.borrow().workers, 1);
    }

    #[test]
    fn test_result_accessors() {
        let result = LoadTestResult {
            total_requests: 4,
            concurrency: 2,
            error_count: 1,
            total_elapsed: Duration::from_secs(2),
            average_latency: 0.2,
            percentiles: Percentiles::from_sorted(&[0.1, 0.2, 0.3]),
            latencies: vec![0.1, 0.2, 0.3],
            error_categories: BTreeMap::from([("timeout".to_string(), 1)]),
        };

        assert_eq!(result.success_count(), 3);
        assert!((result.error_rate() - 0.25).abs() < f64::EPSILON);
        assert!((result.throughput() - 2.0).abs() < f64::EPSILON);
        assert_eq!(result.min_latency(), 0.1);
        assert_eq!(result.max_latency(), 0.3);
    }
}
