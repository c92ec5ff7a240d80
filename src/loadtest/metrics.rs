//! Single-owner metrics recorder fed by the worker outcome channel.
//!
//! [`MetricsRecorder`] keeps the exact success latency sample (for final
//! statistics), the error count and per-category breakdown, and an
//! HdrHistogram of success latencies used for cheap approximate percentiles
//! in live progress updates.
//!
//! # Design
//!
//! - **Single-owner**: no `Arc<Mutex>`. Workers send [`SampleReport`] values
//!   through an mpsc channel and one aggregator task owns the recorder.
//! - **Exact final numbers**: the raw sample is kept so the finished run
//!   reports interpolated percentiles, not histogram buckets.
//! - **Microsecond histogram**: live p95 is read from the histogram in
//!   microseconds and shown in milliseconds.

use std::collections::BTreeMap;
use std::time::Duration;

use hdrhistogram::Histogram;

use crate::loadtest::sampler::SampleOutcome;

/// One finished request, as reported by a worker.
#[derive(Debug, Clone)]
pub struct SampleReport {
    /// Index of the request slot (0-based) this outcome belongs to.
    pub slot: u64,
    /// What happened.
    pub outcome: SampleOutcome,
}

impl SampleReport {
    pub fn new(slot: u64, outcome: SampleOutcome) -> Self {
        Self { slot, outcome }
    }
}

/// Point-in-time progress of a running load test.
///
/// Published through a watch channel by the aggregator. Percentiles here are
/// histogram approximations; the final result is computed exactly.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunProgress {
    /// Outcomes collected so far (success + error).
    pub completed: u64,
    /// Successful requests so far.
    pub success_count: u64,
    /// Failed requests so far.
    pub error_count: u64,
    /// Requests the run will issue in total.
    pub total_requests: u64,
    /// Approximate success latency P95 (milliseconds).
    pub p95_ms: f64,
    /// Running mean of success latencies (milliseconds).
    pub mean_ms: f64,
    /// Workers still claiming slots.
    pub active_workers: u32,
    /// Workers spawned for the run.
    pub workers: u32,
}

impl RunProgress {
    /// Fraction of failed requests among completed ones (0.0..=1.0).
    pub fn error_rate(&self) -> f64 {
        if self.completed == 0 {
            return 0.0;
        }
        self.error_count as f64 / self.completed as f64
    }

    /// Returns `true` once every request has reported.
    pub fn is_finished(&self) -> bool {
        self.total_requests > 0 && self.completed >= self.total_requests
    }
}

/// Collects worker outcomes for one run.
pub struct MetricsRecorder {
    /// Success latencies in seconds, in arrival order.
    latencies: Vec<f64>,
    /// Success latencies in microseconds, for live percentiles.
    histogram: Histogram<u64>,
    /// Number of failed requests.
    error_count: u64,
    /// Failure counts keyed by [`crate::loadtest::error::RequestFailure::error_category`].
    error_categories: BTreeMap<String, u64>,
    /// Requests the run will issue in total.
    total_requests: u64,
}

impl MetricsRecorder {
    /// Creates an empty recorder for a run of `total_requests` requests.
    pub fn new(total_requests: u64) -> Self {
        let mut histogram = Histogram::<u64>::new(3).expect("3 sigfigs is always valid");
        histogram.auto(true);

        Self {
            latencies: Vec::with_capacity(total_requests.min(1 << 20) as usize),
            histogram,
            error_count: 0,
            error_categories: BTreeMap::new(),
            total_requests,
        }
    }

    /// Record one outcome.
    pub fn record(&mut self, outcome: &SampleOutcome) {
        match outcome {
            SampleOutcome::Success { latency } => {
                self.latencies.push(latency.as_secs_f64());
                let micros = u64::try_from(latency.as_micros())
                    .unwrap_or(u64::MAX)
                    .max(1);
                let _ = self.histogram.record(micros);
            },
            SampleOutcome::Failure { cause } => {
                self.error_count += 1;
                *self
                    .error_categories
                    .entry(cause.error_category().to_owned())
                    .or_insert(0) += 1;
            },
        }
    }

    /// Number of successful requests recorded.
    pub fn success_count(&self) -> u64 {
        self.latencies.len() as u64
    }

    /// Number of failed requests recorded.
    pub fn error_count(&self) -> u64 {
        self.error_count
    }

    /// Total outcomes recorded (success + error).
    pub fn completed(&self) -> u64 {
        self.success_count() + self.error_count
    }

    /// Approximate success latency at `quantile` (0.0..=1.0), in milliseconds.
    /// Returns 0.0 if no successes have been recorded.
    pub fn approx_quantile_ms(&self, quantile: f64) -> f64 {
        if self.histogram.is_empty() {
            return 0.0;
        }
        Duration::from_micros(self.histogram.value_at_quantile(quantile)).as_secs_f64() * 1000.0
    }

    /// Capture a progress snapshot.
    pub fn progress(&self) -> RunProgress {
        let mean_ms = if self.histogram.is_empty() {
            0.0
        } else {
            self.histogram.mean() / 1000.0
        };
        RunProgress {
            completed: self.completed(),
            success_count: self.success_count(),
            error_count: self.error_count,
            total_requests: self.total_requests,
            p95_ms: self.approx_quantile_ms(0.95),
            mean_ms,
            ..RunProgress::default()
        }
    }

    /// Consume the recorder, returning the success latencies (seconds, arrival
    /// order), the error count and the per-category breakdown.
    pub fn into_parts(self) -> (Vec<f64>, u64, BTreeMap<String, u64>) {
        (self.latencies, self.error_count, self.error_categories)
    }
}
