//! JSON report serialization for load test results.
//!
//! Produces a schema-versioned JSON report file containing latency
//! percentiles, throughput, error classification and the full resolved
//! config for reproducibility. Designed for CI pipeline consumption.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::loadtest::config::{HttpMethod, LoadTestConfig, RequestBody};
use crate::loadtest::engine::LoadTestResult;

/// Schema version for the JSON report format.
///
/// Increment when making breaking changes to the report structure.
pub const SCHEMA_VERSION: &str = "1.0";

/// Directory (relative to the base dir) that receives report files.
pub const REPORTS_DIR: &str = ".loadtest/reports";

/// Top-level JSON report structure.
///
/// Self-contained: the file alone says what was run and what happened.
#[derive(Debug, Serialize)]
pub struct LoadTestReport {
    /// Report format version for parser compatibility.
    pub schema_version: String,
    /// When the report was generated (RFC 3339, UTC).
    pub timestamp: DateTime<Utc>,
    /// Target URL that was tested.
    pub target_url: String,
    /// Actual run duration in seconds.
    pub duration_secs: f64,
    /// Full resolved configuration (with CLI overrides applied).
    pub config: ReportConfig,
    /// Aggregate performance metrics.
    pub metrics: ReportMetrics,
    /// Error counts by category.
    pub errors: BTreeMap<String, u64>,
}

/// Resolved configuration embedded in the report.
#[derive(Debug, Serialize)]
pub struct ReportConfig {
    pub method: HttpMethod,
    pub total_requests: u64,
    pub concurrency: u32,
    /// Per-request timeout in milliseconds, `null` when unbounded.
    pub timeout_ms: Option<u64>,
    /// JSON body sent with POST requests.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<RequestBody>,
}

/// Aggregate performance metrics in the report.
#[derive(Debug, Serialize)]
pub struct ReportMetrics {
    pub total_requests: u64,
    pub success_count: u64,
    pub error_count: u64,
    /// Error rate as a fraction (0.0..=1.0).
    pub error_rate: f64,
    /// Throughput in requests per second.
    pub throughput_rps: f64,
    /// Success latency breakdown.
    pub latency: LatencyMetrics,
}

/// Success latency metrics in milliseconds.
///
/// All values are 0.0 when no request succeeded.
#[derive(Debug, Serialize)]
pub struct LatencyMetrics {
    pub mean_ms: f64,
    pub min_ms: f64,
    pub max_ms: f64,
    pub p50_ms: f64,
    pub p75_ms: f64,
    pub p95_ms: f64,
    pub p99_ms: f64,
}

fn secs_to_ms(secs: f64) -> f64 {
    secs * 1000.0
}

impl LoadTestReport {
    /// Build a report from a finished run and the config that produced it.
    pub fn from_result(result: &LoadTestResult, config: &LoadTestConfig) -> Self {
        Self::at(result, config, Utc::now())
    }

    /// Build a report stamped with `timestamp`.
    pub fn at(
        result: &LoadTestResult,
        config: &LoadTestConfig,
        timestamp: DateTime<Utc>,
    ) -> Self {
        let p = &result.percentiles;
        Self {
            schema_version: SCHEMA_VERSION.to_string(),
            timestamp,
            target_url: config.target.clone(),
            duration_secs: result.total_elapsed.as_secs_f64(),
            config: ReportConfig {
                method: config.method,
                total_requests: config.total_requests,
                concurrency: config.concurrency,
                timeout_ms: config.timeout_ms,
                body: config.effective_body().cloned(),
            },
            metrics: ReportMetrics {
                total_requests: result.total_requests,
                success_count: result.success_count(),
                error_count: result.error_count,
                error_rate: result.error_rate(),
                throughput_rps: result.throughput(),
                latency: LatencyMetrics {
                    mean_ms: secs_to_ms(result.average_latency),
                    min_ms: secs_to_ms(result.min_latency()),
                    max_ms: secs_to_ms(result.max_latency()),
                    p50_ms: secs_to_ms(p.p50),
                    p75_ms: secs_to_ms(p.p75),
                    p95_ms: secs_to_ms(p.p95),
                    p99_ms: secs_to_ms(p.p99),
                },
            },
            errors: result.error_categories.clone(),
        }
    }
}

/// Write a JSON report file under `base_dir/.loadtest/reports/`.
///
/// Creates the reports directory if it does not exist. The filename comes
/// from the report timestamp (see [`report_filename`]).
///
/// Returns the path to the written report file.
pub fn write_report(report: &LoadTestReport, base_dir: &Path) -> Result<PathBuf, std::io::Error> {
    let reports_dir = base_dir.join(REPORTS_DIR);
    std::fs::create_dir_all(&reports_dir)?;

    let report_path = reports_dir.join(report_filename(&report.timestamp));
    let json = serde_json::to_string_pretty(report).map_err(std::io::Error::other)?;
    std::fs::write(&report_path, json)?;

    tracing::debug!(path = %report_path.display(), "wrote load test report");
    Ok(report_path)
}

/// Generate the report filename for a given timestamp.
///
/// Uses hyphens instead of colons for cross-platform filename compatibility:
/// `loadtest-YYYY-MM-DDTHH-MM-SS.json`.
pub fn report_filename(timestamp: &DateTime<Utc>) -> String {
    format!("loadtest-{}.json", timestamp.format("%Y-%m-%dT%H-%M-%S"))
}
