//! k6-style terminal summary renderer for load test results.
//!
//! Produces a colorized, human-readable summary with:
//! - ASCII art header with the run configuration
//! - Dotted-line metric rows (metric.........: value)
//! - Latency percentile breakdown
//! - Throughput and error rate
//! - Error classification breakdown
//!
//! [`render_summary`] is a pure function: it takes structured data and
//! returns a formatted [`String`]. Color coding respects the global override
//! set by `colored::control::set_override(false)` when `--no-color` is
//! active or output is piped.

use colored::Colorize;

use crate::loadtest::config::LoadTestConfig;
use crate::loadtest::engine::LoadTestResult;

/// Width for dotted metric row padding.
const PAD_WIDTH: usize = 32;

/// Latencies above this are highlighted (seconds).
const SLOW_LATENCY_SECS: f64 = 1.0;

/// Render a k6-style terminal summary from load test results.
///
/// # Layout
///
/// ```text
///           /\      |  http-loadtest
///          /  \     |
///     /\  /    \    |  target:      http://localhost:8080/
///    /  \/      \   |  method:      GET
///   /    \       \  |  requests:    1000
///  /      \       \ |  concurrency: 10
///
///   http_req_duration.............: avg=12.40ms  min=3.10ms  max=88.00ms
///   http_req_duration_p50.........: 10.20ms
///   http_req_duration_p75.........: 14.90ms
///   http_req_duration_p95.........: 31.00ms
///   http_req_duration_p99.........: 70.50ms
///   http_req_success_count........: 990
///   http_req_error_count..........: 10
///   http_req_error_rate...........: 1.0%
///   http_req_throughput...........: 402.3 req/s
///   http_req_total................: 1000
///   http_req_elapsed..............: 2.49s
///
///   errors:
///     http........................: 8
///     timeout.....................: 2
/// ```
pub fn render_summary(result: &LoadTestResult, config: &LoadTestConfig) -> String {
    let mut lines = Vec::new();

    lines.push(render_header(config));

    let duration_value = format!(
        "avg={}  min={}  max={}",
        format_latency(result.average_latency),
        format_latency(result.min_latency()),
        format_latency(result.max_latency()),
    );
    lines.push(format_metric_row(
        "http_req_duration",
        &colorize_latency(duration_value, result.max_latency()),
        PAD_WIDTH,
    ));

    for (rank, value) in result.percentiles.iter() {
        lines.push(format_metric_row(
            &format!("http_req_duration_p{rank}"),
            &colorize_latency(format_latency(value), value),
            PAD_WIDTH,
        ));
    }

    lines.push(format_metric_row(
        "http_req_success_count",
        &result.success_count().to_string().green().to_string(),
        PAD_WIDTH,
    ));

    let error_count_str = if result.error_count > 0 {
        result.error_count.to_string().red().to_string()
    } else {
        result.error_count.to_string()
    };
    lines.push(format_metric_row(
        "http_req_error_count",
        &error_count_str,
        PAD_WIDTH,
    ));

    let error_rate_pct = result.error_rate() * 100.0;
    let error_rate_str = format!("{error_rate_pct:.1}%");
    let error_rate_colored = if error_rate_pct > 5.0 {
        error_rate_str.red().to_string()
    } else if error_rate_pct > 1.0 {
        error_rate_str.yellow().to_string()
    } else {
        error_rate_str.green().to_string()
    };
    lines.push(format_metric_row(
        "http_req_error_rate",
        &error_rate_colored,
        PAD_WIDTH,
    ));

    let throughput_str = format!("{:.1} req/s", result.throughput());
    lines.push(format_metric_row(
        "http_req_throughput",
        &throughput_str.green().to_string(),
        PAD_WIDTH,
    ));

    lines.push(format_metric_row(
        "http_req_total",
        &result.total_requests.to_string(),
        PAD_WIDTH,
    ));

    lines.push(format_metric_row(
        "http_req_elapsed",
        &format!("{:.2}s", result.total_elapsed.as_secs_f64()),
        PAD_WIDTH,
    ));

    // Error breakdown (only when errors exist)
    if !result.error_categories.is_empty() {
        lines.push(String::new());
        lines.push("  errors:".to_string());
        let mut categories: Vec<_> = result.error_categories.iter().collect();
        categories.sort_by(|a, b| b.1.cmp(a.1));
        for (category, count) in categories {
            lines.push(format_metric_row(
                &format!("  {category}"),
                &count.to_string().red().to_string(),
                PAD_WIDTH,
            ));
        }
    }

    lines.join("\n")
}

/// Render the ASCII art header with run configuration details.
fn render_header(config: &LoadTestConfig) -> String {
    let timeout = config
        .timeout_ms
        .map_or_else(|| "none".to_string(), |ms| format!("{ms}ms"));
    format!(
        r#"
          /\      |  {}
         /  \     |
    /\  /    \    |  target:      {}
   /  \/      \   |  method:      {}
  /    \       \  |  requests:    {}
 /      \       \ |  concurrency: {}
                  |  timeout:     {}
"#,
        "http-loadtest".bold(),
        config.target,
        config.method,
        config.total_requests,
        config.concurrency,
        timeout,
    )
}

/// Format a latency given in seconds as milliseconds.
fn format_latency(secs: f64) -> String {
    format!("{:.2}ms", secs * 1000.0)
}

fn colorize_latency(text: String, secs: f64) -> String {
    if secs > SLOW_LATENCY_SECS {
        text.yellow().to_string()
    } else {
        text.green().to_string()
    }
}

/// Format a single metric row with dot-padding.
///
/// Produces: `"  metric_name..................: value_string"`
fn format_metric_row(name: &str, value: &str, pad_width: usize) -> String {
    format!("  {name:.<pad_width$}: {value}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loadtest::stats::Percentiles;
    use std::collections::BTreeMap;
    use std::time::Duration;

    /// Disable colors in tests for deterministic assertions.
    fn setup_no_color() {
        colored::control::set_override(false);
    }

    fn config() -> LoadTestConfig {
        LoadTestConfig::new("http://localhost:8080/", 10, 2)
    }

    fn mixed_result() -> LoadTestResult {
        let latencies = vec![0.010, 0.020, 0.030, 0.040, 0.050, 0.060, 0.070, 0.080];
        LoadTestResult {
            total_requests: 10,
            concurrency: 2,
            error_count: 2,
            total_elapsed: Duration::from_secs(2),
            average_latency: 0.045,
            percentiles: Percentiles::from_sorted(&latencies),
            latencies,
            error_categories: BTreeMap::from([
                ("http".to_string(), 1),
                ("timeout".to_string(), 3),
            ]),
        }
    }

    #[test]
    fn test_render_summary_contains_header() {
        setup_no_color();
        let output = render_summary(&mixed_result(), &config());

        assert!(output.contains("http-loadtest"), "Missing header title");
        assert!(output.contains("http://localhost:8080/"), "Missing target URL");
        assert!(output.contains("GET"), "Missing method");
        assert!(output.contains("timeout:     none"), "Missing timeout");
    }

    #[test]
    fn test_render_summary_contains_latency_metrics() {
        setup_no_color();
        let output = render_summary(&mixed_result(), &config());

        assert!(output.contains("avg=45.00ms"), "Missing avg: {output}");
        assert!(output.contains("min=10.00ms"), "Missing min: {output}");
        assert!(output.contains("max=80.00ms"), "Missing max: {output}");
        assert!(output.contains("http_req_duration_p50"), "Missing p50 row");
        assert!(output.contains("http_req_duration_p99"), "Missing p99 row");
        assert!(output.contains("45.00ms"), "Missing p50 value");
    }

    #[test]
    fn test_render_summary_contains_throughput_and_rate() {
        setup_no_color();
        let output = render_summary(&mixed_result(), &config());

        assert!(output.contains("5.0 req/s"), "Missing throughput: {output}");
        assert!(output.contains("20.0%"), "Missing error rate: {output}");
        assert!(output.contains("2.00s"), "Missing elapsed: {output}");
    }

    #[test]
    fn test_render_summary_error_categories_sorted_by_count_desc() {
        setup_no_color();
        let output = render_summary(&mixed_result(), &config());

        let errors_pos = output.find("errors:").expect("error section");
        let timeout_pos = output.rfind("timeout").expect("timeout category");
        let http_pos = output.rfind("  http.").expect("http category");
        assert!(errors_pos < timeout_pos);
        assert!(timeout_pos < http_pos, "timeout (3) should precede http (1)");
    }

    #[test]
    fn test_render_summary_no_errors_omits_error_section() {
        setup_no_color();
        let result = LoadTestResult {
            error_count: 0,
            error_categories: BTreeMap::new(),
            ..mixed_result()
        };
        let output = render_summary(&result, &config());
        assert!(!output.contains("errors:"), "Should not have error section");
    }

    #[test]
    fn test_render_summary_zero_successes() {
        setup_no_color();
        let result = LoadTestResult {
            error_count: 10,
            average_latency: 0.0,
            percentiles: Percentiles::default(),
            latencies: Vec::new(),
            error_categories: BTreeMap::from([("http".to_string(), 10)]),
            ..mixed_result()
        };
        let output = render_summary(&result, &config());
        assert!(output.contains("avg=0.00ms"), "got: {output}");
        assert!(output.contains("100.0%"), "got: {output}");
    }

    #[test]
    fn test_format_metric_row_dot_padding() {
        let row = format_metric_row("test_metric", "42ms", 30);
        assert!(row.starts_with("  test_metric"));
        assert!(row.ends_with(": 42ms"));
        assert!(row.contains(".."), "Should have dot padding");
    }
}
