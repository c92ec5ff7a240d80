//! `http-loadtest run` command implementation.

use anyhow::{Context, Result};
use clap::Args;
use std::future::Future;
use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tokio::sync::watch;

use http_loadtest::loadtest::config::{HttpMethod, LoadTestConfig, RequestBody};
use http_loadtest::loadtest::display::{apply_color_override, color_override, display_loop};
use http_loadtest::loadtest::engine::{LoadRunner, LoadTestResult};
use http_loadtest::loadtest::job::JobResponse;
use http_loadtest::loadtest::metrics::RunProgress;
use http_loadtest::loadtest::report::{write_report, LoadTestReport};
use http_loadtest::loadtest::summary::render_summary;

use super::{CONFIG_DIR, CONFIG_FILE};

/// Arguments of `http-loadtest run`.
#[derive(Debug, Args)]
pub struct RunArgs {
    /// Target URL (overrides config)
    pub url: Option<String>,

    /// Path to config file (default: auto-discover .loadtest/loadtest.toml)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Total number of requests (overrides config)
    #[arg(short = 'n', long)]
    pub requests: Option<u64>,

    /// Number of concurrent workers (overrides config)
    #[arg(short, long)]
    pub concurrency: Option<u32>,

    /// Request method, GET or POST (overrides config)
    #[arg(short = 'X', long)]
    pub method: Option<HttpMethod>,

    /// JSON object sent as the POST body (overrides config)
    #[arg(long)]
    pub data: Option<String>,

    /// Per-request timeout in milliseconds (overrides config)
    #[arg(long)]
    pub timeout_ms: Option<u64>,

    /// Disable JSON report output
    #[arg(long)]
    pub no_report: bool,

    /// Disable colored output
    #[arg(long)]
    pub no_color: bool,

    /// Print the result document as JSON instead of the summary
    #[arg(long)]
    pub json: bool,
}

/// Execute the `run` command.
///
/// Loads config (explicit path, auto-discovery, or none), applies CLI
/// overrides, runs the load test, prints the summary and writes the report.
pub async fn execute_run(args: RunArgs) -> Result<()> {
    let mut config = load_config(args.config.as_deref())?;
    apply_overrides(&mut config, &args)?;

    let runner = LoadRunner::new(config).context("Invalid load test configuration")?;

    let (progress_tx, progress_rx) = watch::channel(RunProgress::default());
    let display_handle = if args.json {
        None
    } else {
        Some(tokio::spawn(display_loop(
            progress_rx,
            args.no_color,
            Instant::now(),
        )))
    };

    let outcome = run_until_interrupted(&runner, progress_tx, tokio::signal::ctrl_c()).await;

    // The progress sender is gone either way, so the display clears its line.
    if let Some(handle) = display_handle {
        let _ = handle.await;
    }

    let Some(result) = outcome? else {
        eprintln!("\nReceived Ctrl+C, aborting load test.");
        anyhow::bail!("Load test interrupted");
    };

    if args.json {
        let response = JobResponse::from(&result);
        println!("{}", serde_json::to_string_pretty(&response)?);
    } else {
        apply_color_override(color_override(
            args.no_color,
            std::io::stdout().is_terminal(),
        ));
        println!("{}", render_summary(&result, runner.config()));
    }

    if !args.no_report {
        let report = LoadTestReport::from_result(&result, runner.config());
        let cwd = std::env::current_dir()?;
        match write_report(&report, &cwd) {
            Ok(path) => {
                eprintln!();
                eprintln!("Report written to: {}", path.display());
            },
            Err(e) => {
                // Non-fatal -- the run itself completed
                eprintln!();
                eprintln!("Warning: Failed to write report: {e}");
            },
        }
    }

    Ok(())
}

/// Run to completion unless `interrupt` resolves first.
///
/// Returns `None` when interrupted. `progress_tx` is dropped before this
/// returns in both cases.
async fn run_until_interrupted<F>(
    runner: &LoadRunner,
    progress_tx: watch::Sender<RunProgress>,
    interrupt: F,
) -> Result<Option<LoadTestResult>>
where
    F: Future<Output = std::io::Result<()>>,
{
    tokio::select! {
        result = runner.run_with_progress(progress_tx) => Ok(Some(result)),
        signal = interrupt => {
            signal.context("Failed to listen for Ctrl+C")?;
            Ok(None)
        }
    }
}

/// Resolve the base config: an explicit file, a discovered file, or defaults.
fn load_config(explicit: Option<&Path>) -> Result<LoadTestConfig> {
    let path = match explicit {
        Some(path) => {
            if !path.exists() {
                anyhow::bail!(
                    "Config file not found: {}\nUse `http-loadtest init` to create one.",
                    path.display()
                );
            }
            path.to_path_buf()
        },
        None => match std::env::current_dir().ok().and_then(|dir| discover_config(&dir)) {
            Some(path) => path,
            None => {
                tracing::debug!("no config file found, using command-line settings only");
                return Ok(LoadTestConfig::default());
            },
        },
    };

    eprintln!("Loading config from: {}", path.display());
    LoadTestConfig::load_unvalidated(&path)
        .with_context(|| format!("Failed to load config '{}'", path.display()))
}

/// Apply CLI flag overrides to a loaded config.
fn apply_overrides(config: &mut LoadTestConfig, args: &RunArgs) -> Result<()> {
    if let Some(url) = &args.url {
        config.target = url.clone();
    }
    if let Some(requests) = args.requests {
        config.total_requests = requests;
    }
    if let Some(concurrency) = args.concurrency {
        config.concurrency = concurrency;
    }
    if let Some(method) = args.method {
        config.method = method;
    }
    if let Some(data) = &args.data {
        let body: RequestBody =
            serde_json::from_str(data).context("--data must be a JSON object")?;
        config.body = Some(body);
    }
    if let Some(timeout_ms) = args.timeout_ms {
        config.timeout_ms = Some(timeout_ms);
    }
    Ok(())
}

/// Discover `.loadtest/loadtest.toml` by walking parent directories.
///
/// Starts from `start` and walks up until either the file is found or the
/// filesystem root is reached, like `.git` discovery.
fn discover_config(start: &Path) -> Option<PathBuf> {
    let mut dir = start.to_path_buf();
    loop {
        let candidate = dir.join(CONFIG_DIR).join(CONFIG_FILE);
        if candidate.exists() {
            return Some(candidate);
        }
        if !dir.pop() {
            return None;
        }
    }
}
