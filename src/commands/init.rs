//! `http-loadtest init` command implementation.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

use super::{CONFIG_DIR, CONFIG_FILE};

/// Target written when no URL is given.
const DEFAULT_TARGET: &str = "http://localhost:8080/";

/// Execute the `init` command.
///
/// Creates `.loadtest/loadtest.toml` under `path` (or the current
/// directory). Refuses to overwrite an existing file unless `force` is set.
pub fn execute_init(url: Option<String>, path: Option<PathBuf>, force: bool) -> Result<()> {
    let base_dir = match path {
        Some(path) => path,
        None => std::env::current_dir()?,
    };
    let config_path = write_starter_config(&base_dir, url.as_deref(), force)?;

    eprintln!("Created {}", config_path.display());
    eprintln!("Edit the file to customize your load test.");
    Ok(())
}

/// Write the starter config under `base_dir` and return its path.
fn write_starter_config(base_dir: &Path, url: Option<&str>, force: bool) -> Result<PathBuf> {
    let config_dir = base_dir.join(CONFIG_DIR);
    let config_path = config_dir.join(CONFIG_FILE);

    if config_path.exists() && !force {
        anyhow::bail!(
            "Config file already exists: {}\n\
             Use `--force` to overwrite.",
            config_path.display()
        );
    }

    std::fs::create_dir_all(&config_dir)
        .with_context(|| format!("Failed to create {}", config_dir.display()))?;
    std::fs::write(&config_path, starter_template(url.unwrap_or(DEFAULT_TARGET)))
        .with_context(|| format!("Failed to write {}", config_path.display()))?;

    Ok(config_path)
}

/// Starter config with every setting spelled out.
fn starter_template(target: &str) -> String {
    format!(
        r#"# http-loadtest configuration
#
# Command-line flags override any value set here.

# Endpoint every request is sent to (http or https).
target = "{target}"

# GET or POST.
method = "GET"

# Requests issued in total, and how many run at once.
total_requests = 100
concurrency = 10

# Per-request timeout in milliseconds. Remove for no timeout.
timeout_ms = 5000

# JSON body sent with POST requests.
# [body]
# name = "widget"
"#
    )
}
