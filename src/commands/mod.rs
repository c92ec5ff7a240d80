//! `http-loadtest` CLI subcommands.
//!
//! Provides `run` (execute a load test), `serve` (JSON control plane) and
//! `init` (generate starter config).

mod init;
mod run;
mod serve;

use anyhow::Result;
use clap::Subcommand;
use std::net::SocketAddr;
use std::path::PathBuf;

/// Directory holding the config file and the reports directory.
pub const CONFIG_DIR: &str = ".loadtest";

/// Config file name inside [`CONFIG_DIR`].
pub const CONFIG_FILE: &str = "loadtest.toml";

/// Load test commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run a load test against an HTTP endpoint
    ///
    /// Settings come from .loadtest/loadtest.toml (or a custom config path)
    /// with command-line flags taking precedence. Reports results to the
    /// terminal and writes a JSON report to .loadtest/reports/.
    Run(run::RunArgs),

    /// Serve the JSON control plane
    ///
    /// Accepts POST /run_load_test jobs and answers with the result summary.
    Serve {
        /// Address to listen on
        #[arg(long, default_value = "127.0.0.1:5000", env = "LOADTEST_BIND")]
        bind: SocketAddr,
    },

    /// Generate a starter loadtest config file
    ///
    /// Creates .loadtest/loadtest.toml with sensible defaults.
    Init {
        /// Target URL written into the config
        url: Option<String>,

        /// Directory to create the config in (defaults to current directory)
        #[arg(long)]
        path: Option<PathBuf>,

        /// Overwrite existing config file
        #[arg(long)]
        force: bool,
    },
}

impl Command {
    /// Execute the selected subcommand.
    pub fn execute(self) -> Result<()> {
        match self {
            Command::Run(args) => {
                let runtime = tokio::runtime::Runtime::new()?;
                runtime.block_on(run::execute_run(args))
            },
            Command::Serve { bind } => {
                let runtime = tokio::runtime::Runtime::new()?;
                runtime.block_on(serve::execute_serve(bind))
            },
            Command::Init { url, path, force } => init::execute_init(url, path, force),
        }
    }
}
