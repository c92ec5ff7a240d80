//! http-loadtest: fire a fixed number of HTTP requests at bounded
//! concurrency and report latency percentiles.

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

mod commands;

use commands::Command;

/// HTTP load generator with latency percentiles and a JSON control plane
#[derive(Parser)]
#[command(name = "http-loadtest")]
#[command(about = "Measure HTTP endpoint latency under concurrent load", long_about = None)]
#[command(version)]
struct Cli {
    /// Enable debug logging (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    cli.command.execute()
}

/// Install the stderr tracing subscriber.
fn init_logging(verbose: bool) {
    let default_directive = if verbose {
        "http_loadtest=debug"
    } else {
        "http_loadtest=info"
    };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| default_directive.into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
