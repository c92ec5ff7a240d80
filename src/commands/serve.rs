//! `http-loadtest serve` command implementation.

use anyhow::{Context, Result};
use std::net::SocketAddr;

use http_loadtest::server;

/// Execute the `serve` command: run the control plane until Ctrl+C.
pub async fn execute_serve(bind: SocketAddr) -> Result<()> {
    eprintln!("Control plane: POST http://{bind}/run_load_test");
    server::serve(bind)
        .await
        .with_context(|| format!("Control plane on {bind} failed"))
}
