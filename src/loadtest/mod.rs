//! Load testing engine for HTTP endpoints.
//!
//! Provides typed TOML configuration, a reqwest-backed transport, error
//! classification, a bounded worker pool with a single metrics aggregator,
//! and the terminal and JSON outputs built on its results.

pub mod client;
pub mod config;
pub mod display;
pub mod engine;
pub mod error;
pub mod job;
pub mod metrics;
pub mod report;
pub mod sampler;
pub mod stats;
pub mod summary;
pub mod worker;
