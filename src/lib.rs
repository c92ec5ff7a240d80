//! HTTP load generator.
//!
//! Issues a configured number of requests against one target at a fixed
//! concurrency level and reports the success latency distribution and
//! error counts.
//!
//! - [`loadtest`] holds the engine: configuration, the single-request
//!   sampler, the worker pool and the statistics over the collected sample.
//! - [`server`] exposes the engine as a small JSON control plane.

pub mod loadtest;
pub mod server;
