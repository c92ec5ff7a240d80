//! Single-request sampler.
//!
//! [`sample`] sends exactly one request through a [`Transport`], times it,
//! and classifies the result as a [`SampleOutcome`]. It never retries: each
//! call is one attempt and its outcome is final.
//!
//! The [`Transport`] trait is the network seam. [`crate::loadtest::client::HttpTransport`]
//! is the reqwest-backed implementation; tests plug in counting mocks.

use async_trait::async_trait;
use std::time::{Duration, Instant};

use crate::loadtest::config::{HttpMethod, LoadTestConfig, RequestBody};
use crate::loadtest::error::RequestFailure;

/// Sends one HTTP request and waits for the complete response.
///
/// Implementations return the response status code once the full response
/// (headers and body) has been received. Status classification is left to
/// [`sample`]; only transport-level problems are reported as errors.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Sends `method` to `target`, with `body` serialized as JSON when present.
    async fn send(
        &self,
        method: HttpMethod,
        target: &str,
        body: Option<&RequestBody>,
    ) -> Result<u16, RequestFailure>;
}

/// Tagged result of one request attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum SampleOutcome {
    /// A 2xx response, with the wall-clock latency of the request.
    Success { latency: Duration },
    /// A non-2xx response or a transport failure.
    Failure { cause: RequestFailure },
}

impl SampleOutcome {
    /// Returns `true` for [`SampleOutcome::Success`].
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    /// Latency in seconds for a success, `None` for a failure.
    pub fn latency_secs(&self) -> Option<f64> {
        match self {
            Self::Success { latency } => Some(latency.as_secs_f64()),
            Self::Failure { .. } => None,
        }
    }

    /// The failure, if this outcome is one.
    pub fn failure(&self) -> Option<&RequestFailure> {
        match self {
            Self::Success { .. } => None,
            Self::Failure { cause } => Some(cause),
        }
    }
}

/// Returns `true` for status codes in 200..=299.
pub fn is_success_status(status: u16) -> bool {
    (200..300).contains(&status)
}

/// Issue one request described by `config` and classify the outcome.
///
/// The clock starts immediately before the transport call and stops as soon
/// as it returns, so classification is outside the measured window.
pub async fn sample(transport: &dyn Transport, config: &LoadTestConfig) -> SampleOutcome {
    let body = config.effective_body();

    let start = Instant::now();
    let result = transport.send(config.method, &config.target, body).await;
    let latency = start.elapsed();

    match result {
        Ok(status) if is_success_status(status) => SampleOutcome::Success { latency },
        Ok(status) => SampleOutcome::Failure {
            cause: RequestFailure::from_status(status),
        },
        Err(cause) => SampleOutcome::Failure { cause },
    }
}
