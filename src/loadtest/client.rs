//! reqwest-backed [`Transport`] used for real runs.
//!
//! One [`HttpTransport`] is shared by every worker of a run. The underlying
//! [`reqwest::Client`] is cheap to clone and pools connections internally.

use async_trait::async_trait;
use std::time::Duration;

use crate::loadtest::config::{HttpMethod, LoadTestConfig, RequestBody};
use crate::loadtest::error::{LoadTestError, RequestFailure};
use crate::loadtest::sampler::Transport;

/// HTTP transport built on [`reqwest::Client`].
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    /// Creates a transport with an optional per-request timeout.
    ///
    /// Without a timeout a stalled server holds its worker indefinitely.
    pub fn new(timeout: Option<Duration>) -> Result<Self, LoadTestError> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|source| LoadTestError::ClientBuild { source })?;
        Ok(Self { client })
    }

    /// Creates a transport honoring the config's `timeout_ms`.
    pub fn from_config(config: &LoadTestConfig) -> Result<Self, LoadTestError> {
        Self::new(config.timeout())
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(
        &self,
        method: HttpMethod,
        target: &str,
        body: Option<&RequestBody>,
    ) -> Result<u16, RequestFailure> {
        let mut request = self.client.request(method.into(), target);
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request
            .send()
            .await
            .map_err(|e| RequestFailure::classify_reqwest(&e))?;
        let status = response.status().as_u16();

        // The sample covers the whole response, so drain the body before returning.
        response
            .bytes()
            .await
            .map_err(|e| RequestFailure::classify_reqwest(&e))?;

        Ok(status)
    }
}
