//! Control-plane job contract.
//!
//! [`JobRequest`] is the JSON body accepted by `POST /run_load_test`;
//! [`JobResponse`] is the document returned once the run finishes. The same
//! response shape is printed by `http-loadtest run --json`.

use serde::{Deserialize, Serialize};

use crate::loadtest::config::{HttpMethod, LoadTestConfig, RequestBody};
use crate::loadtest::engine::{LoadRunner, LoadTestResult};
use crate::loadtest::error::LoadTestError;
use crate::loadtest::stats::Percentiles;

fn default_concurrency() -> u32 {
    1
}

fn default_request_type() -> String {
    HttpMethod::Get.as_str().to_string()
}

/// Request body of `POST /run_load_test`.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct JobRequest {
    pub url: String,
    pub num_requests: u64,
    #[serde(default = "default_concurrency")]
    pub concurrency: u32,
    /// `GET` or `POST`, case-insensitive.
    #[serde(default = "default_request_type")]
    pub request_type: String,
    /// JSON object sent with POST requests.
    #[serde(default)]
    pub data: Option<RequestBody>,
}

impl JobRequest {
    /// Map the request onto a validated [`LoadTestConfig`].
    pub fn into_config(self) -> Result<LoadTestConfig, LoadTestError> {
        let method: HttpMethod = self.request_type.parse()?;
        let config = LoadTestConfig {
            target: self.url,
            method,
            total_requests: self.num_requests,
            concurrency: self.concurrency,
            timeout_ms: None,
            body: self.data,
        };
        config.validate()?;
        Ok(config)
    }
}

/// Result document of one load test job.
///
/// Times are in seconds.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct JobResponse {
    pub total_requests: u64,
    pub concurrency: u32,
    pub errors: u64,
    pub total_time: f64,
    pub average_latency: f64,
    pub percentiles: Percentiles,
}

impl From<&LoadTestResult> for JobResponse {
    fn from(result: &LoadTestResult) -> Self {
        Self {
            total_requests: result.total_requests,
            concurrency: result.concurrency,
            errors: result.error_count,
            total_time: result.total_elapsed.as_secs_f64(),
            average_latency: result.average_latency,
            percentiles: result.percentiles,
        }
    }
}

/// Validate `request`, run it to completion and summarize the result.
pub async fn run_job(request: JobRequest) -> Result<JobResponse, LoadTestError> {
    let config = request.into_config()?;
    let runner = LoadRunner::new(config)?;
    let result = runner.run().await;
    Ok(JobResponse::from(&result))
}
