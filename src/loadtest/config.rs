//! TOML-based load test configuration.
//!
//! Defines [`LoadTestConfig`], the immutable description of one run: the
//! target URL, request method, optional JSON body, total request count and
//! concurrency level. Configs can be built in code, parsed from TOML, or
//! loaded from a file; all three paths go through [`LoadTestConfig::validate`]
//! before a run is allowed to start.
//!
//! # Example TOML
//!
//! ```toml
//! target = "http://localhost:8080/api/items"
//! method = "post"
//! total_requests = 1000
//! concurrency = 16
//! timeout_ms = 5000
//!
//! [body]
//! name = "widget"
//! quantity = 3
//! ```
//!
//! The `target` may be omitted from the file and supplied with the `URL`
//! argument of `http-loadtest run` instead.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use crate::loadtest::error::LoadTestError;

/// JSON object sent as the body of POST requests.
pub type RequestBody = serde_json::Map<String, serde_json::Value>;

/// Request method issued by every sample of a run.
///
/// Parsing is case-insensitive (`"get"`, `"Get"` and `"GET"` are equivalent)
/// and the [`fmt::Display`] form is always uppercase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize, Serialize)]
#[serde(try_from = "String", into = "&'static str")]
pub enum HttpMethod {
    /// `GET` without a request body.
    #[default]
    Get,
    /// `POST` with the configured body serialized as JSON.
    Post,
}

impl HttpMethod {
    /// Uppercase wire name of the method.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HttpMethod {
    type Err = LoadTestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "GET" => Ok(Self::Get),
            "POST" => Ok(Self::Post),
            _ => Err(LoadTestError::UnsupportedMethod {
                method: s.trim().to_ascii_uppercase(),
            }),
        }
    }
}

impl TryFrom<String> for HttpMethod {
    type Error = LoadTestError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<HttpMethod> for &'static str {
    fn from(method: HttpMethod) -> Self {
        method.as_str()
    }
}

impl From<HttpMethod> for reqwest::Method {
    fn from(method: HttpMethod) -> Self {
        match method {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
        }
    }
}

fn default_concurrency() -> u32 {
    1
}

/// Top-level load test configuration.
///
/// Constructed once, validated, then shared read-only with every worker of a
/// run. Nothing in the engine mutates a config after
/// [`crate::loadtest::engine::LoadRunner`] has accepted it.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct LoadTestConfig {
    /// Absolute `http`/`https` URL every request is sent to.
    #[serde(default)]
    pub target: String,
    /// Request method; defaults to `GET`.
    #[serde(default)]
    pub method: HttpMethod,
    /// Total number of requests to issue across all workers.
    #[serde(default)]
    pub total_requests: u64,
    /// Number of concurrent workers; defaults to 1.
    #[serde(default = "default_concurrency")]
    pub concurrency: u32,
    /// Optional per-request timeout in milliseconds. No timeout when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,
    /// JSON object sent with POST requests. Ignored for GET.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<RequestBody>,
}

impl Default for LoadTestConfig {
    fn default() -> Self {
        Self {
            target: String::new(),
            method: HttpMethod::Get,
            total_requests: 0,
            concurrency: default_concurrency(),
            timeout_ms: None,
            body: None,
        }
    }
}

impl LoadTestConfig {
    /// Creates a GET config for `target` with the given request count and concurrency.
    pub fn new(target: impl Into<String>, total_requests: u64, concurrency: u32) -> Self {
        Self {
            target: target.into(),
            total_requests,
            concurrency,
            ..Self::default()
        }
    }

    /// Sets the request method.
    pub fn with_method(mut self, method: HttpMethod) -> Self {
        self.method = method;
        self
    }

    /// Sets the JSON body sent with POST requests.
    pub fn with_body(mut self, body: RequestBody) -> Self {
        self.body = Some(body);
        self
    }

    /// Sets a per-request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout_ms = Some(timeout.as_millis() as u64);
        self
    }

    /// Parse a TOML string into a validated [`LoadTestConfig`].
    ///
    /// Returns an error if the TOML is malformed or fails validation.
    pub fn from_toml(content: &str) -> Result<Self, LoadTestError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Parse a TOML string without validating it.
    ///
    /// Used by the CLI, which layers flag overrides on top of the file
    /// before validating the merged result.
    pub fn from_toml_unvalidated(content: &str) -> Result<Self, LoadTestError> {
        Ok(toml::from_str(content)?)
    }

    /// Load and validate a [`LoadTestConfig`] from a file path.
    ///
    /// Returns [`LoadTestError::ConfigIo`] if the file cannot be read,
    /// [`LoadTestError::ConfigParse`] if the TOML is malformed, or a
    /// validation error if the values are unusable.
    pub fn load(path: &Path) -> Result<Self, LoadTestError> {
        let config = Self::load_unvalidated(path)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a [`LoadTestConfig`] from a file path without validating it.
    pub fn load_unvalidated(path: &Path) -> Result<Self, LoadTestError> {
        let content = std::fs::read_to_string(path).map_err(|source| LoadTestError::ConfigIo {
            source,
            path: path.display().to_string(),
        })?;
        Self::from_toml_unvalidated(&content)
    }

    /// Serialize the config back to TOML.
    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string(self)
    }

    /// Returns the per-request timeout, if one is configured.
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }

    /// Returns the body that will actually be sent, which is only ever the
    /// configured body for POST.
    pub fn effective_body(&self) -> Option<&RequestBody> {
        match self.method {
            HttpMethod::Post => self.body.as_ref(),
            HttpMethod::Get => None,
        }
    }

    /// Validate that the config is semantically correct.
    ///
    /// Checks:
    /// - `target` is non-empty and parses as an absolute `http`/`https` URL
    /// - `total_requests > 0`
    /// - `concurrency > 0`
    /// - `timeout_ms`, when present, is greater than 0
    pub fn validate(&self) -> Result<(), LoadTestError> {
        let target = self.target.trim();
        if target.is_empty() {
            return Err(LoadTestError::validation("Target URL must not be empty"));
        }

        let parsed = url::Url::parse(target).map_err(|e| {
            LoadTestError::validation(format!("Target URL '{target}' is invalid: {e}"))
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(LoadTestError::validation(format!(
                "Target URL '{target}' must use http or https, got '{}'",
                parsed.scheme()
            )));
        }

        if self.total_requests == 0 {
            return Err(LoadTestError::validation(
                "total_requests must be greater than 0",
            ));
        }

        if self.concurrency == 0 {
            return Err(LoadTestError::validation(
                "concurrency must be greater than 0",
            ));
        }

        if self.timeout_ms == Some(0) {
            return Err(LoadTestError::validation(
                "timeout_ms must be greater than 0 when set",
            ));
        }

        if self.method == HttpMethod::Get && self.body.is_some() {
            tracing::warn!("request body is ignored for GET requests");
        }

        if u64::from(self.concurrency) > self.total_requests {
            tracing::debug!(
                concurrency = self.concurrency,
                total_requests = self.total_requests,
                "concurrency exceeds total_requests; one worker per request will be spawned"
            );
        }

        Ok(())
    }
}
