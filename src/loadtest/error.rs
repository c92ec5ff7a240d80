//! Error types for the load testing engine.
//!
//! Defines [`LoadTestError`] for configuration errors that stop a run before
//! any request is sent, and [`RequestFailure`] for per-request failures that
//! are counted and reported but never abort a run.

/// Errors that occur during load test configuration parsing, validation, or file I/O.
///
/// Every variant is raised before dispatch begins, so a run that fails with
/// a `LoadTestError` has issued zero requests.
#[derive(Debug, thiserror::Error)]
pub enum LoadTestError {
    /// TOML parse failure -- the config file contains invalid TOML syntax
    /// or does not match the expected schema.
    #[error("Failed to parse config TOML: {source}")]
    ConfigParse {
        #[from]
        source: toml::de::Error,
    },

    /// Semantic validation failure -- the config parsed successfully but
    /// contains invalid values (e.g., zero requests, empty target).
    #[error("Config validation error: {message}")]
    ConfigValidation { message: String },

    /// The request method is not one of the supported methods.
    #[error("Unsupported request type: {method} (expected GET or POST)")]
    UnsupportedMethod { method: String },

    /// File I/O failure -- the config file could not be read from disk.
    #[error("Failed to read config file '{path}': {source}")]
    ConfigIo {
        source: std::io::Error,
        path: String,
    },

    /// The HTTP client could not be constructed from the configured settings.
    #[error("Failed to build HTTP client: {source}")]
    ClientBuild { source: reqwest::Error },
}

impl LoadTestError {
    /// Shorthand for a [`LoadTestError::ConfigValidation`] with the given message.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            message: message.into(),
        }
    }
}

/// Failure of a single request attempt.
///
/// Each variant represents a distinct error category that the metrics
/// pipeline counts and reports separately.
#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum RequestFailure {
    /// The target answered with a status outside 200-299.
    #[error("HTTP {status}: {reason}")]
    Http { status: u16, reason: String },

    /// The request exceeded the configured per-request timeout.
    #[error("Request timed out")]
    Timeout,

    /// Connection-level failure (DNS resolution, TCP connect, TLS handshake).
    #[error("Connection error: {message}")]
    Connection { message: String },

    /// The request could not be built or sent (bad URL, unsupported scheme).
    #[error("Request error: {message}")]
    Request { message: String },

    /// The response headers arrived but the body could not be read to the end.
    #[error("Failed to read response body: {message}")]
    Body { message: String },
}

impl RequestFailure {
    /// Build an [`RequestFailure::Http`] failure for a non-2xx status code.
    ///
    /// The reason phrase is the canonical one for well-known codes and empty
    /// otherwise.
    pub fn from_status(status: u16) -> Self {
        let reason = reqwest::StatusCode::from_u16(status)
            .ok()
            .and_then(|code| code.canonical_reason())
            .unwrap_or("")
            .to_string();
        Self::Http { status, reason }
    }

    /// Returns the error category as a static string for metrics classification.
    ///
    /// Categories: `"http"`, `"timeout"`, `"connection"`, `"request"`, `"body"`.
    pub fn error_category(&self) -> &'static str {
        match self {
            Self::Http { .. } => "http",
            Self::Timeout => "timeout",
            Self::Connection { .. } => "connection",
            Self::Request { .. } => "request",
            Self::Body { .. } => "body",
        }
    }

    /// Returns the HTTP status code when the failure came from a response.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Classify a [`reqwest::Error`] into the appropriate [`RequestFailure`] variant.
    pub fn classify_reqwest(err: &reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else if err.is_connect() {
            Self::Connection {
                message: err.to_string(),
            }
        } else if let Some(status) = err.status() {
            Self::from_status(status.as_u16())
        } else if err.is_builder() {
            Self::Request {
                message: err.to_string(),
            }
        } else if err.is_body() || err.is_decode() {
            Self::Body {
                message: err.to_string(),
            }
        } else {
            Self::Connection {
                message: err.to_string(),
            }
        }
    }
}
