//! Error types for channel-scout
//!
//! This module provides the error handling for the library, including:
//! - Domain-specific error types (Upstream, Config, Validation)
//! - HTTP status code mapping for API integration
//! - Structured error responses with machine-readable error codes

use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

/// Result type alias for channel-scout operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for channel-scout
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "rate_limit.requests_per_minute")
        key: Option<String>,
    },

    /// Invalid input to task creation
    #[error("validation error: {0}")]
    Validation(String),

    /// Task not found (or no longer tracked)
    #[error("task not found: {0}")]
    NotFound(String),

    /// Active task ceiling reached
    #[error("too many active tasks: {active} of {limit} running")]
    TooManyTasks {
        /// Number of tasks currently running
        active: usize,
        /// Configured ceiling
        limit: usize,
    },

    /// Upstream content API failure
    #[error("upstream error: {0}")]
    Upstream(#[from] UpstreamError),

    /// Network error
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// API server error
    #[error("API server error: {0}")]
    ApiServerError(String),

    /// Shutdown in progress - not accepting new tasks
    #[error("shutdown in progress: not accepting new tasks")]
    ShuttingDown,

    /// Wait interrupted by a stop request
    #[error("operation cancelled")]
    Cancelled,
}

impl Error {
    /// Build a configuration error for the given key
    pub fn config(key: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Config {
            message: message.into(),
            key: Some(key.into()),
        }
    }
}

/// Failures reported by the upstream content API
#[derive(Debug, Error)]
pub enum UpstreamError {
    /// Daily quota exhausted on the provider side
    #[error("quota exceeded: {message}")]
    QuotaExceeded {
        /// Provider message
        message: String,
    },

    /// Request rate too high on the provider side
    #[error("rate limited: {message}")]
    RateLimited {
        /// Provider message
        message: String,
    },

    /// Any other non-success response
    #[error("API error {status} ({reason}): {message}")]
    Api {
        /// HTTP status code
        status: u16,
        /// Provider reason code (e.g. "badRequest"), empty when absent
        reason: String,
        /// Provider message
        message: String,
    },

    /// Response body did not match the expected shape
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

/// Cache backing store errors
///
/// These never reach task callers: the cache facade logs them and falls back
/// to the in-process store.
#[derive(Debug, Error)]
pub enum CacheError {
    /// Backing store could not be reached
    #[error("cache backend unavailable: {0}")]
    Unavailable(String),

    /// Backing store command failed
    #[error("cache command failed: {0}")]
    Command(String),

    /// Stored entry could not be decoded
    #[error("corrupt cache entry for {key}: {reason}")]
    Corrupt {
        /// Cache key of the entry
        key: String,
        /// Decode failure
        reason: String,
    },
}

impl From<redis::RedisError> for CacheError {
    fn from(err: redis::RedisError) -> Self {
        CacheError::Command(err.to_string())
    }
}

/// API error response format
///
/// This structure is returned by API endpoints when an error occurs.
///
/// # Example JSON Response
///
/// ```json
/// {
///   "error": {
///     "code": "too_many_tasks",
///     "message": "too many active tasks: 10 of 10 running",
///     "details": { "active": 10, "limit": 10 }
///   }
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ApiError {
    /// The error details
    pub error: ErrorDetail,
}

/// Detailed error information for API responses
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ErrorDetail {
    /// Machine-readable error code (e.g., "not_found", "validation_error")
    pub code: String,

    /// Human-readable error message
    pub message: String,

    /// Optional additional context about the error
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

/// Convert errors to HTTP status codes for API responses
pub trait ToHttpStatus {
    /// Get the HTTP status code for this error
    fn status_code(&self) -> u16;

    /// Get the machine-readable error code
    fn error_code(&self) -> &str;
}

impl ToHttpStatus for Error {
    fn status_code(&self) -> u16 {
        match self {
            // 400 Bad Request - Client error (invalid input)
            Error::Config { .. } => 400,
            Error::Validation(_) => 400,

            // 404 Not Found
            Error::NotFound(_) => 404,

            // 429 Too Many Requests - active task ceiling
            Error::TooManyTasks { .. } => 429,

            // 502 Bad Gateway - External service errors
            Error::Upstream(_) => 502,
            Error::Network(_) => 502,

            // 503 Service Unavailable
            Error::ShuttingDown => 503,
            Error::Cancelled => 503,

            // 500 Internal Server Error - Server-side issues
            Error::Serialization(_) => 500,
            Error::Io(_) => 500,
            Error::ApiServerError(_) => 500,
        }
    }

    fn error_code(&self) -> &str {
        match self {
            Error::Config { .. } => "config_error",
            Error::Validation(_) => "validation_error",
            Error::NotFound(_) => "not_found",
            Error::TooManyTasks { .. } => "too_many_tasks",
            Error::Upstream(e) => match e {
                UpstreamError::QuotaExceeded { .. } => "quota_exceeded",
                UpstreamError::RateLimited { .. } => "rate_limited",
                UpstreamError::Api { .. } => "upstream_error",
                UpstreamError::InvalidResponse(_) => "invalid_upstream_response",
            },
            Error::Network(_) => "network_error",
            Error::Serialization(_) => "serialization_error",
            Error::Io(_) => "io_error",
            Error::ApiServerError(_) => "api_server_error",
            Error::ShuttingDown => "shutting_down",
            Error::Cancelled => "cancelled",
        }
    }
}

impl From<Error> for ApiError {
    fn from(error: Error) -> Self {
        let code = error.error_code().to_string();
        let message = error.to_string();

        let details = match &error {
            Error::TooManyTasks { active, limit } => Some(serde_json::json!({
                "active": active,
                "limit": limit,
            })),
            Error::Config { key: Some(key), .. } => Some(serde_json::json!({
                "key": key,
            })),
            Error::Upstream(UpstreamError::Api { status, reason, .. }) => {
                Some(serde_json::json!({
                    "upstream_status": status,
                    "reason": reason,
                }))
            }
            _ => None,
        };

        ApiError {
            error: ErrorDetail {
                code,
                message,
                details,
            },
        }
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    /// Returns a vec of (Error, expected_status_code, expected_error_code) for
    /// every reachable match arm in ToHttpStatus.
    fn all_error_variants() -> Vec<(Error, u16, &'static str)> {
        vec![
            (
                Error::config("tasks.max_active_tasks", "must be positive"),
                400,
                "config_error",
            ),
            (
                Error::Validation("query is required".into()),
                400,
                "validation_error",
            ),
            (Error::NotFound("task abc".into()), 404, "not_found"),
            (
                Error::TooManyTasks {
                    active: 10,
                    limit: 10,
                },
                429,
                "too_many_tasks",
            ),
            (
                Error::Upstream(UpstreamError::QuotaExceeded {
                    message: "daily limit".into(),
                }),
                502,
                "quota_exceeded",
            ),
            (
                Error::Upstream(UpstreamError::RateLimited {
                    message: "slow down".into(),
                }),
                502,
                "rate_limited",
            ),
            (
                Error::Upstream(UpstreamError::Api {
                    status: 400,
                    reason: "badRequest".into(),
                    message: "bad".into(),
                }),
                502,
                "upstream_error",
            ),
            (
                Error::Upstream(UpstreamError::InvalidResponse("eof".into())),
                502,
                "invalid_upstream_response",
            ),
            (
                Error::Serialization(serde_json::from_str::<u8>("x").unwrap_err()),
                500,
                "serialization_error",
            ),
            (
                Error::Io(std::io::Error::new(std::io::ErrorKind::NotFound, "gone")),
                500,
                "io_error",
            ),
            (
                Error::ApiServerError("bind failed".into()),
                500,
                "api_server_error",
            ),
            (Error::ShuttingDown, 503, "shutting_down"),
            (Error::Cancelled, 503, "cancelled"),
        ]
    }

    /// Exhaustive over `Error`, so a new variant must be added to the table
    fn variant_name(error: &Error) -> &'static str {
        match error {
            Error::Config { .. } => "Config",
            Error::Validation(_) => "Validation",
            Error::NotFound(_) => "NotFound",
            Error::TooManyTasks { .. } => "TooManyTasks",
            Error::Upstream(_) => "Upstream",
            Error::Network(_) => "Network",
            Error::Serialization(_) => "Serialization",
            Error::Io(_) => "Io",
            Error::ApiServerError(_) => "ApiServerError",
            Error::ShuttingDown => "ShuttingDown",
            Error::Cancelled => "Cancelled",
        }
    }

    #[test]
    fn status_table_covers_every_constructible_variant() {
        let covered: std::collections::HashSet<&str> = all_error_variants()
            .iter()
            .map(|(error, _, _)| variant_name(error))
            .collect();

        // Network wraps reqwest::Error, which has no public constructor
        assert_eq!(covered.len(), 10);
        assert!(!covered.contains("Network"));
    }

    #[test]
    fn every_variant_maps_to_expected_status_and_code() {
        for (error, status, code) in all_error_variants() {
            assert_eq!(error.status_code(), status, "status for {error:?}");
            assert_eq!(error.error_code(), code, "code for {error:?}");
        }
    }

    #[test]
    fn too_many_tasks_carries_counts_in_details() {
        let api_error: ApiError = Error::TooManyTasks {
            active: 10,
            limit: 10,
        }
        .into();

        assert_eq!(api_error.error.code, "too_many_tasks");
        let details = api_error.error.details.unwrap();
        assert_eq!(details["active"], 10);
        assert_eq!(details["limit"], 10);
    }

    #[test]
    fn upstream_api_error_carries_status_and_reason() {
        let api_error: ApiError = Error::Upstream(UpstreamError::Api {
            status: 400,
            reason: "keyInvalid".into(),
            message: "API key not valid".into(),
        })
        .into();

        assert!(api_error.error.message.contains("API key not valid"));
        let details = api_error.error.details.unwrap();
        assert_eq!(details["upstream_status"], 400);
        assert_eq!(details["reason"], "keyInvalid");
    }

    #[test]
    fn validation_error_has_no_details() {
        let api_error: ApiError = Error::Validation("count must be positive".into()).into();
        assert_eq!(api_error.error.code, "validation_error");
        assert!(api_error.error.details.is_none());
    }
}
