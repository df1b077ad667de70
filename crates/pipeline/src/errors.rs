//! Top-level error and retry-policy types for the research domain.
//!
//! [`ToolScoutError`] covers conditions that stop a run before or outside the
//! stages. Component-level errors ([`crate::search::SearchError`],
//! [`crate::llm::LlmError`]) are defined in their respective modules and are
//! absorbed by the stages rather than surfacing here.
//!
//! [`RetryPolicy`] is a cross-cutting concern: any error type that participates
//! in retry decisions must be able to produce a [`RetryPolicy`].

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

// ---------------------------------------------------------------------------
// Retry semantics
// ---------------------------------------------------------------------------

/// Whether an error condition is safe to retry and, if so, after what delay.
///
/// Returned by infrastructure error types to let an adapter decide whether to
/// re-issue a request.
///
/// - `Retryable` errors: timeouts, connection resets, HTTP 429 and 5xx.
/// - `NonRetryable` errors: authentication failures, malformed requests,
///   schema-validation failures.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RetryPolicy {
    /// The operation may be retried.
    Retryable {
        /// Minimum back-off before the next attempt, usually taken from a
        /// `retry-after` header. `None` means apply the caller's own schedule.
        after: Option<Duration>,
    },
    /// The operation must not be retried.
    NonRetryable,
}

impl RetryPolicy {
    /// Returns `true` for [`RetryPolicy::Retryable`].
    pub fn is_retryable(&self) -> bool {
        matches!(self, RetryPolicy::Retryable { .. })
    }
}

// ---------------------------------------------------------------------------
// Run-level errors
// ---------------------------------------------------------------------------

/// Errors that stop a research run.
///
/// Stage-level failures never produce one of these: they are converted to an
/// `error` progress event plus a safe default value. Only the driver itself
/// (state construction) and configuration loading can fail a run.
#[derive(Debug, Error, Serialize, Deserialize)]
pub enum ToolScoutError {
    /// The query was empty or whitespace only.
    #[error("Research query must not be empty")]
    EmptyQuery,

    /// A provider or runtime configuration value is invalid.
    ///
    /// Produced at startup; the workflow never starts with an invalid config.
    #[error("Configuration error: {message}")]
    ConfigurationError {
        /// Description of the configuration problem.
        message: String,
    },
}

impl ToolScoutError {
    /// Convenience constructor for [`ToolScoutError::ConfigurationError`].
    pub fn config(message: impl Into<String>) -> Self {
        Self::ConfigurationError {
            message: message.into(),
        }
    }
}
