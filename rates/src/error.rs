//! Rates engine error types.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;
use valutatrade_common::ValutaError;

/// Why a rate source could not deliver rates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceFailure {
    /// HTTP 429 or a provider quota error.
    RateLimited,
    /// HTTP 401 or a rejected API key.
    Unauthorized,
    /// HTTP 403.
    Forbidden,
    /// Any other non-success HTTP status.
    Http(u16),
    /// The request timed out.
    Timeout,
    /// Connection-level failure.
    Network(String),
    /// The body could not be decoded.
    Parse(String),
    /// The provider answered with an application-level error.
    Provider(String),
}

impl fmt::Display for SourceFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceFailure::RateLimited => write!(f, "rate limit exceeded (HTTP 429)"),
            SourceFailure::Unauthorized => write!(f, "invalid API key (HTTP 401)"),
            SourceFailure::Forbidden => write!(f, "access denied (HTTP 403)"),
            SourceFailure::Http(status) => write!(f, "HTTP status {}", status),
            SourceFailure::Timeout => write!(f, "request timed out"),
            SourceFailure::Network(msg) => write!(f, "network error: {}", msg),
            SourceFailure::Parse(msg) => write!(f, "malformed response: {}", msg),
            SourceFailure::Provider(msg) => write!(f, "provider error: {}", msg),
        }
    }
}

/// Errors that can occur in the rates engine.
#[derive(Debug, Error)]
pub enum RatesError {
    /// A rate source failed. Recoverable: the aggregator skips it.
    #[error("Source {source_name} unavailable: {failure}")]
    SourceUnavailable {
        source_name: String,
        failure: SourceFailure,
    },

    /// Disk I/O or malformed stored content.
    #[error("Storage failure at {}: {reason}", path.display())]
    Storage { path: PathBuf, reason: String },

    /// Every consulted source failed or returned nothing.
    #[error("No rates fetched from {attempted} source(s)")]
    NoRatesFetched { attempted: usize },

    /// Update requested for a source that is not configured.
    #[error("Unknown rate source: {0}")]
    UnknownSource(String),

    /// Startup-time misconfiguration.
    #[error("Configuration validation failed: {0}")]
    ConfigValidation(String),

    /// Currency lookup or validation failed.
    #[error(transparent)]
    Currency(#[from] ValutaError),
}

impl RatesError {
    /// Build a source failure.
    pub fn source_unavailable(source_name: impl Into<String>, failure: SourceFailure) -> Self {
        RatesError::SourceUnavailable {
            source_name: source_name.into(),
            failure,
        }
    }

    /// Build a storage failure.
    pub fn storage(path: impl Into<PathBuf>, reason: impl fmt::Display) -> Self {
        RatesError::Storage {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    /// Check if retrying later may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            RatesError::SourceUnavailable { failure, .. } => matches!(
                failure,
                SourceFailure::RateLimited | SourceFailure::Timeout | SourceFailure::Network(_)
            ) || matches!(failure, SourceFailure::Http(status) if *status >= 500),
            _ => false,
        }
    }

    /// Get error code for logs and user-facing output.
    pub fn error_code(&self) -> &'static str {
        match self {
            RatesError::SourceUnavailable { .. } => "SOURCE_UNAVAILABLE",
            RatesError::Storage { .. } => "STORAGE_FAILURE",
            RatesError::NoRatesFetched { .. } => "NO_RATES_FETCHED",
            RatesError::UnknownSource(_) => "UNKNOWN_SOURCE",
            RatesError::ConfigValidation(_) => "CONFIG_VALIDATION",
            RatesError::Currency(e) => e.error_code(),
        }
    }
}

/// Result type for rates operations.
pub type RatesResult<T> = Result<T, RatesError>;
