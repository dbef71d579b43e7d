//! Error types shared across ValutaTrade crates.

use thiserror::Error;

/// Errors raised by currency lookup, validation and configuration checks.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValutaError {
    /// The code is well formed but no such currency is registered.
    #[error("Unknown currency '{0}'")]
    CurrencyNotFound(String),

    /// The code itself is malformed.
    #[error("Invalid currency code '{code}': {reason}")]
    InvalidCurrencyCode { code: String, reason: String },

    /// A pair key that is not of the form `FROM_TO`.
    #[error("Invalid pair key '{0}'")]
    InvalidPairKey(String),

    /// Startup-time misconfiguration.
    #[error("Configuration validation failed: {0}")]
    ConfigValidation(String),
}

impl ValutaError {
    /// Get error code for user-facing output and logs.
    pub fn error_code(&self) -> &'static str {
        match self {
            ValutaError::CurrencyNotFound(_) => "CURRENCY_NOT_FOUND",
            ValutaError::InvalidCurrencyCode { .. } => "INVALID_CURRENCY_CODE",
            ValutaError::InvalidPairKey(_) => "INVALID_PAIR_KEY",
            ValutaError::ConfigValidation(_) => "CONFIG_VALIDATION",
        }
    }
}

/// Result type alias for common operations.
pub type Result<T> = std::result::Result<T, ValutaError>;
