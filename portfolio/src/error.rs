//! Portfolio and trading error types.

use rust_decimal::Decimal;
use thiserror::Error;
use valutatrade_common::ValutaError;
use valutatrade_rates::RatesError;

/// Errors that can occur in user and portfolio operations.
#[derive(Debug, Error)]
pub enum PortfolioError {
    #[error("Not logged in. Use: login --username <name> --password <password>")]
    NotAuthenticated,

    #[error("User '{0}' already exists")]
    UserExists(String),

    #[error("User '{0}' not found")]
    UserNotFound(String),

    #[error("Invalid password")]
    InvalidPassword,

    #[error("Password must be at least {min} characters")]
    PasswordTooShort { min: usize },

    #[error("Username cannot be empty")]
    InvalidUsername,

    #[error("Amount must be a positive number, got {0}")]
    InvalidAmount(Decimal),

    #[error("Insufficient funds: available {available} {code}, required {required} {code}")]
    InsufficientFunds {
        available: Decimal,
        required: Decimal,
        code: String,
    },

    #[error("No wallet for currency '{0}'")]
    WalletNotFound(String),

    #[error("Wallet for currency '{0}' already exists")]
    WalletExists(String),

    #[error("Portfolio for user {0} not found")]
    PortfolioNotFound(u64),

    #[error("Rate {from} -> {to} unavailable. Try: update-rates")]
    RateUnavailable { from: String, to: String },

    #[error(transparent)]
    Currency(#[from] ValutaError),

    #[error(transparent)]
    Rates(#[from] RatesError),
}

impl PortfolioError {
    /// Get error code for logs and user-facing output.
    pub fn error_code(&self) -> &'static str {
        match self {
            PortfolioError::NotAuthenticated => "NOT_AUTHENTICATED",
            PortfolioError::UserExists(_) => "USER_EXISTS",
            PortfolioError::UserNotFound(_) => "USER_NOT_FOUND",
            PortfolioError::InvalidPassword => "INVALID_PASSWORD",
            PortfolioError::PasswordTooShort { .. } => "PASSWORD_TOO_SHORT",
            PortfolioError::InvalidUsername => "INVALID_USERNAME",
            PortfolioError::InvalidAmount(_) => "INVALID_AMOUNT",
            PortfolioError::InsufficientFunds { .. } => "INSUFFICIENT_FUNDS",
            PortfolioError::WalletNotFound(_) => "WALLET_NOT_FOUND",
            PortfolioError::WalletExists(_) => "WALLET_EXISTS",
            PortfolioError::PortfolioNotFound(_) => "PORTFOLIO_NOT_FOUND",
            PortfolioError::RateUnavailable { .. } => "RATE_UNAVAILABLE",
            PortfolioError::Currency(e) => e.error_code(),
            PortfolioError::Rates(e) => e.error_code(),
        }
    }
}

/// Result type for portfolio operations.
pub type PortfolioResult<T> = Result<T, PortfolioError>;
