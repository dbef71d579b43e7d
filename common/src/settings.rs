//! Application settings.

use std::path::PathBuf;

use chrono::Duration;
use tracing::warn;

use crate::currency::CurrencyCode;
use crate::error::{Result, ValutaError};
use crate::time::constants;

/// Longest accepted snapshot time-to-live (one year).
pub const MAX_RATES_TTL_HOURS: i64 = 24 * 365;

/// Settings shared by every ValutaTrade component.
///
/// Built once at process start and passed explicitly to whatever needs it.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Directory holding rates, history, users, portfolios and session files.
    pub data_dir: PathBuf,
    /// Snapshot time-to-live in hours.
    pub rates_ttl_hours: i64,
    /// Default base currency for valuations.
    pub default_base_currency: String,
    /// Log level used when `RUST_LOG` is not set.
    pub log_level: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            rates_ttl_hours: constants::default_rates_ttl().num_hours(),
            default_base_currency: "USD".to_string(),
            log_level: "info".to_string(),
        }
    }
}

impl Settings {
    /// Load settings from environment variables.
    pub fn from_env() -> Self {
        let mut settings = Self::default();

        if let Ok(dir) = std::env::var("VALUTATRADE_DATA_DIR") {
            settings.data_dir = PathBuf::from(dir);
        }

        if let Ok(ttl) = std::env::var("VALUTATRADE_RATES_TTL_HOURS") {
            match ttl.parse() {
                Ok(hours) => settings.rates_ttl_hours = hours,
                Err(_) => warn!(value = %ttl, "Ignoring unparsable VALUTATRADE_RATES_TTL_HOURS"),
            }
        }

        if let Ok(base) = std::env::var("VALUTATRADE_BASE_CURRENCY") {
            settings.default_base_currency = base.trim().to_uppercase();
        }

        if let Ok(level) = std::env::var("VALUTATRADE_LOG_LEVEL") {
            settings.log_level = level;
        }

        settings
    }

    /// Validate settings.
    pub fn validate(&self) -> Result<()> {
        if self.data_dir.as_os_str().is_empty() {
            return Err(ValutaError::ConfigValidation(
                "data directory cannot be empty".to_string(),
            ));
        }

        if self.rates_ttl_hours <= 0 {
            return Err(ValutaError::ConfigValidation(
                "rates TTL must be at least one hour".to_string(),
            ));
        }

        if self.rates_ttl_hours > MAX_RATES_TTL_HOURS {
            return Err(ValutaError::ConfigValidation(format!(
                "rates TTL cannot exceed {} hours",
                MAX_RATES_TTL_HOURS
            )));
        }

        CurrencyCode::parse(&self.default_base_currency).map_err(|e| {
            ValutaError::ConfigValidation(format!("default base currency: {}", e))
        })?;

        Ok(())
    }

    /// Snapshot time-to-live. Out-of-range values fall back to the default.
    pub fn rates_ttl(&self) -> Duration {
        Duration::try_hours(self.rates_ttl_hours)
            .filter(|ttl| *ttl > Duration::zero())
            .unwrap_or_else(|| {
                warn!(hours = self.rates_ttl_hours, "Rates TTL out of range, using default");
                constants::default_rates_ttl()
            })
    }

    /// Path of a file inside the data directory.
    pub fn data_file(&self, name: &str) -> PathBuf {
        self.data_dir.join(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert!(settings.validate().is_ok());
        assert_eq!(settings.rates_ttl(), Duration::hours(1));
        assert_eq!(settings.data_file("rates.json"), PathBuf::from("data/rates.json"));
    }

    #[test]
    fn test_invalid_settings() {
        let mut settings = Settings::default();
        settings.rates_ttl_hours = 0;
        assert!(matches!(
            settings.validate(),
            Err(ValutaError::ConfigValidation(_))
        ));

        let mut settings = Settings::default();
        settings.default_base_currency = "DOLLARS".to_string();
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_huge_ttl_rejected_without_panic() {
        let settings = Settings {
            rates_ttl_hours: 3_000_000_000_000_000,
            ..Settings::default()
        };
        assert!(matches!(
            settings.validate(),
            Err(ValutaError::ConfigValidation(_))
        ));
        assert_eq!(settings.rates_ttl(), Duration::hours(1));

        let settings = Settings {
            rates_ttl_hours: MAX_RATES_TTL_HOURS,
            ..Settings::default()
        };
        assert!(settings.validate().is_ok());
        assert_eq!(settings.rates_ttl(), Duration::hours(MAX_RATES_TTL_HOURS));
    }
}
