//! Rates engine configuration.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};
use valutatrade_common::{time::constants, CurrencyCode, Settings, USD};

use crate::error::{RatesError, RatesResult};
use crate::provider::RateSource;
use crate::sources::{coingecko, exchangerate, CoinGeckoSource, ExchangeRateApiSource};

/// Snapshot file name inside the data directory.
pub const SNAPSHOT_FILE: &str = "rates.json";

/// History file name inside the data directory.
pub const HISTORY_FILE: &str = "exchange_rates.json";

const DEFAULT_FIAT: [&str; 8] = ["EUR", "GBP", "RUB", "JPY", "CNY", "CAD", "AUD", "CHF"];

const DEFAULT_CRYPTO: [(&str, &str); 6] = [
    ("BTC", "bitcoin"),
    ("ETH", "ethereum"),
    ("SOL", "solana"),
    ("ADA", "cardano"),
    ("DOT", "polkadot"),
    ("DOGE", "dogecoin"),
];

/// Configuration for rate sources, storage and scheduling.
#[derive(Debug, Clone)]
pub struct RatesConfig {
    /// Path of the latest snapshot.
    pub snapshot_path: PathBuf,
    /// Path of the history log.
    pub history_path: PathBuf,
    /// Snapshot time-to-live.
    pub rates_ttl: chrono::Duration,
    /// HTTP request timeout.
    pub request_timeout: Duration,
    /// Interval between scheduled updates.
    pub update_interval: Duration,
    /// Base currency the fiat source quotes against.
    pub base_currency: String,
    /// Fiat codes kept from the fiat source.
    pub fiat_currencies: Vec<String>,
    /// Crypto codes requested from the crypto source.
    pub crypto_currencies: Vec<String>,
    /// Crypto code to CoinGecko asset id.
    pub crypto_id_map: BTreeMap<String, String>,
    /// ExchangeRate-API key. The fiat source is disabled without one.
    pub exchangerate_api_key: Option<String>,
    /// Optional CoinGecko demo key.
    pub coingecko_api_key: Option<String>,
    pub coingecko_url: String,
    pub exchangerate_url: String,
}

impl Default for RatesConfig {
    fn default() -> Self {
        Self::from_data_dir(PathBuf::from("data"))
    }
}

impl RatesConfig {
    fn from_data_dir(data_dir: PathBuf) -> Self {
        Self {
            snapshot_path: data_dir.join(SNAPSHOT_FILE),
            history_path: data_dir.join(HISTORY_FILE),
            rates_ttl: constants::default_rates_ttl(),
            request_timeout: constants::default_request_timeout(),
            update_interval: constants::default_update_interval(),
            base_currency: USD.to_string(),
            fiat_currencies: DEFAULT_FIAT.iter().map(|c| c.to_string()).collect(),
            crypto_currencies: DEFAULT_CRYPTO.iter().map(|(c, _)| c.to_string()).collect(),
            crypto_id_map: DEFAULT_CRYPTO
                .iter()
                .map(|(c, id)| (c.to_string(), id.to_string()))
                .collect(),
            exchangerate_api_key: None,
            coingecko_api_key: None,
            coingecko_url: coingecko::DEFAULT_BASE_URL.to_string(),
            exchangerate_url: exchangerate::DEFAULT_BASE_URL.to_string(),
        }
    }

    /// Build from application settings, then apply environment overrides.
    pub fn from_settings(settings: &Settings) -> Self {
        let mut config = Self::from_data_dir(settings.data_dir.clone());
        config.rates_ttl = settings.rates_ttl();

        if let Some(key) = non_empty_var("EXCHANGERATE_API_KEY") {
            config.exchangerate_api_key = Some(key);
        }

        if let Some(key) = non_empty_var("COINGECKO_API_KEY") {
            config.coingecko_api_key = Some(key);
        }

        if let Some(secs) = secs_var("VALUTATRADE_REQUEST_TIMEOUT_SECS") {
            config.request_timeout = Duration::from_secs(secs);
        }

        if let Some(secs) = secs_var("VALUTATRADE_UPDATE_INTERVAL_SECS") {
            config.update_interval = Duration::from_secs(secs);
        }

        config
    }

    /// Validate configuration. Runs before any update.
    pub fn validate(&self) -> RatesResult<()> {
        let invalid = |msg: String| Err(RatesError::ConfigValidation(msg));

        if self.fiat_currencies.is_empty() {
            return invalid("fiat currency list cannot be empty".to_string());
        }

        if self.crypto_currencies.is_empty() {
            return invalid("crypto currency list cannot be empty".to_string());
        }

        for code in self
            .fiat_currencies
            .iter()
            .chain(&self.crypto_currencies)
            .chain(std::iter::once(&self.base_currency))
        {
            if let Err(e) = CurrencyCode::parse(code) {
                return invalid(format!("tracked currency: {}", e));
            }
        }

        for code in &self.crypto_currencies {
            if !self.crypto_id_map.contains_key(code) {
                return invalid(format!("crypto currency {} has no provider id", code));
            }
        }

        if self.request_timeout.is_zero() || self.request_timeout > constants::max_request_timeout() {
            return invalid(format!(
                "request timeout must be between 1 and {} seconds",
                constants::max_request_timeout().as_secs()
            ));
        }

        if self.update_interval < constants::min_update_interval() {
            return invalid(format!(
                "update interval must be at least {} seconds",
                constants::min_update_interval().as_secs()
            ));
        }

        if self.rates_ttl <= chrono::Duration::zero() {
            return invalid("rates TTL must be positive".to_string());
        }

        Ok(())
    }

    /// Build the configured sources: CoinGecko first, then ExchangeRate-API
    /// when a key is present.
    pub fn build_sources(&self) -> RatesResult<Vec<Arc<dyn RateSource>>> {
        let ids = self
            .crypto_currencies
            .iter()
            .filter_map(|code| {
                self.crypto_id_map
                    .get(code)
                    .map(|id| (code.clone(), id.clone()))
            })
            .collect();

        let mut sources: Vec<Arc<dyn RateSource>> = vec![Arc::new(CoinGeckoSource::new(
            &self.coingecko_url,
            ids,
            self.coingecko_api_key.clone(),
            self.request_timeout,
        )?)];

        match &self.exchangerate_api_key {
            Some(key) => sources.push(Arc::new(ExchangeRateApiSource::new(
                &self.exchangerate_url,
                key,
                &self.base_currency,
                self.fiat_currencies.clone(),
                self.request_timeout,
            )?)),
            None => warn!("EXCHANGERATE_API_KEY not set, fiat rates disabled"),
        }

        info!(
            sources = ?sources.iter().map(|s| s.name()).collect::<Vec<_>>(),
            "Rate sources configured"
        );
        Ok(sources)
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn secs_var(name: &str) -> Option<u64> {
    let raw = non_empty_var(name)?;
    match raw.parse() {
        Ok(secs) => Some(secs),
        Err(_) => {
            warn!(variable = name, value = %raw, "Ignoring unparsable duration");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = RatesConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.snapshot_path, PathBuf::from("data/rates.json"));
        assert_eq!(config.history_path, PathBuf::from("data/exchange_rates.json"));
        assert_eq!(config.crypto_id_map["DOGE"], "dogecoin");
    }

    #[test]
    fn test_from_settings_uses_data_dir_and_ttl() {
        let settings = Settings {
            data_dir: PathBuf::from("/var/lib/valutatrade"),
            rates_ttl_hours: 6,
            ..Settings::default()
        };
        let config = RatesConfig::from_settings(&settings);

        assert_eq!(config.snapshot_path, PathBuf::from("/var/lib/valutatrade/rates.json"));
        assert_eq!(config.rates_ttl, chrono::Duration::hours(6));
    }

    #[test]
    fn test_validation_failures() {
        let mut config = RatesConfig::default();
        config.crypto_currencies.clear();
        assert!(matches!(config.validate(), Err(RatesError::ConfigValidation(_))));

        let mut config = RatesConfig::default();
        config.crypto_currencies.push("XRP".to_string());
        assert!(config.validate().is_err());

        let mut config = RatesConfig::default();
        config.request_timeout = Duration::from_secs(31);
        assert!(config.validate().is_err());

        let mut config = RatesConfig::default();
        config.update_interval = Duration::from_secs(59);
        assert!(config.validate().is_err());

        let mut config = RatesConfig::default();
        config.fiat_currencies.push("eu ro".to_string());
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_source_order() {
        let mut config = RatesConfig::default();
        let names = |c: &RatesConfig| -> Vec<String> {
            c.build_sources()
                .unwrap()
                .iter()
                .map(|s| s.name().to_string())
                .collect()
        };

        assert_eq!(names(&config), vec!["coingecko"]);

        config.exchangerate_api_key = Some("key".to_string());
        assert_eq!(names(&config), vec!["coingecko", "exchangerate"]);
    }
}
