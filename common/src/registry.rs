//! Currency registry and the lookup capability used by the rates core.

use std::collections::BTreeMap;

use crate::currency::{Currency, CurrencyCode, CurrencyKind};
use crate::error::{Result, ValutaError};

/// Capability to resolve a currency code into reference data.
pub trait CurrencyLookup: Send + Sync {
    /// Look up a currency. Fails with `CurrencyNotFound` for unknown codes
    /// and `InvalidCurrencyCode` for malformed ones.
    fn get_currency(&self, code: &str) -> Result<Currency>;
}

/// In-memory registry of supported currencies.
#[derive(Debug, Clone)]
pub struct CurrencyRegistry {
    currencies: BTreeMap<CurrencyCode, Currency>,
}

impl CurrencyRegistry {
    /// Create an empty registry.
    pub fn empty() -> Self {
        Self {
            currencies: BTreeMap::new(),
        }
    }

    /// Create a registry with the built-in fiat and crypto currencies.
    pub fn with_defaults() -> Self {
        let mut registry = Self::empty();

        let fiat = [
            ("USD", "US Dollar", "United States"),
            ("EUR", "Euro", "European Union"),
            ("GBP", "British Pound", "United Kingdom"),
            ("RUB", "Russian Ruble", "Russia"),
            ("JPY", "Japanese Yen", "Japan"),
            ("CNY", "Chinese Yuan", "China"),
            ("CAD", "Canadian Dollar", "Canada"),
            ("AUD", "Australian Dollar", "Australia"),
            ("CHF", "Swiss Franc", "Switzerland"),
        ];
        for (code, name, country) in fiat {
            registry.insert(Currency {
                code: CurrencyCode::from_static(code),
                display_name: name.to_string(),
                kind: CurrencyKind::Fiat {
                    issuing_country: country.to_string(),
                },
            });
        }

        let crypto = [
            ("BTC", "Bitcoin", "SHA-256", 1.1e12),
            ("ETH", "Ethereum", "Proof-of-Stake", 400e9),
            ("SOL", "Solana", "Proof-of-History", 60e9),
            ("ADA", "Cardano", "Ouroboros", 15e9),
            ("DOT", "Polkadot", "Nominated Proof-of-Stake", 10e9),
            ("DOGE", "Dogecoin", "Scrypt", 20e9),
        ];
        for (code, name, algorithm, market_cap) in crypto {
            registry.insert(Currency {
                code: CurrencyCode::from_static(code),
                display_name: name.to_string(),
                kind: CurrencyKind::Crypto {
                    algorithm: algorithm.to_string(),
                    market_cap,
                },
            });
        }

        registry
    }

    /// Register or replace a currency.
    pub fn insert(&mut self, currency: Currency) {
        self.currencies.insert(currency.code.clone(), currency);
    }

    /// All registered currencies, ordered by code.
    pub fn all(&self) -> Vec<&Currency> {
        self.currencies.values().collect()
    }

    /// Registered currencies of one kind (`"fiat"` or `"crypto"`).
    pub fn by_kind(&self, label: &str) -> Vec<&Currency> {
        self.currencies
            .values()
            .filter(|c| c.kind.label() == label)
            .collect()
    }

    /// Check whether a code is registered.
    pub fn contains(&self, code: &str) -> bool {
        CurrencyCode::parse(code)
            .map(|c| self.currencies.contains_key(&c))
            .unwrap_or(false)
    }

    pub fn len(&self) -> usize {
        self.currencies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.currencies.is_empty()
    }
}

impl Default for CurrencyRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl CurrencyLookup for CurrencyRegistry {
    fn get_currency(&self, code: &str) -> Result<Currency> {
        let parsed = CurrencyCode::parse(code)?;
        self.currencies
            .get(&parsed)
            .cloned()
            .ok_or_else(|| ValutaError::CurrencyNotFound(parsed.to_string()))
    }
}
