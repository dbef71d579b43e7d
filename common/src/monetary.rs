//! Monetary amounts and directional currency pairs.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::currency::CurrencyCode;
use crate::error::{Result, ValutaError};

/// Separator between the two codes of a pair key.
pub const PAIR_SEPARATOR: char = '_';

/// Mapping from pair key (`"FROM_TO"`) to the rate "1 FROM = rate TO".
pub type RateMap = BTreeMap<String, f64>;

/// Compose the pair key for a directional rate.
pub fn pair_key(from: &str, to: &str) -> String {
    format!("{}{}{}", from, PAIR_SEPARATOR, to)
}

/// A directional currency pair identified by its pair key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CurrencyPair {
    /// Currency being priced.
    pub from: CurrencyCode,
    /// Currency the price is expressed in.
    pub to: CurrencyCode,
}

impl CurrencyPair {
    /// Create a new currency pair.
    pub fn new(from: CurrencyCode, to: CurrencyCode) -> Self {
        Self { from, to }
    }

    /// Parse a pair key such as `"BTC_USD"`.
    pub fn parse(key: &str) -> Result<Self> {
        let (from, to) = key
            .split_once(PAIR_SEPARATOR)
            .ok_or_else(|| ValutaError::InvalidPairKey(key.to_string()))?;

        let from = CurrencyCode::parse(from).map_err(|_| ValutaError::InvalidPairKey(key.to_string()))?;
        let to = CurrencyCode::parse(to).map_err(|_| ValutaError::InvalidPairKey(key.to_string()))?;

        Ok(Self { from, to })
    }

    /// The pair key of this pair.
    pub fn key(&self) -> String {
        pair_key(self.from.as_str(), self.to.as_str())
    }
}

impl fmt::Display for CurrencyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.key())
    }
}

impl FromStr for CurrencyPair {
    type Err = ValutaError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

/// A monetary amount with currency, such as the USD value of a trade.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Money {
    /// The amount value.
    pub value: Decimal,
    /// Currency of the amount.
    pub currency: CurrencyCode,
}

impl Money {
    /// Create a new Money instance.
    pub fn new(value: Decimal, currency: CurrencyCode) -> Self {
        Self { value, currency }
    }

    /// Check if the amount is positive.
    pub fn is_positive(&self) -> bool {
        self.value > Decimal::ZERO
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.value, self.currency)
    }
}
