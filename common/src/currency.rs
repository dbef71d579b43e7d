//! Currency codes and reference data.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{Result, ValutaError};

/// Shortest accepted currency code.
pub const MIN_CODE_LEN: usize = 2;

/// Longest accepted currency code.
pub const MAX_CODE_LEN: usize = 5;

/// The sole bridge currency for triangulated conversions.
pub const USD: &str = "USD";

/// A validated currency code: 2 to 5 uppercase characters, no whitespace.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CurrencyCode(String);

impl CurrencyCode {
    /// Parse and normalize a code. Surrounding whitespace is trimmed and the
    /// result is uppercased.
    pub fn parse(code: &str) -> Result<Self> {
        let normalized = code.trim().to_uppercase();

        let invalid = |reason: &str| ValutaError::InvalidCurrencyCode {
            code: code.to_string(),
            reason: reason.to_string(),
        };

        if normalized.is_empty() {
            return Err(invalid("code is empty"));
        }
        if normalized.chars().any(char::is_whitespace) {
            return Err(invalid("code contains whitespace"));
        }
        let len = normalized.chars().count();
        if !(MIN_CODE_LEN..=MAX_CODE_LEN).contains(&len) {
            return Err(invalid(&format!(
                "code must be {}-{} characters",
                MIN_CODE_LEN, MAX_CODE_LEN
            )));
        }
        if !normalized.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(invalid("code must be ASCII letters or digits"));
        }

        Ok(Self(normalized))
    }

    /// Get the code as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Build from a code known to be valid at compile time.
    pub(crate) fn from_static(code: &'static str) -> Self {
        debug_assert!(Self::parse(code).is_ok());
        Self(code.to_string())
    }

    /// The USD bridge currency.
    pub fn usd() -> Self {
        Self(USD.to_string())
    }

    /// Whether this is the USD bridge currency.
    pub fn is_usd(&self) -> bool {
        self.0 == USD
    }
}

impl fmt::Display for CurrencyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for CurrencyCode {
    type Err = ValutaError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<String> for CurrencyCode {
    type Error = ValutaError;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<CurrencyCode> for String {
    fn from(code: CurrencyCode) -> Self {
        code.0
    }
}

impl AsRef<str> for CurrencyCode {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Kind of currency with the kind-specific reference data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum CurrencyKind {
    /// Government-issued currency.
    Fiat { issuing_country: String },
    /// Crypto asset.
    Crypto { algorithm: String, market_cap: f64 },
}

impl CurrencyKind {
    /// Short label used in listings.
    pub fn label(&self) -> &'static str {
        match self {
            CurrencyKind::Fiat { .. } => "fiat",
            CurrencyKind::Crypto { .. } => "crypto",
        }
    }

    pub fn is_crypto(&self) -> bool {
        matches!(self, CurrencyKind::Crypto { .. })
    }
}

/// Currency reference data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Currency {
    /// Validated code.
    pub code: CurrencyCode,
    /// Human-readable name.
    pub display_name: String,
    /// Fiat or crypto.
    #[serde(flatten)]
    pub kind: CurrencyKind,
}

impl Currency {
    /// Create a fiat currency.
    pub fn fiat(code: &str, display_name: &str, issuing_country: &str) -> Result<Self> {
        Self::new(
            code,
            display_name,
            CurrencyKind::Fiat {
                issuing_country: issuing_country.to_string(),
            },
        )
    }

    /// Create a crypto currency.
    pub fn crypto(code: &str, display_name: &str, algorithm: &str, market_cap: f64) -> Result<Self> {
        Self::new(
            code,
            display_name,
            CurrencyKind::Crypto {
                algorithm: algorithm.to_string(),
                market_cap,
            },
        )
    }

    fn new(code: &str, display_name: &str, kind: CurrencyKind) -> Result<Self> {
        let code = CurrencyCode::parse(code)?;
        let display_name = display_name.trim();
        if display_name.is_empty() {
            return Err(ValutaError::InvalidCurrencyCode {
                code: code.to_string(),
                reason: "display name is empty".to_string(),
            });
        }

        Ok(Self {
            code,
            display_name: display_name.to_string(),
            kind,
        })
    }

    /// One-line description for listings and logs.
    pub fn display_info(&self) -> String {
        match &self.kind {
            CurrencyKind::Fiat { issuing_country } => format!(
                "[FIAT] {} - {} (issuing: {})",
                self.code, self.display_name, issuing_country
            ),
            CurrencyKind::Crypto {
                algorithm,
                market_cap,
            } => format!(
                "[CRYPTO] {} - {} (algo: {}, mcap: {:.2e})",
                self.code, self.display_name, algorithm, market_cap
            ),
        }
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_info())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_normalization() {
        let code = CurrencyCode::parse(" btc ").unwrap();
        assert_eq!(code.as_str(), "BTC");
        assert_eq!(CurrencyCode::parse("doge").unwrap().as_str(), "DOGE");
    }

    #[test]
    fn test_code_length_bounds() {
        assert!(CurrencyCode::parse("X").is_err());
        assert!(CurrencyCode::parse("XY").is_ok());
        assert!(CurrencyCode::parse("ABCDE").is_ok());
        assert!(CurrencyCode::parse("ABCDEF").is_err());
        assert!(CurrencyCode::parse("").is_err());
    }

    #[test]
    fn test_code_rejects_inner_whitespace() {
        let err = CurrencyCode::parse("U SD").unwrap_err();
        assert!(matches!(err, ValutaError::InvalidCurrencyCode { .. }));
        assert!(CurrencyCode::parse("US_D").is_err());
    }

    #[test]
    fn test_code_serde_validates() {
        let code: CurrencyCode = serde_json::from_str("\"eur\"").unwrap();
        assert_eq!(code.as_str(), "EUR");
        assert!(serde_json::from_str::<CurrencyCode>("\"toolong\"").is_err());
        assert_eq!(serde_json::to_string(&code).unwrap(), "\"EUR\"");
    }

    #[test]
    fn test_display_info() {
        let usd = Currency::fiat("USD", "US Dollar", "United States").unwrap();
        assert_eq!(
            usd.display_info(),
            "[FIAT] USD - US Dollar (issuing: United States)"
        );

        let btc = Currency::crypto("BTC", "Bitcoin", "SHA-256", 1.12e12).unwrap();
        assert!(btc.display_info().starts_with("[CRYPTO] BTC - Bitcoin (algo: SHA-256"));
        assert!(btc.kind.is_crypto());
    }

    #[test]
    fn test_empty_display_name_rejected() {
        assert!(Currency::fiat("EUR", "  ", "EU").is_err());
    }
}
