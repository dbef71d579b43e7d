//! CoinGecko crypto price client.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, instrument, warn};
use valutatrade_common::{pair_key, RateMap, USD};

use super::{build_client, get_body, insert_rate};
use crate::error::{RatesError, RatesResult, SourceFailure};
use crate::provider::RateSource;

/// Public CoinGecko API root.
pub const DEFAULT_BASE_URL: &str = "https://api.coingecko.com/api/v3";

/// Crypto-asset source quoting every tracked code against USD.
///
/// Produces `{CODE}_USD` keys only.
pub struct CoinGeckoSource {
    client: Client,
    base_url: String,
    /// Internal code to CoinGecko asset id, in request order.
    ids: Vec<(String, String)>,
    api_key: Option<String>,
}

impl CoinGeckoSource {
    pub const NAME: &'static str = "coingecko";

    /// Create a client for the given code to asset-id mapping.
    pub fn new(
        base_url: impl Into<String>,
        ids: Vec<(String, String)>,
        api_key: Option<String>,
        timeout: Duration,
    ) -> RatesResult<Self> {
        Ok(Self {
            client: build_client(Self::NAME, timeout)?,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            ids,
            api_key,
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/simple/price", self.base_url)
    }

    fn id_list(&self) -> String {
        self.ids
            .iter()
            .map(|(_, id)| id.as_str())
            .collect::<Vec<_>>()
            .join(",")
    }
}

/// Parse a `/simple/price` body such as `{"bitcoin": {"usd": 50000.0}}`.
///
/// Codes whose id is missing from the response are skipped.
pub fn parse_simple_price(body: &str, ids: &[(String, String)]) -> Result<RateMap, SourceFailure> {
    let parsed: HashMap<String, HashMap<String, f64>> =
        serde_json::from_str(body).map_err(|e| SourceFailure::Parse(e.to_string()))?;

    let mut rates = RateMap::new();
    for (code, id) in ids {
        match parsed.get(id).and_then(|quotes| quotes.get("usd")) {
            Some(price) => insert_rate(CoinGeckoSource::NAME, &mut rates, pair_key(code, USD), *price),
            None => debug!(code = %code, id = %id, "No USD price in CoinGecko response"),
        }
    }

    Ok(rates)
}

#[async_trait]
impl RateSource for CoinGeckoSource {
    fn name(&self) -> &str {
        Self::NAME
    }

    #[instrument(skip(self), fields(provider = Self::NAME))]
    async fn fetch_rates(&self) -> RatesResult<RateMap> {
        if self.ids.is_empty() {
            return Ok(RateMap::new());
        }

        let mut request = self
            .client
            .get(self.endpoint())
            .query(&[("ids", self.id_list().as_str()), ("vs_currencies", "usd")]);
        if let Some(key) = &self.api_key {
            request = request.header("x-cg-demo-api-key", key);
        }

        let body = get_body(Self::NAME, request).await?;
        let rates = parse_simple_price(&body, &self.ids)
            .map_err(|failure| RatesError::source_unavailable(Self::NAME, failure))?;

        if rates.len() < self.ids.len() {
            warn!(
                requested = self.ids.len(),
                received = rates.len(),
                "CoinGecko response is missing some assets"
            );
        }
        debug!(count = rates.len(), "Fetched crypto rates");
        Ok(rates)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids() -> Vec<(String, String)> {
        vec![
            ("BTC".to_string(), "bitcoin".to_string()),
            ("ETH".to_string(), "ethereum".to_string()),
            ("DOGE".to_string(), "dogecoin".to_string()),
        ]
    }

    #[test]
    fn test_parse_simple_price() {
        let body = r#"{"bitcoin": {"usd": 59337.21}, "ethereum": {"usd": 3720.0}}"#;
        let rates = parse_simple_price(body, &ids()).unwrap();

        assert_eq!(rates.len(), 2);
        assert_eq!(rates["BTC_USD"], 59337.21);
        assert_eq!(rates["ETH_USD"], 3720.0);
        assert!(!rates.contains_key("DOGE_USD"));
    }

    #[test]
    fn test_parse_skips_non_usd_and_invalid_prices() {
        let body = r#"{"bitcoin": {"eur": 50000.0}, "ethereum": {"usd": 0.0}, "dogecoin": {"usd": 0.12}}"#;
        let rates = parse_simple_price(body, &ids()).unwrap();

        assert_eq!(rates.len(), 1);
        assert_eq!(rates["DOGE_USD"], 0.12);
    }

    #[test]
    fn test_parse_malformed_body() {
        let failure = parse_simple_price("<html>busy</html>", &ids()).unwrap_err();
        assert!(matches!(failure, SourceFailure::Parse(_)));
    }

    #[test]
    fn test_endpoint_and_ids() {
        let source = CoinGeckoSource::new(
            "https://example.test/api/v3/",
            ids(),
            None,
            Duration::from_secs(5),
        )
        .unwrap();

        assert_eq!(source.endpoint(), "https://example.test/api/v3/simple/price");
        assert_eq!(source.id_list(), "bitcoin,ethereum,dogecoin");
        assert_eq!(source.name(), "coingecko");
    }
}
