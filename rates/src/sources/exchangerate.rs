//! ExchangeRate-API fiat client.

use std::collections::{BTreeMap, HashSet};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, instrument};
use valutatrade_common::{pair_key, RateMap};

use super::{build_client, get_body, insert_rate};
use crate::error::{RatesError, RatesResult, SourceFailure};
use crate::provider::RateSource;

/// Public ExchangeRate-API v6 root.
pub const DEFAULT_BASE_URL: &str = "https://v6.exchangerate-api.com/v6";

#[derive(Debug, Deserialize)]
struct LatestResponse {
    #[serde(default)]
    result: Option<String>,
    #[serde(default, rename = "error-type")]
    error_type: Option<String>,
    #[serde(default)]
    conversion_rates: Option<BTreeMap<String, f64>>,
    #[serde(default)]
    rates: Option<BTreeMap<String, f64>>,
}

/// Fiat source quoting currencies against one base currency.
pub struct ExchangeRateApiSource {
    client: Client,
    base_url: String,
    api_key: String,
    base_currency: String,
    /// Codes to keep. Empty means every code the provider returns.
    tracked: HashSet<String>,
}

impl ExchangeRateApiSource {
    pub const NAME: &'static str = "exchangerate";

    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        base_currency: impl Into<String>,
        tracked: impl IntoIterator<Item = String>,
        timeout: Duration,
    ) -> RatesResult<Self> {
        Ok(Self {
            client: build_client(Self::NAME, timeout)?,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            base_currency: base_currency.into(),
            tracked: tracked.into_iter().collect(),
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/{}/latest/{}", self.base_url, self.api_key, self.base_currency)
    }
}

/// Parse a `/latest/{BASE}` body.
///
/// The provider quotes "1 BASE = r CODE". Each value is stored as `1/r`
/// under `{CODE}_{BASE}`, so the key reads "1 CODE = 1/r BASE".
pub fn parse_latest(
    body: &str,
    base_currency: &str,
    tracked: &HashSet<String>,
) -> Result<RateMap, SourceFailure> {
    let response: LatestResponse =
        serde_json::from_str(body).map_err(|e| SourceFailure::Parse(e.to_string()))?;

    if let Some(result) = response.result.as_deref() {
        if result != "success" {
            let error_type = response.error_type.unwrap_or_else(|| "unknown-error".to_string());
            return Err(match error_type.as_str() {
                "invalid-key" | "inactive-account" => SourceFailure::Unauthorized,
                "quota-reached" => SourceFailure::RateLimited,
                _ => SourceFailure::Provider(error_type),
            });
        }
    }

    let quoted = response
        .conversion_rates
        .or(response.rates)
        .ok_or_else(|| SourceFailure::Parse("response has no rates".to_string()))?;

    let mut rates = RateMap::new();
    for (code, per_base) in quoted {
        if code == base_currency || (!tracked.is_empty() && !tracked.contains(&code)) {
            continue;
        }
        let rate = if per_base > 0.0 { 1.0 / per_base } else { per_base };
        insert_rate(ExchangeRateApiSource::NAME, &mut rates, pair_key(&code, base_currency), rate);
    }

    Ok(rates)
}

#[async_trait]
impl RateSource for ExchangeRateApiSource {
    fn name(&self) -> &str {
        Self::NAME
    }

    #[instrument(skip(self), fields(provider = Self::NAME, base = %self.base_currency))]
    async fn fetch_rates(&self) -> RatesResult<RateMap> {
        let body = get_body(Self::NAME, self.client.get(self.endpoint())).await?;
        let rates = parse_latest(&body, &self.base_currency, &self.tracked)
            .map_err(|failure| RatesError::source_unavailable(Self::NAME, failure))?;

        debug!(count = rates.len(), "Fetched fiat rates");
        Ok(rates)
    }
}
