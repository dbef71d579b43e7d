//! HTTP rate source clients.

pub mod coingecko;
pub mod exchangerate;

pub use coingecko::CoinGeckoSource;
pub use exchangerate::ExchangeRateApiSource;

use std::time::Duration;

use reqwest::{Client, StatusCode};
use tracing::warn;
use valutatrade_common::RateMap;

use crate::error::{RatesError, RatesResult, SourceFailure};
use crate::snapshot::is_valid_rate;

/// Map a non-success HTTP status to a failure kind.
pub fn classify_status(status: StatusCode) -> SourceFailure {
    match status.as_u16() {
        429 => SourceFailure::RateLimited,
        401 => SourceFailure::Unauthorized,
        403 => SourceFailure::Forbidden,
        other => SourceFailure::Http(other),
    }
}

/// Map a transport error to a failure kind.
pub(crate) fn classify_transport(err: &reqwest::Error) -> SourceFailure {
    if err.is_timeout() {
        SourceFailure::Timeout
    } else if let Some(status) = err.status() {
        classify_status(status)
    } else if err.is_decode() {
        SourceFailure::Parse(err.to_string())
    } else {
        SourceFailure::Network(err.to_string())
    }
}

/// Build an HTTP client with the given request timeout.
pub(crate) fn build_client(source: &str, timeout: Duration) -> RatesResult<Client> {
    Client::builder()
        .timeout(timeout)
        .user_agent(concat!("valutatrade/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| RatesError::ConfigValidation(format!("{} HTTP client: {}", source, e)))
}

/// Send a GET request and return the body of a successful response.
pub(crate) async fn get_body(
    source: &str,
    request: reqwest::RequestBuilder,
) -> RatesResult<String> {
    let response = request
        .header("accept", "application/json")
        .send()
        .await
        .map_err(|e| RatesError::source_unavailable(source, classify_transport(&e)))?;

    let status = response.status();
    if !status.is_success() {
        return Err(RatesError::source_unavailable(source, classify_status(status)));
    }

    response
        .text()
        .await
        .map_err(|e| RatesError::source_unavailable(source, classify_transport(&e)))
}

/// Insert a rate unless it breaks the positive-rate invariant.
pub(crate) fn insert_rate(source: &str, rates: &mut RateMap, key: String, rate: f64) {
    if is_valid_rate(rate) {
        rates.insert(key, rate);
    } else {
        warn!(provider = source, pair = %key, rate, "Discarding invalid rate from provider");
    }
}
