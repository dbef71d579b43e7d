//! Rate source trait.

use async_trait::async_trait;
use valutatrade_common::RateMap;

use crate::error::RatesResult;

/// An external provider of exchange rates.
///
/// Implementations return pair keys in the `FROM_TO` form, where the value
/// is how many units of `TO` one unit of `FROM` buys.
#[async_trait]
pub trait RateSource: Send + Sync {
    /// Get the source name.
    fn name(&self) -> &str;

    /// Fetch the current rates.
    async fn fetch_rates(&self) -> RatesResult<RateMap>;
}

/// Mock rate source for testing.
#[cfg(any(test, feature = "test-utils"))]
pub struct MockRateSource {
    name: String,
    response: parking_lot::Mutex<Result<RateMap, crate::error::SourceFailure>>,
    calls: std::sync::atomic::AtomicUsize,
}

#[cfg(any(test, feature = "test-utils"))]
impl MockRateSource {
    /// Create a mock that returns the given rates.
    pub fn with_rates(name: impl Into<String>, rates: &[(&str, f64)]) -> Self {
        Self {
            name: name.into(),
            response: parking_lot::Mutex::new(Ok(to_rate_map(rates))),
            calls: std::sync::atomic::AtomicUsize::new(0),
        }
    }

    /// Create a mock that always fails.
    pub fn failing(name: impl Into<String>, failure: crate::error::SourceFailure) -> Self {
        Self {
            name: name.into(),
            response: parking_lot::Mutex::new(Err(failure)),
            calls: std::sync::atomic::AtomicUsize::new(0),
        }
    }

    /// Replace the configured rates.
    pub fn set_rates(&self, rates: &[(&str, f64)]) {
        *self.response.lock() = Ok(to_rate_map(rates));
    }

    /// Make subsequent fetches fail.
    pub fn set_failure(&self, failure: crate::error::SourceFailure) {
        *self.response.lock() = Err(failure);
    }

    /// Number of `fetch_rates` calls so far.
    pub fn calls(&self) -> usize {
        self.calls.load(std::sync::atomic::Ordering::SeqCst)
    }
}

#[cfg(any(test, feature = "test-utils"))]
fn to_rate_map(rates: &[(&str, f64)]) -> RateMap {
    rates.iter().map(|(k, v)| (k.to_string(), *v)).collect()
}

#[cfg(any(test, feature = "test-utils"))]
#[async_trait]
impl RateSource for MockRateSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch_rates(&self) -> RatesResult<RateMap> {
        self.calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        let response = self.response.lock().clone();
        response.map_err(|failure| crate::error::RatesError::source_unavailable(&self.name, failure))
    }
}
