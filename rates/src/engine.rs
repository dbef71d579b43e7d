//! Rates engine: the facade used by trading use cases and the CLI.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, instrument, warn};
use valutatrade_common::{CurrencyLookup, CurrencyPair, RateMap, Timestamp, USD};

use crate::aggregator::{RateAggregator, UpdateReport};
use crate::config::RatesConfig;
use crate::error::RatesResult;
use crate::history::HistoryLog;
use crate::provider::RateSource;
use crate::resolver;
use crate::scheduler::UpdateScheduler;
use crate::snapshot::RateSnapshot;
use crate::staleness::StalenessPolicy;
use crate::store::{BlobStore, JsonFileStore};

/// A resolved rate with its inverse and freshness.
#[derive(Debug, Clone, PartialEq)]
pub struct RateQuote {
    pub from: String,
    pub to: String,
    pub rate: f64,
    pub inverse: f64,
    pub last_refresh: Option<Timestamp>,
    pub stale: bool,
}

/// Filters for listing cached rates.
#[derive(Debug, Clone, Default)]
pub struct RatesQuery {
    /// Keep only pair keys containing this code.
    pub currency: Option<String>,
    /// Keep only the N most valuable tracked crypto pairs.
    pub top: Option<usize>,
    /// Re-express every rate against this currency.
    pub base: Option<String>,
}

/// Result of a listing query.
#[derive(Debug, Clone)]
pub struct RateListing {
    /// Pair key and rate. Sorted by key, or by descending rate for `top`.
    pub rows: Vec<(String, f64)>,
    pub last_refresh: Option<Timestamp>,
    pub source: String,
    pub stale: bool,
}

/// Rate cache and conversion engine.
///
/// Holds no snapshot in memory. Every read goes to the snapshot file, so a
/// background scheduler and the caller always agree on the latest rates.
pub struct RatesEngine {
    config: RatesConfig,
    aggregator: Arc<RateAggregator>,
    policy: StalenessPolicy,
    currencies: Arc<dyn CurrencyLookup>,
}

impl RatesEngine {
    /// Create an engine over explicit sources.
    pub fn new(
        config: RatesConfig,
        sources: Vec<Arc<dyn RateSource>>,
        currencies: Arc<dyn CurrencyLookup>,
    ) -> Self {
        let store: Arc<dyn BlobStore> = Arc::new(JsonFileStore::new(&config.snapshot_path));
        let history = HistoryLog::new(Arc::new(JsonFileStore::new(&config.history_path)));
        let aggregator = Arc::new(RateAggregator::new(sources, store, history));

        Self {
            policy: StalenessPolicy::new(config.rates_ttl),
            config,
            aggregator,
            currencies,
        }
    }

    /// Validate the configuration and build the configured HTTP sources.
    pub fn from_config(config: RatesConfig, currencies: Arc<dyn CurrencyLookup>) -> RatesResult<Self> {
        config.validate()?;
        let sources = config.build_sources()?;
        Ok(Self::new(config, sources, currencies))
    }

    pub fn config(&self) -> &RatesConfig {
        &self.config
    }

    pub fn policy(&self) -> StalenessPolicy {
        self.policy
    }

    pub fn currencies(&self) -> &dyn CurrencyLookup {
        self.currencies.as_ref()
    }

    pub fn source_names(&self) -> Vec<&str> {
        self.aggregator.source_names()
    }

    /// Scheduler running updates at the configured interval.
    pub fn scheduler(&self) -> UpdateScheduler {
        self.scheduler_every(self.config.update_interval)
    }

    pub fn scheduler_every(&self, interval: Duration) -> UpdateScheduler {
        UpdateScheduler::new(self.aggregator.clone(), interval)
    }

    /// Run one update. Returns whether a new snapshot was written.
    pub async fn run_update(&self, source: Option<&str>) -> bool {
        self.aggregator.run_update(source).await
    }

    /// Run one update and return its report.
    pub async fn refresh(&self, source: Option<&str>) -> RatesResult<UpdateReport> {
        self.aggregator.refresh(source).await
    }

    /// The persisted snapshot, if any.
    pub fn current_snapshot(&self) -> RatesResult<Option<RateSnapshot>> {
        self.aggregator.load_snapshot()
    }

    /// Current rates, or an empty mapping when no usable snapshot exists.
    pub fn get_current_rates(&self) -> RateMap {
        self.snapshot_or_empty().rates
    }

    /// Resolve a rate between two codes. `None` when no path exists.
    pub fn resolve(&self, from: &str, to: &str) -> Option<f64> {
        let snapshot = self.snapshot_or_empty();
        resolver::resolve(&normalize(from), &normalize(to), &snapshot)
    }

    /// Resolve after validating both codes against the currency registry.
    pub fn resolve_checked(&self, from: &str, to: &str) -> RatesResult<Option<f64>> {
        let snapshot = self.snapshot_or_empty();
        resolver::resolve_checked(from, to, &snapshot, self.currencies.as_ref())
    }

    /// Validated quote with inverse and staleness, or `None` when no rate exists.
    #[instrument(skip(self))]
    pub fn quote(&self, from: &str, to: &str) -> RatesResult<Option<RateQuote>> {
        let from = self.currencies.get_currency(from)?.code;
        let to = self.currencies.get_currency(to)?.code;
        let snapshot = self.snapshot_or_empty();

        let Some(rate) = resolver::resolve(from.as_str(), to.as_str(), &snapshot) else {
            debug!(pair = %CurrencyPair::new(from, to), "No rate path");
            return Ok(None);
        };

        Ok(Some(RateQuote {
            from: from.to_string(),
            to: to.to_string(),
            rate,
            inverse: 1.0 / rate,
            last_refresh: snapshot.generated_at,
            stale: self.policy.is_stale(Some(&snapshot)),
        }))
    }

    pub fn is_stale(&self) -> bool {
        match self.current_snapshot() {
            Ok(snapshot) => self.policy.is_stale(snapshot.as_ref()),
            Err(e) => {
                warn!(error = %e, "Cannot read snapshot, treating rates as stale");
                true
            }
        }
    }

    pub fn last_refresh(&self) -> Option<Timestamp> {
        self.snapshot_or_empty().generated_at
    }

    /// List cached rates. `None` when the cache is empty.
    pub fn list_rates(&self, query: &RatesQuery) -> RatesResult<Option<RateListing>> {
        let snapshot = match self.current_snapshot()? {
            Some(snapshot) if !snapshot.is_empty() => snapshot,
            _ => return Ok(None),
        };

        let mut rates = snapshot.rates.clone();

        if let Some(base) = query.base.as_deref().map(normalize) {
            if base != USD {
                self.currencies.get_currency(&base)?;
                rates = rebase(&rates, &base, &snapshot);
            }
        }

        if let Some(code) = query.currency.as_deref().map(normalize) {
            rates.retain(|key, _| key.contains(&code));
        }

        let mut rows: Vec<(String, f64)> = rates.into_iter().collect();

        if let Some(top) = query.top {
            let tracked: Vec<String> = self
                .config
                .crypto_currencies
                .iter()
                .map(|code| valutatrade_common::pair_key(code, USD))
                .collect();
            rows.retain(|(key, _)| tracked.contains(key));
            rows.sort_by(|a, b| b.1.total_cmp(&a.1));
            rows.truncate(top);
        }

        Ok(Some(RateListing {
            rows,
            last_refresh: snapshot.generated_at,
            source: snapshot.source.clone(),
            stale: self.policy.is_stale(Some(&snapshot)),
        }))
    }

    fn snapshot_or_empty(&self) -> RateSnapshot {
        match self.current_snapshot() {
            Ok(Some(snapshot)) => snapshot,
            Ok(None) => RateSnapshot::empty(),
            Err(e) => {
                warn!(error = %e, "Cannot read snapshot, using empty rates");
                RateSnapshot::empty()
            }
        }
    }
}

fn normalize(code: &str) -> String {
    code.trim().to_uppercase()
}

/// Re-express every priced currency against `base`.
fn rebase(rates: &RateMap, base: &str, snapshot: &RateSnapshot) -> RateMap {
    let mut rebased = RateMap::new();
    for key in rates.keys() {
        let Ok(pair) = CurrencyPair::parse(key) else {
            continue;
        };
        for code in [pair.from.as_str(), pair.to.as_str()] {
            if code == base {
                continue;
            }
            if let Some(rate) = resolver::resolve(code, base, snapshot) {
                rebased.insert(valutatrade_common::pair_key(code, base), rate);
            }
        }
    }
    rebased
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{RatesError, SourceFailure};
    use crate::provider::MockRateSource;
    use crate::snapshot::SnapshotFile;
    use crate::store::save_typed;
    use crate::store::tests::temp_dir;
    use chrono::Duration;
    use valutatrade_common::{now, CurrencyRegistry, ValutaError};

    fn config() -> RatesConfig {
        let dir = temp_dir();
        RatesConfig {
            snapshot_path: dir.join("rates.json"),
            history_path: dir.join("exchange_rates.json"),
            ..RatesConfig::default()
        }
    }

    fn engine_with(sources: Vec<Arc<dyn RateSource>>) -> RatesEngine {
        RatesEngine::new(config(), sources, Arc::new(CurrencyRegistry::default()))
    }

    fn market() -> Arc<MockRateSource> {
        Arc::new(MockRateSource::with_rates(
            "mock",
            &[
                ("BTC_USD", 50000.0),
                ("ETH_USD", 3000.0),
                ("SOL_USD", 150.0),
                ("EUR_USD", 1.08),
                ("GBP_USD", 1.27),
            ],
        ))
    }

    #[tokio::test]
    async fn test_empty_engine() {
        let engine = engine_with(Vec::new());

        assert!(engine.get_current_rates().is_empty());
        assert!(engine.is_stale());
        assert!(engine.last_refresh().is_none());
        assert_eq!(engine.resolve("EUR", "EUR"), Some(1.0));
        assert_eq!(engine.resolve("BTC", "USD"), None);
        assert!(engine.list_rates(&RatesQuery::default()).unwrap().is_none());
        assert!(!engine.run_update(None).await);
    }

    #[tokio::test]
    async fn test_update_then_resolve() {
        let engine = engine_with(vec![market() as Arc<dyn RateSource>]);
        assert!(engine.run_update(None).await);

        assert!(!engine.is_stale());
        assert!(engine.last_refresh().is_some());
        assert_eq!(engine.get_current_rates().len(), 5);
        assert_eq!(engine.resolve("btc", "usd"), Some(50000.0));

        let eur_gbp = engine.resolve("EUR", "GBP").unwrap();
        assert!((eur_gbp - 1.08 / 1.27).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_quote_and_checked_resolution() {
        let engine = engine_with(vec![market() as Arc<dyn RateSource>]);
        engine.run_update(None).await;

        let quote = engine.quote("usd", "btc").unwrap().unwrap();
        assert_eq!(quote.from, "USD");
        assert_eq!(quote.to, "BTC");
        assert!((quote.rate - 1.0 / 50000.0).abs() < 1e-15);
        assert!((quote.inverse - 50000.0).abs() < 1e-6);
        assert!(!quote.stale);

        // Known currency, no rate.
        assert!(engine.quote("RUB", "JPY").unwrap().is_none());

        let err = engine.resolve_checked("XYZ", "USD").unwrap_err();
        assert!(matches!(err, RatesError::Currency(ValutaError::CurrencyNotFound(_))));
    }

    #[tokio::test]
    async fn test_failed_update_keeps_previous_rates() {
        let source = market();
        let engine = engine_with(vec![source.clone() as Arc<dyn RateSource>]);
        assert!(engine.run_update(None).await);

        source.set_failure(SourceFailure::Http(503));
        assert!(!engine.run_update(None).await);
        assert_eq!(engine.resolve("BTC", "USD"), Some(50000.0));
    }

    #[test]
    fn test_stale_snapshot_on_disk() {
        let engine = engine_with(Vec::new());
        let mut rates = RateMap::new();
        rates.insert("BTC_USD".to_string(), 50000.0);
        let old = RateSnapshot::new(rates, now() - Duration::hours(2), 1, "coingecko");
        let store = JsonFileStore::new(&engine.config().snapshot_path);
        save_typed(&store, &old.to_file()).unwrap();

        assert!(engine.is_stale());
        assert_eq!(engine.resolve("BTC", "USD"), Some(50000.0));
    }

    #[test]
    fn test_corrupt_snapshot_reads_as_empty() {
        let engine = engine_with(Vec::new());
        let path = &engine.config().snapshot_path;
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, "not json").unwrap();

        assert!(matches!(engine.current_snapshot(), Err(RatesError::Storage { .. })));
        assert!(engine.get_current_rates().is_empty());
        assert!(engine.is_stale());
    }

    #[tokio::test]
    async fn test_list_rates_filters() {
        let engine = engine_with(vec![market() as Arc<dyn RateSource>]);
        engine.run_update(None).await;

        let all = engine.list_rates(&RatesQuery::default()).unwrap().unwrap();
        assert_eq!(all.rows.len(), 5);
        assert_eq!(all.rows[0].0, "BTC_USD");
        assert_eq!(all.source, "mock");

        let btc = engine
            .list_rates(&RatesQuery {
                currency: Some("btc".to_string()),
                ..Default::default()
            })
            .unwrap()
            .unwrap();
        assert_eq!(btc.rows, vec![("BTC_USD".to_string(), 50000.0)]);

        let top = engine
            .list_rates(&RatesQuery {
                top: Some(2),
                ..Default::default()
            })
            .unwrap()
            .unwrap();
        let keys: Vec<&str> = top.rows.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, vec!["BTC_USD", "ETH_USD"]);

        let none = engine
            .list_rates(&RatesQuery {
                currency: Some("XRP".to_string()),
                ..Default::default()
            })
            .unwrap()
            .unwrap();
        assert!(none.rows.is_empty());
    }

    #[tokio::test]
    async fn test_list_rates_with_base() {
        let engine = engine_with(vec![market() as Arc<dyn RateSource>]);
        engine.run_update(None).await;

        let in_eur = engine
            .list_rates(&RatesQuery {
                base: Some("EUR".to_string()),
                ..Default::default()
            })
            .unwrap()
            .unwrap();

        let rates: RateMap = in_eur.rows.into_iter().collect();
        assert!((rates["BTC_EUR"] - 50000.0 / 1.08).abs() < 1e-6);
        assert!((rates["USD_EUR"] - 1.0 / 1.08).abs() < 1e-12);
        assert!(!rates.contains_key("EUR_EUR"));

        let err = engine
            .list_rates(&RatesQuery {
                base: Some("XYZ".to_string()),
                ..Default::default()
            })
            .unwrap_err();
        assert_eq!(err.error_code(), "CURRENCY_NOT_FOUND");
    }

    #[test]
    fn test_blank_file_is_no_snapshot() {
        let engine = engine_with(Vec::new());
        let store = JsonFileStore::new(&engine.config().snapshot_path);
        save_typed(&store, &SnapshotFile::default()).unwrap();

        assert!(engine.current_snapshot().unwrap().is_none());
    }
}
