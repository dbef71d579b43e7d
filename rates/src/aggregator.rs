//! Rate aggregation: fetch from every source, merge, persist.

use std::sync::Arc;

use tracing::{error, info, instrument, warn};
use valutatrade_common::{now, RateMap, Timestamp};

use crate::error::{RatesError, RatesResult};
use crate::history::HistoryLog;
use crate::provider::RateSource;
use crate::snapshot::{HistoryEntry, RateSnapshot, SnapshotFile};
use crate::store::{load_typed, save_typed, BlobStore};

/// Outcome of one successful update run.
#[derive(Debug, Clone)]
pub struct UpdateReport {
    /// Number of rates in the new snapshot.
    pub rates_count: usize,
    /// Sources that contributed rates.
    pub succeeded: Vec<String>,
    /// Number of sources consulted.
    pub attempted: usize,
    /// Sources that failed, with the reason.
    pub failures: Vec<(String, String)>,
    /// Timestamp of the new snapshot.
    pub generated_at: Timestamp,
    /// Whether the history append succeeded.
    pub history_written: bool,
}

/// Merges rates from every configured source into one snapshot.
///
/// Sources are consulted in their configured order. When two sources emit
/// the same pair key, the later one wins.
pub struct RateAggregator {
    sources: Vec<Arc<dyn RateSource>>,
    store: Arc<dyn BlobStore>,
    history: HistoryLog,
}

impl RateAggregator {
    pub fn new(sources: Vec<Arc<dyn RateSource>>, store: Arc<dyn BlobStore>, history: HistoryLog) -> Self {
        Self {
            sources,
            store,
            history,
        }
    }

    /// Names of the configured sources, in consultation order.
    pub fn source_names(&self) -> Vec<&str> {
        self.sources.iter().map(|s| s.name()).collect()
    }

    /// Run one update and report whether a snapshot was written.
    pub async fn run_update(&self, source: Option<&str>) -> bool {
        match self.refresh(source).await {
            Ok(_) => true,
            Err(e) => {
                error!(error = %e, code = e.error_code(), "Rate update failed");
                false
            }
        }
    }

    /// Run one update, optionally restricted to a single source by name.
    ///
    /// Individual source failures are logged and skipped. The run fails only
    /// when no source contributes any rate, in which case the stored
    /// snapshot is left as it was.
    #[instrument(skip(self))]
    pub async fn refresh(&self, source: Option<&str>) -> RatesResult<UpdateReport> {
        let selected = self.select(source)?;
        let attempted = selected.len();
        info!(sources = attempted, "Starting rate update");

        let mut merged = RateMap::new();
        let mut succeeded = Vec::new();
        let mut failures = Vec::new();

        for source in selected {
            match source.fetch_rates().await {
                Ok(rates) if rates.is_empty() => {
                    warn!(provider = source.name(), "Source returned no rates");
                    failures.push((source.name().to_string(), "no rates returned".to_string()));
                }
                Ok(rates) => {
                    info!(provider = source.name(), count = rates.len(), "Fetched rates");
                    merged.extend(rates);
                    succeeded.push(source.name().to_string());
                }
                Err(e) => {
                    warn!(
                        provider = source.name(),
                        error = %e,
                        retryable = e.is_retryable(),
                        "Source failed, skipping"
                    );
                    failures.push((source.name().to_string(), e.to_string()));
                }
            }
        }

        let generated_at = now();
        let snapshot = RateSnapshot::new(merged, generated_at, succeeded.len(), succeeded.join(","));
        if snapshot.is_empty() {
            return Err(RatesError::NoRatesFetched { attempted });
        }

        save_typed(self.store.as_ref(), &snapshot.to_file())?;

        let entry = HistoryEntry {
            timestamp: generated_at,
            rates: snapshot.rates.clone(),
        };
        let history_written = match self.history.append(entry) {
            Ok(_) => true,
            Err(e) => {
                warn!(error = %e, "Failed to append rate history");
                false
            }
        };

        info!(
            rates = snapshot.len(),
            succeeded = succeeded.len(),
            failed = failures.len(),
            last_refresh = %generated_at,
            "Rate update complete"
        );

        Ok(UpdateReport {
            rates_count: snapshot.len(),
            succeeded,
            attempted,
            failures,
            generated_at,
            history_written,
        })
    }

    /// Load the persisted snapshot, or `None` if nothing was written yet.
    pub fn load_snapshot(&self) -> RatesResult<Option<RateSnapshot>> {
        let file: SnapshotFile = load_typed(self.store.as_ref())?;
        if file.is_blank() {
            return Ok(None);
        }
        Ok(Some(file.into_snapshot()))
    }

    fn select(&self, source: Option<&str>) -> RatesResult<Vec<&Arc<dyn RateSource>>> {
        match source {
            None => Ok(self.sources.iter().collect()),
            Some(name) => {
                let wanted = name.trim();
                let selected: Vec<_> = self
                    .sources
                    .iter()
                    .filter(|s| s.name().eq_ignore_ascii_case(wanted))
                    .collect();
                if selected.is_empty() {
                    return Err(RatesError::UnknownSource(wanted.to_string()));
                }
                Ok(selected)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SourceFailure;
    use crate::provider::MockRateSource;
    use crate::store::tests::temp_dir;
    use crate::store::JsonFileStore;
    use std::path::PathBuf;

    struct Fixture {
        dir: PathBuf,
        store: Arc<JsonFileStore>,
        history: HistoryLog,
    }

    fn fixture() -> Fixture {
        let dir = temp_dir();
        let store = Arc::new(JsonFileStore::new(dir.join("rates.json")));
        let history = HistoryLog::new(Arc::new(JsonFileStore::new(dir.join("exchange_rates.json"))));
        Fixture { dir, store, history }
    }

    fn aggregator(fx: &Fixture, sources: Vec<Arc<dyn RateSource>>) -> RateAggregator {
        RateAggregator::new(sources, fx.store.clone(), fx.history.clone())
    }

    #[tokio::test]
    async fn test_one_failing_source_is_skipped() {
        let fx = fixture();
        let agg = aggregator(
            &fx,
            vec![
                Arc::new(MockRateSource::failing("broken", SourceFailure::Timeout)) as Arc<dyn RateSource>,
                Arc::new(MockRateSource::with_rates("good", &[("BTC_USD", 50000.0)])) as Arc<dyn RateSource>,
            ],
        );

        assert!(agg.run_update(None).await);

        let snapshot = agg.load_snapshot().unwrap().unwrap();
        assert_eq!(snapshot.rates.len(), 1);
        assert_eq!(snapshot.get("BTC_USD"), Some(50000.0));
        assert_eq!(snapshot.source_count, 1);
        assert_eq!(snapshot.source, "good");
        assert!(snapshot.generated_at.is_some());
        assert_eq!(fx.history.entries().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_all_sources_failing_leaves_snapshot_untouched() {
        let fx = fixture();
        let good = Arc::new(MockRateSource::with_rates("good", &[("BTC_USD", 50000.0)]));
        let agg = aggregator(&fx, vec![good.clone() as Arc<dyn RateSource>]);
        assert!(agg.run_update(None).await);
        let before = std::fs::read(fx.store.path()).unwrap();

        good.set_failure(SourceFailure::RateLimited);
        assert!(!agg.run_update(None).await);

        let err = agg.refresh(None).await.unwrap_err();
        assert!(matches!(err, RatesError::NoRatesFetched { attempted: 1 }));
        assert_eq!(std::fs::read(fx.store.path()).unwrap(), before);
        assert_eq!(fx.history.entries().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_no_sources_fails_without_writing() {
        let fx = fixture();
        let agg = aggregator(&fx, Vec::new());

        assert!(!agg.run_update(None).await);
        assert!(!fx.store.exists());
        assert!(agg.load_snapshot().unwrap().is_none());
    }

    #[tokio::test]
    async fn test_later_source_wins_on_collision() {
        let fx = fixture();
        let agg = aggregator(
            &fx,
            vec![
                Arc::new(MockRateSource::with_rates("first", &[("EUR_USD", 1.05), ("BTC_USD", 50000.0)])) as Arc<dyn RateSource>,
                Arc::new(MockRateSource::with_rates("second", &[("EUR_USD", 1.08)])) as Arc<dyn RateSource>,
            ],
        );

        let report = agg.refresh(None).await.unwrap();
        assert_eq!(report.succeeded, vec!["first", "second"]);
        assert_eq!(report.rates_count, 2);

        let snapshot = agg.load_snapshot().unwrap().unwrap();
        assert_eq!(snapshot.get("EUR_USD"), Some(1.08));
        assert_eq!(snapshot.source, "first,second");
        assert_eq!(snapshot.source_count, 2);
    }

    #[tokio::test]
    async fn test_each_run_replaces_previous_snapshot() {
        let fx = fixture();
        let source = Arc::new(MockRateSource::with_rates("mock", &[("BTC_USD", 50000.0)]));
        let agg = aggregator(&fx, vec![source.clone() as Arc<dyn RateSource>]);
        agg.refresh(None).await.unwrap();

        source.set_rates(&[("ETH_USD", 3000.0)]);
        agg.refresh(None).await.unwrap();

        let snapshot = agg.load_snapshot().unwrap().unwrap();
        assert_eq!(snapshot.get("BTC_USD"), None);
        assert_eq!(snapshot.get("ETH_USD"), Some(3000.0));
    }

    #[tokio::test]
    async fn test_source_filter() {
        let fx = fixture();
        let crypto = Arc::new(MockRateSource::with_rates("coingecko", &[("BTC_USD", 50000.0)]));
        let fiat = Arc::new(MockRateSource::with_rates("exchangerate", &[("EUR_USD", 1.08)]));
        let agg = aggregator(
            &fx,
            vec![crypto.clone() as Arc<dyn RateSource>, fiat.clone() as Arc<dyn RateSource>],
        );

        let report = agg.refresh(Some("CoinGecko")).await.unwrap();
        assert_eq!(report.attempted, 1);
        assert_eq!(crypto.calls(), 1);
        assert_eq!(fiat.calls(), 0);

        let err = agg.refresh(Some("nope")).await.unwrap_err();
        assert!(matches!(err, RatesError::UnknownSource(ref name) if name == "nope"));
    }

    #[tokio::test]
    async fn test_history_failure_does_not_fail_run() {
        let fx = fixture();
        // A directory where the history file should be makes every write fail.
        let history_path = fx.dir.join("blocked");
        std::fs::create_dir_all(history_path.join("inner")).unwrap();
        let history = HistoryLog::new(Arc::new(JsonFileStore::new(&history_path)));
        let agg = RateAggregator::new(
            vec![Arc::new(MockRateSource::with_rates("mock", &[("BTC_USD", 50000.0)])) as Arc<dyn RateSource>],
            fx.store.clone(),
            history,
        );

        let report = agg.refresh(None).await.unwrap();
        assert!(!report.history_written);
        assert!(fx.store.exists());
    }
}
