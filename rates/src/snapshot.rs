//! Rate snapshots and their on-disk form.

use chrono::SecondsFormat;
use serde::{Deserialize, Serialize};
use tracing::warn;
use valutatrade_common::{parse_timestamp, RateMap, Timestamp};

/// Meta `source` label used when no source name is known.
pub const DEFAULT_SOURCE_LABEL: &str = "ValutaTrade Hub Parser";

/// Whether a value may be stored as a rate.
pub fn is_valid_rate(rate: f64) -> bool {
    rate.is_finite() && rate > 0.0
}

/// Drop entries that break the positive-rate invariant.
pub fn sanitize_rates(rates: RateMap) -> RateMap {
    rates
        .into_iter()
        .filter(|(pair, rate)| {
            let keep = is_valid_rate(*rate);
            if !keep {
                warn!(pair = %pair, rate = *rate, "Dropping non-positive rate");
            }
            keep
        })
        .collect()
}

/// One complete, timestamped set of merged rates.
#[derive(Debug, Clone, PartialEq)]
pub struct RateSnapshot {
    /// Pair key to rate. Every value is positive and finite.
    pub rates: RateMap,
    /// When the snapshot was generated. Absent for snapshots read from a
    /// file without a usable `last_refresh`.
    pub generated_at: Option<Timestamp>,
    /// Number of sources that contributed.
    pub source_count: usize,
    /// Comma-joined names of the contributing sources.
    pub source: String,
}

impl RateSnapshot {
    /// Create a snapshot, dropping any non-positive rates.
    pub fn new(
        rates: RateMap,
        generated_at: Timestamp,
        source_count: usize,
        source: impl Into<String>,
    ) -> Self {
        Self {
            rates: sanitize_rates(rates),
            generated_at: Some(generated_at),
            source_count,
            source: source.into(),
        }
    }

    /// A snapshot with no rates and no timestamp.
    pub fn empty() -> Self {
        Self {
            rates: RateMap::new(),
            generated_at: None,
            source_count: 0,
            source: String::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.rates.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rates.len()
    }

    /// Look up a pair key.
    pub fn get(&self, key: &str) -> Option<f64> {
        self.rates.get(key).copied()
    }

    /// Serializable file form.
    pub fn to_file(&self) -> SnapshotFile {
        SnapshotFile {
            meta: Some(SnapshotMeta {
                source: if self.source.is_empty() {
                    DEFAULT_SOURCE_LABEL.to_string()
                } else {
                    self.source.clone()
                },
                last_refresh: self
                    .generated_at
                    .map(|ts| ts.to_rfc3339_opts(SecondsFormat::Micros, false)),
                rates_count: self.rates.len(),
                source_count: self.source_count,
            }),
            rates: self.rates.clone(),
        }
    }
}

/// Snapshot metadata as stored on disk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotMeta {
    #[serde(default)]
    pub source: String,
    /// ISO-8601 UTC timestamp.
    #[serde(default)]
    pub last_refresh: Option<String>,
    #[serde(default)]
    pub rates_count: usize,
    #[serde(default)]
    pub source_count: usize,
}

/// On-disk snapshot document: `{ "meta": {...}, "rates": {...} }`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SnapshotFile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<SnapshotMeta>,
    #[serde(default)]
    pub rates: RateMap,
}

impl SnapshotFile {
    /// Whether the document holds nothing at all (no file written yet).
    pub fn is_blank(&self) -> bool {
        self.meta.is_none() && self.rates.is_empty()
    }

    /// Convert into a snapshot. Invalid rates are dropped and an unparsable
    /// timestamp becomes an absent one.
    pub fn into_snapshot(self) -> RateSnapshot {
        let (generated_at, source_count, source) = match self.meta {
            Some(meta) => (
                meta.last_refresh.as_deref().and_then(parse_timestamp),
                meta.source_count,
                meta.source,
            ),
            None => (None, 0, String::new()),
        };

        RateSnapshot {
            rates: sanitize_rates(self.rates),
            generated_at,
            source_count,
            source,
        }
    }
}

/// One appended history record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub timestamp: Timestamp,
    pub rates: RateMap,
}

/// On-disk history document: `{ "history": [...] }`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HistoryFile {
    #[serde(default)]
    pub history: Vec<HistoryEntry>,
}
