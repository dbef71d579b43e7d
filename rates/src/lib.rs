//! ValutaTrade Rates Engine
//!
//! Rate cache and conversion engine: fetches rates from external sources,
//! merges them into one timestamped snapshot, stores it atomically and
//! answers conversion queries against it.
//!
//! # Features
//!
//! - CoinGecko and ExchangeRate-API sources behind one `RateSource` trait
//! - Atomic JSON snapshot store with a capped history log
//! - Direct, inverse and USD-bridged rate resolution
//! - Advisory staleness policy with a configurable TTL
//! - Background update scheduler with bounded shutdown
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use valutatrade_common::{CurrencyRegistry, Settings};
//! use valutatrade_rates::{RatesConfig, RatesEngine};
//!
//! let config = RatesConfig::from_settings(&Settings::from_env());
//! let engine = RatesEngine::from_config(config, Arc::new(CurrencyRegistry::default()))?;
//!
//! if engine.run_update(None).await {
//!     let eur_gbp = engine.resolve("EUR", "GBP");
//! }
//! ```

pub mod aggregator;
pub mod config;
pub mod engine;
pub mod error;
pub mod history;
pub mod provider;
pub mod resolver;
pub mod scheduler;
pub mod snapshot;
pub mod sources;
pub mod staleness;
pub mod store;

pub use aggregator::{RateAggregator, UpdateReport};
pub use config::RatesConfig;
pub use engine::{RateListing, RateQuote, RatesEngine, RatesQuery};
pub use error::{RatesError, RatesResult, SourceFailure};
pub use history::{HistoryLog, HISTORY_LIMIT};
pub use provider::RateSource;
pub use resolver::{resolve, resolve_checked, Resolution};
pub use scheduler::UpdateScheduler;
pub use snapshot::{HistoryEntry, RateSnapshot};
pub use staleness::StalenessPolicy;
pub use store::{BlobStore, JsonFileStore};

#[cfg(any(test, feature = "test-utils"))]
pub use provider::MockRateSource;
