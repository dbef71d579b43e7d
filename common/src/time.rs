//! Time utilities and timing constants.

use chrono::{DateTime, Duration, Utc};

/// Timing constants for rate refresh and scheduling.
pub mod constants {
    use super::Duration;

    /// Default snapshot time-to-live (1 hour).
    pub fn default_rates_ttl() -> Duration {
        Duration::hours(1)
    }

    /// Default interval between scheduled updates (5 minutes).
    pub fn default_update_interval() -> std::time::Duration {
        std::time::Duration::from_secs(300)
    }

    /// Minimum interval between scheduled updates (1 minute).
    pub fn min_update_interval() -> std::time::Duration {
        std::time::Duration::from_secs(60)
    }

    /// Default HTTP request timeout (10 seconds).
    pub fn default_request_timeout() -> std::time::Duration {
        std::time::Duration::from_secs(10)
    }

    /// Maximum HTTP request timeout (30 seconds).
    pub fn max_request_timeout() -> std::time::Duration {
        std::time::Duration::from_secs(30)
    }

    /// Scheduler stop-signal polling slice (500 milliseconds).
    pub fn polling_interval() -> std::time::Duration {
        std::time::Duration::from_millis(500)
    }

    /// Scheduler join timeout on shutdown (5 seconds).
    pub fn shutdown_timeout() -> std::time::Duration {
        std::time::Duration::from_secs(5)
    }
}

/// A timestamp, always UTC.
pub type Timestamp = DateTime<Utc>;

/// Get the current timestamp.
pub fn now() -> Timestamp {
    Utc::now()
}

/// Age of a timestamp relative to `reference`, never negative.
pub fn age_at(timestamp: Timestamp, reference: Timestamp) -> Duration {
    let age = reference - timestamp;
    if age < Duration::zero() {
        Duration::zero()
    } else {
        age
    }
}

/// Parse an ISO-8601 timestamp, accepting both `Z` and numeric offsets.
pub fn parse_timestamp(value: &str) -> Option<Timestamp> {
    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}
