//! Snapshot staleness policy.
//!
//! Staleness is advisory. Callers warn on stale rates but keep working.

use chrono::Duration;
use valutatrade_common::{age_at, now, time::constants, Timestamp};

use crate::snapshot::RateSnapshot;

/// Decides whether a snapshot is too old to trust without a warning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StalenessPolicy {
    ttl: Duration,
}

impl Default for StalenessPolicy {
    fn default() -> Self {
        Self::new(constants::default_rates_ttl())
    }
}

impl StalenessPolicy {
    pub fn new(ttl: Duration) -> Self {
        Self { ttl }
    }

    /// Create a policy from a TTL in hours.
    pub fn from_hours(hours: i64) -> Self {
        Self::new(Duration::hours(hours))
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Check staleness against the current time.
    pub fn is_stale(&self, snapshot: Option<&RateSnapshot>) -> bool {
        self.is_stale_at(snapshot, now())
    }

    /// Check staleness against a reference time.
    ///
    /// Stale when there is no snapshot, it holds no rates, it has no
    /// timestamp, or it is older than the TTL.
    pub fn is_stale_at(&self, snapshot: Option<&RateSnapshot>, reference: Timestamp) -> bool {
        let Some(snapshot) = snapshot else {
            return true;
        };
        if snapshot.is_empty() {
            return true;
        }
        match snapshot.generated_at {
            Some(generated_at) => age_at(generated_at, reference) > self.ttl,
            None => true,
        }
    }
}
