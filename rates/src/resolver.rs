//! Conversion resolution against a rate snapshot.
//!
//! Lookup order for `from -> to`:
//! 1. identity (`from == to`) is always `1.0`
//! 2. the direct key `FROM_TO`
//! 3. the reciprocal of the inverse key `TO_FROM`
//! 4. when neither side is USD, `from -> USD` times `USD -> to`
//!
//! USD is the only bridge currency and bridging never nests, since both
//! legs of a bridge involve USD.

use valutatrade_common::{pair_key, CurrencyLookup, USD};

use crate::error::RatesResult;
use crate::snapshot::{is_valid_rate, RateSnapshot};

/// Which rule produced a resolved rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    Identity,
    Direct,
    Inverse,
    ViaUsd,
}

/// Resolve a rate, returning `None` when no path exists.
pub fn resolve(from: &str, to: &str, snapshot: &RateSnapshot) -> Option<f64> {
    resolve_with_path(from, to, snapshot).map(|(rate, _)| rate)
}

/// Resolve a rate along with the rule that produced it.
pub fn resolve_with_path(from: &str, to: &str, snapshot: &RateSnapshot) -> Option<(f64, Resolution)> {
    if from == to {
        return Some((1.0, Resolution::Identity));
    }

    if let Some(rate) = lookup(from, to, snapshot) {
        return Some((rate, Resolution::Direct));
    }

    if let Some(rate) = inverse(from, to, snapshot) {
        return Some((rate, Resolution::Inverse));
    }

    if from != USD && to != USD {
        let to_usd = single_hop(from, USD, snapshot)?;
        let from_usd = single_hop(USD, to, snapshot)?;
        let rate = to_usd * from_usd;
        if is_valid_rate(rate) {
            return Some((rate, Resolution::ViaUsd));
        }
    }

    None
}

/// Validate both codes against the currency lookup, then resolve.
///
/// Unknown or malformed codes are errors; a missing rate is still `None`.
pub fn resolve_checked(
    from: &str,
    to: &str,
    snapshot: &RateSnapshot,
    currencies: &dyn CurrencyLookup,
) -> RatesResult<Option<f64>> {
    let from = currencies.get_currency(from)?;
    let to = currencies.get_currency(to)?;
    Ok(resolve(from.code.as_str(), to.code.as_str(), snapshot))
}

fn single_hop(from: &str, to: &str, snapshot: &RateSnapshot) -> Option<f64> {
    if from == to {
        return Some(1.0);
    }
    lookup(from, to, snapshot).or_else(|| inverse(from, to, snapshot))
}

fn lookup(from: &str, to: &str, snapshot: &RateSnapshot) -> Option<f64> {
    snapshot.get(&pair_key(from, to)).filter(|rate| is_valid_rate(*rate))
}

fn inverse(from: &str, to: &str, snapshot: &RateSnapshot) -> Option<f64> {
    let rate = lookup(to, from, snapshot)?;
    let reciprocal = 1.0 / rate;
    is_valid_rate(reciprocal).then_some(reciprocal)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use valutatrade_common::{now, CurrencyRegistry, RateMap, ValutaError};

    use crate::error::RatesError;

    fn snapshot(pairs: &[(&str, f64)]) -> RateSnapshot {
        let rates: RateMap = pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect();
        RateSnapshot::new(rates, now(), 1, "test")
    }

    #[test]
    fn test_identity_without_rates() {
        let empty = RateSnapshot::empty();
        assert_eq!(resolve_with_path("BTC", "BTC", &empty), Some((1.0, Resolution::Identity)));
    }

    #[test]
    fn test_direct_and_inverse() {
        let s = snapshot(&[("BTC_USD", 50000.0)]);

        assert_eq!(resolve_with_path("BTC", "USD", &s), Some((50000.0, Resolution::Direct)));
        let (rate, path) = resolve_with_path("USD", "BTC", &s).unwrap();
        assert_eq!(path, Resolution::Inverse);
        assert!((rate - 1.0 / 50000.0).abs() < 1e-15);
    }

    #[test]
    fn test_triangulation_through_usd() {
        let s = snapshot(&[("EUR_USD", 0.9), ("GBP_USD", 1.3)]);

        let (rate, path) = resolve_with_path("EUR", "GBP", &s).unwrap();
        assert_eq!(path, Resolution::ViaUsd);
        assert!((rate - 0.9 / 1.3).abs() < 1e-9);
        assert!((rate - 0.6923).abs() < 1e-4);
    }

    #[test]
    fn test_direct_key_wins_over_bridge() {
        let s = snapshot(&[("EUR_USD", 0.9), ("GBP_USD", 1.3), ("EUR_GBP", 0.7)]);
        assert_eq!(resolve("EUR", "GBP", &s), Some(0.7));
    }

    #[test]
    fn test_no_path_is_none() {
        let s = snapshot(&[("EUR_USD", 0.9)]);
        assert_eq!(resolve("EUR", "GBP", &s), None);
        assert_eq!(resolve("USD", "GBP", &s), None);
        assert_eq!(resolve("EUR", "JPY", &RateSnapshot::empty()), None);
    }

    #[test]
    fn test_no_multi_hop_through_non_usd() {
        // EUR -> GBP -> JPY exists, but GBP is not a bridge.
        let s = snapshot(&[("EUR_GBP", 0.85), ("GBP_JPY", 190.0)]);
        assert_eq!(resolve("EUR", "JPY", &s), None);
    }

    #[test]
    fn test_resolve_checked_rejects_unknown_codes() {
        let registry = CurrencyRegistry::default();
        let s = snapshot(&[("BTC_USD", 50000.0)]);

        assert_eq!(resolve_checked("btc", "usd", &s, &registry).unwrap(), Some(50000.0));
        assert_eq!(resolve_checked("EUR", "GBP", &s, &registry).unwrap(), None);

        let err = resolve_checked("XYZ", "USD", &s, &registry).unwrap_err();
        assert!(matches!(
            err,
            RatesError::Currency(ValutaError::CurrencyNotFound(ref code)) if code == "XYZ"
        ));
    }

    fn code() -> impl Strategy<Value = String> {
        "[A-Z]{3}"
    }

    proptest! {
        #[test]
        fn prop_identity(c in code(), rate in 0.0001f64..1_000_000.0) {
            let s = snapshot(&[("EUR_USD", rate)]);
            prop_assert_eq!(resolve(&c, &c, &s), Some(1.0));
        }

        #[test]
        fn prop_direct_and_inverse(a in code(), b in code(), rate in 0.0001f64..1_000_000.0) {
            prop_assume!(a != b);
            let key = pair_key(&a, &b);
            let s = snapshot(&[(key.as_str(), rate)]);

            prop_assert_eq!(resolve(&a, &b, &s), Some(rate));
            let back = resolve(&b, &a, &s).unwrap();
            prop_assert!((back - 1.0 / rate).abs() <= 1e-12 * (1.0 / rate).max(1.0));
        }
    }
}
