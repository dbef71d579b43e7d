//! Per-user portfolios and their valuation.

use std::collections::BTreeMap;

use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;
use valutatrade_common::CurrencyCode;

use crate::error::{PortfolioError, PortfolioResult};
use crate::wallet::Wallet;

/// All wallets of one user, keyed by currency code.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Portfolio {
    pub user_id: u64,
    #[serde(default)]
    wallets: BTreeMap<String, Wallet>,
}

/// Value of one wallet in the valuation currency.
#[derive(Debug, Clone, PartialEq)]
pub struct WalletValue {
    pub currency_code: String,
    pub balance: Decimal,
    /// Rate to the valuation currency, absent when unknown.
    pub rate: Option<f64>,
    /// Balance times rate, absent when the rate is unknown.
    pub value: Option<Decimal>,
}

/// Portfolio valuation in one currency.
#[derive(Debug, Clone, PartialEq)]
pub struct Valuation {
    pub base: String,
    pub wallets: Vec<WalletValue>,
    /// Sum of all known wallet values.
    pub total: Decimal,
}

impl Valuation {
    /// Wallets left out of the total for lack of a rate.
    pub fn unpriced(&self) -> impl Iterator<Item = &WalletValue> {
        self.wallets.iter().filter(|w| w.value.is_none())
    }
}

impl Portfolio {
    pub fn new(user_id: u64) -> Self {
        Self {
            user_id,
            wallets: BTreeMap::new(),
        }
    }

    pub fn wallets(&self) -> impl Iterator<Item = &Wallet> {
        self.wallets.values()
    }

    pub fn is_empty(&self) -> bool {
        self.wallets.is_empty()
    }

    pub fn has_currency(&self, code: &CurrencyCode) -> bool {
        self.wallets.contains_key(code.as_str())
    }

    /// Add an empty wallet. Fails if one already exists.
    pub fn add_currency(&mut self, code: CurrencyCode) -> PortfolioResult<&mut Wallet> {
        if self.has_currency(&code) {
            return Err(PortfolioError::WalletExists(code.to_string()));
        }
        let key = code.to_string();
        Ok(self.wallets.entry(key).or_insert_with(|| Wallet::new(code)))
    }

    pub fn get_wallet(&self, code: &CurrencyCode) -> PortfolioResult<&Wallet> {
        self.wallets
            .get(code.as_str())
            .ok_or_else(|| PortfolioError::WalletNotFound(code.to_string()))
    }

    pub fn get_wallet_mut(&mut self, code: &CurrencyCode) -> PortfolioResult<&mut Wallet> {
        self.wallets
            .get_mut(code.as_str())
            .ok_or_else(|| PortfolioError::WalletNotFound(code.to_string()))
    }

    /// Wallet for `code`, created empty if absent.
    pub fn wallet_or_create(&mut self, code: &CurrencyCode) -> &mut Wallet {
        self.wallets
            .entry(code.to_string())
            .or_insert_with(|| Wallet::new(code.clone()))
    }

    /// Value every wallet in `base`, resolving each rate with `resolve`.
    ///
    /// Wallets without a rate are reported with no value and left out of
    /// the total.
    pub fn valuate<F>(&self, base: &CurrencyCode, resolve: F) -> Valuation
    where
        F: Fn(&str, &str) -> Option<f64>,
    {
        let mut total = Decimal::ZERO;
        let wallets = self
            .wallets
            .values()
            .map(|wallet| {
                let rate = resolve(wallet.currency_code.as_str(), base.as_str());
                let value = rate
                    .and_then(Decimal::from_f64)
                    .map(|rate| wallet.balance() * rate);
                match value {
                    Some(value) => total += value,
                    None => debug!(currency = %wallet.currency_code, base = %base, "No rate for wallet"),
                }
                WalletValue {
                    currency_code: wallet.currency_code.to_string(),
                    balance: wallet.balance(),
                    rate,
                    value,
                }
            })
            .collect();

        Valuation {
            base: base.to_string(),
            wallets,
            total,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn code(c: &str) -> CurrencyCode {
        CurrencyCode::parse(c).unwrap()
    }

    fn rates(from: &str, to: &str) -> Option<f64> {
        match (from, to) {
            (a, b) if a == b => Some(1.0),
            ("BTC", "USD") => Some(50000.0),
            ("EUR", "USD") => Some(1.1),
            _ => None,
        }
    }

    #[test]
    fn test_add_and_get_wallet() {
        let mut portfolio = Portfolio::new(1);
        portfolio.add_currency(code("BTC")).unwrap().deposit(dec!(1)).unwrap();

        assert!(portfolio.has_currency(&code("BTC")));
        assert_eq!(portfolio.get_wallet(&code("BTC")).unwrap().balance(), dec!(1));
        assert!(matches!(portfolio.add_currency(code("BTC")), Err(PortfolioError::WalletExists(_))));
        assert!(matches!(portfolio.get_wallet(&code("ETH")), Err(PortfolioError::WalletNotFound(_))));
    }

    #[test]
    fn test_valuation_in_usd() {
        let mut portfolio = Portfolio::new(1);
        portfolio.wallet_or_create(&code("USD")).deposit(dec!(100)).unwrap();
        portfolio.wallet_or_create(&code("BTC")).deposit(dec!(0.5)).unwrap();
        portfolio.wallet_or_create(&code("EUR")).deposit(dec!(10)).unwrap();

        let valuation = portfolio.valuate(&code("USD"), rates);

        assert_eq!(valuation.base, "USD");
        assert_eq!(valuation.wallets.len(), 3);
        assert_eq!(valuation.total, dec!(25111));
    }

    #[test]
    fn test_unknown_rate_excluded_from_total() {
        let mut portfolio = Portfolio::new(1);
        portfolio.wallet_or_create(&code("USD")).deposit(dec!(100)).unwrap();
        portfolio.wallet_or_create(&code("DOGE")).deposit(dec!(1000)).unwrap();

        let valuation = portfolio.valuate(&code("USD"), rates);

        assert_eq!(valuation.total, dec!(100));
        let unpriced: Vec<_> = valuation.unpriced().map(|w| w.currency_code.as_str()).collect();
        assert_eq!(unpriced, vec!["DOGE"]);
    }

    #[test]
    fn test_serde_shape() {
        let mut portfolio = Portfolio::new(3);
        portfolio.wallet_or_create(&code("USD")).deposit(dec!(12.5)).unwrap();

        let value = serde_json::to_value(&portfolio).unwrap();
        assert_eq!(value["user_id"], 3);
        assert_eq!(value["wallets"]["USD"]["currency_code"], "USD");

        let back: Portfolio = serde_json::from_value(value).unwrap();
        assert_eq!(back, portfolio);
    }
}
