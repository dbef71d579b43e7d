//! Single-currency wallets.

use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use valutatrade_common::CurrencyCode;

use crate::error::{PortfolioError, PortfolioResult};

/// Balance held in one currency. The balance never goes negative.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Wallet {
    pub currency_code: CurrencyCode,
    balance: Decimal,
}

impl Wallet {
    /// Create an empty wallet.
    pub fn new(currency_code: CurrencyCode) -> Self {
        Self {
            currency_code,
            balance: Decimal::ZERO,
        }
    }

    pub fn balance(&self) -> Decimal {
        self.balance
    }

    /// Add funds. Returns the new balance.
    pub fn deposit(&mut self, amount: Decimal) -> PortfolioResult<Decimal> {
        ensure_positive(amount)?;
        self.balance += amount;
        Ok(self.balance)
    }

    /// Remove funds. Returns the new balance.
    pub fn withdraw(&mut self, amount: Decimal) -> PortfolioResult<Decimal> {
        ensure_positive(amount)?;
        if amount > self.balance {
            return Err(PortfolioError::InsufficientFunds {
                available: self.balance,
                required: amount,
                code: self.currency_code.to_string(),
            });
        }
        self.balance -= amount;
        Ok(self.balance)
    }
}

impl fmt::Display for Wallet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {:.8}", self.currency_code, self.balance)
    }
}

/// Reject zero and negative amounts.
pub fn ensure_positive(amount: Decimal) -> PortfolioResult<()> {
    if amount <= Decimal::ZERO {
        return Err(PortfolioError::InvalidAmount(amount));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn btc() -> Wallet {
        Wallet::new(CurrencyCode::parse("BTC").unwrap())
    }

    #[test]
    fn test_deposit_and_withdraw() {
        let mut wallet = btc();
        assert_eq!(wallet.deposit(dec!(1.5)).unwrap(), dec!(1.5));
        assert_eq!(wallet.withdraw(dec!(0.25)).unwrap(), dec!(1.25));
        assert_eq!(wallet.to_string(), "BTC: 1.25000000");
    }

    #[test]
    fn test_rejects_non_positive_amounts() {
        let mut wallet = btc();
        assert!(matches!(wallet.deposit(dec!(0)), Err(PortfolioError::InvalidAmount(_))));
        assert!(matches!(wallet.deposit(dec!(-1)), Err(PortfolioError::InvalidAmount(_))));
        assert!(matches!(wallet.withdraw(dec!(-1)), Err(PortfolioError::InvalidAmount(_))));
    }

    #[test]
    fn test_overdraw_leaves_balance_unchanged() {
        let mut wallet = btc();
        wallet.deposit(dec!(0.5)).unwrap();

        let err = wallet.withdraw(dec!(1)).unwrap_err();
        assert!(matches!(
            err,
            PortfolioError::InsufficientFunds { available, required, ref code }
                if available == dec!(0.5) && required == dec!(1) && code == "BTC"
        ));
        assert_eq!(wallet.balance(), dec!(0.5));
    }
}
