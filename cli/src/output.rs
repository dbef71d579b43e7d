//! Text rendering for command results.

use std::fmt::Write;

use valutatrade_common::{Timestamp, ValutaError};
use valutatrade_portfolio::{PortfolioError, PortfolioView, TradeReceipt, TradeSide};
use valutatrade_rates::{RateListing, RateQuote, RatesError, UpdateReport};

fn timestamp(ts: Option<Timestamp>) -> String {
    match ts {
        Some(ts) => ts.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
        None => "never".to_string(),
    }
}

pub fn stale_warning(last_refresh: Option<Timestamp>) -> String {
    format!(
        "Warning: rates may be outdated (last refresh: {}). Run 'update-rates' to refresh.",
        timestamp(last_refresh)
    )
}

pub fn portfolio(view: &PortfolioView) -> String {
    let valuation = &view.valuation;
    let mut out = String::new();

    if valuation.wallets.is_empty() {
        let _ = write!(out, "Portfolio of '{}' is empty", view.username);
        return out;
    }

    let _ = writeln!(out, "Portfolio of '{}' (base: {}):", view.username, valuation.base);
    for wallet in &valuation.wallets {
        match wallet.value {
            Some(value) => {
                let _ = writeln!(
                    out,
                    "- {}: {} -> {:.2} {}",
                    wallet.currency_code,
                    wallet.balance.normalize(),
                    value,
                    valuation.base
                );
            }
            None => {
                let _ = writeln!(
                    out,
                    "- {}: {} -> rate unavailable",
                    wallet.currency_code,
                    wallet.balance.normalize()
                );
            }
        }
    }
    let _ = write!(
        out,
        "---------------------------------\nTOTAL: {:.2} {}",
        valuation.total, valuation.base
    );
    out
}

pub fn trade(receipt: &TradeReceipt) -> String {
    let verb = match receipt.side {
        TradeSide::Buy => "Bought",
        TradeSide::Sell => "Sold",
    };
    let value_label = match receipt.side {
        TradeSide::Buy => "Estimated cost",
        TradeSide::Sell => "Proceeds",
    };

    format!(
        "{} {} {} at {:.8} USD/{}\n- {}: was {} -> now {}\n{}: {:.2} {}",
        verb,
        receipt.amount.normalize(),
        receipt.currency,
        receipt.rate,
        receipt.currency,
        receipt.currency,
        receipt.old_balance.normalize(),
        receipt.new_balance.normalize(),
        value_label,
        receipt.usd_value.value,
        receipt.usd_value.currency
    )
}

pub fn quote(quote: &RateQuote) -> String {
    format!(
        "Rate {}->{}: {:.8} (updated: {})\nInverse {}->{}: {:.8}",
        quote.from,
        quote.to,
        quote.rate,
        timestamp(quote.last_refresh),
        quote.to,
        quote.from,
        quote.inverse
    )
}

pub fn rate_listing(listing: &RateListing) -> String {
    let mut out = format!(
        "Rates from cache (updated at {}, source: {}):",
        timestamp(listing.last_refresh),
        listing.source
    );
    if listing.rows.is_empty() {
        out.push_str("\n(no matching rates)");
    }
    for (pair, rate) in &listing.rows {
        let _ = write!(out, "\n- {}: {:.8}", pair, rate);
    }
    out
}

pub fn update_summary(report: &UpdateReport) -> String {
    format!(
        "Update successful. Total rates updated: {} from {}/{} source(s). Last refresh: {}",
        report.rates_count,
        report.succeeded.len(),
        report.attempted,
        timestamp(Some(report.generated_at))
    )
}

/// User-facing message for a failed command, with a hint where one helps.
pub fn describe_error(error: &anyhow::Error) -> String {
    let hint = if let Some(e) = error.downcast_ref::<PortfolioError>() {
        match e {
            PortfolioError::Currency(ValutaError::CurrencyNotFound(_))
            | PortfolioError::Rates(RatesError::Currency(ValutaError::CurrencyNotFound(_))) => {
                Some("Run 'currencies' to list supported codes.")
            }
            PortfolioError::Rates(e) if e.is_retryable() => Some("Try again later."),
            _ => None,
        }
    } else if let Some(e) = error.downcast_ref::<RatesError>() {
        match e {
            RatesError::Currency(ValutaError::CurrencyNotFound(_)) => {
                Some("Run 'currencies' to list supported codes.")
            }
            RatesError::UnknownSource(_) => Some("Known sources: coingecko, exchangerate."),
            _ => None,
        }
    } else {
        None
    };

    match hint {
        Some(hint) => format!("{:#} {}", error, hint),
        None => format!("{:#}", error),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use valutatrade_common::{CurrencyCode, Money};
    use valutatrade_portfolio::{Valuation, WalletValue};

    #[test]
    fn test_portfolio_rendering() {
        let view = PortfolioView {
            user_id: 1,
            username: "alice".to_string(),
            valuation: Valuation {
                base: "USD".to_string(),
                wallets: vec![
                    WalletValue {
                        currency_code: "BTC".to_string(),
                        balance: dec!(0.5),
                        rate: Some(50000.0),
                        value: Some(dec!(25000)),
                    },
                    WalletValue {
                        currency_code: "DOGE".to_string(),
                        balance: dec!(100),
                        rate: None,
                        value: None,
                    },
                ],
                total: dec!(25000),
            },
            stale: false,
        };

        let text = portfolio(&view);
        assert!(text.contains("- BTC: 0.5 -> 25000.00 USD"));
        assert!(text.contains("- DOGE: 100 -> rate unavailable"));
        assert!(text.ends_with("TOTAL: 25000.00 USD"));
    }

    #[test]
    fn test_trade_rendering() {
        let receipt = TradeReceipt {
            side: TradeSide::Sell,
            currency: "ETH".to_string(),
            amount: dec!(0.5),
            rate: 3000.0,
            old_balance: dec!(2),
            new_balance: dec!(1.5),
            usd_value: Money::new(dec!(1500), CurrencyCode::usd()),
            stale: false,
        };

        let text = trade(&receipt);
        assert!(text.starts_with("Sold 0.5 ETH"));
        assert!(text.contains("was 2 -> now 1.5"));
        assert!(text.ends_with("Proceeds: 1500.00 USD"));
    }

    #[test]
    fn test_stale_warning_without_refresh() {
        assert!(stale_warning(None).contains("last refresh: never"));
    }

    #[test]
    fn test_error_hints() {
        let err = anyhow::Error::new(PortfolioError::Currency(ValutaError::CurrencyNotFound(
            "XYZ".to_string(),
        )));
        assert!(describe_error(&err).ends_with("Run 'currencies' to list supported codes."));

        let err = anyhow::Error::new(RatesError::UnknownSource("bank".to_string()));
        assert!(describe_error(&err).contains("coingecko, exchangerate"));

        let err = anyhow::Error::new(PortfolioError::NotAuthenticated);
        assert_eq!(describe_error(&err), PortfolioError::NotAuthenticated.to_string());

        let err = anyhow::anyhow!("plain failure");
        assert_eq!(describe_error(&err), "plain failure");
    }
}
