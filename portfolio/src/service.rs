//! Trading use cases: registration, login, portfolio display, buy and sell.

use std::sync::Arc;

use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use tracing::{error, info, instrument};
use valutatrade_common::{CurrencyCode, Money, Settings, USD};
use valutatrade_rates::{JsonFileStore, RateQuote, RatesEngine};

use crate::error::{PortfolioError, PortfolioResult};
use crate::portfolio::{Portfolio, Valuation};
use crate::repository::{PortfolioRepository, UserRepository};
use crate::session::{Session, SessionStore};
use crate::user::{validate_username, User};
use crate::wallet::ensure_positive;

pub const USERS_FILE: &str = "users.json";
pub const PORTFOLIOS_FILE: &str = "portfolios.json";
pub const SESSION_FILE: &str = "session.json";

/// Direction of a trade.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TradeSide {
    Buy,
    Sell,
}

impl TradeSide {
    pub fn as_str(&self) -> &'static str {
        match self {
            TradeSide::Buy => "BUY",
            TradeSide::Sell => "SELL",
        }
    }
}

/// Result of a completed trade.
#[derive(Debug, Clone)]
pub struct TradeReceipt {
    pub side: TradeSide,
    pub currency: String,
    pub amount: Decimal,
    /// USD per unit of `currency`.
    pub rate: f64,
    pub old_balance: Decimal,
    pub new_balance: Decimal,
    /// Estimated cost (buy) or proceeds (sell) in USD.
    pub usd_value: Money,
    /// Rates were stale when the trade ran.
    pub stale: bool,
}

/// Successful login.
#[derive(Debug, Clone)]
pub struct LoginOutcome {
    pub session: Session,
    pub user: User,
    /// Callers should refresh rates when set.
    pub rates_stale: bool,
}

/// A valued portfolio.
#[derive(Debug, Clone)]
pub struct PortfolioView {
    pub user_id: u64,
    pub username: String,
    pub valuation: Valuation,
    pub stale: bool,
}

/// Entry point for every user-facing operation.
///
/// Operations that need a login take the caller's `Session` explicitly.
pub struct TradingDesk {
    users: UserRepository,
    portfolios: PortfolioRepository,
    sessions: SessionStore,
    rates: Arc<RatesEngine>,
    default_base: String,
}

impl TradingDesk {
    pub fn new(
        users: UserRepository,
        portfolios: PortfolioRepository,
        sessions: SessionStore,
        rates: Arc<RatesEngine>,
    ) -> Self {
        Self {
            users,
            portfolios,
            sessions,
            rates,
            default_base: USD.to_string(),
        }
    }

    /// Open the desk over the JSON files in the configured data directory.
    pub fn open(settings: &Settings, rates: Arc<RatesEngine>) -> Self {
        let mut desk = Self::new(
            UserRepository::new(Arc::new(JsonFileStore::new(settings.data_file(USERS_FILE)))),
            PortfolioRepository::new(Arc::new(JsonFileStore::new(
                settings.data_file(PORTFOLIOS_FILE),
            ))),
            SessionStore::new(Arc::new(JsonFileStore::new(settings.data_file(SESSION_FILE)))),
            rates,
        );
        desk.default_base = settings.default_base_currency.clone();
        desk
    }

    pub fn rates(&self) -> &RatesEngine {
        &self.rates
    }

    /// Session persisted by the last login or logout.
    pub fn current_session(&self) -> PortfolioResult<Session> {
        self.sessions.load()
    }

    /// Register a user and create an empty portfolio.
    #[instrument(skip(self, password))]
    pub fn register(&self, username: &str, password: &str) -> PortfolioResult<User> {
        audited("REGISTER", None, || {
            let username = validate_username(username)?;
            if self.users.find_by_username(&username)?.is_some() {
                return Err(PortfolioError::UserExists(username));
            }

            let user = User::new(self.users.next_id()?, &username, password)?;
            self.users.insert(user.clone())?;
            self.portfolios.save(&Portfolio::new(user.user_id))?;

            info!(user_id = user.user_id, username = %user.username, "User registered");
            Ok(user)
        })
    }

    /// Verify credentials and persist the new session.
    #[instrument(skip(self, password))]
    pub fn login(&self, username: &str, password: &str) -> PortfolioResult<LoginOutcome> {
        audited("LOGIN", None, || {
            let username = validate_username(username)?;
            let user = self
                .users
                .find_by_username(&username)?
                .ok_or_else(|| PortfolioError::UserNotFound(username.clone()))?;

            if !user.verify_password(password) {
                return Err(PortfolioError::InvalidPassword);
            }

            let session = Session::for_user(user.user_id);
            self.sessions.save(&session)?;

            info!(user_id = user.user_id, "User logged in");
            Ok(LoginOutcome {
                session,
                user,
                rates_stale: self.rates.is_stale(),
            })
        })
    }

    /// Clear the persisted session. Returns the id that was logged in.
    pub fn logout(&self, session: &Session) -> PortfolioResult<Option<u64>> {
        self.sessions.clear()?;
        if let Some(user_id) = session.user_id {
            info!(user_id, "User logged out");
        }
        Ok(session.user_id)
    }

    /// The logged-in user, if any.
    pub fn whoami(&self, session: &Session) -> PortfolioResult<Option<User>> {
        match session.user_id {
            Some(user_id) => self.users.find_by_id(user_id),
            None => Ok(None),
        }
    }

    /// Value the session user's portfolio in `base`, or the default base.
    #[instrument(skip(self))]
    pub fn show_portfolio(
        &self,
        session: &Session,
        base: Option<&str>,
    ) -> PortfolioResult<PortfolioView> {
        let user_id = session.require_user()?;
        let base = self.currency(base.unwrap_or(&self.default_base))?;
        let user = self
            .users
            .find_by_id(user_id)?
            .ok_or_else(|| PortfolioError::UserNotFound(user_id.to_string()))?;
        let portfolio = self.portfolios.get(user_id)?;

        let valuation = portfolio.valuate(&base, |from, to| self.rates.resolve(from, to));

        Ok(PortfolioView {
            user_id,
            username: user.username,
            valuation,
            stale: self.rates.is_stale(),
        })
    }

    /// Buy `amount` of `currency`.
    ///
    /// Credits the wallet, creating it if needed, and reports the estimated
    /// USD cost. The USD wallet is not debited.
    #[instrument(skip(self))]
    pub fn buy(
        &self,
        session: &Session,
        currency: &str,
        amount: Decimal,
    ) -> PortfolioResult<TradeReceipt> {
        let user_id = session.require_user()?;
        audited("BUY", Some(user_id), || {
            ensure_positive(amount)?;
            let code = self.currency(currency)?;
            let (rate, rate_dec) = self.usd_rate(&code)?;

            let mut portfolio = self.portfolios.get(user_id)?;
            let wallet = portfolio.wallet_or_create(&code);
            let old_balance = wallet.balance();
            let new_balance = wallet.deposit(amount)?;
            self.portfolios.save(&portfolio)?;

            let receipt = TradeReceipt {
                side: TradeSide::Buy,
                currency: code.to_string(),
                amount,
                rate,
                old_balance,
                new_balance,
                usd_value: Money::new(amount * rate_dec, CurrencyCode::usd()),
                stale: self.rates.is_stale(),
            };
            info!(currency = %receipt.currency, amount = %amount, usd_value = %receipt.usd_value, "Buy executed");
            Ok(receipt)
        })
    }

    /// Sell `amount` of `currency` and credit the USD proceeds.
    #[instrument(skip(self))]
    pub fn sell(
        &self,
        session: &Session,
        currency: &str,
        amount: Decimal,
    ) -> PortfolioResult<TradeReceipt> {
        let user_id = session.require_user()?;
        audited("SELL", Some(user_id), || {
            ensure_positive(amount)?;
            let code = self.currency(currency)?;

            let mut portfolio = self.portfolios.get(user_id)?;
            if !portfolio.has_currency(&code) {
                return Err(PortfolioError::WalletNotFound(code.to_string()));
            }
            let (rate, rate_dec) = self.usd_rate(&code)?;

            let wallet = portfolio.get_wallet_mut(&code)?;
            let old_balance = wallet.balance();
            let new_balance = wallet.withdraw(amount)?;

            let proceeds = Money::new(amount * rate_dec, CurrencyCode::usd());
            if !code.is_usd() && proceeds.is_positive() {
                portfolio.wallet_or_create(&proceeds.currency).deposit(proceeds.value)?;
            }
            self.portfolios.save(&portfolio)?;

            let receipt = TradeReceipt {
                side: TradeSide::Sell,
                currency: code.to_string(),
                amount,
                rate,
                old_balance,
                new_balance,
                usd_value: proceeds,
                stale: self.rates.is_stale(),
            };
            info!(currency = %receipt.currency, amount = %amount, usd_value = %receipt.usd_value, "Sell executed");
            Ok(receipt)
        })
    }

    /// Current rate between two currencies, with its inverse.
    pub fn get_rate(&self, from: &str, to: &str) -> PortfolioResult<RateQuote> {
        let quote = self.rates.quote(from, to)?;
        quote.ok_or_else(|| PortfolioError::RateUnavailable {
            from: from.trim().to_uppercase(),
            to: to.trim().to_uppercase(),
        })
    }

    fn currency(&self, code: &str) -> PortfolioResult<CurrencyCode> {
        Ok(self.rates.currencies().get_currency(code)?.code)
    }

    fn usd_rate(&self, code: &CurrencyCode) -> PortfolioResult<(f64, Decimal)> {
        let unavailable = || PortfolioError::RateUnavailable {
            from: code.to_string(),
            to: USD.to_string(),
        };
        let rate = self.rates.resolve(code.as_str(), USD).ok_or_else(unavailable)?;
        let rate_dec = Decimal::from_f64(rate).ok_or_else(unavailable)?;
        Ok((rate, rate_dec))
    }
}

/// Run a use case between START and SUCCESS/ERROR action log events.
fn audited<T>(
    action: &'static str,
    user_id: Option<u64>,
    op: impl FnOnce() -> PortfolioResult<T>,
) -> PortfolioResult<T> {
    info!(action, user_id = ?user_id, "START");
    let result = op();
    match &result {
        Ok(_) => info!(action, user_id = ?user_id, "SUCCESS"),
        Err(e) => error!(action, user_id = ?user_id, code = e.error_code(), error = %e, "ERROR"),
    }
    result
}
