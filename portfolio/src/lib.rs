//! ValutaTrade Portfolio
//!
//! Users, wallets and portfolios persisted as JSON, plus the trading use
//! cases that value and move balances using cached rates.

pub mod error;
pub mod portfolio;
pub mod repository;
pub mod service;
pub mod session;
pub mod user;
pub mod wallet;

pub use error::{PortfolioError, PortfolioResult};
pub use portfolio::{Portfolio, Valuation, WalletValue};
pub use repository::{PortfolioRepository, UserRepository};
pub use service::{LoginOutcome, PortfolioView, TradeReceipt, TradeSide, TradingDesk};
pub use session::{Session, SessionStore};
pub use user::{User, MIN_PASSWORD_LEN};
pub use wallet::Wallet;
