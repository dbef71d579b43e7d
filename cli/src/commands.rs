//! Command dispatch.

use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context};
use tracing::{info, warn};

use valutatrade_common::{time::constants, CurrencyRegistry};
use valutatrade_portfolio::TradingDesk;
use valutatrade_rates::{RatesEngine, RatesQuery};

use crate::output;
use crate::Command;

/// Wires the trading desk and rates engine to CLI commands.
pub struct App {
    desk: TradingDesk,
    engine: Arc<RatesEngine>,
    registry: Arc<CurrencyRegistry>,
}

impl App {
    pub fn new(desk: TradingDesk, engine: Arc<RatesEngine>, registry: Arc<CurrencyRegistry>) -> Self {
        Self {
            desk,
            engine,
            registry,
        }
    }

    pub async fn execute(&self, command: Command) -> anyhow::Result<ExitCode> {
        let session = self.desk.current_session()?;

        match command {
            Command::Register { username, password } => {
                let user = self.desk.register(&username, &password)?;
                println!(
                    "Registered user '{}' (id={}). Log in with: login --username {} --password ****",
                    user.username, user.user_id, user.username
                );
            }

            Command::Login { username, password } => {
                let outcome = self.desk.login(&username, &password)?;
                println!("Logged in as '{}'", outcome.user.username);

                if outcome.rates_stale {
                    info!("Rates are stale, refreshing after login");
                    match self.engine.refresh(None).await {
                        Ok(report) => println!("{}", output::update_summary(&report)),
                        Err(e) => {
                            warn!(error = %e, "Refresh after login failed");
                            eprintln!("{}", output::stale_warning(self.engine.last_refresh()));
                        }
                    }
                }
            }

            Command::Logout => match self.desk.logout(&session)? {
                Some(_) => println!("Logged out"),
                None => println!("Not logged in"),
            },

            Command::Whoami => match self.desk.whoami(&session)? {
                Some(user) => println!("{}", user.info()),
                None => println!("Not logged in"),
            },

            Command::ShowPortfolio { base } => {
                let view = self.desk.show_portfolio(&session, base.as_deref())?;
                println!("{}", output::portfolio(&view));
                if view.stale {
                    eprintln!("{}", output::stale_warning(self.engine.last_refresh()));
                }
            }

            Command::Buy { currency, amount } => {
                let receipt = self.desk.buy(&session, &currency, amount)?;
                println!("{}", output::trade(&receipt));
                if receipt.stale {
                    eprintln!("{}", output::stale_warning(self.engine.last_refresh()));
                }
            }

            Command::Sell { currency, amount } => {
                let receipt = self.desk.sell(&session, &currency, amount)?;
                println!("{}", output::trade(&receipt));
                if receipt.stale {
                    eprintln!("{}", output::stale_warning(self.engine.last_refresh()));
                }
            }

            Command::GetRate { from, to } => {
                let quote = self.desk.get_rate(&from, &to)?;
                println!("{}", output::quote(&quote));
                if quote.stale {
                    eprintln!("{}", output::stale_warning(quote.last_refresh));
                }
            }

            Command::UpdateRates { source } => {
                return self.update_rates(source.as_deref()).await;
            }

            Command::ShowRates {
                currency,
                top,
                base,
            } => {
                let query = RatesQuery {
                    currency,
                    top,
                    base,
                };
                match self.engine.list_rates(&query)? {
                    Some(listing) => {
                        println!("{}", output::rate_listing(&listing));
                        if listing.stale {
                            eprintln!("{}", output::stale_warning(listing.last_refresh));
                        }
                    }
                    None => println!("Local rate cache is empty. Run 'update-rates' to load data."),
                }
            }

            Command::Schedule { interval } => self.schedule(interval).await?,

            Command::Currencies { kind } => {
                let currencies = match kind.as_deref() {
                    Some(kind) => self.registry.by_kind(&kind.trim().to_lowercase()),
                    None => self.registry.all(),
                };
                if currencies.is_empty() {
                    bail!("no currencies of kind '{}'", kind.unwrap_or_default());
                }
                for currency in currencies {
                    println!("{}", currency.display_info());
                }
            }
        }

        Ok(ExitCode::SUCCESS)
    }

    async fn update_rates(&self, source: Option<&str>) -> anyhow::Result<ExitCode> {
        println!("Updating rates...");
        match self.engine.refresh(source).await {
            Ok(report) => {
                println!("{}", output::update_summary(&report));
                for (name, reason) in &report.failures {
                    println!("  {} failed: {}", name, reason);
                }
                Ok(ExitCode::SUCCESS)
            }
            Err(e) => {
                eprintln!("Update failed: {}", e);
                Ok(ExitCode::FAILURE)
            }
        }
    }

    async fn schedule(&self, interval: Option<u64>) -> anyhow::Result<()> {
        let interval = interval
            .map(Duration::from_secs)
            .unwrap_or(self.engine.config().update_interval);
        if interval < constants::min_update_interval() {
            bail!(
                "interval must be at least {} seconds",
                constants::min_update_interval().as_secs()
            );
        }

        let scheduler = self.engine.scheduler_every(interval);
        scheduler.start();
        println!(
            "Updating rates every {} seconds. Press Ctrl-C to stop.",
            interval.as_secs()
        );

        tokio::signal::ctrl_c()
            .await
            .context("cannot listen for Ctrl-C")?;

        info!("Shutdown signal received");
        scheduler.stop().await;
        println!("Scheduler stopped after {} update(s)", scheduler.runs());
        Ok(())
    }
}
