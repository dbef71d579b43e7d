//! ValutaTrade CLI
//!
//! Register, log in, trade currencies and inspect cached exchange rates.

use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use rust_decimal::Decimal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use valutatrade_common::{CurrencyRegistry, Settings};
use valutatrade_portfolio::TradingDesk;
use valutatrade_rates::{RatesConfig, RatesEngine};

mod commands;
mod output;

use commands::App;

/// ValutaTrade command-line interface
#[derive(Parser, Debug)]
#[command(name = "valutatrade")]
#[command(about = "Currency portfolio tracker with cached exchange rates")]
struct Cli {
    /// Emit logs as JSON
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Create a new user
    Register {
        #[arg(long)]
        username: String,
        #[arg(long)]
        password: String,
    },
    /// Log in and remember the session
    Login {
        #[arg(long)]
        username: String,
        #[arg(long)]
        password: String,
    },
    /// Forget the current session
    Logout,
    /// Show the logged-in user
    Whoami,
    /// Show wallets and their value in a base currency
    ShowPortfolio {
        #[arg(long)]
        base: Option<String>,
    },
    /// Buy a currency
    Buy {
        #[arg(long)]
        currency: String,
        #[arg(long)]
        amount: Decimal,
    },
    /// Sell a currency for USD
    Sell {
        #[arg(long)]
        currency: String,
        #[arg(long)]
        amount: Decimal,
    },
    /// Show the rate between two currencies
    GetRate {
        #[arg(long)]
        from: String,
        #[arg(long)]
        to: String,
    },
    /// Fetch fresh rates from all sources, or one named source
    UpdateRates {
        source: Option<String>,
    },
    /// List cached rates
    ShowRates {
        /// Keep pairs containing this code
        #[arg(long)]
        currency: Option<String>,
        /// Show the N most valuable crypto currencies
        #[arg(long)]
        top: Option<usize>,
        /// Express rates against this currency
        #[arg(long)]
        base: Option<String>,
    },
    /// Refresh rates periodically until Ctrl-C
    Schedule {
        /// Seconds between updates
        #[arg(long)]
        interval: Option<u64>,
    },
    /// List supported currencies
    Currencies {
        /// fiat or crypto
        #[arg(long)]
        kind: Option<String>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let dotenv = dotenvy::dotenv();
    let cli = Cli::parse();
    let settings = Settings::from_env();

    init_tracing(&settings, cli.log_json);

    match dotenv {
        Ok(path) => info!(path = %path.display(), "Loaded environment file"),
        Err(e) if e.not_found() => {}
        Err(e) => warn!(error = %e, "Cannot read environment file"),
    }

    match run(cli.command, settings).await {
        Ok(code) => code,
        Err(e) => {
            error!(error = %e, "Command failed");
            eprintln!("Error: {}", output::describe_error(&e));
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(settings: &Settings, json: bool) {
    let filter = tracing_subscriber::EnvFilter::new(
        std::env::var("RUST_LOG").unwrap_or_else(|_| settings.log_level.clone()),
    );
    let registry = tracing_subscriber::registry().with(filter);

    if json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

async fn run(command: Command, settings: Settings) -> anyhow::Result<ExitCode> {
    settings.validate()?;

    let registry = Arc::new(CurrencyRegistry::default());
    let engine = Arc::new(RatesEngine::from_config(
        RatesConfig::from_settings(&settings),
        registry.clone(),
    )?);
    let desk = TradingDesk::open(&settings, engine.clone());

    App::new(desk, engine, registry).execute(command).await
}
