pub mod cli;
pub mod core;
pub mod providers;
pub mod store;

use crate::core::config::AppConfig;
use crate::providers::YahooHistoryProvider;
use anyhow::Result;
use tracing::{debug, info};

/// Commands the binary can run once configuration is resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppCommand {
    /// Fetch and print the returns matrix. Empty `symbols` means the
    /// configured set.
    Returns {
        symbols: Vec<String>,
        start: Option<String>,
        end: Option<String>,
        last: Option<usize>,
    },
    Prices {
        symbol: String,
        start: Option<String>,
        end: Option<String>,
        last: Option<usize>,
    },
    Save {
        symbols: Vec<String>,
        start: Option<String>,
        end: Option<String>,
    },
    Load {
        last: Option<usize>,
    },
}

impl AppCommand {
    /// Returns for the configured instruments over the default window.
    pub fn demo() -> Self {
        AppCommand::Returns {
            symbols: Vec::new(),
            start: None,
            end: None,
            last: None,
        }
    }
}

fn load_config(config_path: Option<&str>) -> Result<AppConfig> {
    let config = match config_path {
        Some(path) => AppConfig::load_from_path(path)?,
        None => AppConfig::load()?,
    };
    debug!("Loaded config: {config:#?}");
    Ok(config)
}

fn symbols_or_default(symbols: Vec<String>, config: &AppConfig) -> Vec<String> {
    if symbols.is_empty() {
        config.symbols.clone()
    } else {
        symbols
    }
}

pub async fn run_command(command: AppCommand, config_path: Option<&str>) -> Result<()> {
    info!("xret starting...");

    let config = load_config(config_path)?;
    let yahoo = config.yahoo();
    let provider = YahooHistoryProvider::new(&yahoo.base_url, config.yahoo_timeout())?;

    match command {
        AppCommand::Returns {
            symbols,
            start,
            end,
            last,
        } => {
            let window = config.window(start.as_deref(), end.as_deref())?;
            let symbols = symbols_or_default(symbols, &config);
            cli::returns::run(&provider, &symbols, &window, config.concurrent, last).await
        }
        AppCommand::Prices {
            symbol,
            start,
            end,
            last,
        } => {
            let window = config.window(start.as_deref(), end.as_deref())?;
            cli::prices::run(&provider, &symbol, &window, last).await
        }
        AppCommand::Save {
            symbols,
            start,
            end,
        } => {
            let window = config.window(start.as_deref(), end.as_deref())?;
            let symbols = symbols_or_default(symbols, &config);
            let persistence = store::from_config(&config);
            cli::snapshot::save(
                &provider,
                persistence.as_ref(),
                &symbols,
                &window,
                config.concurrent,
                &config.snapshot_path()?,
            )
            .await
        }
        AppCommand::Load { last } => {
            let persistence = store::from_config(&config);
            cli::snapshot::load(persistence.as_ref(), &config.snapshot_path()?, last)
                .await
                .map(|_| ())
        }
    }
}
