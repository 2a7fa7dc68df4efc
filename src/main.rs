use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use xret::AppCommand;
use xret::core::log::init_logging;

#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to optional configuration file
    #[arg(short, long, global = true)]
    config_path: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Args)]
struct WindowArgs {
    /// First date to fetch (YYYY-MM-DD), defaults to 1095 days before the end
    #[arg(long)]
    start: Option<String>,

    /// Last date to fetch (YYYY-MM-DD), defaults to today
    #[arg(long)]
    end: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Create default configuration
    Setup,
    /// Display daily returns aligned across instruments
    Returns {
        /// Instruments to fetch, defaults to the configured symbols
        symbols: Vec<String>,
        #[command(flatten)]
        window: WindowArgs,
        /// Only show the most recent rows
        #[arg(long)]
        last: Option<usize>,
    },
    /// Display daily prices for one instrument
    Prices {
        symbol: String,
        #[command(flatten)]
        window: WindowArgs,
        /// Only show the most recent rows
        #[arg(long)]
        last: Option<usize>,
    },
    /// Fetch instruments and save them as a snapshot
    Save {
        /// Instruments to fetch, defaults to the configured symbols
        symbols: Vec<String>,
        #[command(flatten)]
        window: WindowArgs,
    },
    /// Load the saved snapshot and display its returns
    Load {
        /// Only show the most recent rows
        #[arg(long)]
        last: Option<usize>,
    },
}

impl From<Commands> for AppCommand {
    fn from(cmd: Commands) -> AppCommand {
        match cmd {
            Commands::Returns {
                symbols,
                window,
                last,
            } => AppCommand::Returns {
                symbols,
                start: window.start,
                end: window.end,
                last,
            },
            Commands::Prices {
                symbol,
                window,
                last,
            } => AppCommand::Prices {
                symbol,
                start: window.start,
                end: window.end,
                last,
            },
            Commands::Save { symbols, window } => AppCommand::Save {
                symbols,
                start: window.start,
                end: window.end,
            },
            Commands::Load { last } => AppCommand::Load { last },
            Commands::Setup => unreachable!("Setup command should be handled separately"),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let result = match cli.command {
        Some(Commands::Setup) => xret::cli::setup::setup(),
        Some(cmd) => xret::run_command(cmd.into(), cli.config_path.as_deref()).await,
        None => xret::run_command(AppCommand::demo(), cli.config_path.as_deref()).await,
    };

    if let Err(e) = &result {
        tracing::error!(error = %e, "Application failed");
    }
    result
}
