//! Stderr logging for the CLI.

use tracing::level_filters::LevelFilter;
use tracing_subscriber::{EnvFilter, filter::Targets, fmt, prelude::*};

const CRATE_TARGET: &str = "xret";

/// Only this crate's events pass. Per-instrument fetch failures are logged at
/// warn, so they stay visible without `--verbose`.
fn app_level(verbose: bool) -> LevelFilter {
    if verbose {
        LevelFilter::DEBUG
    } else {
        LevelFilter::WARN
    }
}

fn app_targets(verbose: bool) -> Targets {
    Targets::new().with_target(CRATE_TARGET, app_level(verbose))
}

pub fn init_logging(verbose: bool) {
    // RUST_LOG can narrow further, never widen past the crate target
    let env_filter = EnvFilter::builder()
        .with_default_directive(app_level(verbose).into())
        .from_env_lossy();

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .pretty()
                .without_time()
                .with_writer(std::io::stderr),
        )
        .with(app_targets(verbose))
        .with(env_filter)
        .init();
}
