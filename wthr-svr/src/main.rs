//! Binary crate for the `trmnl-wthr-svr` command-line tool.
//!
//! This crate focuses on:
//! - Parsing CLI arguments and environment variables
//! - Interactive configuration
//! - Logging setup and signal handling around the core poll loop

use anyhow::Result;
use clap::Parser;

mod cli;
mod shutdown;

fn init_tracing(debug: bool) -> Result<()> {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let default_filter = if debug {
        "info,trmnl_wthr_core=debug,trmnl_wthr_svr=debug"
    } else {
        "info"
    };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| default_filter.into());
    let fmt_layer = tracing_subscriber::fmt::layer().with_target(true);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()?;

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cmd = cli::Cli::parse();
    init_tracing(cmd.debug)?;
    cmd.run().await
}
