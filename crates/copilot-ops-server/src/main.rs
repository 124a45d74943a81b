// SPDX-License-Identifier: Apache-2.0

//! Binary entry point for the copilot-ops-bot webhook server.

mod cli;
mod logging;

use anyhow::{Context, Result};
use clap::Parser;
use copilot_ops_core::load_config;
use tracing::debug;

use crate::cli::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init_logging();

    let mut config =
        load_config(cli.config.as_deref()).context("Failed to load configuration")?;
    debug!("Configuration loaded successfully");
    cli.apply(&mut config);

    copilot_ops_server::run(config).await
}
