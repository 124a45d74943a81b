// SPDX-License-Identifier: Apache-2.0

//! Command-line interface definition for the webhook server.

use std::path::PathBuf;

use clap::Parser;
use copilot_ops_core::AppConfig;

/// GitHub App that turns issue-form instructions into Tekton task runs.
#[derive(Parser)]
#[command(name = "copilot-ops-bot", version, about)]
pub struct Cli {
    /// Configuration file (defaults to the user config directory)
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Address to bind
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind
    #[arg(long, short)]
    pub port: Option<u16>,
}

impl Cli {
    /// Applies command-line overrides on top of the loaded configuration.
    pub fn apply(&self, config: &mut AppConfig) {
        if let Some(host) = &self.host {
            config.server.host.clone_from(host);
        }
        if let Some(port) = self.port {
            config.server.port = port;
        }
    }
}
