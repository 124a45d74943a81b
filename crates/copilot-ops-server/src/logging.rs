// SPDX-License-Identifier: Apache-2.0

//! Logging initialization for the webhook server.
//!
//! Uses `tracing` with `tracing-subscriber` for structured logging.
//! Log level can be controlled via the `RUST_LOG` environment variable.
//!
//! # Examples
//!
//! ```bash
//! # Default: info level for copilot-ops, warn for clients
//! copilot-ops-bot
//!
//! # Debug output for troubleshooting a delivery
//! RUST_LOG=copilot_ops=debug copilot-ops-bot
//! ```

use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, fmt};

const DEFAULT_FILTER: &str = "copilot_ops=info,octocrab=warn,kube=warn";

/// Initialize the logging subsystem.
///
/// `RUST_LOG` overrides the default filter.
pub fn init_logging() {
    let fmt_layer = fmt::layer().with_target(false).with_writer(std::io::stderr);

    let filter_layer = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(DEFAULT_FILTER))
        .expect("valid default filter directives");

    tracing_subscriber::registry()
        .with(filter_layer)
        .with(fmt_layer)
        .init();
}
