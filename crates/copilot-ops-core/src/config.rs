// SPDX-License-Identifier: Apache-2.0

//! Configuration management for copilot-ops-bot.
//!
//! Provides layered configuration from files and environment variables.
//!
//! # Configuration Sources (in priority order)
//!
//! 1. Environment variables (prefix: `COPILOT_OPS_`)
//! 2. Config file: `--config <path>` or `~/.config/copilot-ops-bot/config.toml`
//! 3. Built-in defaults
//!
//! # Examples
//!
//! ```bash
//! # Point the bot at a different Tekton task
//! COPILOT_OPS_BOT__TASK_REF=my-task copilot-ops-bot
//! ```

use std::path::{Path, PathBuf};

use config::{Config, Environment, File};
use serde::Deserialize;

use crate::error::BotError;
use crate::ownership::BotIdentities;
use crate::payload::DispatchSettings;

/// Application configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// GitHub App settings.
    pub github: GitHubConfig,
    /// Kubernetes settings.
    pub kubernetes: KubernetesConfig,
    /// Bot behaviour settings.
    pub bot: BotConfig,
    /// HTTP server settings.
    pub server: ServerConfig,
}

/// GitHub App settings.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct GitHubConfig {
    /// Numeric GitHub App id.
    pub app_id: Option<u64>,
    /// Path to the App's PEM-encoded private key.
    pub private_key_path: Option<PathBuf>,
    /// Shared secret used to sign webhook deliveries.
    pub webhook_secret: Option<String>,
    /// API request timeout in seconds.
    pub api_timeout_seconds: u64,
}

impl Default for GitHubConfig {
    fn default() -> Self {
        Self {
            app_id: None,
            private_key_path: None,
            webhook_secret: None,
            api_timeout_seconds: 10,
        }
    }
}

/// Kubernetes settings.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct KubernetesConfig {
    /// Namespace for secrets and task runs. Defaults to the client's namespace.
    pub namespace: Option<String>,
    /// Prefix of the per-installation token secret name.
    pub secret_prefix: String,
}

impl Default for KubernetesConfig {
    fn default() -> Self {
        Self {
            namespace: None,
            secret_prefix: "copilot-ops-bot".to_string(),
        }
    }
}

/// Bot behaviour settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BotConfig {
    /// Label marking pull requests opened by the bot.
    pub label: String,
    /// Comment command requesting a redo.
    pub reroll_command: String,
    /// Name of the Tekton task the task run references.
    pub task_ref: String,
    /// Prefix of the generated task run name.
    pub name_prefix: String,
    /// Login of the production App bot user.
    pub primary_identity: String,
    /// Login of the development App bot user.
    pub dev_identity: String,
    /// Issue form heading holding the user's instruction.
    pub instruction_field: String,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            label: "copilot-ops-bot".to_string(),
            reroll_command: "/reroll".to_string(),
            task_ref: "copilot-ops-task".to_string(),
            name_prefix: "copilot-ops-bot".to_string(),
            primary_identity: "copilot-ops-bot[bot]".to_string(),
            dev_identity: "copilot-ops-bot-dev[bot]".to_string(),
            instruction_field: "Bot Input".to_string(),
        }
    }
}

impl BotConfig {
    /// Identities whose "eyes" reaction claims an issue.
    #[must_use]
    pub fn identities(&self) -> BotIdentities {
        BotIdentities::new(&self.primary_identity, &self.dev_identity)
    }

    /// Settings consumed by the dispatch payload builder.
    #[must_use]
    pub fn dispatch_settings(&self) -> DispatchSettings {
        DispatchSettings {
            name_prefix: self.name_prefix.clone(),
            task_ref: self.task_ref.clone(),
            pr_flag: self.label.clone(),
        }
    }
}

/// HTTP server settings.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address.
    pub host: String,
    /// Bind port.
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
        }
    }
}

/// Returns the copilot-ops-bot configuration directory.
///
/// Respects the `XDG_CONFIG_HOME` environment variable if set,
/// otherwise defaults to the platform config directory.
#[must_use]
pub fn config_dir() -> PathBuf {
    if let Ok(xdg_config) = std::env::var("XDG_CONFIG_HOME")
        && !xdg_config.is_empty()
    {
        return PathBuf::from(xdg_config).join("copilot-ops-bot");
    }
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("/etc"))
        .join("copilot-ops-bot")
}

/// Returns the path to the default configuration file.
#[must_use]
pub fn config_file_path() -> PathBuf {
    config_dir().join("config.toml")
}

/// Load application configuration.
///
/// Loads from the given config file (or the default path when `None`, which
/// may be absent) and environment variables. Environment variables use the
/// prefix `COPILOT_OPS_` and double underscore for nested keys
/// (e.g., `COPILOT_OPS_GITHUB__APP_ID`).
///
/// # Errors
///
/// Returns `BotError::Config` if an explicit config file is missing or any
/// config file is invalid.
pub fn load_config(path: Option<&Path>) -> Result<AppConfig, BotError> {
    let file = match path {
        Some(path) => File::from(path).required(true),
        None => File::from(config_file_path()).required(false),
    };

    let config = Config::builder()
        .add_source(file)
        .add_source(
            Environment::with_prefix("COPILOT_OPS")
                .separator("__")
                .try_parsing(true),
        )
        .build()?;

    let app_config: AppConfig = config.try_deserialize()?;

    Ok(app_config)
}
