// SPDX-License-Identifier: Apache-2.0

//! Error types for copilot-ops-bot.
//!
//! Uses `thiserror` for deriving `std::error::Error` implementations.
//! The server binary uses `anyhow::Result` for top-level error handling.

use thiserror::Error;

/// Errors that can occur while resolving and dispatching a work request.
#[derive(Error, Debug)]
pub enum BotError {
    /// GitHub API error from octocrab.
    #[error("GitHub API error: {message}")]
    GitHub {
        /// Error message.
        message: String,
    },

    /// Kubernetes API error from kube.
    #[error("Kubernetes API error: {message}")]
    Kubernetes {
        /// Error message.
        message: String,
    },

    /// GitHub App credentials are not configured.
    #[error(
        "GitHub App credentials missing - set COPILOT_OPS_GITHUB__APP_ID and COPILOT_OPS_GITHUB__PRIVATE_KEY_PATH"
    )]
    NotAuthenticated,

    /// Configuration file error.
    #[error("Configuration error: {message}")]
    Config {
        /// Error message.
        message: String,
    },

    /// Issue body could not be parsed as an issue form.
    #[error("Issue form parse error: {message}")]
    FormParse {
        /// Error message.
        message: String,
    },

    /// A dispatch payload was requested with inputs that violate its contract.
    #[error("Invalid dispatch payload: {message}")]
    Construction {
        /// Error message.
        message: String,
    },

    /// Payload (de)serialization failure.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<octocrab::Error> for BotError {
    fn from(err: octocrab::Error) -> Self {
        BotError::GitHub {
            message: err.to_string(),
        }
    }
}

impl From<kube::Error> for BotError {
    fn from(err: kube::Error) -> Self {
        BotError::Kubernetes {
            message: err.to_string(),
        }
    }
}

impl From<config::ConfigError> for BotError {
    fn from(err: config::ConfigError) -> Self {
        BotError::Config {
            message: err.to_string(),
        }
    }
}

impl From<jsonwebtoken::errors::Error> for BotError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        BotError::Config {
            message: format!("invalid GitHub App private key: {err}"),
        }
    }
}
