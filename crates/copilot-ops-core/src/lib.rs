// SPDX-License-Identifier: Apache-2.0

#![warn(missing_docs)]

//! # copilot-ops core
//!
//! Request resolution and dispatch orchestration for copilot-ops-bot, a
//! GitHub App that turns issue-form instructions into Tekton task runs.
//!
//! This crate provides:
//! - Instruction extraction from issue forms and reroll comments
//! - Ownership checks (bot label on pull requests, "eyes" reaction on issues)
//! - Reroll intent reconstruction through pull request back-references
//! - Task run payload construction
//! - Counted control-plane operations and the webhook event orchestrator
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use copilot_ops_core::{
//!     BotSettings, GitHubApp, KubeCredentialStore, KubeTaskClient, MarkdownFormParser, Metrics,
//!     Orchestrator, load_config,
//! };
//!
//! # async fn example() -> anyhow::Result<()> {
//! let config = load_config(None)?;
//! let app = Arc::new(GitHubApp::from_config(&config.github)?);
//! let client = kube::Client::try_default().await?;
//! let namespace = client.default_namespace().to_string();
//!
//! let orchestrator = Orchestrator::builder()
//!     .settings(BotSettings::new(&config.bot, &config.kubernetes.secret_prefix))
//!     .parser(Arc::new(MarkdownFormParser::new(&config.bot.instruction_field)))
//!     .trackers(app.clone())
//!     .credentials(Arc::new(KubeCredentialStore::new(
//!         client.clone(),
//!         &namespace,
//!         &config.kubernetes.secret_prefix,
//!         app,
//!     )))
//!     .tasks(Arc::new(KubeTaskClient::new(client, &namespace)))
//!     .metrics(Arc::new(Metrics::new()))
//!     .build();
//! # let _ = orchestrator;
//! # Ok(())
//! # }
//! ```
//!
//! ## Modules
//!
//! - [`extract`] - Instruction extraction
//! - [`ownership`] - Ownership markers
//! - [`intent`] - Reroll target and original instruction
//! - [`payload`] - Task run payload builder
//! - [`executor`] - Counted control-plane operations
//! - [`orchestrator`] - Webhook event handling
//! - [`github`] - GitHub App and issue tracker
//! - [`k8s`] - Token secrets and task runs

// ============================================================================
// Error Handling
// ============================================================================

pub use error::BotError;

/// Convenience Result type for copilot-ops operations.
///
/// This is equivalent to `std::result::Result<T, BotError>`.
pub type Result<T> = std::result::Result<T, BotError>;

// ============================================================================
// Configuration
// ============================================================================

pub use config::{
    AppConfig, BotConfig, GitHubConfig, KubernetesConfig, ServerConfig, config_dir,
    config_file_path, load_config,
};

// ============================================================================
// Issue Tracker Types
// ============================================================================

pub use event::{EventKind, EventPayload, WebhookEvent};
pub use model::{Account, Issue, IssueNumber, Label, Reaction, RepoRef, WorkRequest};

// ============================================================================
// Request Resolution
// ============================================================================

pub use extract::{extract, is_reroll, reroll_user_input, strip_prompt};
pub use form::{FieldValue, FormParser, IssueForm, MarkdownFormParser};
pub use intent::{
    find_linked_issue_number, issue_number_from_pr, original_input, original_issue,
    resolve_original_input, target_issue_number,
};
pub use ownership::{BotIdentities, is_ours};

// ============================================================================
// Dispatch
// ============================================================================

pub use executor::{OperationLabels, OperationMethod, OperationStatus, run_with_metrics};
pub use metrics::{Counter, Metrics};
pub use orchestrator::{BotSettings, Orchestrator, Outcome, SkipReason};
pub use payload::{DispatchPayload, DispatchSettings, branch_name};

// ============================================================================
// Collaborators
// ============================================================================

pub use github::{GitHubApp, IssueTracker, OctocrabTracker, TokenMinter, TrackerFactory};
pub use k8s::{
    CredentialStore, InstallationRef, KubeCredentialStore, KubeTaskClient, TaskClient,
    secret_name_for,
};

pub mod config;
pub mod error;
pub mod event;
pub mod executor;
pub mod extract;
pub mod form;
pub mod github;
pub mod intent;
pub mod k8s;
pub mod metrics;
pub mod model;
pub mod orchestrator;
pub mod ownership;
pub mod payload;
pub mod retry;
