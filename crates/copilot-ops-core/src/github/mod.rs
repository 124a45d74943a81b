// SPDX-License-Identifier: Apache-2.0

//! GitHub integration module.
//!
//! Defines the issue-tracker seam the resolvers depend on and its
//! octocrab-backed implementation authenticated as a GitHub App installation.

use std::sync::Arc;

use async_trait::async_trait;
use secrecy::SecretString;

use crate::model::{Issue, Reaction, RepoRef};

pub mod app;
pub mod tracker;

pub use app::GitHubApp;
pub use tracker::OctocrabTracker;

/// REST-style issue tracker operations used while resolving an event.
#[async_trait]
pub trait IssueTracker: Send + Sync {
    /// Fetches an issue (or pull request) by number.
    async fn get_issue(&self, repo: &RepoRef, number: u64) -> crate::Result<Issue>;

    /// Lists the reactions placed on an issue.
    async fn list_reactions(&self, repo: &RepoRef, number: u64) -> crate::Result<Vec<Reaction>>;
}

/// Produces an issue tracker authenticated for one installation.
#[async_trait]
pub trait TrackerFactory: Send + Sync {
    /// Returns a tracker acting as the given installation.
    async fn for_installation(&self, installation_id: u64) -> crate::Result<Arc<dyn IssueTracker>>;
}

/// Mints installation access tokens.
#[async_trait]
pub trait TokenMinter: Send + Sync {
    /// Returns a fresh access token for the installation.
    async fn mint(&self, installation_id: u64) -> crate::Result<SecretString>;
}
