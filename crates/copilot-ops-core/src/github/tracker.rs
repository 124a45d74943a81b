// SPDX-License-Identifier: Apache-2.0

//! Issue tracker backed by an installation-scoped octocrab client.
//!
//! Responses are decoded straight into the crate's model types, which share
//! their JSON shape with webhook payloads.

use async_trait::async_trait;
use backon::Retryable;
use octocrab::Octocrab;
use serde_json::json;
use tracing::{debug, instrument, warn};

use super::IssueTracker;
use crate::model::{Issue, Reaction, RepoRef};
use crate::retry::{is_retryable_octocrab, retry_backoff};

/// Issue tracker acting as one GitHub App installation.
#[derive(Debug, Clone)]
pub struct OctocrabTracker {
    client: Octocrab,
}

impl OctocrabTracker {
    /// Wraps an authenticated octocrab client.
    #[must_use]
    pub fn new(client: Octocrab) -> Self {
        Self { client }
    }
}

#[async_trait]
impl IssueTracker for OctocrabTracker {
    #[instrument(skip(self), fields(repo = %repo, number = number))]
    async fn get_issue(&self, repo: &RepoRef, number: u64) -> crate::Result<Issue> {
        debug!("Fetching issue");
        let route = format!("/repos/{}/{}/issues/{number}", repo.owner, repo.name);

        let issue: Issue = (|| async {
            self.client
                .get::<Issue, _, _>(&route, None::<&()>)
                .await
        })
        .retry(retry_backoff())
        .when(is_retryable_octocrab)
        .notify(|err, dur| {
            warn!(error = %err, retry_after = ?dur, "Retrying get_issue");
        })
        .await?;

        Ok(issue)
    }

    #[instrument(skip(self), fields(repo = %repo, number = number))]
    async fn list_reactions(&self, repo: &RepoRef, number: u64) -> crate::Result<Vec<Reaction>> {
        let route = format!(
            "/repos/{}/{}/issues/{number}/reactions",
            repo.owner, repo.name
        );

        let reactions: Vec<Reaction> = (|| async {
            self.client
                .get::<Vec<Reaction>, _, _>(&route, Some(&json!({ "per_page": 100 })))
                .await
        })
        .retry(retry_backoff())
        .when(is_retryable_octocrab)
        .notify(|err, dur| {
            warn!(error = %err, retry_after = ?dur, "Retrying list_reactions");
        })
        .await?;

        debug!(count = reactions.len(), "Fetched reactions");
        Ok(reactions)
    }
}
