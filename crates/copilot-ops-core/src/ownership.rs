// SPDX-License-Identifier: Apache-2.0

//! Ownership markers.
//!
//! The bot claims pull requests with its label and issues with an "eyes"
//! reaction from one of its accounts. Neither marker is ever removed here.

use tracing::{debug, instrument};

use crate::github::IssueTracker;
use crate::model::{Issue, Reaction, RepoRef};

/// Reaction content the bot places on issues it claims.
pub const CLAIM_REACTION: &str = "eyes";

/// Accounts the bot acts as.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BotIdentities {
    primary: String,
    dev: String,
}

impl BotIdentities {
    /// Creates the identity pair from the production and development logins.
    pub fn new(primary: impl Into<String>, dev: impl Into<String>) -> Self {
        Self {
            primary: primary.into(),
            dev: dev.into(),
        }
    }

    /// Whether a login belongs to the bot.
    #[must_use]
    pub fn contains(&self, login: &str) -> bool {
        login == self.primary || login == self.dev
    }
}

/// Whether a pull request carries the bot label.
#[must_use]
pub fn is_bot_pr(issue: &Issue, label: &str) -> bool {
    issue.has_label(label)
}

/// Whether any of the reactions is a claim by the bot.
#[must_use]
pub fn has_claim_reaction(reactions: &[Reaction], identities: &BotIdentities) -> bool {
    reactions.iter().any(|r| {
        r.content == CLAIM_REACTION
            && r.user
                .as_ref()
                .is_some_and(|user| identities.contains(&user.login))
    })
}

/// Whether the bot already claimed an issue with its reaction.
///
/// # Errors
///
/// Returns an error if the reactions cannot be listed.
#[instrument(skip(tracker, identities), fields(repo = %repo, number = number))]
pub async fn issue_was_seen_by_bot(
    tracker: &dyn IssueTracker,
    repo: &RepoRef,
    number: u64,
    identities: &BotIdentities,
) -> crate::Result<bool> {
    let reactions = tracker.list_reactions(repo, number).await?;
    let seen = has_claim_reaction(&reactions, identities);
    debug!(reactions = reactions.len(), seen, "Checked claim reaction");
    Ok(seen)
}

/// Whether an issue or pull request belongs to the bot.
///
/// Pull requests are judged by their already-fetched labels; issues need one
/// reactions read.
///
/// # Errors
///
/// Returns an error if the reactions of an issue cannot be listed.
pub async fn is_ours(
    tracker: &dyn IssueTracker,
    repo: &RepoRef,
    issue: &Issue,
    label: &str,
    identities: &BotIdentities,
) -> crate::Result<bool> {
    if issue.is_pull_request() {
        return Ok(is_bot_pr(issue, label));
    }
    issue_was_seen_by_bot(tracker, repo, issue.number, identities).await
}
