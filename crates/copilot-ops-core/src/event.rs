// SPDX-License-Identifier: Apache-2.0

//! Authenticated webhook deliveries.
//!
//! Only the payload fields the bot reads are modelled; everything else in a
//! delivery is ignored during deserialization.

use serde::{Deserialize, Serialize};

use crate::model::{Account, Installation, Issue, RepoRef};

/// Event kinds the orchestrator acts on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    /// `installation.created`
    InstallationCreated,
    /// `installation.deleted`
    InstallationDeleted,
    /// `issues.opened`
    IssuesOpened,
    /// `issue_comment.created`
    IssueCommentCreated,
    /// Anything else; only counted.
    Other,
}

/// Repository as sent in webhook payloads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Repository {
    /// Repository name.
    pub name: String,
    /// Repository owner.
    pub owner: Account,
}

/// Issue comment as sent in webhook payloads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    /// Comment id.
    pub id: u64,
    /// Comment body.
    #[serde(default)]
    pub body: String,
    /// Comment author.
    pub user: Account,
}

/// Webhook payload fields the bot reads.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventPayload {
    /// Event action (`created`, `opened`, ...).
    #[serde(default)]
    pub action: Option<String>,
    /// Installation the delivery belongs to.
    #[serde(default)]
    pub installation: Option<Installation>,
    /// Repository the event happened in.
    #[serde(default)]
    pub repository: Option<Repository>,
    /// Issue (or pull request) the event concerns.
    #[serde(default)]
    pub issue: Option<Issue>,
    /// Comment for `issue_comment` events.
    #[serde(default)]
    pub comment: Option<Comment>,
    /// Account that triggered the event.
    #[serde(default)]
    pub sender: Option<Account>,
}

/// One webhook delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebhookEvent {
    /// Event name from `X-GitHub-Event` (`issues`, `installation`, ...).
    pub name: String,
    /// Delivery id from `X-GitHub-Delivery`.
    pub delivery_id: String,
    /// Decoded payload.
    pub payload: EventPayload,
}

impl WebhookEvent {
    /// Creates a delivery.
    pub fn new(
        name: impl Into<String>,
        delivery_id: impl Into<String>,
        payload: EventPayload,
    ) -> Self {
        Self {
            name: name.into(),
            delivery_id: delivery_id.into(),
            payload,
        }
    }

    /// Classifies the delivery by event name and action.
    #[must_use]
    pub fn kind(&self) -> EventKind {
        match (self.name.as_str(), self.payload.action.as_deref()) {
            ("installation", Some("created")) => EventKind::InstallationCreated,
            ("installation", Some("deleted")) => EventKind::InstallationDeleted,
            ("issues", Some("opened")) => EventKind::IssuesOpened,
            ("issue_comment", Some("created")) => EventKind::IssueCommentCreated,
            _ => EventKind::Other,
        }
    }

    /// `event.action` form used in logs.
    #[must_use]
    pub fn full_name(&self) -> String {
        match &self.payload.action {
            Some(action) => format!("{}.{action}", self.name),
            None => self.name.clone(),
        }
    }

    /// Installation id, if the delivery carries one.
    #[must_use]
    pub fn installation_id(&self) -> Option<u64> {
        self.payload.installation.as_ref().map(|i| i.id)
    }

    /// Repository coordinate, if the delivery carries a repository.
    #[must_use]
    pub fn repo(&self) -> Option<RepoRef> {
        self.payload
            .repository
            .as_ref()
            .map(|r| RepoRef::new(r.owner.login.clone(), r.name.clone()))
    }
}
