// SPDX-License-Identifier: Apache-2.0

//! Issue-tracker data shared by webhook payloads and REST responses.
//!
//! GitHub serves the same JSON shapes for issues, labels, users and reactions
//! in both webhook deliveries and REST responses, so one set of types backs
//! both.

use std::fmt;

use bon::Builder;
use serde::{Deserialize, Serialize};

/// A repository coordinate (`owner/name`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoRef {
    /// Repository owner login.
    pub owner: String,
    /// Repository name.
    pub name: String,
}

impl RepoRef {
    /// Creates a repository coordinate.
    pub fn new(owner: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for RepoRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

/// A GitHub user or bot account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    /// Numeric account id.
    pub id: u64,
    /// Login name.
    pub login: String,
    /// Account type ("User", "Bot", "Organization").
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
}

impl Account {
    /// Whether GitHub reports this account as a bot.
    #[must_use]
    pub fn is_bot(&self) -> bool {
        self.kind.as_deref() == Some("Bot")
    }
}

/// An issue label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Label {
    /// Label name.
    pub name: String,
}

/// Marker present on issues that are really pull requests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullRequestLink {
    /// API URL of the pull request.
    #[serde(default)]
    pub url: Option<String>,
}

/// An issue or pull request as GitHub presents it on the issues API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Issue {
    /// Issue number.
    pub number: u64,
    /// Issue body (markdown). GitHub sends `null` for empty bodies.
    #[serde(default)]
    pub body: Option<String>,
    /// Issue author.
    pub user: Account,
    /// Labels currently attached.
    #[serde(default)]
    pub labels: Vec<Label>,
    /// Present when the issue is a pull request.
    #[serde(default)]
    pub pull_request: Option<PullRequestLink>,
}

impl Issue {
    /// Whether this entity is a pull request.
    #[must_use]
    pub fn is_pull_request(&self) -> bool {
        self.pull_request.is_some()
    }

    /// Whether a label with the given name is attached.
    #[must_use]
    pub fn has_label(&self, name: &str) -> bool {
        self.labels.iter().any(|l| l.name == name)
    }
}

/// A reaction on an issue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reaction {
    /// Reaction content ("eyes", "+1", ...).
    pub content: String,
    /// Reacting account. GitHub may omit it for deleted users.
    #[serde(default)]
    pub user: Option<Account>,
}

/// An installation of the GitHub App.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Installation {
    /// Installation id.
    pub id: u64,
    /// Account the App is installed on.
    #[serde(default)]
    pub account: Option<Account>,
}

/// An issue number as delivered to the payload builder.
///
/// Rerolls on pull requests carry the linked issue number as text, fresh
/// issues carry the numeric value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum IssueNumber {
    /// Numeric issue number.
    Number(u64),
    /// Issue number rendered as text.
    Text(String),
}

impl From<u64> for IssueNumber {
    fn from(n: u64) -> Self {
        IssueNumber::Number(n)
    }
}

impl From<String> for IssueNumber {
    fn from(s: String) -> Self {
        IssueNumber::Text(s)
    }
}

impl fmt::Display for IssueNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IssueNumber::Number(n) => write!(f, "{n}"),
            IssueNumber::Text(s) => f.write_str(s),
        }
    }
}

/// A fully resolved request for automation on one issue.
///
/// Only built once the user's instruction is known; a missing instruction
/// means the event is not ours and no request exists.
#[derive(Debug, Clone, PartialEq, Eq, Builder)]
#[builder(on(String, into))]
pub struct WorkRequest {
    /// Repository owner.
    pub owner: String,
    /// Repository name.
    pub repo: String,
    /// Number of the issue the work is for.
    #[builder(into)]
    pub issue_number: IssueNumber,
    /// Free-text instruction with form boilerplate removed.
    pub user_input: String,
}
