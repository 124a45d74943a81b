// SPDX-License-Identifier: Apache-2.0

//! Reroll intent reconstruction.
//!
//! A reroll may be requested on the original issue or on a pull request the
//! bot opened for it. Either way the instruction is recovered from the
//! original issue, never from whatever changed since.

use std::borrow::Cow;
use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, instrument};

use crate::extract::{extract, strip_prompt};
use crate::form::FormParser;
use crate::github::IssueTracker;
use crate::model::{Issue, RepoRef};

/// Returned by [`issue_number_from_pr`] when the body links no issue.
pub const NO_LINKED_ISSUE: i64 = -1;

/// Closing keywords GitHub recognises when linking a pull request to an issue.
static CLOSING_KEYWORD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(close|closes|closed|fix|fixes|fixed|resolve|resolves|resolved)\s+#(\d+)")
        .expect("closing keyword pattern is valid")
});

/// Back-reference the bot writes into the pull requests it opens.
static FIXES_REFERENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Fixes #(\d+)").expect("fixes pattern is valid"));

/// A body consisting of nothing but the back-reference.
static BARE_FIXES_REFERENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*Fixes #(\d+)\s*$").expect("bare fixes pattern is valid")
});

/// Finds the first issue a pull request body closes via a closing keyword.
#[must_use]
pub fn find_linked_issue_number(body: &str) -> Option<u64> {
    CLOSING_KEYWORD
        .captures(body)
        .and_then(|caps| caps.get(2))
        .and_then(|m| m.as_str().parse().ok())
}

/// Parses the bot's `Fixes #N` back-reference, or [`NO_LINKED_ISSUE`].
#[must_use]
pub fn issue_number_from_pr(body: &str) -> i64 {
    FIXES_REFERENCE
        .captures(body)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
        .unwrap_or(NO_LINKED_ISSUE)
}

/// Determines which issue holds the original instruction.
///
/// Pull requests point at it through their body: the bot's own back-reference
/// first, any closing keyword otherwise. An issue whose whole body is the
/// back-reference points at that issue; any other issue is its own target,
/// whatever its instruction text mentions. `None` means no target could be
/// found.
#[must_use]
pub fn target_issue_number(issue: &Issue) -> Option<u64> {
    let body = issue.body.as_deref();

    if issue.is_pull_request() {
        let body = body?;
        return match u64::try_from(issue_number_from_pr(body)) {
            Ok(number) => Some(number),
            Err(_) => find_linked_issue_number(body),
        };
    }

    let linked = body
        .and_then(|b| BARE_FIXES_REFERENCE.captures(b))
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok());
    Some(linked.unwrap_or(issue.number))
}

/// Returns the issue holding the original instruction.
///
/// The target issue is fetched when it differs from `issue`; otherwise
/// `issue` itself is returned.
///
/// # Errors
///
/// Returns an error if the target issue cannot be fetched.
#[instrument(skip(tracker, issue), fields(repo = %repo, number = issue.number))]
pub async fn original_issue<'a>(
    tracker: &dyn IssueTracker,
    repo: &RepoRef,
    issue: &'a Issue,
    target: u64,
) -> crate::Result<Cow<'a, Issue>> {
    if target == issue.number {
        return Ok(Cow::Borrowed(issue));
    }
    let original = tracker.get_issue(repo, target).await?;
    debug!(author = %original.user.login, "Fetched linked issue");
    Ok(Cow::Owned(original))
}

/// Recovers the instruction from the original issue.
///
/// A linked issue has its form header stripped; the entity the reroll was
/// invoked on goes back through form extraction. `None` means no
/// instruction could be recovered.
#[must_use]
pub fn original_input(
    parser: &dyn FormParser,
    repo: &RepoRef,
    issue: &Issue,
    original: &Issue,
) -> Option<String> {
    if original.number != issue.number {
        return original
            .body
            .as_deref()
            .map(strip_prompt)
            .filter(|s| !s.trim().is_empty());
    }

    extract(issue.body.as_deref(), parser, repo, issue.number).map(|r| r.user_input)
}

/// Recovers the original instruction for a reroll.
///
/// Combines [`original_issue`] and [`original_input`].
///
/// # Errors
///
/// Returns an error if the target issue cannot be fetched.
pub async fn resolve_original_input(
    tracker: &dyn IssueTracker,
    parser: &dyn FormParser,
    repo: &RepoRef,
    issue: &Issue,
    target: u64,
) -> crate::Result<Option<String>> {
    let original = original_issue(tracker, repo, issue, target).await?;
    Ok(original_input(parser, repo, issue, &original))
}
