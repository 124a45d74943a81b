// SPDX-License-Identifier: Apache-2.0

//! Work request extraction from issue and comment bodies.

use tracing::{debug, warn};

use crate::form::{FieldValue, FormParser};
use crate::model::{IssueNumber, RepoRef, WorkRequest};

/// Number of leading issue body lines taken by the form heading and its
/// trailing blank line.
pub const HEADER_LINES: usize = 2;

/// Extracts a work request from an issue body.
///
/// Returns `None` when the body is absent, the parser fails, or the form has
/// no usable instruction. Parser failures are logged, never propagated.
pub fn extract(
    body: Option<&str>,
    parser: &dyn FormParser,
    repo: &RepoRef,
    issue_number: impl Into<IssueNumber>,
) -> Option<WorkRequest> {
    let body = body?;
    let form = match parser.parse(body) {
        Ok(form) => form,
        Err(e) => {
            debug!(error = %e, repo = %repo, "Issue body is not a bot form");
            return None;
        }
    };

    let user_input = match form.instruction? {
        FieldValue::Text(text) => text,
        FieldValue::List(values) => values.join("\n"),
    };
    if user_input.trim().is_empty() {
        warn!(repo = %repo, "Instruction field is blank");
        return None;
    }

    Some(
        WorkRequest::builder()
            .owner(repo.owner.clone())
            .repo(repo.name.clone())
            .issue_number(issue_number.into())
            .user_input(user_input)
            .build(),
    )
}

/// Recovers the instruction from a bare issue body by dropping the form
/// header lines. The remainder is returned verbatim.
#[must_use]
pub fn strip_prompt(issue_body: &str) -> String {
    issue_body
        .split('\n')
        .skip(HEADER_LINES)
        .collect::<Vec<_>>()
        .join("\n")
}

/// Removes the reroll command from a comment and trims the rest.
#[must_use]
pub fn reroll_user_input(comment: &str, reroll_command: &str) -> String {
    comment.replacen(reroll_command, "", 1).trim().to_string()
}

/// Whether a comment invokes the reroll command.
#[must_use]
pub fn is_reroll(comment: &str, reroll_command: &str) -> bool {
    comment.trim_start().starts_with(reroll_command)
}
