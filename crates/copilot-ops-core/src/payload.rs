// SPDX-License-Identifier: Apache-2.0

//! Tekton `TaskRun` payload construction.
//!
//! The parameter names and their order are consumed by the task template
//! and must stay exactly as listed in [`PARAM_ORDER`].

use serde::{Deserialize, Serialize};

use crate::error::BotError;
use crate::model::{IssueNumber, WorkRequest};

/// API group of the task run resource.
pub const TASKRUN_GROUP: &str = "tekton.dev";
/// API version of the task run resource.
pub const TASKRUN_VERSION: &str = "v1beta1";
/// Kind of the task run resource.
pub const TASKRUN_KIND: &str = "TaskRun";
/// Plural resource name of the task run resource.
pub const TASKRUN_PLURAL: &str = "taskruns";

/// Repository name parameter.
pub const PARAM_REPO_NAME: &str = "REPO_NAME";
/// Issue number parameter.
pub const PARAM_ISSUE_NUMBER: &str = "ISSUE_NUMBER";
/// Repository owner parameter.
pub const PARAM_ISSUE_OWNER: &str = "ISSUE_OWNER";
/// Token secret name parameter.
pub const PARAM_SECRET_NAME: &str = "SECRET_NAME";
/// User instruction parameter.
pub const PARAM_USER_INPUT: &str = "USER_INPUT";
/// Label the task applies to the pull request it opens.
pub const PARAM_PR_FLAG: &str = "PR_FLAG";

/// Parameter order expected by the task template.
pub const PARAM_ORDER: [&str; 6] = [
    PARAM_REPO_NAME,
    PARAM_ISSUE_NUMBER,
    PARAM_ISSUE_OWNER,
    PARAM_SECRET_NAME,
    PARAM_USER_INPUT,
    PARAM_PR_FLAG,
];

/// Longest `generateName` the API server accepts before it starts truncating.
const MAX_GENERATE_NAME: usize = 253;

/// Static inputs of the payload builder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchSettings {
    /// Prefix of the generated task run name.
    pub name_prefix: String,
    /// Tekton task referenced by the run.
    pub task_ref: String,
    /// Value of the `PR_FLAG` parameter.
    pub pr_flag: String,
}

/// Name of the branch (and task run seed) for an issue.
#[must_use]
pub fn branch_name(issue_number: &IssueNumber) -> String {
    format!("copilot-ops-fix-issue-{issue_number}")
}

/// Object metadata of the task run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PayloadMetadata {
    /// Name prefix; the API server appends a unique suffix.
    pub generate_name: String,
}

/// Reference to the Tekton task to run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskRef {
    /// Task name.
    pub name: String,
}

/// One task parameter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Param {
    /// Parameter name.
    pub name: String,
    /// Parameter value.
    pub value: String,
}

/// Task run spec.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskRunSpec {
    /// Task to run.
    pub task_ref: TaskRef,
    /// Ordered parameters.
    pub params: Vec<Param>,
}

/// The task run resource body submitted to the cluster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DispatchPayload {
    /// `tekton.dev/v1beta1`.
    pub api_version: String,
    /// `TaskRun`.
    pub kind: String,
    /// Object metadata.
    pub metadata: PayloadMetadata,
    /// Run spec.
    pub spec: TaskRunSpec,
}

impl DispatchPayload {
    /// Builds the task run for a resolved work request.
    ///
    /// `name` seeds the generated object name. The result depends only on
    /// the inputs.
    ///
    /// # Errors
    ///
    /// Returns `BotError::Construction` if the issue number is not numeric or
    /// the generated name is not a valid object name prefix.
    pub fn build(
        name: &str,
        request: &WorkRequest,
        secret_name: &str,
        settings: &DispatchSettings,
    ) -> crate::Result<Self> {
        let issue_number = issue_number_param(&request.issue_number)?;
        let generate_name = format!("{}-{name}-", settings.name_prefix);
        validate_generate_name(&generate_name)?;

        let params = [
            (PARAM_REPO_NAME, request.repo.clone()),
            (PARAM_ISSUE_NUMBER, issue_number),
            (PARAM_ISSUE_OWNER, request.owner.clone()),
            (PARAM_SECRET_NAME, secret_name.to_string()),
            (PARAM_USER_INPUT, request.user_input.clone()),
            (PARAM_PR_FLAG, settings.pr_flag.clone()),
        ]
        .into_iter()
        .map(|(name, value)| Param {
            name: name.to_string(),
            value,
        })
        .collect();

        Ok(Self {
            api_version: format!("{TASKRUN_GROUP}/{TASKRUN_VERSION}"),
            kind: TASKRUN_KIND.to_string(),
            metadata: PayloadMetadata { generate_name },
            spec: TaskRunSpec {
                task_ref: TaskRef {
                    name: settings.task_ref.clone(),
                },
                params,
            },
        })
    }

    /// Looks up a parameter value by name.
    #[must_use]
    pub fn param(&self, name: &str) -> Option<&str> {
        self.spec
            .params
            .iter()
            .find(|p| p.name == name)
            .map(|p| p.value.as_str())
    }
}

/// Renders the issue number parameter.
fn issue_number_param(number: &IssueNumber) -> crate::Result<String> {
    match number {
        IssueNumber::Number(n) => Ok(n.to_string()),
        IssueNumber::Text(s) => {
            let trimmed = s.trim();
            if !trimmed.is_empty() && trimmed.bytes().all(|b| b.is_ascii_digit()) {
                Ok(trimmed.to_string())
            } else {
                Err(BotError::Construction {
                    message: format!("issue number {s:?} is not numeric"),
                })
            }
        }
    }
}

/// Checks a `generateName` against DNS-1123 subdomain rules.
fn validate_generate_name(name: &str) -> crate::Result<()> {
    let valid_chars = name
        .bytes()
        .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-' || b == b'.');
    let starts_alnum = name
        .bytes()
        .next()
        .is_some_and(|b| b.is_ascii_lowercase() || b.is_ascii_digit());

    if valid_chars && starts_alnum && name.len() <= MAX_GENERATE_NAME {
        Ok(())
    } else {
        Err(BotError::Construction {
            message: format!("{name:?} is not a valid generateName"),
        })
    }
}
