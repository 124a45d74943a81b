// SPDX-License-Identifier: Apache-2.0

//! Webhook event orchestration.
//!
//! Maps each supported delivery to a sequence of resolver, builder and
//! control-plane calls:
//!
//! - `installation.created`: create the token secret
//! - `installation.deleted`: delete the token secret
//! - `issues.opened`: extract the instruction, refresh the token, submit a task run
//! - `issue_comment.created`: on a reroll by the original issue's author on a
//!   claimed issue or bot pull request, recover the instruction and submit again
//!
//! Deliveries are independent; nothing is kept between them except counters.

use std::sync::Arc;

use bon::Builder;
use tracing::{debug, error, info, instrument, warn};

use crate::config::BotConfig;
use crate::error::BotError;
use crate::event::{EventKind, WebhookEvent};
use crate::executor::{OperationLabels, OperationMethod, run_with_metrics};
use crate::extract::{extract, is_reroll, reroll_user_input};
use crate::form::FormParser;
use crate::github::TrackerFactory;
use crate::intent::{original_input, original_issue, target_issue_number};
use crate::k8s::{CredentialStore, InstallationRef, TaskClient, secret_name_for};
use crate::metrics::Metrics;
use crate::model::{IssueNumber, WorkRequest};
use crate::ownership::{BotIdentities, is_ours};
use crate::payload::{DispatchPayload, DispatchSettings, branch_name};

/// Why a delivery was skipped without dispatching.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Event kind the bot does not act on.
    UnhandledEvent,
    /// Payload lacks a field the handler needs.
    IncompletePayload,
    /// No instruction could be extracted or recovered.
    NoInstruction,
    /// Comment written by the bot itself.
    BotComment,
    /// Comment author is not the issue author.
    NotIssueAuthor,
    /// Comment is not the reroll command.
    NotReroll,
    /// Issue or pull request was never claimed by the bot.
    NotOurs,
    /// Reroll target issue could not be determined.
    UnresolvableLinkage,
}

/// Result of handling one delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Token secret created for a new installation.
    CredentialCreated,
    /// Token secret deleted for a removed installation.
    CredentialDeleted,
    /// Task run submitted.
    Dispatched {
        /// Issue the task works on.
        issue_number: String,
        /// Name the cluster assigned to the task run.
        task_run: String,
    },
    /// Nothing to do.
    Skipped(SkipReason),
}

/// Bot settings the orchestrator needs per delivery.
#[derive(Debug, Clone)]
pub struct BotSettings {
    /// Bot pull request label.
    pub label: String,
    /// Reroll comment command.
    pub reroll_command: String,
    /// Bot accounts.
    pub identities: BotIdentities,
    /// Token secret name prefix.
    pub secret_prefix: String,
    /// Payload builder settings.
    pub dispatch: DispatchSettings,
}

impl BotSettings {
    /// Collects settings from the `bot` config section.
    pub fn new(bot: &BotConfig, secret_prefix: impl Into<String>) -> Self {
        Self {
            label: bot.label.clone(),
            reroll_command: bot.reroll_command.clone(),
            identities: bot.identities(),
            secret_prefix: secret_prefix.into(),
            dispatch: bot.dispatch_settings(),
        }
    }
}

/// Handles webhook deliveries.
#[derive(Builder)]
pub struct Orchestrator {
    settings: BotSettings,
    parser: Arc<dyn FormParser>,
    trackers: Arc<dyn TrackerFactory>,
    credentials: Arc<dyn CredentialStore>,
    tasks: Arc<dyn TaskClient>,
    metrics: Arc<Metrics>,
}

impl Orchestrator {
    /// Counts the delivery on the actions counter.
    ///
    /// Returns `false` for deliveries without an action or installation,
    /// which are not counted.
    pub fn record_action(&self, event: &WebhookEvent) -> bool {
        let (Some(action), Some(install)) =
            (event.payload.action.as_deref(), event.installation_id())
        else {
            debug!(event = %event.name, delivery = %event.delivery_id, "Delivery without action or installation");
            return false;
        };
        self.metrics
            .actions
            .inc(vec![install.to_string(), action.to_string()]);
        true
    }

    /// Handles a delivery, logging instead of propagating failures.
    ///
    /// Returns `None` when handling failed.
    pub async fn dispatch_event(&self, event: &WebhookEvent) -> Option<Outcome> {
        match self.handle(event).await {
            Ok(outcome) => {
                debug!(event = %event.full_name(), delivery = %event.delivery_id, ?outcome, "Delivery handled");
                Some(outcome)
            }
            Err(e) => {
                error!(
                    error = %e,
                    event = %event.full_name(),
                    delivery = %event.delivery_id,
                    "Error on event"
                );
                None
            }
        }
    }

    /// Handles a delivery.
    ///
    /// # Errors
    ///
    /// Returns an error if a fatal control-plane call, a GitHub read or the
    /// payload construction fails.
    #[instrument(skip(self, event), fields(event = %event.full_name(), delivery = %event.delivery_id))]
    pub async fn handle(&self, event: &WebhookEvent) -> crate::Result<Outcome> {
        match event.kind() {
            EventKind::InstallationCreated => self.on_installation_created(event).await,
            EventKind::InstallationDeleted => self.on_installation_deleted(event).await,
            EventKind::IssuesOpened => self.on_issue_opened(event).await,
            EventKind::IssueCommentCreated => self.on_comment_created(event).await,
            EventKind::Other => Ok(Outcome::Skipped(SkipReason::UnhandledEvent)),
        }
    }

    async fn on_installation_created(&self, event: &WebhookEvent) -> crate::Result<Outcome> {
        self.metrics.installs.inc(Vec::new());
        let Some(installation) = installation_ref(event) else {
            return Ok(Outcome::Skipped(SkipReason::IncompletePayload));
        };

        run_with_metrics(
            self.credentials.create(&installation),
            OperationLabels::new(installation.id, OperationMethod::CreateSecret),
            &self.metrics.operations,
        )
        .await?;

        info!(install = installation.id, "Installation credential created");
        Ok(Outcome::CredentialCreated)
    }

    async fn on_installation_deleted(&self, event: &WebhookEvent) -> crate::Result<Outcome> {
        self.metrics.uninstalls.inc(Vec::new());
        let Some(installation) = installation_ref(event) else {
            return Ok(Outcome::Skipped(SkipReason::IncompletePayload));
        };

        run_with_metrics(
            self.credentials.delete(&installation),
            OperationLabels::new(installation.id, OperationMethod::DeleteSecret),
            &self.metrics.operations,
        )
        .await?;

        info!(install = installation.id, "Installation credential deleted");
        Ok(Outcome::CredentialDeleted)
    }

    async fn on_issue_opened(&self, event: &WebhookEvent) -> crate::Result<Outcome> {
        let (Some(installation), Some(repo), Some(issue)) = (
            installation_ref(event),
            event.repo(),
            event.payload.issue.as_ref(),
        ) else {
            return Ok(Outcome::Skipped(SkipReason::IncompletePayload));
        };

        let Some(request) = extract(
            issue.body.as_deref(),
            self.parser.as_ref(),
            &repo,
            issue.number,
        ) else {
            info!(repo = %repo, number = issue.number, "Issue is not for the bot");
            return Ok(Outcome::Skipped(SkipReason::NoInstruction));
        };

        self.dispatch(&installation, &request).await
    }

    async fn on_comment_created(&self, event: &WebhookEvent) -> crate::Result<Outcome> {
        let payload = &event.payload;
        let (Some(installation), Some(repo), Some(issue), Some(comment), Some(sender)) = (
            installation_ref(event),
            event.repo(),
            payload.issue.as_ref(),
            payload.comment.as_ref(),
            payload.sender.as_ref(),
        ) else {
            return Ok(Outcome::Skipped(SkipReason::IncompletePayload));
        };

        if sender.is_bot() || self.settings.identities.contains(&sender.login) {
            debug!("Skipping bot comment");
            return Ok(Outcome::Skipped(SkipReason::BotComment));
        }
        if !is_reroll(&comment.body, &self.settings.reroll_command) {
            return Ok(Outcome::Skipped(SkipReason::NotReroll));
        }
        // A pull request is authored by the bot, so its reroll is checked
        // against the linked issue's author once that issue is fetched.
        if !issue.is_pull_request() && sender.id != issue.user.id {
            debug!(sender = %sender.login, "Skipping comment from someone other than the issue author");
            return Ok(Outcome::Skipped(SkipReason::NotIssueAuthor));
        }

        let tracker = self.trackers.for_installation(installation.id).await?;
        let ours = is_ours(
            tracker.as_ref(),
            &repo,
            issue,
            &self.settings.label,
            &self.settings.identities,
        )
        .await?;
        if !ours {
            info!(repo = %repo, number = issue.number, "Reroll on an issue the bot never claimed");
            return Ok(Outcome::Skipped(SkipReason::NotOurs));
        }

        let Some(target) = target_issue_number(issue) else {
            info!(repo = %repo, number = issue.number, "Reroll target issue not found");
            return Ok(Outcome::Skipped(SkipReason::UnresolvableLinkage));
        };

        let original = original_issue(tracker.as_ref(), &repo, issue, target).await?;
        if issue.is_pull_request() && sender.id != original.user.id {
            debug!(sender = %sender.login, target, "Skipping reroll from someone other than the linked issue author");
            return Ok(Outcome::Skipped(SkipReason::NotIssueAuthor));
        }

        let extra = reroll_user_input(&comment.body, &self.settings.reroll_command);
        if !extra.is_empty() {
            debug!(extra = %extra, "Ignoring text after the reroll command");
        }

        let Some(user_input) = original_input(self.parser.as_ref(), &repo, issue, &original)
        else {
            return Ok(Outcome::Skipped(SkipReason::NoInstruction));
        };

        let issue_number = if target == issue.number {
            IssueNumber::Number(target)
        } else {
            IssueNumber::Text(target.to_string())
        };
        let request = WorkRequest::builder()
            .owner(repo.owner)
            .repo(repo.name)
            .issue_number(issue_number)
            .user_input(user_input)
            .build();

        info!(number = issue.number, target, "Rerolling");
        self.dispatch(&installation, &request).await
    }

    /// Refreshes the installation token, then submits the task run.
    async fn dispatch(
        &self,
        installation: &InstallationRef,
        request: &WorkRequest,
    ) -> crate::Result<Outcome> {
        self.refresh_credential(installation).await;

        let secret_name = secret_name_for(&self.settings.secret_prefix, installation.id);
        let payload = DispatchPayload::build(
            &branch_name(&request.issue_number),
            request,
            &secret_name,
            &self.settings.dispatch,
        )?;

        let task_run = run_with_metrics(
            self.tasks.submit(&payload),
            OperationLabels::new(installation.id, OperationMethod::ScheduleTaskRun),
            &self.metrics.operations,
        )
        .await?;

        Ok(Outcome::Dispatched {
            issue_number: request.issue_number.to_string(),
            task_run,
        })
    }

    /// Refreshes the token secret. Failure is logged and ignored.
    async fn refresh_credential(&self, installation: &InstallationRef) {
        let result: Result<(), BotError> = run_with_metrics(
            self.credentials.update(installation),
            OperationLabels::new(installation.id, OperationMethod::UpdateSecret),
            &self.metrics.operations,
        )
        .await;

        if let Err(e) = result {
            warn!(error = %e, install = installation.id, "Token refresh failed, continuing with stored token");
        }
    }
}

fn installation_ref(event: &WebhookEvent) -> Option<InstallationRef> {
    event
        .payload
        .installation
        .as_ref()
        .map(|installation| InstallationRef {
            id: installation.id,
            account: installation.account.as_ref().map(|a| a.login.clone()),
        })
}
