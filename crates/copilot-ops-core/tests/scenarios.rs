// SPDX-License-Identifier: Apache-2.0

//! End-to-end orchestration tests with in-memory collaborators.
//!
//! Each test feeds a webhook delivery through `Orchestrator::handle` and checks
//! the submitted task run, the credential calls and the counters.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use copilot_ops_core::payload::{PARAM_ISSUE_NUMBER, PARAM_SECRET_NAME, PARAM_USER_INPUT};
use copilot_ops_core::{
    Account, BotConfig, BotError, BotSettings, CredentialStore, DispatchPayload, EventPayload,
    InstallationRef, Issue, IssueTracker, Label, MarkdownFormParser, Metrics, Orchestrator,
    Outcome, Reaction, RepoRef, SkipReason, TaskClient, TrackerFactory, WebhookEvent,
};
use serde_json::json;

const ISSUE_BODY: &str = "### Bot Input\n\nfix the bug";

#[derive(Default)]
struct FakeTracker {
    issues: HashMap<u64, Issue>,
    reactions: HashMap<u64, Vec<Reaction>>,
}

#[async_trait]
impl IssueTracker for FakeTracker {
    async fn get_issue(&self, _repo: &RepoRef, number: u64) -> copilot_ops_core::Result<Issue> {
        self.issues
            .get(&number)
            .cloned()
            .ok_or_else(|| BotError::GitHub {
                message: format!("issue {number} not found"),
            })
    }

    async fn list_reactions(
        &self,
        _repo: &RepoRef,
        number: u64,
    ) -> copilot_ops_core::Result<Vec<Reaction>> {
        Ok(self.reactions.get(&number).cloned().unwrap_or_default())
    }
}

struct FakeFactory(Arc<FakeTracker>);

#[async_trait]
impl TrackerFactory for FakeFactory {
    async fn for_installation(
        &self,
        _installation_id: u64,
    ) -> copilot_ops_core::Result<Arc<dyn IssueTracker>> {
        let tracker: Arc<dyn IssueTracker> = self.0.clone();
        Ok(tracker)
    }
}

#[derive(Default)]
struct FakeCredentials {
    calls: Mutex<Vec<(&'static str, u64)>>,
    fail_update: bool,
    fail_create: bool,
    fail_delete: bool,
}

impl FakeCredentials {
    fn calls(&self) -> Vec<(&'static str, u64)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl CredentialStore for FakeCredentials {
    async fn create(&self, installation: &InstallationRef) -> copilot_ops_core::Result<()> {
        self.calls.lock().unwrap().push(("create", installation.id));
        if self.fail_create {
            return Err(BotError::Kubernetes {
                message: "already exists".to_string(),
            });
        }
        Ok(())
    }

    async fn update(&self, installation: &InstallationRef) -> copilot_ops_core::Result<()> {
        self.calls.lock().unwrap().push(("update", installation.id));
        if self.fail_update {
            return Err(BotError::Kubernetes {
                message: "secret not found".to_string(),
            });
        }
        Ok(())
    }

    async fn delete(&self, installation: &InstallationRef) -> copilot_ops_core::Result<()> {
        self.calls.lock().unwrap().push(("delete", installation.id));
        if self.fail_delete {
            return Err(BotError::Kubernetes {
                message: "forbidden".to_string(),
            });
        }
        Ok(())
    }
}

#[derive(Default)]
struct FakeTasks {
    submitted: Mutex<Vec<DispatchPayload>>,
}

impl FakeTasks {
    fn submitted(&self) -> Vec<DispatchPayload> {
        self.submitted.lock().unwrap().clone()
    }
}

#[async_trait]
impl TaskClient for FakeTasks {
    async fn submit(&self, payload: &DispatchPayload) -> copilot_ops_core::Result<String> {
        let mut submitted = self.submitted.lock().unwrap();
        submitted.push(payload.clone());
        Ok(format!(
            "{}{}",
            payload.metadata.generate_name,
            submitted.len()
        ))
    }
}

struct Harness {
    orchestrator: Orchestrator,
    credentials: Arc<FakeCredentials>,
    tasks: Arc<FakeTasks>,
    metrics: Arc<Metrics>,
}

fn harness(tracker: FakeTracker, credentials: FakeCredentials) -> Harness {
    let bot = BotConfig::default();
    let credentials = Arc::new(credentials);
    let tasks = Arc::new(FakeTasks::default());
    let metrics = Arc::new(Metrics::new());
    let orchestrator = Orchestrator::builder()
        .settings(BotSettings::new(&bot, "copilot-ops-bot"))
        .parser(Arc::new(MarkdownFormParser::new(&bot.instruction_field)))
        .trackers(Arc::new(FakeFactory(Arc::new(tracker))))
        .credentials(credentials.clone())
        .tasks(tasks.clone())
        .metrics(metrics.clone())
        .build();
    Harness {
        orchestrator,
        credentials,
        tasks,
        metrics,
    }
}

fn user(id: u64, login: &str) -> Account {
    Account {
        id,
        login: login.to_string(),
        kind: Some("User".to_string()),
    }
}

fn bot_account() -> Account {
    Account {
        id: 1000,
        login: "copilot-ops-bot[bot]".to_string(),
        kind: Some("Bot".to_string()),
    }
}

fn issue(number: u64, body: &str, author: &Account) -> Issue {
    Issue {
        number,
        body: Some(body.to_string()),
        user: author.clone(),
        labels: Vec::new(),
        pull_request: None,
    }
}

fn bot_pr(number: u64, body: &str, author: &Account) -> Issue {
    Issue {
        labels: vec![Label {
            name: "copilot-ops-bot".to_string(),
        }],
        pull_request: Some(copilot_ops_core::model::PullRequestLink {
            url: Some(format!(
                "https://api.github.com/repos/acme/widget/pulls/{number}"
            )),
        }),
        ..issue(number, body, author)
    }
}

fn eyes_from(account: &Account) -> Reaction {
    Reaction {
        content: "eyes".to_string(),
        user: Some(account.clone()),
    }
}

fn payload(value: serde_json::Value) -> EventPayload {
    serde_json::from_value(value).unwrap()
}

fn issue_opened(issue: &Issue) -> WebhookEvent {
    WebhookEvent::new(
        "issues",
        "delivery-1",
        payload(json!({
            "action": "opened",
            "installation": {"id": 42, "account": {"id": 3, "login": "acme", "type": "Organization"}},
            "repository": {"name": "widget", "owner": {"id": 3, "login": "acme", "type": "Organization"}},
            "issue": issue,
            "sender": issue.user,
        })),
    )
}

fn comment_created(issue: &Issue, body: &str, sender: &Account) -> WebhookEvent {
    WebhookEvent::new(
        "issue_comment",
        "delivery-2",
        payload(json!({
            "action": "created",
            "installation": {"id": 42},
            "repository": {"name": "widget", "owner": {"id": 3, "login": "acme", "type": "Organization"}},
            "issue": issue,
            "comment": {"id": 77, "body": body, "user": sender},
            "sender": sender,
        })),
    )
}

fn installation(action: &str) -> WebhookEvent {
    WebhookEvent::new(
        "installation",
        "delivery-3",
        payload(json!({
            "action": action,
            "installation": {"id": 42, "account": {"id": 3, "login": "acme", "type": "Organization"}},
            "sender": {"id": 9, "login": "alice", "type": "User"},
        })),
    )
}

#[tokio::test]
async fn test_issue_opened_dispatches_instruction() {
    let alice = user(9, "alice");
    let h = harness(FakeTracker::default(), FakeCredentials::default());

    let outcome = h
        .orchestrator
        .handle(&issue_opened(&issue(5, ISSUE_BODY, &alice)))
        .await
        .unwrap();

    assert!(matches!(
        outcome,
        Outcome::Dispatched { ref issue_number, .. } if issue_number == "5"
    ));
    let submitted = h.tasks.submitted();
    assert_eq!(submitted.len(), 1);
    let run = &submitted[0];
    assert_eq!(run.param(PARAM_USER_INPUT), Some("fix the bug"));
    assert_eq!(run.param(PARAM_ISSUE_NUMBER), Some("5"));
    assert_eq!(run.param(PARAM_SECRET_NAME), Some("copilot-ops-bot-42"));
    assert_eq!(
        run.metadata.generate_name,
        "copilot-ops-bot-copilot-ops-fix-issue-5-"
    );

    // Token refreshed before submission.
    assert_eq!(h.credentials.calls(), vec![("update", 42)]);
    assert_eq!(
        h.metrics
            .operations
            .get(&["42", "k8s", "Succeeded", "updateSecret"]),
        1
    );
    assert_eq!(
        h.metrics
            .operations
            .get(&["42", "k8s", "Succeeded", "scheduleTaskRun"]),
        1
    );
}

#[tokio::test]
async fn test_issue_opened_without_instruction_is_skipped() {
    let alice = user(9, "alice");
    let h = harness(FakeTracker::default(), FakeCredentials::default());

    let body = "### Bot Input\n\n_No response_";
    let outcome = h
        .orchestrator
        .handle(&issue_opened(&issue(5, body, &alice)))
        .await
        .unwrap();

    assert_eq!(outcome, Outcome::Skipped(SkipReason::NoInstruction));
    assert!(h.tasks.submitted().is_empty());
    assert!(h.credentials.calls().is_empty());
    assert_eq!(h.metrics.operations.total(), 0);
}

#[tokio::test]
async fn test_refresh_failure_does_not_block_dispatch() {
    let alice = user(9, "alice");
    let credentials = FakeCredentials {
        fail_update: true,
        ..FakeCredentials::default()
    };
    let h = harness(FakeTracker::default(), credentials);

    let outcome = h
        .orchestrator
        .handle(&issue_opened(&issue(5, ISSUE_BODY, &alice)))
        .await
        .unwrap();

    assert!(matches!(outcome, Outcome::Dispatched { .. }));
    assert_eq!(h.tasks.submitted().len(), 1);
    assert_eq!(
        h.metrics
            .operations
            .get(&["42", "k8s", "Failed", "updateSecret"]),
        1
    );
}

#[tokio::test]
async fn test_reroll_on_claimed_issue_redispatches() {
    let alice = user(9, "alice");
    let original = issue(5, ISSUE_BODY, &alice);
    let tracker = FakeTracker {
        reactions: HashMap::from([(5, vec![eyes_from(&bot_account())])]),
        ..FakeTracker::default()
    };
    let h = harness(tracker, FakeCredentials::default());

    let outcome = h
        .orchestrator
        .handle(&comment_created(&original, "/reroll", &alice))
        .await
        .unwrap();

    assert!(matches!(outcome, Outcome::Dispatched { .. }));
    let submitted = h.tasks.submitted();
    assert_eq!(submitted.len(), 1);
    assert_eq!(submitted[0].param(PARAM_USER_INPUT), Some("fix the bug"));
    assert_eq!(submitted[0].param(PARAM_ISSUE_NUMBER), Some("5"));
}

#[tokio::test]
async fn test_reroll_ignores_text_after_command() {
    let alice = user(9, "alice");
    let claimed = issue(5, ISSUE_BODY, &alice);
    let tracker = FakeTracker {
        reactions: HashMap::from([(5, vec![eyes_from(&bot_account())])]),
        ..FakeTracker::default()
    };
    let h = harness(tracker, FakeCredentials::default());

    h.orchestrator
        .handle(&comment_created(&claimed, "/reroll and also bump the version", &alice))
        .await
        .unwrap();

    let submitted = h.tasks.submitted();
    assert_eq!(submitted.len(), 1);
    assert_eq!(submitted[0].param(PARAM_USER_INPUT), Some("fix the bug"));
}

#[tokio::test]
async fn test_reroll_on_bot_pr_recovers_linked_issue() {
    let alice = user(9, "alice");
    let original = issue(5, "### Bot Input\n\nfix the bug\nand add a test", &alice);
    let pr = bot_pr(12, "Automated change.\n\nFixes #5", &bot_account());
    let tracker = FakeTracker {
        issues: HashMap::from([(5, original)]),
        ..FakeTracker::default()
    };
    let h = harness(tracker, FakeCredentials::default());

    let outcome = h
        .orchestrator
        .handle(&comment_created(&pr, "/reroll", &alice))
        .await
        .unwrap();

    assert!(matches!(
        outcome,
        Outcome::Dispatched { ref issue_number, .. } if issue_number == "5"
    ));
    let run = &h.tasks.submitted()[0];
    assert_eq!(run.param(PARAM_USER_INPUT), Some("fix the bug\nand add a test"));
    assert_eq!(run.param(PARAM_ISSUE_NUMBER), Some("5"));
    assert_eq!(
        run.metadata.generate_name,
        "copilot-ops-bot-copilot-ops-fix-issue-5-"
    );
}

#[tokio::test]
async fn test_reroll_on_pr_without_linkage_is_skipped() {
    let alice = user(9, "alice");
    let pr = bot_pr(12, "No reference here", &bot_account());
    let h = harness(FakeTracker::default(), FakeCredentials::default());

    let outcome = h
        .orchestrator
        .handle(&comment_created(&pr, "/reroll", &alice))
        .await
        .unwrap();

    assert_eq!(outcome, Outcome::Skipped(SkipReason::UnresolvableLinkage));
    assert!(h.tasks.submitted().is_empty());
}

#[tokio::test]
async fn test_reroll_on_bot_pr_by_someone_else_is_skipped() {
    let alice = user(9, "alice");
    let mallory = user(66, "mallory");
    let pr = bot_pr(12, "Automated change.\n\nFixes #5", &bot_account());
    let tracker = FakeTracker {
        issues: HashMap::from([(5, issue(5, ISSUE_BODY, &alice))]),
        ..FakeTracker::default()
    };
    let h = harness(tracker, FakeCredentials::default());

    let outcome = h
        .orchestrator
        .handle(&comment_created(&pr, "/reroll", &mallory))
        .await
        .unwrap();

    assert_eq!(outcome, Outcome::Skipped(SkipReason::NotIssueAuthor));
    assert!(h.tasks.submitted().is_empty());
    assert!(h.credentials.calls().is_empty());
}

#[tokio::test]
async fn test_reroll_on_unlabeled_pr_is_skipped() {
    let alice = user(9, "alice");
    let pr = Issue {
        labels: Vec::new(),
        ..bot_pr(12, "Fixes #5", &alice)
    };
    let tracker = FakeTracker {
        issues: HashMap::from([(5, issue(5, ISSUE_BODY, &alice))]),
        ..FakeTracker::default()
    };
    let h = harness(tracker, FakeCredentials::default());

    let outcome = h
        .orchestrator
        .handle(&comment_created(&pr, "/reroll", &alice))
        .await
        .unwrap();

    assert_eq!(outcome, Outcome::Skipped(SkipReason::NotOurs));
    assert!(h.tasks.submitted().is_empty());
}

#[tokio::test]
async fn test_reroll_keeps_issue_that_mentions_another() {
    let alice = user(9, "alice");
    let claimed = issue(8, "### Bot Input\n\nFixes #3 by adding a null check", &alice);
    let tracker = FakeTracker {
        issues: HashMap::from([(3, issue(3, "### Bot Input\n\nunrelated work", &alice))]),
        reactions: HashMap::from([(8, vec![eyes_from(&bot_account())])]),
    };
    let h = harness(tracker, FakeCredentials::default());

    let outcome = h
        .orchestrator
        .handle(&comment_created(&claimed, "/reroll", &alice))
        .await
        .unwrap();

    assert!(matches!(
        outcome,
        Outcome::Dispatched { ref issue_number, .. } if issue_number == "8"
    ));
    let run = &h.tasks.submitted()[0];
    assert_eq!(run.param(PARAM_ISSUE_NUMBER), Some("8"));
    assert_eq!(
        run.param(PARAM_USER_INPUT),
        Some("Fixes #3 by adding a null check")
    );
}

#[tokio::test]
async fn test_reroll_guards() {
    let alice = user(9, "alice");
    let mallory = user(66, "mallory");
    let claimed = issue(5, ISSUE_BODY, &alice);
    let tracker = FakeTracker {
        reactions: HashMap::from([(5, vec![eyes_from(&bot_account())])]),
        ..FakeTracker::default()
    };
    let h = harness(tracker, FakeCredentials::default());

    let cases = [
        (
            comment_created(&claimed, "/reroll", &bot_account()),
            SkipReason::BotComment,
        ),
        (
            comment_created(&claimed, "/reroll", &mallory),
            SkipReason::NotIssueAuthor,
        ),
        (
            comment_created(&claimed, "looks good, thanks", &alice),
            SkipReason::NotReroll,
        ),
    ];
    for (event, expected) in cases {
        let outcome = h.orchestrator.handle(&event).await.unwrap();
        assert_eq!(outcome, Outcome::Skipped(expected));
    }
    assert!(h.tasks.submitted().is_empty());
}

#[tokio::test]
async fn test_reroll_on_unclaimed_issue_is_skipped() {
    let alice = user(9, "alice");
    let unclaimed = issue(5, ISSUE_BODY, &alice);
    let tracker = FakeTracker {
        // Reaction from a human does not claim the issue.
        reactions: HashMap::from([(5, vec![eyes_from(&alice)])]),
        ..FakeTracker::default()
    };
    let h = harness(tracker, FakeCredentials::default());

    let outcome = h
        .orchestrator
        .handle(&comment_created(&unclaimed, "/reroll", &alice))
        .await
        .unwrap();

    assert_eq!(outcome, Outcome::Skipped(SkipReason::NotOurs));
}

#[tokio::test]
async fn test_installation_lifecycle() {
    let h = harness(FakeTracker::default(), FakeCredentials::default());

    let created = h.orchestrator.handle(&installation("created")).await.unwrap();
    let deleted = h.orchestrator.handle(&installation("deleted")).await.unwrap();

    assert_eq!(created, Outcome::CredentialCreated);
    assert_eq!(deleted, Outcome::CredentialDeleted);
    assert_eq!(h.credentials.calls(), vec![("create", 42), ("delete", 42)]);
    assert_eq!(h.metrics.installs.total(), 1);
    assert_eq!(h.metrics.uninstalls.total(), 1);
    assert_eq!(
        h.metrics
            .operations
            .get(&["42", "k8s", "Succeeded", "deleteSecret"]),
        1
    );
}

#[tokio::test]
async fn test_failed_install_is_counted_and_logged() {
    let credentials = FakeCredentials {
        fail_create: true,
        ..FakeCredentials::default()
    };
    let h = harness(FakeTracker::default(), credentials);

    let event = installation("created");
    assert!(h.orchestrator.handle(&event).await.is_err());
    assert_eq!(h.orchestrator.dispatch_event(&event).await, None);
    assert_eq!(
        h.metrics
            .operations
            .get(&["42", "k8s", "Failed", "createSecret"]),
        2
    );
}

#[tokio::test]
async fn test_failed_uninstall_is_counted() {
    let credentials = FakeCredentials {
        fail_delete: true,
        ..FakeCredentials::default()
    };
    let h = harness(FakeTracker::default(), credentials);

    let result = h.orchestrator.handle(&installation("deleted")).await;

    assert!(result.is_err());
    assert_eq!(h.credentials.calls(), vec![("delete", 42)]);
    assert_eq!(h.metrics.uninstalls.total(), 1);
    assert_eq!(
        h.metrics
            .operations
            .get(&["42", "k8s", "Failed", "deleteSecret"]),
        1
    );
    assert_eq!(
        h.metrics
            .operations
            .get(&["42", "k8s", "Succeeded", "deleteSecret"]),
        0
    );
}

#[tokio::test]
async fn test_record_action_counts_by_installation() {
    let alice = user(9, "alice");
    let h = harness(FakeTracker::default(), FakeCredentials::default());

    assert!(h
        .orchestrator
        .record_action(&issue_opened(&issue(5, ISSUE_BODY, &alice))));
    assert!(h.orchestrator.record_action(&installation("created")));
    assert!(!h.orchestrator.record_action(&WebhookEvent::new(
        "ping",
        "delivery-4",
        EventPayload::default()
    )));

    assert_eq!(h.metrics.actions.get(&["42", "opened"]), 1);
    assert_eq!(h.metrics.actions.get(&["42", "created"]), 1);
    assert_eq!(h.metrics.actions.total(), 2);
}

#[tokio::test]
async fn test_unhandled_event_is_skipped() {
    let h = harness(FakeTracker::default(), FakeCredentials::default());
    let event = WebhookEvent::new(
        "issues",
        "delivery-5",
        payload(json!({"action": "closed", "installation": {"id": 42}})),
    );

    let outcome = h.orchestrator.handle(&event).await.unwrap();

    assert_eq!(outcome, Outcome::Skipped(SkipReason::UnhandledEvent));
}
