// SPDX-License-Identifier: Apache-2.0

//! Metrics-wrapped execution of control-plane operations.
//!
//! Every secret write and task submission goes through [`run_with_metrics`],
//! which records exactly one `operations_triggered` sample per call.

use std::fmt::Display;
use std::future::Future;

use tracing::error;

use crate::metrics::Counter;

/// Operation label value for cluster calls.
pub const OPERATION_K8S: &str = "k8s";

/// Control-plane method being executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationMethod {
    /// Create the installation token secret.
    CreateSecret,
    /// Refresh the installation token secret.
    UpdateSecret,
    /// Delete the installation token secret.
    DeleteSecret,
    /// Submit a task run.
    ScheduleTaskRun,
}

impl OperationMethod {
    /// Label value of the method.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationMethod::CreateSecret => "createSecret",
            OperationMethod::UpdateSecret => "updateSecret",
            OperationMethod::DeleteSecret => "deleteSecret",
            OperationMethod::ScheduleTaskRun => "scheduleTaskRun",
        }
    }
}

/// Final outcome of an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationStatus {
    /// The operation returned successfully.
    Succeeded,
    /// The operation failed (or never completed).
    Failed,
}

impl OperationStatus {
    /// Label value of the status.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationStatus::Succeeded => "Succeeded",
            OperationStatus::Failed => "Failed",
        }
    }
}

/// Labels of one `operations_triggered` sample. Each call owns its own copy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationLabels {
    /// Installation id.
    pub install: u64,
    /// Method executed.
    pub method: OperationMethod,
    /// Operation family, set by the executor.
    pub operation: Option<&'static str>,
    /// Outcome, set by the executor.
    pub status: Option<OperationStatus>,
}

impl OperationLabels {
    /// Labels for a method on an installation, before execution.
    #[must_use]
    pub fn new(install: u64, method: OperationMethod) -> Self {
        Self {
            install,
            method,
            operation: None,
            status: None,
        }
    }

    /// Label values in `[install, operation, status, method]` order.
    #[must_use]
    pub fn label_values(&self) -> Vec<String> {
        vec![
            self.install.to_string(),
            self.operation.unwrap_or_default().to_string(),
            self.status.map(|s| s.as_str()).unwrap_or_default().to_string(),
            self.method.as_str().to_string(),
        ]
    }
}

/// Increments the counter with the final labels when dropped.
struct RecordOnDrop<'a> {
    counter: &'a Counter,
    labels: OperationLabels,
}

impl Drop for RecordOnDrop<'_> {
    fn drop(&mut self) {
        self.counter.inc(self.labels.label_values());
    }
}

/// Runs a control-plane operation and records its outcome.
///
/// Sets the operation label to `k8s`, the status to `Succeeded` or `Failed`,
/// and increments `counter` exactly once whatever happens. A failure is
/// logged and returned to the caller unchanged. An operation dropped before
/// completion counts as `Failed`.
///
/// # Errors
///
/// Returns the operation's own error.
pub async fn run_with_metrics<T, E, F>(
    operation: F,
    labels: OperationLabels,
    counter: &Counter,
) -> Result<T, E>
where
    F: Future<Output = Result<T, E>>,
    E: Display,
{
    let mut record = RecordOnDrop {
        counter,
        labels: OperationLabels {
            operation: Some(OPERATION_K8S),
            status: Some(OperationStatus::Failed),
            ..labels
        },
    };

    match operation.await {
        Ok(value) => {
            record.labels.status = Some(OperationStatus::Succeeded);
            Ok(value)
        }
        Err(e) => {
            error!(
                error = %e,
                install = record.labels.install,
                method = record.labels.method.as_str(),
                "Control-plane operation failed"
            );
            Err(e)
        }
    }
}
