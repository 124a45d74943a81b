// SPDX-License-Identifier: Apache-2.0

//! Kubernetes control-plane seams.
//!
//! The per-installation token secret and the task run submission are the
//! only cluster objects the bot touches.

use async_trait::async_trait;

use crate::payload::DispatchPayload;

pub mod secrets;
pub mod tasks;

pub use secrets::KubeCredentialStore;
pub use tasks::KubeTaskClient;

/// Installation whose credential is being managed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallationRef {
    /// Installation id.
    pub id: u64,
    /// Login of the account the App is installed on, when known.
    pub account: Option<String>,
}

/// Deterministic name of an installation's token secret.
#[must_use]
pub fn secret_name_for(prefix: &str, installation_id: u64) -> String {
    format!("{prefix}-{installation_id}")
}

/// Stores installation tokens keyed by installation id.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Creates the installation's token secret.
    async fn create(&self, installation: &InstallationRef) -> crate::Result<()>;

    /// Replaces the token held in the installation's secret.
    async fn update(&self, installation: &InstallationRef) -> crate::Result<()>;

    /// Deletes the installation's token secret.
    async fn delete(&self, installation: &InstallationRef) -> crate::Result<()>;
}

/// Submits task runs.
#[async_trait]
pub trait TaskClient: Send + Sync {
    /// Creates a task run and returns the name the cluster assigned.
    async fn submit(&self, payload: &DispatchPayload) -> crate::Result<String>;
}
