// SPDX-License-Identifier: Apache-2.0

//! Tekton task run submission.

use async_trait::async_trait;
use kube::api::{ApiResource, DynamicObject, GroupVersionKind, PostParams};
use kube::{Api, Client};
use tracing::{info, instrument};

use super::TaskClient;
use crate::payload::{
    DispatchPayload, TASKRUN_GROUP, TASKRUN_KIND, TASKRUN_PLURAL, TASKRUN_VERSION,
};

/// Task client creating namespaced `TaskRun` objects.
#[derive(Clone)]
pub struct KubeTaskClient {
    api: Api<DynamicObject>,
}

impl KubeTaskClient {
    /// Creates a client submitting into `namespace`.
    #[must_use]
    pub fn new(client: Client, namespace: &str) -> Self {
        let gvk = GroupVersionKind::gvk(TASKRUN_GROUP, TASKRUN_VERSION, TASKRUN_KIND);
        let resource = ApiResource::from_gvk_with_plural(&gvk, TASKRUN_PLURAL);
        Self {
            api: Api::namespaced_with(client, namespace, &resource),
        }
    }
}

#[async_trait]
impl TaskClient for KubeTaskClient {
    #[instrument(skip(self, payload), fields(generate_name = %payload.metadata.generate_name))]
    async fn submit(&self, payload: &DispatchPayload) -> crate::Result<String> {
        let object: DynamicObject = serde_json::from_value(serde_json::to_value(payload)?)?;
        let created = self.api.create(&PostParams::default(), &object).await?;
        let name = created.metadata.name.unwrap_or_default();
        info!(task_run = %name, "Task run scheduled");
        Ok(name)
    }
}
