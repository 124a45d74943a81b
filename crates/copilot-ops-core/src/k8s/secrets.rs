// SPDX-License-Identifier: Apache-2.0

//! Installation token secrets.
//!
//! Each installation gets one `Opaque` secret holding its access token under
//! `token` and the account login under `orgName`. Tasks mount it by name.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use k8s_openapi::api::core::v1::Secret;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube::api::{DeleteParams, Patch, PatchParams, PostParams};
use kube::{Api, Client};
use secrecy::{ExposeSecret, SecretString};
use tracing::{info, instrument};

use super::{CredentialStore, InstallationRef, secret_name_for};
use crate::github::TokenMinter;

/// Secret key holding the installation access token.
pub const TOKEN_KEY: &str = "token";
/// Secret key holding the installation account login.
pub const ORG_NAME_KEY: &str = "orgName";

/// Credential store writing Kubernetes secrets.
pub struct KubeCredentialStore {
    client: Client,
    namespace: String,
    secret_prefix: String,
    minter: Arc<dyn TokenMinter>,
}

impl KubeCredentialStore {
    /// Creates a store writing secrets into `namespace`.
    pub fn new(
        client: Client,
        namespace: impl Into<String>,
        secret_prefix: impl Into<String>,
        minter: Arc<dyn TokenMinter>,
    ) -> Self {
        Self {
            client,
            namespace: namespace.into(),
            secret_prefix: secret_prefix.into(),
            minter,
        }
    }

    fn api(&self) -> Api<Secret> {
        Api::namespaced(self.client.clone(), &self.namespace)
    }

    fn name(&self, installation: &InstallationRef) -> String {
        secret_name_for(&self.secret_prefix, installation.id)
    }
}

/// Builds the token secret object.
#[must_use]
pub fn token_secret(name: &str, installation: &InstallationRef, token: &SecretString) -> Secret {
    let mut string_data = BTreeMap::new();
    string_data.insert(TOKEN_KEY.to_string(), token.expose_secret().to_string());
    if let Some(account) = &installation.account {
        string_data.insert(ORG_NAME_KEY.to_string(), account.clone());
    }

    let labels = BTreeMap::from([(
        "app.kubernetes.io/created-by".to_string(),
        "copilot-ops-bot".to_string(),
    )]);

    Secret {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            labels: Some(labels),
            ..ObjectMeta::default()
        },
        type_: Some("Opaque".to_string()),
        string_data: Some(string_data),
        ..Secret::default()
    }
}

#[async_trait]
impl CredentialStore for KubeCredentialStore {
    #[instrument(skip(self, installation), fields(install = installation.id))]
    async fn create(&self, installation: &InstallationRef) -> crate::Result<()> {
        let token = self.minter.mint(installation.id).await?;
        let name = self.name(installation);
        self.api()
            .create(
                &PostParams::default(),
                &token_secret(&name, installation, &token),
            )
            .await?;
        info!(secret = %name, "Token secret created");
        Ok(())
    }

    #[instrument(skip(self, installation), fields(install = installation.id))]
    async fn update(&self, installation: &InstallationRef) -> crate::Result<()> {
        let token = self.minter.mint(installation.id).await?;
        let name = self.name(installation);
        let patch = Secret {
            string_data: Some(BTreeMap::from([(
                TOKEN_KEY.to_string(),
                token.expose_secret().to_string(),
            )])),
            ..Secret::default()
        };
        self.api()
            .patch(&name, &PatchParams::default(), &Patch::Merge(&patch))
            .await?;
        info!(secret = %name, "Token secret refreshed");
        Ok(())
    }

    #[instrument(skip(self, installation), fields(install = installation.id))]
    async fn delete(&self, installation: &InstallationRef) -> crate::Result<()> {
        let name = self.name(installation);
        self.api().delete(&name, &DeleteParams::default()).await?;
        info!(secret = %name, "Token secret deleted");
        Ok(())
    }
}
