// SPDX-License-Identifier: Apache-2.0

//! GitHub App authentication.
//!
//! The App authenticates with a JWT signed by its private key and exchanges
//! it for short-lived installation access tokens. Those tokens back both the
//! per-installation issue tracker and the credential secret handed to tasks.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use octocrab::Octocrab;
use octocrab::models::{AppId, InstallationId};
use secrecy::SecretString;
use tracing::{debug, instrument};

use super::{IssueTracker, OctocrabTracker, TokenMinter, TrackerFactory};
use crate::config::GitHubConfig;
use crate::error::BotError;

/// Client authenticated as the GitHub App itself.
#[derive(Debug, Clone)]
pub struct GitHubApp {
    client: Octocrab,
}

impl GitHubApp {
    /// Builds the App client from configuration.
    ///
    /// # Errors
    ///
    /// Returns `BotError::NotAuthenticated` if the App id or key path is
    /// missing, and `BotError::Config` if the key cannot be read or parsed.
    pub fn from_config(config: &GitHubConfig) -> crate::Result<Self> {
        let app_id = config.app_id.ok_or(BotError::NotAuthenticated)?;
        let key_path = config
            .private_key_path
            .as_ref()
            .ok_or(BotError::NotAuthenticated)?;

        let pem = std::fs::read(key_path).map_err(|e| BotError::Config {
            message: format!("failed to read {}: {e}", key_path.display()),
        })?;
        let key = jsonwebtoken::EncodingKey::from_rsa_pem(&pem)?;

        let timeout = Some(Duration::from_secs(config.api_timeout_seconds));
        let client = Octocrab::builder()
            .app(AppId(app_id), key)
            .set_connect_timeout(timeout)
            .set_read_timeout(timeout)
            .build()?;

        debug!(app_id, "GitHub App client ready");
        Ok(Self { client })
    }

    async fn installation(&self, installation_id: u64) -> crate::Result<(Octocrab, SecretString)> {
        let pair = self
            .client
            .installation_and_token(InstallationId(installation_id))
            .await?;
        Ok(pair)
    }
}

#[async_trait]
impl TrackerFactory for GitHubApp {
    #[instrument(skip(self))]
    async fn for_installation(&self, installation_id: u64) -> crate::Result<Arc<dyn IssueTracker>> {
        let (client, _token) = self.installation(installation_id).await?;
        Ok(Arc::new(OctocrabTracker::new(client)))
    }
}

#[async_trait]
impl TokenMinter for GitHubApp {
    #[instrument(skip(self))]
    async fn mint(&self, installation_id: u64) -> crate::Result<SecretString> {
        let (_client, token) = self.installation(installation_id).await?;
        debug!("Minted installation token");
        Ok(token)
    }
}
