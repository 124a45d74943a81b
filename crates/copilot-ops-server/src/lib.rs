// SPDX-License-Identifier: Apache-2.0

//! Webhook server for copilot-ops-bot.
//!
//! Receives GitHub App deliveries over HTTP, authenticates them, and hands
//! each one to the [`Orchestrator`] on its own task. Also serves `/healthz`
//! and the Prometheus counters on `/metrics`.

pub mod signature;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use axum::Router;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use copilot_ops_core::{
    AppConfig, BotSettings, EventPayload, GitHubApp, KubeCredentialStore, KubeTaskClient,
    MarkdownFormParser, Metrics, Orchestrator, WebhookEvent,
};
use secrecy::SecretString;
use tokio::net::TcpListener;
use tracing::{debug, error, info, warn};

/// Header naming the event type.
pub const EVENT_HEADER: &str = "x-github-event";
/// Header carrying the unique delivery id.
pub const DELIVERY_HEADER: &str = "x-github-delivery";

const METRICS_CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

/// Shared state of the HTTP handlers.
#[derive(Clone)]
pub struct AppState {
    orchestrator: Arc<Orchestrator>,
    metrics: Arc<Metrics>,
    webhook_secret: Option<Arc<SecretString>>,
}

impl AppState {
    /// Creates the handler state. Without a webhook secret, signatures are
    /// not checked.
    pub fn new(
        orchestrator: Arc<Orchestrator>,
        metrics: Arc<Metrics>,
        webhook_secret: Option<SecretString>,
    ) -> Self {
        Self {
            orchestrator,
            metrics,
            webhook_secret: webhook_secret.map(Arc::new),
        }
    }
}

/// Builds the HTTP router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", post(webhook))
        .route("/api/github/webhooks", post(webhook))
        .route("/healthz", get(healthz))
        .route("/metrics", get(metrics))
        .with_state(state)
}

async fn healthz() -> &'static str {
    "OK"
}

async fn metrics(State(state): State<AppState>) -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, METRICS_CONTENT_TYPE)],
        state.metrics.render(),
    )
}

async fn webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> (StatusCode, &'static str) {
    if let Some(secret) = &state.webhook_secret {
        let signature = header_str(&headers, signature::SIGNATURE_HEADER).unwrap_or_default();
        if !signature::verify(secret, &body, signature) {
            warn!("Rejected delivery with invalid signature");
            return (StatusCode::UNAUTHORIZED, "invalid signature");
        }
    }

    let Some(name) = header_str(&headers, EVENT_HEADER) else {
        return (StatusCode::BAD_REQUEST, "missing event header");
    };
    let delivery_id = header_str(&headers, DELIVERY_HEADER).unwrap_or_default();

    let payload: EventPayload = match serde_json::from_slice(&body) {
        Ok(payload) => payload,
        Err(e) => {
            error!(error = %e, event = name, delivery = delivery_id, "Undecodable delivery");
            return (StatusCode::BAD_REQUEST, "invalid payload");
        }
    };

    let event = WebhookEvent::new(name, delivery_id, payload);
    debug!(event = %event.full_name(), delivery = %event.delivery_id, "Delivery received");
    state.orchestrator.record_action(&event);

    let orchestrator = state.orchestrator.clone();
    tokio::spawn(async move {
        orchestrator.dispatch_event(&event).await;
    });

    (StatusCode::ACCEPTED, "accepted")
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

/// Wires the GitHub App and cluster clients, then serves until shutdown.
///
/// # Errors
///
/// Returns an error if the GitHub App credentials are invalid, no cluster
/// configuration is found, or the listener cannot be bound.
pub async fn run(config: AppConfig) -> anyhow::Result<()> {
    let app = Arc::new(
        GitHubApp::from_config(&config.github).context("Failed to configure GitHub App")?,
    );
    let client = kube::Client::try_default()
        .await
        .context("Failed to create Kubernetes client")?;
    let namespace = config
        .kubernetes
        .namespace
        .clone()
        .unwrap_or_else(|| client.default_namespace().to_string());
    info!(namespace = %namespace, "Using namespace");

    let metrics = Arc::new(Metrics::new());
    let orchestrator = Orchestrator::builder()
        .settings(BotSettings::new(
            &config.bot,
            &config.kubernetes.secret_prefix,
        ))
        .parser(Arc::new(MarkdownFormParser::new(
            &config.bot.instruction_field,
        )))
        .trackers(app.clone())
        .credentials(Arc::new(KubeCredentialStore::new(
            client.clone(),
            &namespace,
            &config.kubernetes.secret_prefix,
            app,
        )))
        .tasks(Arc::new(KubeTaskClient::new(client, &namespace)))
        .metrics(metrics.clone())
        .build();

    if config.github.webhook_secret.is_none() {
        warn!("No webhook secret configured, deliveries are not authenticated");
    }
    let state = AppState::new(
        Arc::new(orchestrator),
        metrics,
        config.github.webhook_secret.map(SecretString::from),
    );

    serve(router(state), &config.server.host, config.server.port).await
}

/// Serves the router on `host:port`. Shuts down gracefully on Ctrl+C or
/// SIGTERM.
///
/// # Errors
///
/// Returns an error if the address is invalid or cannot be bound.
pub async fn serve(router: Router, host: &str, port: u16) -> anyhow::Result<()> {
    let addr: SocketAddr = if host.contains(':') {
        format!("[{host}]:{port}")
    } else {
        format!("{host}:{port}")
    }
    .parse()
    .with_context(|| format!("Invalid listen address {host}:{port}"))?;
    let listener = TcpListener::bind(addr).await?;

    info!("Webhook server listening on {}", addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
    info!("Received shutdown signal, shutting down gracefully");
}
