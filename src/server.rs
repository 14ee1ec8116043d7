//! JSON HTTP facade over the remediation engine.

use anyhow::anyhow;
use axum::{
    extract::State,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use http::StatusCode;
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{info, warn};

use crate::config::{resolve_accounts, EnvironmentProvider, RedactedAccount};
use crate::databricks::AppsClient;
use crate::remediation::Remediator;
use crate::telegram::{templates, Notifier};
use crate::types::AccountConfig;

/// Shared collaborators. Accounts are re-resolved from `env` on every use.
pub struct AppState {
    env: Box<dyn EnvironmentProvider + Send + Sync>,
    apps: AppsClient,
    notifier: Notifier,
}

impl AppState {
    pub fn new<E>(env: E, notifier: Notifier) -> Self
    where
        E: EnvironmentProvider + Send + Sync + 'static,
    {
        Self {
            env: Box::new(env),
            apps: AppsClient::new(),
            notifier,
        }
    }

    pub fn accounts(&self) -> Vec<AccountConfig> {
        resolve_accounts(&*self.env)
    }

    pub fn remediator(&self) -> Remediator<'_> {
        Remediator::new(&self.apps, &self.notifier)
    }

    pub fn notifier(&self) -> &Notifier {
        &self.notifier
    }
}

/// Any handler failure, rendered as a 500.
pub struct ServerError(anyhow::Error);

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "success": false, "error": self.0.to_string() })),
        )
            .into_response()
    }
}

impl<E> From<E> for ServerError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}

pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/status", get(status_handler).fallback(not_found))
        .route("/check", get(check_handler).fallback(not_found))
        .route("/start", post(start_handler).fallback(not_found))
        .route("/config", get(config_handler).fallback(not_found))
        .route(
            "/test-notification",
            post(test_notification_handler).fallback(not_found),
        )
        .fallback(not_found)
        .with_state(state)
}

pub async fn serve(addr: SocketAddr, state: Arc<AppState>) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("listening on {}", listener.local_addr()?);
    axum::serve(listener, build_router(state)).await?;
    Ok(())
}

async fn status_handler(State(state): State<Arc<AppState>>) -> Json<Value> {
    let report = state.remediator().status(&state.accounts()).await;
    Json(json!({ "success": true, "results": report }))
}

async fn check_handler(State(state): State<Arc<AppState>>) -> Json<Value> {
    let results = state.remediator().check_and_start(&state.accounts()).await;
    Json(json!({ "success": true, "results": results }))
}

async fn start_handler(State(state): State<Arc<AppState>>) -> Json<Value> {
    let results = state.remediator().start_stopped(&state.accounts()).await;
    Json(json!({ "success": true, "results": results }))
}

async fn config_handler(State(state): State<Arc<AppState>>) -> Json<Vec<RedactedAccount>> {
    Json(state.accounts().iter().map(RedactedAccount::from).collect())
}

async fn test_notification_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Value>, ServerError> {
    let configured = state.accounts();
    let accounts: Vec<&AccountConfig> = configured
        .iter()
        .filter(|a| a.notifications_enabled())
        .collect();
    if accounts.is_empty() && !configured.is_empty() {
        return Err(anyhow!("no account has Telegram notifications configured").into());
    }

    let message = templates::test();
    let mut failed = Vec::new();
    for account in accounts {
        if !state.notifier().notify(account, &message).await {
            failed.push(account.name.clone());
        }
    }
    if !failed.is_empty() {
        warn!("test notification failed for: {}", failed.join(", "));
        return Err(anyhow!(
            "test notification failed for {}; check the configuration and network",
            failed.join(", ")
        )
        .into());
    }
    Ok(Json(json!({ "success": true })))
}

async fn not_found() -> (StatusCode, Json<Value>) {
    (StatusCode::NOT_FOUND, Json(json!({ "error": "route not found" })))
}
