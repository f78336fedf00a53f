use crate::core::{ReconciledRate, SourceAttemptReport, WalletRate};
use crate::updater::{SourcesStatus, UpdateCoordinator};
use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Value, json};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info};

/// Application state shared across handlers
pub struct AppState {
    pub coordinator: UpdateCoordinator,
}

type ApiError = (StatusCode, Json<Value>);

fn internal_error(e: anyhow::Error) -> ApiError {
    error!("Request failed: {e:#}");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "detail": format!("{e:#}") })),
    )
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/wallets", get(list_wallets))
        .route("/wallets/{id}", get(get_wallet))
        .route("/update", post(manual_update))
        .route("/sources/status", get(sources_status))
        .route("/status", get(status))
        .layer(CorsLayer::new().allow_origin(Any))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// GET /wallets - All persisted wallet records
async fn list_wallets(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<WalletRate>>, ApiError> {
    state
        .coordinator
        .repository()
        .list()
        .await
        .map(Json)
        .map_err(internal_error)
}

/// GET /wallets/{id} - One wallet, 404 when never computed
async fn get_wallet(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<WalletRate>, ApiError> {
    match state.coordinator.repository().get(&id).await {
        Ok(Some(wallet)) => Ok(Json(wallet)),
        Ok(None) => Err((
            StatusCode::NOT_FOUND,
            Json(json!({ "detail": "Billetera no encontrada" })),
        )),
        Err(e) => Err(internal_error(e)),
    }
}

/// Query flags accept `true/false`, `1/0`, `yes/no` and `on/off`.
fn query_flag<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    let raw = String::deserialize(deserializer)?;
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" | "" => Ok(false),
        other => Err(serde::de::Error::custom(format!("invalid boolean flag: {other}"))),
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateQuery {
    #[serde(default, deserialize_with = "query_flag")]
    debug: bool,
}

#[derive(Debug, Serialize)]
pub struct UpdateResponse {
    pub updated: usize,
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sources: Option<Vec<SourceAttemptReport>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wallets: Option<Vec<ReconciledRate>>,
}

/// POST /update?debug=bool - Run an update cycle
async fn manual_update(
    State(state): State<Arc<AppState>>,
    Query(query): Query<UpdateQuery>,
) -> Json<UpdateResponse> {
    info!(debug = query.debug, "Manual update requested");
    let report = state.coordinator.update_all().await;
    let updated = report.wallets.len();

    let (sources, wallets) = if query.debug {
        (Some(report.sources), Some(report.wallets))
    } else {
        (None, None)
    };
    Json(UpdateResponse {
        updated,
        timestamp: Utc::now(),
        sources,
        wallets,
    })
}

#[derive(Debug, Default, Deserialize)]
pub struct StatusQuery {
    #[serde(default, deserialize_with = "query_flag")]
    probe: bool,
}

/// GET /sources/status?probe=bool - Source metadata, or a live diagnostic run
async fn sources_status(
    State(state): State<Arc<AppState>>,
    Query(query): Query<StatusQuery>,
) -> Json<SourcesStatus> {
    Json(state.coordinator.sources_status(query.probe).await)
}

/// GET /status - Liveness
async fn status() -> Json<Value> {
    Json(json!({ "status": "ok", "timestamp": Utc::now() }))
}

/// Binds the configured port and serves until the process stops.
pub async fn serve(state: Arc<AppState>, port: u16) -> anyhow::Result<()> {
    let app = router(state);
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{port}")).await?;
    info!("Wallet rates API listening on port {}", port);
    axum::serve(listener, app).await?;
    Ok(())
}
