//! REST handlers.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Json, Response},
};
use chrono::Utc;
use serde::Deserialize;
use tracing::warn;

use muckrake_common::types::*;
use muckrake_common::MuckrakeError;
use muckrake_engine::publish::load_pool;
use muckrake_engine::scoring::compute_preview;
use muckrake_store::records;

use crate::auth::{check_admin_auth, ApiUser};
use crate::AppState;

// --- Request bodies ---

#[derive(Deserialize)]
pub struct IngestRequest {
    #[serde(default)]
    pub mode: IngestMode,
}

#[derive(Deserialize)]
pub struct SubmitRequest {
    pub grid: Grid,
    pub stats: StatsSnapshot,
}

#[derive(Deserialize)]
pub struct PublishRequest {
    pub grid: Grid,
    pub stats: StatsSnapshot,
    pub name: String,
}

// --- Error mapping ---

fn error_response(err: &MuckrakeError) -> Response {
    let status = match err {
        MuckrakeError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
        MuckrakeError::AlreadyPublished { .. } => StatusCode::CONFLICT,
        MuckrakeError::NotFound(_) => StatusCode::NOT_FOUND,
        MuckrakeError::Unauthenticated => StatusCode::UNAUTHORIZED,
        MuckrakeError::Network(_) => StatusCode::BAD_GATEWAY,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, Json(serde_json::json!({ "error": err.to_string() }))).into_response()
}

fn admin_gate(state: &AppState, headers: &axum::http::HeaderMap) -> Option<Response> {
    if check_admin_auth(
        headers,
        &state.config.admin_username,
        &state.config.admin_password,
    ) {
        return None;
    }
    Some(
        Response::builder()
            .status(StatusCode::UNAUTHORIZED)
            .header(header::WWW_AUTHENTICATE, "Basic realm=\"admin\"")
            .body(axum::body::Body::from("Unauthorized"))
            .expect("static response")
            .into_response(),
    )
}

// --- Handlers ---

/// POST /api/ingest — start (or coalesce to) an ingestion run.
pub async fn api_ingest(
    State(state): State<Arc<AppState>>,
    headers: axum::http::HeaderMap,
    Json(body): Json<IngestRequest>,
) -> impl IntoResponse {
    if let Some(denied) = admin_gate(&state, &headers) {
        return denied;
    }

    match state.orchestrator.trigger(body.mode).await {
        Ok(job_id) => (
            StatusCode::ACCEPTED,
            Json(serde_json::json!({ "job_id": job_id })),
        )
            .into_response(),
        Err(e) => {
            warn!(error = %e, "ingest trigger failed");
            error_response(&e)
        }
    }
}

/// GET /api/jobs/{id} — live job status for polling clients.
pub async fn api_job_status(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    match state.orchestrator.job_status(&id).await {
        Ok(job) => Json(job).into_response(),
        Err(e) => error_response(&e),
    }
}

/// GET /api/ingest/runs — the scheduler's recent-run ring buffer.
pub async fn api_ingest_runs(
    State(state): State<Arc<AppState>>,
    headers: axum::http::HeaderMap,
) -> impl IntoResponse {
    if let Some(denied) = admin_gate(&state, &headers) {
        return denied;
    }
    Json(serde_json::json!({ "runs": state.run_history.recent() })).into_response()
}

/// GET /api/editions/today — the current article pool.
pub async fn api_edition_today(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let today = Utc::now().date_naive();
    let edition = match records::edition_for_date(state.store.as_ref(), today).await {
        Ok(Some(edition)) => edition,
        Ok(None) => {
            return error_response(&MuckrakeError::NotFound(format!("no edition for {today}")));
        }
        Err(e) => return error_response(&e.into()),
    };

    match records::articles_for_edition(state.store.as_ref(), &edition.id).await {
        Ok(articles) => Json(serde_json::json!({
            "edition": edition,
            "articles": articles,
        }))
        .into_response(),
        Err(e) => error_response(&e.into()),
    }
}

/// POST /api/submit — preview a layout. Pure; no side effects, no identity
/// required.
pub async fn api_submit(
    State(state): State<Arc<AppState>>,
    Json(body): Json<SubmitRequest>,
) -> impl IntoResponse {
    let today = Utc::now().date_naive();
    let (articles, ads) = match load_pool(state.store.as_ref(), today).await {
        Ok(pool) => pool,
        Err(e) => return error_response(&e),
    };

    let result = compute_preview(&body.grid, &articles, &ads, body.stats, &state.coefficients);
    Json(result).into_response()
}

/// POST /api/publish — finalize today's front page for the caller.
pub async fn api_publish(
    State(state): State<Arc<AppState>>,
    user: ApiUser,
    Json(body): Json<PublishRequest>,
) -> impl IntoResponse {
    match state
        .guard
        .publish(&user.user_id, &body.grid, body.stats, &body.name)
        .await
    {
        Ok(published) => (
            StatusCode::CREATED,
            Json(serde_json::json!({ "id": published.id })),
        )
            .into_response(),
        Err(e) => error_response(&e),
    }
}
