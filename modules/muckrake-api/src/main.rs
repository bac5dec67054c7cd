use std::sync::Arc;

use anyhow::Result;
use axum::{
    routing::{get, post},
    Router,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

use muckrake_common::Config;
use muckrake_engine::{PublishGuard, ScoringCoefficients};
use muckrake_ingest::{AiGenerator, IngestOrchestrator, IngestScheduler, RssFeedSource, RunHistory};
use muckrake_store::{PocketBaseStore, RecordStore};

mod auth;
mod rest;

pub struct AppState {
    pub config: Config,
    pub store: Arc<dyn RecordStore>,
    pub orchestrator: IngestOrchestrator,
    pub guard: PublishGuard<Arc<dyn RecordStore>>,
    pub coefficients: ScoringCoefficients,
    pub run_history: RunHistory,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("muckrake=info".parse()?))
        .init();

    let config = Config::from_env();

    let store: Arc<dyn RecordStore> = Arc::new(PocketBaseStore::new(
        &config.pocketbase_url,
        &config.pocketbase_token,
    ));

    let orchestrator = IngestOrchestrator::new(
        store.clone(),
        Arc::new(RssFeedSource::new(&config.feed_url)),
        Arc::new(AiGenerator::new(&config.anthropic_api_key, &config.model)),
        config.max_items_per_run,
    );

    let scheduler = IngestScheduler::new(
        orchestrator.clone(),
        store.clone(),
        config.ingest_interval_minutes,
    );
    let run_history = scheduler.history();
    if config.scheduler_enabled() {
        scheduler.start();
    }

    let state = Arc::new(AppState {
        store: store.clone(),
        orchestrator,
        guard: PublishGuard::new(store),
        coefficients: ScoringCoefficients::v1(),
        run_history,
        config: config.clone(),
    });

    let app = Router::new()
        // Health check
        .route("/", get(|| async { "ok" }))
        // Ingestion
        .route("/api/ingest", post(rest::api_ingest))
        .route("/api/ingest/runs", get(rest::api_ingest_runs))
        .route("/api/jobs/{id}", get(rest::api_job_status))
        // Game
        .route("/api/editions/today", get(rest::api_edition_today))
        .route("/api/submit", post(rest::api_submit))
        .route("/api/publish", post(rest::api_publish))
        .with_state(state)
        // CORS
        .layer(
            tower_http::cors::CorsLayer::new()
                .allow_origin(tower_http::cors::Any)
                .allow_methods(tower_http::cors::Any)
                .allow_headers(tower_http::cors::Any),
        )
        // Logging layer: method + path + status + latency only
        .layer(
            tower_http::trace::TraceLayer::new_for_http().make_span_with(
                |request: &axum::http::Request<_>| {
                    tracing::info_span!(
                        "http_request",
                        method = %request.method(),
                        path = %request.uri().path(),
                    )
                },
            ),
        );

    let addr = format!("{}:{}", config.web_host, config.web_port);
    info!("Muckrake API starting on {addr}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
