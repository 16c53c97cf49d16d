//! HTTP surface for the ingestion job.
//!
//! A single trigger endpoint, invoked periodically by an external scheduler:
//! `GET`/`POST /ingest` runs the pipeline and answers with the run summary.
//! Any other method on the route gets a `405` from the method router. The
//! JSON body is the only externally observable success signal; operators
//! rely on logs for per-feed diagnosis.

use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::get, Json, Router};
use serde_json::json;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::feed::fetcher::FeedFetcher;
use crate::ingest::{self, RunOptions};
use crate::registry::FeedRegistry;
use crate::storage::Database;

/// Shared state handed to every request handler.
pub struct AppState {
    pub db: Database,
    pub fetcher: FeedFetcher,
    pub registry: FeedRegistry,
    pub options: RunOptions,
}

/// Build the service router.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/ingest", get(run_ingest).post(run_ingest))
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> &'static str {
    "OK"
}

/// Trigger one ingestion run.
///
/// The run contains its own failures (bad feeds, bad items, failed batches
/// all show up in the counters), so the only `5xx` here is an unusable
/// store.
async fn run_ingest(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    if let Err(e) = state.db.ready().await {
        tracing::error!(error = %e, "Article store unavailable");
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "ok": false, "error": e.to_string() })),
        )
            .into_response();
    }

    let stats = ingest::run(&state.db, &state.fetcher, &state.registry, state.options).await;
    Json(json!({ "ok": true, "stats": stats })).into_response()
}
