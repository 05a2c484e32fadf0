//! HTTP trigger/health edge (spec §6 "HTTP trigger edge"): `GET /` liveness, `POST
//! /translate` triggers [`IngestStage::run_once`] and returns the queued recipe ids.
//!
//! Grounded on the teacher's `web` crate conventions: a small `axum::Router` built from
//! a cloneable state handle, `tower_http::trace::TraceLayer` for request logging,
//! graceful shutdown driven from `main` exactly as `examples/ticketing/src/main.rs`
//! does.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use polygo_core::StreamBroker;
use polygo_stages::IngestStage;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

/// Shared state handed to every handler. Cheap to clone: just an `Arc`.
struct HttpState<B: StreamBroker> {
    ingest: Arc<IngestStage<B>>,
}

impl<B: StreamBroker> Clone for HttpState<B> {
    fn clone(&self) -> Self {
        HttpState { ingest: Arc::clone(&self.ingest) }
    }
}

/// Build the router over `ingest`. `B` is pinned to the concrete broker type the
/// caller's `IngestStage` was built with (`polygo-streams::RedisStreamBroker` in
/// production, a test double in tests).
#[must_use]
pub fn build_router<B: StreamBroker + 'static>(ingest: Arc<IngestStage<B>>) -> Router {
    let state = HttpState { ingest };
    Router::new()
        .route("/", get(health))
        .route("/translate", post(trigger_translate::<B>))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[allow(clippy::unused_async)]
async fn health() -> &'static str {
    "polygo is running"
}

async fn trigger_translate<B: StreamBroker + 'static>(State(state): State<HttpState<B>>) -> Response {
    match state.ingest.run_once().await {
        Ok(stories) => Json(serde_json::json!({ "stories": stories })).into_response(),
        Err(e) => {
            tracing::error!(error = %e, "ingest trigger failed");
            (StatusCode::BAD_GATEWAY, e.to_string()).into_response()
        }
    }
}
