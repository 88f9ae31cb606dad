//! Operational HTTP endpoints.
//!
//! - `/metrics` : Prometheus text format
//! - `/healthz` : liveness

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};

use hostmetrics_core::error::ExporterError;
use hostmetrics_core::registry::CONTENT_TYPE;

use crate::app_state::AppState;

pub async fn healthz() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}

pub async fn metrics(State(state): State<AppState>) -> Response {
    let registry = state.registry();
    // sources are pluggable and may block, keep them off the reactor
    let rendered = tokio::task::spawn_blocking(move || registry.render())
        .await
        .unwrap_or_else(|e| Err(ExporterError::Serialization(format!("render task failed: {e}"))));

    match rendered {
        Ok(body) => (StatusCode::OK, [(header::CONTENT_TYPE, CONTENT_TYPE)], body).into_response(),
        Err(e) => error_response(&e),
    }
}

fn error_response(e: &ExporterError) -> Response {
    tracing::error!(code = e.code(), error = %e, "metrics render failed");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        format!("{}: {e}\n", e.code()),
    )
        .into_response()
}
