//! Axum router wiring.

use axum::{routing::get, Router};
use tower_http::timeout::TimeoutLayer;

use crate::{app_state::AppState, ops};

pub fn build_router(state: AppState) -> Router {
    let timeout = state.cfg().request_timeout();
    Router::new()
        .route("/metrics", get(ops::metrics))
        .route("/healthz", get(ops::healthz))
        .layer(TimeoutLayer::new(timeout))
        .with_state(state)
}
