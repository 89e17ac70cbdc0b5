//! Operational HTTP endpoints.
//!
//! - `/healthz` : liveness, reports how many policies are active
//! - `/metrics` : Prometheus text format

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};

use crate::app_state::AppState;

pub async fn healthz(State(state): State<AppState>) -> impl IntoResponse {
    (StatusCode::OK, format!("ok policies={}", state.store().snapshot().len()))
}

pub async fn metrics(State(state): State<AppState>) -> Response {
    let metrics = state.metrics();
    metrics.set_policies_loaded(state.store().snapshot().len());
    let body = metrics.render();

    (
        StatusCode::OK,
        [(axum::http::header::CONTENT_TYPE, "text/plain; version=0.0.4; charset=utf-8")],
        body,
    )
        .into_response()
}
