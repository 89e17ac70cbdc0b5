//! Axum router wiring.
//!
//! Plugin protocol routes accept any method; operational routes are GET.

use axum::{
    routing::{any, get},
    Router,
};

use crate::{app_state::AppState, ops, transport::handlers};

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/Plugin.Activate", any(handlers::activate))
        .route("/AuthZPlugin.AuthZReq", any(handlers::authz_request))
        .route("/AuthZPlugin.AuthZRes", any(handlers::authz_response))
        .route("/isulad.auth", any(handlers::legacy_auth))
        .route("/healthz", get(ops::healthz))
        .route("/metrics", get(ops::metrics))
        .with_state(state)
}
