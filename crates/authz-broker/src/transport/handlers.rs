//! Plugin protocol handlers.
//!
//! - `/Plugin.Activate`      : manifest
//! - `/AuthZPlugin.AuthZReq` : classify + decide + audit
//! - `/AuthZPlugin.AuthZRes` : always allow, audit as response
//! - `/isulad.auth`          : legacy `username:action`, status only

use std::time::Instant;

use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

use authz_core::protocol::legacy::LegacyRequest;
use authz_core::protocol::plugin::{AuthZRequest, AuthZResponse, Manifest};

use crate::app_state::AppState;
use crate::policy::{self, LegacyStatus};

pub async fn activate() -> Json<Manifest> {
    Json(Manifest::default())
}

/// Malformed envelopes get an `Err` body, never a verdict.
fn error_reply(err: impl Into<String>) -> Response {
    (StatusCode::INTERNAL_SERVER_ERROR, Json(AuthZResponse::error(err))).into_response()
}

fn parse_request(body: &[u8]) -> Result<AuthZRequest, String> {
    serde_json::from_slice(body).map_err(|e| format!("invalid authz request: {e}"))
}

pub async fn authz_request(State(app): State<AppState>, body: Bytes) -> Response {
    let req = match parse_request(&body) {
        Ok(r) => r,
        Err(e) => {
            tracing::warn!(error = %e, "rejecting malformed authz request");
            return error_reply(e);
        }
    };

    let started = Instant::now();
    let snapshot = app.store().snapshot();
    let (action, decision) = policy::authorize_request(&snapshot, &req);
    tracing::debug!(action, allow = decision.allow, "{}", decision.message);

    let metrics = app.metrics();
    metrics.decision_duration.observe(&[("endpoint", "plugin")], started.elapsed());
    let result = if decision.allow { "allow" } else { "deny" };
    metrics.decisions.inc(&[("endpoint", "plugin"), ("result", result)]);

    let resp = if decision.allow {
        AuthZResponse::allow(decision.message)
    } else {
        AuthZResponse::deny(decision.message)
    };

    if let Err(e) = app.auditor().audit_request(Some(&req), Some(&resp)).await {
        tracing::error!(error = %e, "failed to audit request");
        metrics.audit_failures.inc(&[("kind", "request")]);
    }

    Json(resp).into_response()
}

pub async fn authz_response(State(app): State<AppState>, body: Bytes) -> Response {
    let req = match parse_request(&body) {
        Ok(r) => r,
        Err(e) => return error_reply(e),
    };

    let resp = AuthZResponse::allow(String::new());
    if let Err(e) = app.auditor().audit_response(Some(&req), Some(&resp)).await {
        tracing::error!(error = %e, "failed to audit response");
        app.metrics().audit_failures.inc(&[("kind", "response")]);
    }

    Json(resp).into_response()
}

fn status_code(status: LegacyStatus) -> StatusCode {
    match status {
        LegacyStatus::Ok => StatusCode::OK,
        LegacyStatus::Forbidden => StatusCode::FORBIDDEN,
        LegacyStatus::NotFound => StatusCode::NOT_FOUND,
        LegacyStatus::BadRequest => StatusCode::BAD_REQUEST,
        LegacyStatus::InternalServerError => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

pub async fn legacy_auth(State(app): State<AppState>, body: Bytes) -> StatusCode {
    let started = Instant::now();
    let status = legacy_status(&app, &body).await;

    let metrics = app.metrics();
    metrics.decision_duration.observe(&[("endpoint", "legacy")], started.elapsed());
    metrics
        .decisions
        .inc(&[("endpoint", "legacy"), ("result", &status.as_u16().to_string())]);

    status_code(status)
}

async fn legacy_status(app: &AppState, body: &[u8]) -> LegacyStatus {
    let text = String::from_utf8_lossy(body);
    let req = match LegacyRequest::parse(&text) {
        Ok(r) => r,
        Err(e) => {
            tracing::error!(error = %e, "bad format");
            return LegacyStatus::BadRequest;
        }
    };

    let store = app.store();
    if !app.cfg().legacy.reload_per_call {
        return policy::decide_legacy(&store.snapshot(), &req.username, &req.action);
    }

    let metrics = app.metrics();
    let joined = tokio::task::spawn_blocking(move || {
        policy::authorize_legacy(&store, &metrics, &req.username, &req.action)
    })
    .await;

    joined.unwrap_or_else(|e| {
        tracing::error!(error = %e, "legacy authorization task failed");
        LegacyStatus::InternalServerError
    })
}
