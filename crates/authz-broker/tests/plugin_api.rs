#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]

use std::fs;
use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use tower::ServiceExt;

use authz_broker::{
    app_state::AppState,
    audit::{require_pair, Auditor},
    config::BrokerConfig,
    obs::BrokerMetrics,
    policy::PolicyStore,
    router,
};
use authz_core::error::Result;
use authz_core::protocol::plugin::{AuthZRequest, AuthZResponse, Manifest};

const POLICIES: &str = r#"{"name":"ops","users":["alice"],"actions":["container_.*"],"readonly":false}
{"name":"viewers","users":[""],"actions":[".*"],"readonly":true}
"#;

#[derive(Default)]
struct RecordingAuditor {
    requests: Mutex<Vec<(String, bool)>>,
    responses: Mutex<usize>,
}

#[async_trait]
impl Auditor for RecordingAuditor {
    async fn audit_request(
        &self,
        req: Option<&AuthZRequest>,
        resp: Option<&AuthZResponse>,
    ) -> Result<()> {
        let (req, resp) = require_pair(req, resp)?;
        self.requests.lock().unwrap().push((req.user.clone(), resp.allow));
        Ok(())
    }

    async fn audit_response(
        &self,
        _req: Option<&AuthZRequest>,
        _resp: Option<&AuthZResponse>,
    ) -> Result<()> {
        *self.responses.lock().unwrap() += 1;
        Ok(())
    }
}

struct Harness {
    app: Router,
    auditor: Arc<RecordingAuditor>,
    metrics: Arc<BrokerMetrics>,
    _dir: tempfile::TempDir,
    policy: std::path::PathBuf,
}

fn harness(policies: &str, reload_per_call: bool) -> Harness {
    let dir = tempfile::tempdir().unwrap();
    let policy = dir.path().join("policy.json");
    fs::write(&policy, policies).unwrap();

    let mut cfg = BrokerConfig::default();
    cfg.policy.file = policy.clone();
    cfg.legacy.reload_per_call = reload_per_call;

    let store = Arc::new(PolicyStore::open(&policy).unwrap());
    let auditor = Arc::new(RecordingAuditor::default());
    let metrics = Arc::new(BrokerMetrics::default());
    let state = AppState::new(cfg, store, auditor.clone(), Arc::clone(&metrics));

    Harness { app: router::build_router(state), auditor, metrics, _dir: dir, policy }
}

async fn post(app: &Router, uri: &str, body: impl Into<Body>) -> (StatusCode, Vec<u8>) {
    let req = Request::builder().method("POST").uri(uri).body(body.into()).unwrap();
    let resp = app.clone().oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = resp.into_body().collect().await.unwrap().to_bytes();
    (status, bytes.to_vec())
}

async fn authz(app: &Router, user: &str, method: &str, uri: &str) -> AuthZResponse {
    let body = serde_json::json!({
        "User": user,
        "UserAuthNMethod": "TLS",
        "RequestMethod": method,
        "RequestURI": uri,
    });
    let (status, bytes) = post(app, "/AuthZPlugin.AuthZReq", body.to_string()).await;
    assert_eq!(status, StatusCode::OK);
    serde_json::from_slice(&bytes).unwrap()
}

fn rewrite(path: &Path, policies: &str) {
    fs::write(path, policies).unwrap();
}

#[tokio::test]
async fn activate_advertises_authz() {
    let h = harness(POLICIES, true);
    let (status, bytes) = post(&h.app, "/Plugin.Activate", Body::empty()).await;
    assert_eq!(status, StatusCode::OK);
    let manifest: Manifest = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(manifest.implements, vec!["authz".to_string()]);
}

#[tokio::test]
async fn named_user_is_allowed_by_matching_policy() {
    let h = harness(POLICIES, true);
    let resp = authz(&h.app, "alice", "GET", "/containers/json").await;
    assert!(resp.allow);
    assert!(!resp.is_error());

    let resp = authz(&h.app, "alice", "POST", "/containers/abc123/start").await;
    assert!(resp.allow);
}

#[tokio::test]
async fn wildcard_readonly_policy_refuses_writes() {
    let h = harness(POLICIES, true);
    let resp = authz(&h.app, "bob", "POST", "/containers/create").await;
    assert!(!resp.allow);
    assert_eq!(
        resp.msg,
        "action 'container_create' not allowed for user 'bob' by readonly policy viewers"
    );

    let resp = authz(&h.app, "bob", "GET", "/images/json").await;
    assert!(resp.allow);
}

#[tokio::test]
async fn user_without_policy_is_denied() {
    let h = harness(r#"{"name":"ops","users":["alice"],"actions":[".*"]}"#, true);
    let resp = authz(&h.app, "carol", "POST", "/containers/abc/stop").await;
    assert!(!resp.allow);
    assert_eq!(resp.msg, "no policy applied (user: 'carol' action: 'container_stop')");
}

#[tokio::test]
async fn decisions_are_audited() {
    let h = harness(POLICIES, true);
    authz(&h.app, "alice", "GET", "/containers/json").await;
    authz(&h.app, "bob", "DELETE", "/images/busybox").await;

    let seen = h.auditor.requests.lock().unwrap().clone();
    assert_eq!(seen, vec![("alice".to_string(), true), ("bob".to_string(), false)]);
    assert_eq!(
        h.metrics.decisions.get(&[("endpoint", "plugin"), ("result", "allow")]),
        1
    );
}

#[tokio::test]
async fn response_phase_is_always_allowed() {
    let h = harness("", true);
    let body = r#"{"User":"nobody","RequestMethod":"POST","RequestURI":"/containers/create"}"#;
    let (status, bytes) = post(&h.app, "/AuthZPlugin.AuthZRes", body).await;
    assert_eq!(status, StatusCode::OK);
    let resp: AuthZResponse = serde_json::from_slice(&bytes).unwrap();
    assert!(resp.allow);
    assert_eq!(*h.auditor.responses.lock().unwrap(), 1);
    assert!(h.auditor.requests.lock().unwrap().is_empty());
}

#[tokio::test]
async fn malformed_request_gets_error_envelope() {
    let h = harness(POLICIES, true);
    let (status, bytes) = post(&h.app, "/AuthZPlugin.AuthZReq", "{not json").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    let resp: AuthZResponse = serde_json::from_slice(&bytes).unwrap();
    assert!(!resp.allow);
    assert!(resp.is_error());
    assert!(h.auditor.requests.lock().unwrap().is_empty());
}

#[tokio::test]
async fn legacy_endpoint_answers_with_status_only() {
    let h = harness(
        r#"{"name":"rw","users":["dave"],"actions":["container_.*"]}
{"name":"ro","users":["erin"],"actions":[".*"],"readonly":true}"#,
        true,
    );
    assert_eq!(post(&h.app, "/isulad.auth", "dave:container_stop").await.0, StatusCode::OK);
    assert_eq!(post(&h.app, "/isulad.auth", "dave:image_pull").await.0, StatusCode::FORBIDDEN);
    assert_eq!(post(&h.app, "/isulad.auth", "erin:container_list").await.0, StatusCode::FORBIDDEN);
    assert_eq!(post(&h.app, "/isulad.auth", "zed:container_list").await.0, StatusCode::NOT_FOUND);
    assert_eq!(post(&h.app, "/isulad.auth", "invalid").await.0, StatusCode::BAD_REQUEST);
    assert_eq!(post(&h.app, "/isulad.auth", "a:b:c").await.0, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn legacy_endpoint_reloads_and_publishes() {
    let h = harness(POLICIES, true);
    assert!(authz(&h.app, "alice", "POST", "/containers/abc/stop").await.allow);

    rewrite(&h.policy, r#"{"name":"viewers","users":[""],"actions":[".*"],"readonly":true}"#);
    assert_eq!(post(&h.app, "/isulad.auth", "alice:container_stop").await.0, StatusCode::FORBIDDEN);

    // The reload done for the legacy call is visible to the plugin endpoint.
    let resp = authz(&h.app, "alice", "POST", "/containers/abc/stop").await;
    assert!(!resp.allow);
    assert!(resp.msg.contains("readonly policy viewers"));

    fs::remove_file(&h.policy).unwrap();
    assert_eq!(
        post(&h.app, "/isulad.auth", "alice:container_stop").await.0,
        StatusCode::INTERNAL_SERVER_ERROR
    );
    assert!(authz(&h.app, "alice", "GET", "/containers/json").await.allow);

    let reloads = |outcome| h.metrics.policy_reloads.get(&[("trigger", "legacy"), ("outcome", outcome)]);
    assert_eq!(reloads("ok"), 1);
    assert_eq!(reloads("error"), 1);
    assert_eq!(h.metrics.policies_loaded.get(&[]), 1);
}

#[tokio::test]
async fn legacy_endpoint_can_use_current_snapshot() {
    let h = harness(POLICIES, false);
    rewrite(&h.policy, "");
    assert_eq!(post(&h.app, "/isulad.auth", "alice:container_stop").await.0, StatusCode::OK);
}

#[tokio::test]
async fn ops_endpoints() {
    let h = harness(POLICIES, true);
    authz(&h.app, "alice", "GET", "/containers/json").await;

    let req = Request::builder().uri("/healthz").body(Body::empty()).unwrap();
    let resp = h.app.clone().oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body = resp.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(&body[..], b"ok policies=2");

    let req = Request::builder().uri("/metrics").body(Body::empty()).unwrap();
    let resp = h.app.clone().oneshot(req).await.unwrap();
    let body = resp.into_body().collect().await.unwrap().to_bytes();
    let text = String::from_utf8(body.to_vec()).unwrap();
    assert!(text.contains("authz_decisions_total{endpoint=\"plugin\",result=\"allow\"} 1"));
    assert!(text.contains("authz_policies_loaded 2"));
}

#[tokio::test]
async fn plugin_routes_accept_any_method() {
    let h = harness(POLICIES, true);
    let req = Request::builder().method("GET").uri("/Plugin.Activate").body(Body::empty()).unwrap();
    let resp = h.app.clone().oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let req = Request::builder()
        .method("PUT")
        .uri("/isulad.auth")
        .body(Body::from("alice:container_stop"))
        .unwrap();
    let resp = h.app.clone().oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
}
