//! Decision engine.
//!
//! Exactly one policy is consulted per decision: the first one in the
//! snapshot whose user list names the caller or carries the wildcard. Its
//! action patterns are tried in order. If none matches, the request is
//! denied even when a later policy would have allowed it.

use authz_core::protocol::plugin::AuthZRequest;
use authz_core::route;

use crate::obs::BrokerMetrics;

use super::schema::Policy;
use super::store::{PolicySnapshot, PolicyStore};

/// Verdict plus explanation for the runtime and the audit trail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decision {
    pub allow: bool,
    pub message: String,
    /// Policy that decided, if any applied.
    pub policy: Option<String>,
}

/// Status-only answer of the legacy plain-text endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LegacyStatus {
    Ok,
    Forbidden,
    NotFound,
    BadRequest,
    InternalServerError,
}

impl LegacyStatus {
    pub fn as_u16(self) -> u16 {
        match self {
            LegacyStatus::Ok => 200,
            LegacyStatus::BadRequest => 400,
            LegacyStatus::Forbidden => 403,
            LegacyStatus::NotFound => 404,
            LegacyStatus::InternalServerError => 500,
        }
    }
}

/// What to do with an action pattern that never compiled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OnInvalidPattern {
    /// Log it and treat it as "no match".
    Skip,
    /// Abort the decision.
    Fail,
}

#[derive(Debug)]
enum Verdict<'a> {
    Allowed(&'a Policy),
    ReadonlyViolation(&'a Policy),
    ActionDenied(&'a Policy),
    NoPolicy,
    PatternError { policy: &'a Policy, pattern: &'a str, error: &'a str },
}

fn evaluate<'a>(
    snapshot: &'a PolicySnapshot,
    user: &str,
    action: &str,
    is_get: bool,
    on_invalid: OnInvalidPattern,
) -> Verdict<'a> {
    let Some(policy) = snapshot.policy_for(user) else {
        return Verdict::NoPolicy;
    };

    for matcher in &policy.actions {
        match matcher.matches(action) {
            Ok(true) => {
                if policy.readonly && !is_get {
                    return Verdict::ReadonlyViolation(policy);
                }
                return Verdict::Allowed(policy);
            }
            Ok(false) => {}
            Err(error) => {
                tracing::error!(
                    action,
                    pattern = matcher.pattern(),
                    policy = %policy.name,
                    error,
                    "failed to match action against policy pattern"
                );
                if on_invalid == OnInvalidPattern::Fail {
                    return Verdict::PatternError { policy, pattern: matcher.pattern(), error };
                }
            }
        }
    }

    Verdict::ActionDenied(policy)
}

/// Decide `action` for `user`. `is_get` is whether the request method is GET;
/// readonly policies refuse everything else.
pub fn authorize(snapshot: &PolicySnapshot, user: &str, action: &str, is_get: bool) -> Decision {
    match evaluate(snapshot, user, action, is_get, OnInvalidPattern::Skip) {
        Verdict::Allowed(p) => Decision {
            allow: true,
            message: format!("action '{action}' allowed for user '{user}' by policy '{}'", p.name),
            policy: Some(p.name.clone()),
        },
        Verdict::ReadonlyViolation(p) => Decision {
            allow: false,
            message: format!(
                "action '{action}' not allowed for user '{user}' by readonly policy {}",
                p.name
            ),
            policy: Some(p.name.clone()),
        },
        // Skip mode never yields PatternError; an invalid pattern is just a non-match.
        Verdict::ActionDenied(p) | Verdict::PatternError { policy: p, .. } => Decision {
            allow: false,
            message: format!("action '{action}' denied for user '{user}' by policy '{}'", p.name),
            policy: Some(p.name.clone()),
        },
        Verdict::NoPolicy => Decision {
            allow: false,
            message: format!("no policy applied (user: '{user}' action: '{action}')"),
            policy: None,
        },
    }
}

/// Classify a plugin request and decide it against `snapshot`.
pub fn authorize_request(snapshot: &PolicySnapshot, req: &AuthZRequest) -> (&'static str, Decision) {
    tracing::debug!(method = %req.request_method, uri = %req.request_uri, "received authz request");
    let action = route::classify(&req.request_method, &req.request_uri);
    let decision = authorize(snapshot, &req.user, action, req.request_method == "GET");
    (action, decision)
}

/// Legacy decision against an already loaded snapshot. There is no HTTP
/// method here, so a matching readonly policy always answers Forbidden.
pub fn decide_legacy(snapshot: &PolicySnapshot, username: &str, action: &str) -> LegacyStatus {
    match evaluate(snapshot, username, action, false, OnInvalidPattern::Fail) {
        Verdict::Allowed(_) => LegacyStatus::Ok,
        Verdict::ReadonlyViolation(p) => {
            tracing::warn!(
                "action '{}' not allowed for user '{}' by readonly policy {}",
                action,
                username,
                p.name
            );
            LegacyStatus::Forbidden
        }
        Verdict::ActionDenied(p) => {
            tracing::warn!("action '{}' denied for user '{}' by policy '{}'", action, username, p.name);
            LegacyStatus::Forbidden
        }
        Verdict::NoPolicy => {
            tracing::warn!("no policy applied (user: '{}' action: '{}')", username, action);
            LegacyStatus::NotFound
        }
        Verdict::PatternError { .. } => LegacyStatus::InternalServerError,
    }
}

/// Legacy decision with a synchronous reload of the store's file first.
/// Blocks on file I/O; call it off the async executor.
pub fn authorize_legacy(
    store: &PolicyStore,
    metrics: &BrokerMetrics,
    username: &str,
    action: &str,
) -> LegacyStatus {
    match store.load() {
        Ok(snapshot) => {
            metrics.record_reload("legacy", true);
            metrics.set_policies_loaded(snapshot.len());
            decide_legacy(&snapshot, username, action)
        }
        Err(e) => {
            tracing::error!(error = %e, "failed to load policies");
            metrics.record_reload("legacy", false);
            LegacyStatus::InternalServerError
        }
    }
}
