//! Authorization plugin envelopes (JSON).
//!
//! Field names are fixed by the runtime's plugin API (PascalCase). Unknown
//! fields are tolerated because the runtime sends more than the broker reads.

use serde::{Deserialize, Serialize};

/// Name the broker advertises in its activation manifest.
pub const AUTHZ_IMPLEMENTS: &str = "authz";

/// Request the runtime forwards before (and after) serving an API call.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct AuthZRequest {
    /// Authenticated principal. Trusted as given.
    pub user: String,
    #[serde(rename = "UserAuthNMethod")]
    pub user_authn_method: String,
    pub request_method: String,
    #[serde(rename = "RequestURI")]
    pub request_uri: String,
}

/// Verdict returned to the runtime.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct AuthZResponse {
    pub allow: bool,
    #[serde(default)]
    pub msg: String,
    /// Empty on success; populated when the broker failed to decide.
    #[serde(default)]
    pub err: String,
}

impl AuthZResponse {
    pub fn allow(msg: impl Into<String>) -> Self {
        Self { allow: true, msg: msg.into(), err: String::new() }
    }

    pub fn deny(msg: impl Into<String>) -> Self {
        Self { allow: false, msg: msg.into(), err: String::new() }
    }

    pub fn error(err: impl Into<String>) -> Self {
        Self { allow: false, msg: String::new(), err: err.into() }
    }

    pub fn is_error(&self) -> bool {
        !self.err.is_empty()
    }
}

/// Answer to `/Plugin.Activate`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Manifest {
    pub implements: Vec<String>,
}

impl Default for Manifest {
    fn default() -> Self {
        Self { implements: vec![AUTHZ_IMPLEMENTS.to_string()] }
    }
}
