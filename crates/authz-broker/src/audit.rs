//! Audit collaborator.
//!
//! Every decided plugin request is handed to an [`Auditor`]. A record needs
//! both the request and the verdict; an incomplete pair is refused and
//! nothing is written.

use async_trait::async_trait;

use authz_core::error::{AuthzError, Result};
use authz_core::protocol::plugin::{AuthZRequest, AuthZResponse};

/// Tracing target audit records are emitted under.
pub const AUDIT_TARGET: &str = "audit";

#[async_trait]
pub trait Auditor: Send + Sync {
    async fn audit_request(
        &self,
        req: Option<&AuthZRequest>,
        resp: Option<&AuthZResponse>,
    ) -> Result<()>;

    async fn audit_response(
        &self,
        req: Option<&AuthZRequest>,
        resp: Option<&AuthZResponse>,
    ) -> Result<()>;
}

/// Pair up request and verdict or explain why not.
pub fn require_pair<'a>(
    req: Option<&'a AuthZRequest>,
    resp: Option<&'a AuthZResponse>,
) -> Result<(&'a AuthZRequest, &'a AuthZResponse)> {
    match (req, resp) {
        (Some(req), Some(resp)) => Ok((req, resp)),
        _ => Err(AuthzError::Audit("authorization request or response is nil".into())),
    }
}

/// Writes one structured event per request on the [`AUDIT_TARGET`] target.
/// Responses are not recorded.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingAuditor;

#[async_trait]
impl Auditor for TracingAuditor {
    async fn audit_request(
        &self,
        req: Option<&AuthZRequest>,
        resp: Option<&AuthZResponse>,
    ) -> Result<()> {
        let (req, resp) = require_pair(req, resp)?;
        tracing::info!(
            target: AUDIT_TARGET,
            method = %req.request_method,
            uri = %req.request_uri,
            user = %req.user,
            allow = resp.allow,
            msg = %resp.msg,
            err = %resp.err,
            "Request"
        );
        Ok(())
    }

    async fn audit_response(
        &self,
        _req: Option<&AuthZRequest>,
        _resp: Option<&AuthZResponse>,
    ) -> Result<()> {
        Ok(())
    }
}
