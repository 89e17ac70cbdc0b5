//! Legacy plain-text authorization body: `username:action`.

use crate::error::{AuthzError, Result};

/// Parsed legacy request. Exactly one `:` separates the two halves; no
/// trimming is applied to either.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LegacyRequest {
    pub username: String,
    pub action: String,
}

impl LegacyRequest {
    pub fn parse(body: &str) -> Result<Self> {
        let mut parts = body.split(':');
        match (parts.next(), parts.next(), parts.next()) {
            (Some(username), Some(action), None) => Ok(Self {
                username: username.to_string(),
                action: action.to_string(),
            }),
            _ => Err(AuthzError::BadRequest(format!(
                "expected username:action, got {} separator(s)",
                body.matches(':').count()
            ))),
        }
    }
}
