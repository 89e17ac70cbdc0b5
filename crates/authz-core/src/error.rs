//! Shared error type across authz crates.

use std::path::PathBuf;

use thiserror::Error;

/// Client-facing error codes (stable API).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientCode {
    /// Invalid input / malformed message.
    BadRequest,
    /// Policy file could not be read.
    PolicyUnavailable,
    /// Policy content rejected.
    InvalidPolicy,
    /// Broker configuration rejected.
    InvalidConfig,
    /// Audit collaborator refused the record.
    AuditFailed,
    /// Internal server error.
    Internal,
}

impl ClientCode {
    /// String representation used in logs and JSON responses.
    pub fn as_str(self) -> &'static str {
        match self {
            ClientCode::BadRequest => "BAD_REQUEST",
            ClientCode::PolicyUnavailable => "POLICY_UNAVAILABLE",
            ClientCode::InvalidPolicy => "INVALID_POLICY",
            ClientCode::InvalidConfig => "INVALID_CONFIG",
            ClientCode::AuditFailed => "AUDIT_FAILED",
            ClientCode::Internal => "INTERNAL",
        }
    }

    /// HTTP status the transport answers with when this code escapes a handler.
    pub fn http_status(self) -> u16 {
        match self {
            ClientCode::BadRequest => 400,
            _ => 500,
        }
    }
}

/// Shared result type.
pub type Result<T> = std::result::Result<T, AuthzError>;

/// Unified error type used by core and broker.
#[derive(Debug, Error)]
pub enum AuthzError {
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("read policy file {path:?}: {source}")]
    PolicyRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid policy: {0}")]
    InvalidPolicy(String),
    #[error("invalid config: {0}")]
    InvalidConfig(String),
    #[error("audit: {0}")]
    Audit(String),
    #[error("internal: {0}")]
    Internal(String),
}

impl AuthzError {
    /// Map internal error to a stable client-facing code.
    pub fn client_code(&self) -> ClientCode {
        match self {
            AuthzError::BadRequest(_) => ClientCode::BadRequest,
            AuthzError::PolicyRead { .. } => ClientCode::PolicyUnavailable,
            AuthzError::InvalidPolicy(_) => ClientCode::InvalidPolicy,
            AuthzError::InvalidConfig(_) => ClientCode::InvalidConfig,
            AuthzError::Audit(_) => ClientCode::AuditFailed,
            AuthzError::Internal(_) => ClientCode::Internal,
        }
    }
}
