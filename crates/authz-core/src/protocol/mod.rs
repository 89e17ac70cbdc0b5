//! Wire formats spoken with the container runtime.
//!
//! - Plugin protocol: JSON envelopes exchanged on `/AuthZPlugin.*` routes.
//! - Legacy protocol: a plain-text `username:action` body answered with a bare
//!   status code.
//!
//! Parsers here never panic; malformed input is reported as `AuthzError`.

pub mod legacy;
pub mod plugin;
