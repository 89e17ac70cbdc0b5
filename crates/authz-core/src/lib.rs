//! authz core: transport-agnostic primitives shared by the broker.
//!
//! This crate holds the route classifier that turns an HTTP method and URL
//! into a canonical action, the plugin and legacy wire formats, and the
//! error surface. It carries no runtime or transport dependencies.
//!
//! # Defensive guarantees
//! Panics, `unwrap`, and `expect` are compile-denied here. Every fallible
//! path surfaces as `AuthzError`/`Result`; a broken route pattern degrades to
//! "never matches" instead of aborting.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod error;
pub mod protocol;
pub mod route;

/// Shared result type.
pub use error::{AuthzError, Result};
pub use route::{classify, RouteClassifier, UNCLASSIFIED};
