//! authz-broker library entry.
//!
//! Wires the policy store, decision engine, audit sink and plugin transport
//! into the broker served by `main.rs`. Integration tests drive the router
//! built here directly.

pub mod app_state;
pub mod audit;
pub mod cli;
pub mod config;
pub mod obs;
pub mod ops;
#[cfg(unix)]
pub mod pidfile;
pub mod policy;
pub mod reload;
pub mod router;
pub mod transport;
