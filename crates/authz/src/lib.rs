//! Top-level facade crate for the authz broker.
//!
//! Re-exports the core types and the broker library so users can depend on a single crate.

pub mod core {
    pub use authz_core::*;
}

pub mod broker {
    pub use authz_broker::*;
}
