//! Policy layer: file format, snapshot store, decision engine.
//!
//! Policies are compiled once per load into matcher objects and published as
//! an immutable snapshot; decisions read whichever snapshot is current.

pub mod engine;
pub mod schema;
pub mod store;

pub use engine::{authorize, authorize_legacy, authorize_request, decide_legacy, Decision, LegacyStatus};
pub use schema::{ActionMatcher, LineFault, Policy, PolicyLineError, PolicySpec};
pub use store::{read_snapshot, DuplicateUser, LoadDiagnostics, PolicySnapshot, PolicyStore};
