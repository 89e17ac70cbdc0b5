//! Transport layer: plugin protocol handlers served over a unix socket.

pub mod handlers;
#[cfg(unix)]
pub mod socket;
