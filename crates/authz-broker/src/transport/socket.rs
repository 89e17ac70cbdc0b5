//! Plugin socket lifecycle.
//!
//! The runtime discovers plugins by scanning a directory for `<name>.sock`.
//! A socket left behind by a previous run would make `bind` fail, so it is
//! removed first.

use std::fs::{self, DirBuilder, Permissions};
use std::io;
use std::os::unix::fs::{DirBuilderExt, PermissionsExt};
use std::path::Path;

use tokio::net::UnixListener;

use authz_core::error::{AuthzError, Result};

use crate::config::BrokerSection;

const SOCKET_DIR_MODE: u32 = 0o750;

fn io_err(what: &str, path: &Path, e: io::Error) -> AuthzError {
    AuthzError::Internal(format!("{what} {}: {e}", path.display()))
}

/// Remove the socket file, ignoring a missing one.
pub fn remove_socket(path: &Path) -> io::Result<()> {
    match fs::remove_file(path) {
        Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e),
        _ => Ok(()),
    }
}

/// Create the socket directory if needed and bind `<socket_dir>/<plugin_name>.sock`
/// with the configured permission bits.
pub fn bind(cfg: &BrokerSection) -> Result<UnixListener> {
    let mode = cfg.socket_mode_bits()?;
    let dir = cfg.socket_dir.as_path();
    if !dir.exists() {
        DirBuilder::new()
            .recursive(true)
            .mode(SOCKET_DIR_MODE)
            .create(dir)
            .map_err(|e| io_err("create socket dir", dir, e))?;
        fs::set_permissions(dir, Permissions::from_mode(SOCKET_DIR_MODE))
            .map_err(|e| io_err("chmod socket dir", dir, e))?;
    }

    let path = cfg.socket_path();
    remove_socket(&path).map_err(|e| io_err("remove stale socket", &path, e))?;

    let listener = UnixListener::bind(&path).map_err(|e| io_err("bind", &path, e))?;
    fs::set_permissions(&path, Permissions::from_mode(mode))
        .map_err(|e| io_err("chmod", &path, e))?;

    tracing::debug!(path = %path.display(), mode = %format_args!("{mode:o}"), "plugin socket bound");
    Ok(listener)
}
