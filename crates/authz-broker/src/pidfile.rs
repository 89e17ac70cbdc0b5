//! Pid file guarding against a second broker on the same host.
//!
//! A file naming a live process blocks startup. A file left behind by a dead
//! process is replaced.

use std::fs::{self, OpenOptions, Permissions};
use std::io::{self, Write};
use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};
use std::path::{Path, PathBuf};

use authz_core::error::{AuthzError, Result};

const PID_FILE_MODE: u32 = 0o640;

#[derive(Debug)]
pub struct PidFile {
    path: PathBuf,
}

fn process_alive(pid: u32) -> bool {
    Path::new("/proc").join(pid.to_string()).exists()
}

/// Pid recorded in an existing file, if it names a running process.
fn running_pid(path: &Path) -> Option<u32> {
    let content = fs::read_to_string(path).ok()?;
    let pid: u32 = content.trim().parse().ok()?;
    process_alive(pid).then_some(pid)
}

impl PidFile {
    /// Write the current pid to `path` (mode 0640), refusing when the file
    /// already names a live process.
    pub fn create(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if let Some(pid) = running_pid(&path) {
            return Err(AuthzError::Internal(format!(
                "pid file {} found (pid {pid}), ensure authz-broker is not running or delete it",
                path.display()
            )));
        }
        remove_if_present(&path).map_err(|e| io_err("remove stale pid file", &path, e))?;

        let mut file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .mode(PID_FILE_MODE)
            .open(&path)
            .map_err(|e| io_err("create pid file", &path, e))?;
        writeln!(file, "{}", std::process::id()).map_err(|e| io_err("write pid file", &path, e))?;
        // umask may have narrowed the create mode
        fs::set_permissions(&path, Permissions::from_mode(PID_FILE_MODE))
            .map_err(|e| io_err("chmod pid file", &path, e))?;

        tracing::debug!(path = %path.display(), "pid file written");
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn remove(self) -> io::Result<()> {
        remove_if_present(&self.path)
    }
}

fn remove_if_present(path: &Path) -> io::Result<()> {
    match fs::remove_file(path) {
        Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e),
        _ => Ok(()),
    }
}

fn io_err(what: &str, path: &Path, e: io::Error) -> AuthzError {
    AuthzError::Internal(format!("{what} {}: {e}", path.display()))
}
