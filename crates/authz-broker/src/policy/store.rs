//! Policy store: the active snapshot and its atomic replacement.
//!
//! A load either builds a complete new snapshot and swaps it in, or fails
//! before touching the current one. Readers clone the `Arc` and keep using
//! whatever snapshot they grabbed, even if a reload lands meanwhile.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use authz_core::error::{AuthzError, Result};

use super::schema::{Policy, PolicyLineError, PolicySpec};

/// A user listed by more than one policy. Only the first one in file order
/// is ever consulted for that user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DuplicateUser {
    pub user: String,
    pub first_policy: String,
    pub policy: String,
}

/// What a load noticed besides the policies themselves.
#[derive(Debug, Default)]
pub struct LoadDiagnostics {
    pub skipped: Vec<PolicyLineError>,
    pub duplicate_users: Vec<DuplicateUser>,
}

/// Immutable, ordered set of policies.
#[derive(Debug, Default)]
pub struct PolicySnapshot {
    policies: Vec<Policy>,
    diagnostics: LoadDiagnostics,
}

impl PolicySnapshot {
    pub fn new(policies: Vec<Policy>) -> Self {
        let duplicate_users = find_duplicate_users(&policies);
        Self {
            policies,
            diagnostics: LoadDiagnostics { skipped: Vec::new(), duplicate_users },
        }
    }

    /// Parse newline-delimited JSON policies. Empty lines are ignored;
    /// anything else that does not parse, including whitespace-only and
    /// non-UTF-8 lines, is logged and skipped.
    pub fn parse(text: &str) -> Self {
        Self::parse_bytes(text.as_bytes())
    }

    pub fn parse_bytes(raw: &[u8]) -> Self {
        let mut policies = Vec::new();
        let mut skipped = Vec::new();

        for (idx, line) in raw.split(|b| *b == b'\n').enumerate() {
            let line = line.strip_suffix(b"\r").unwrap_or(line);
            if line.is_empty() {
                continue;
            }
            match PolicySpec::parse_bytes(line, idx + 1) {
                Ok(spec) => policies.push(Policy::compile(spec)),
                Err(e) => {
                    tracing::warn!(line = %e.line, error = %e, "failed to parse policy line; skipped");
                    skipped.push(e);
                }
            }
        }

        for p in &policies {
            for (pattern, error) in p.invalid_patterns() {
                tracing::warn!(policy = %p.name, pattern, error, "action pattern does not compile");
            }
        }

        let mut snap = Self::new(policies);
        snap.diagnostics.skipped = skipped;
        snap
    }

    pub fn policies(&self) -> &[Policy] {
        &self.policies
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Policy> {
        self.policies.iter()
    }

    pub fn len(&self) -> usize {
        self.policies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.policies.is_empty()
    }

    pub fn diagnostics(&self) -> &LoadDiagnostics {
        &self.diagnostics
    }

    /// First policy (in order) that applies to `user`.
    pub fn policy_for(&self, user: &str) -> Option<&Policy> {
        self.policies.iter().find(|p| p.applies_to(user))
    }
}

fn find_duplicate_users(policies: &[Policy]) -> Vec<DuplicateUser> {
    let mut seen: HashMap<&str, &str> = HashMap::new();
    let mut dups = Vec::new();
    for p in policies {
        for u in &p.users {
            match seen.get(u.as_str()) {
                Some(first) => dups.push(DuplicateUser {
                    user: u.clone(),
                    first_policy: first.to_string(),
                    policy: p.name.clone(),
                }),
                None => {
                    seen.insert(u.as_str(), p.name.as_str());
                }
            }
        }
    }
    dups
}

/// Read and parse a policy file without installing it.
pub fn read_snapshot(path: &Path) -> Result<PolicySnapshot> {
    let raw = fs::read(path).map_err(|source| AuthzError::PolicyRead {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(PolicySnapshot::parse_bytes(&raw))
}

/// Owner of the policy file path and the active snapshot pointer.
#[derive(Debug)]
pub struct PolicyStore {
    path: PathBuf,
    current: RwLock<Arc<PolicySnapshot>>,
    /// Held across read, parse and swap so loads install in the order they read.
    loading: Mutex<()>,
}

impl PolicyStore {
    /// Store with an empty snapshot. Nothing is read until [`PolicyStore::load`].
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            current: RwLock::new(Arc::new(PolicySnapshot::default())),
            loading: Mutex::new(()),
        }
    }

    /// Store with the file already loaded. An unreadable file is an error.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let store = Self::new(path);
        store.load()?;
        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Current snapshot. Cheap; holds the lock only for the pointer copy.
    pub fn snapshot(&self) -> Arc<PolicySnapshot> {
        let guard = self.current.read().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(&*guard)
    }

    /// Re-read the file and swap the result in. On error the current snapshot
    /// stays authoritative. Concurrent loads are serialized, so the snapshot
    /// left installed is always from the most recent read.
    pub fn load(&self) -> Result<Arc<PolicySnapshot>> {
        let _loading = self.loading.lock().unwrap_or_else(PoisonError::into_inner);
        let snap = Arc::new(read_snapshot(&self.path)?);

        for d in &snap.diagnostics().duplicate_users {
            tracing::warn!(
                "[policy: {}] User {:?} already appears in policy {:?}. Only single policy applies.",
                d.policy,
                d.user,
                d.first_policy
            );
        }

        self.replace(Arc::clone(&snap));
        tracing::info!(
            path = %self.path.display(),
            policies = snap.len(),
            skipped = snap.diagnostics().skipped.len(),
            "policies loaded"
        );
        Ok(snap)
    }

    /// Install a snapshot built elsewhere.
    pub fn replace(&self, snap: Arc<PolicySnapshot>) {
        let mut guard = self.current.write().unwrap_or_else(PoisonError::into_inner);
        *guard = snap;
    }
}
