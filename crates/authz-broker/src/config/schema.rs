use std::path::PathBuf;

use serde::Deserialize;
use authz_core::error::{AuthzError, Result};

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BrokerConfig {
    pub version: u32,

    #[serde(default)]
    pub broker: BrokerSection,

    #[serde(default)]
    pub policy: PolicySection,

    #[serde(default)]
    pub legacy: LegacySection,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            version: 1,
            broker: BrokerSection::default(),
            policy: PolicySection::default(),
            legacy: LegacySection::default(),
        }
    }
}

impl BrokerConfig {
    pub fn validate(&self) -> Result<()> {
        if self.version != 1 {
            return Err(AuthzError::InvalidConfig(format!(
                "unsupported config version {}",
                self.version
            )));
        }

        self.broker.validate()?;
        self.policy.validate()?;

        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BrokerSection {
    /// Directory the runtime scans for plugin sockets.
    #[serde(default = "default_socket_dir")]
    pub socket_dir: PathBuf,

    #[serde(default = "default_plugin_name")]
    pub plugin_name: String,

    /// Octal permission bits for the socket file, e.g. "0660".
    #[serde(default = "default_socket_mode")]
    pub socket_mode: String,

    #[serde(default = "default_pid_file")]
    pub pid_file: PathBuf,
}

impl Default for BrokerSection {
    fn default() -> Self {
        Self {
            socket_dir: default_socket_dir(),
            plugin_name: default_plugin_name(),
            socket_mode: default_socket_mode(),
            pid_file: default_pid_file(),
        }
    }
}

impl BrokerSection {
    pub fn validate(&self) -> Result<()> {
        if self.plugin_name.is_empty() || self.plugin_name.contains('/') {
            return Err(AuthzError::InvalidConfig(
                "broker.plugin_name must be a non-empty file name".into(),
            ));
        }
        if self.socket_dir.as_os_str().is_empty() {
            return Err(AuthzError::InvalidConfig("broker.socket_dir must not be empty".into()));
        }
        if self.pid_file.as_os_str().is_empty() {
            return Err(AuthzError::InvalidConfig("broker.pid_file must not be empty".into()));
        }
        self.socket_mode_bits()?;
        Ok(())
    }

    /// `<socket_dir>/<plugin_name>.sock`
    pub fn socket_path(&self) -> PathBuf {
        self.socket_dir.join(format!("{}.sock", self.plugin_name))
    }

    pub fn socket_mode_bits(&self) -> Result<u32> {
        let digits = self.socket_mode.trim_start_matches("0o");
        let bits = u32::from_str_radix(digits, 8).map_err(|_| {
            AuthzError::InvalidConfig(format!(
                "broker.socket_mode must be octal, got {:?}",
                self.socket_mode
            ))
        })?;
        if bits > 0o777 {
            return Err(AuthzError::InvalidConfig(
                "broker.socket_mode must not exceed 0777".into(),
            ));
        }
        Ok(bits)
    }
}

fn default_socket_dir() -> PathBuf {
    PathBuf::from("/run/isulad/plugins")
}
fn default_plugin_name() -> String {
    "authz-broker".into()
}
fn default_socket_mode() -> String {
    "0660".into()
}
fn default_pid_file() -> PathBuf {
    PathBuf::from("/run/authz.pid")
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PolicySection {
    #[serde(default = "default_policy_file")]
    pub file: PathBuf,
}

impl Default for PolicySection {
    fn default() -> Self {
        Self { file: default_policy_file() }
    }
}

impl PolicySection {
    pub fn validate(&self) -> Result<()> {
        if self.file.as_os_str().is_empty() {
            return Err(AuthzError::InvalidConfig("policy.file must not be empty".into()));
        }
        Ok(())
    }
}

fn default_policy_file() -> PathBuf {
    PathBuf::from("/var/lib/authz-broker/policy.json")
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LegacySection {
    /// Re-read the policy file before every legacy decision. When off, the
    /// legacy endpoint uses the current snapshot like the plugin endpoint.
    #[serde(default = "default_reload_per_call")]
    pub reload_per_call: bool,
}

impl Default for LegacySection {
    fn default() -> Self {
        Self { reload_per_call: default_reload_per_call() }
    }
}

fn default_reload_per_call() -> bool {
    true
}
