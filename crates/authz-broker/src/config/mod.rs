//! Broker config loader (strict parsing).

pub mod schema;

use std::fs;
use std::path::Path;

use authz_core::error::{AuthzError, Result};

pub use schema::{BrokerConfig, BrokerSection, LegacySection, PolicySection};

pub fn load_from_file(path: &Path) -> Result<BrokerConfig> {
    let s = fs::read_to_string(path).map_err(|e| {
        AuthzError::InvalidConfig(format!("read config {} failed: {e}", path.display()))
    })?;
    load_from_str(&s)
}

pub fn load_from_str(s: &str) -> Result<BrokerConfig> {
    let cfg: BrokerConfig = serde_yaml::from_str(s)
        .map_err(|e| AuthzError::InvalidConfig(format!("invalid yaml: {e}")))?;
    cfg.validate()?;
    Ok(cfg)
}
