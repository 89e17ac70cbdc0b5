use std::path::PathBuf;

use clap::Parser;

use authz_core::error::Result;

use crate::config::{self, BrokerConfig};

#[derive(Parser, Debug)]
#[command(name = "authz-broker", version, about = "Authorization plugin for isulad")]
pub struct Cli {
    /// Path to the broker configuration file (defaults apply when omitted)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Path to the policy file (overrides config file setting)
    #[arg(long, env = "AUTHZ_POLICY_FILE")]
    pub policy_file: Option<PathBuf>,

    /// Directory for the plugin socket (overrides config file setting)
    #[arg(long)]
    pub socket_dir: Option<PathBuf>,

    /// Pid file location (overrides config file setting)
    #[arg(long)]
    pub pid_file: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long, env = "DEBUG")]
    pub debug: bool,
}

impl Cli {
    /// Config file (or defaults) with command-line overrides applied.
    pub fn resolve_config(&self) -> Result<BrokerConfig> {
        let mut cfg = match &self.config {
            Some(path) => config::load_from_file(path)?,
            None => BrokerConfig::default(),
        };
        if let Some(p) = &self.policy_file {
            cfg.policy.file = p.clone();
        }
        if let Some(d) = &self.socket_dir {
            cfg.broker.socket_dir = d.clone();
        }
        if let Some(p) = &self.pid_file {
            cfg.broker.pid_file = p.clone();
        }
        cfg.validate()?;
        Ok(cfg)
    }

    /// Default tracing directive when `RUST_LOG` is unset.
    pub fn log_directive(&self) -> &'static str {
        if self.debug {
            "debug"
        } else {
            "info"
        }
    }
}
