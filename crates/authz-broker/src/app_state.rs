//! Shared application state for the authz broker.
//!
//! Built once at startup; handlers clone the cheap `AppState` handle.

use std::sync::Arc;

use crate::audit::Auditor;
use crate::config::BrokerConfig;
use crate::obs::BrokerMetrics;
use crate::policy::PolicyStore;

#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    cfg: BrokerConfig,
    store: Arc<PolicyStore>,
    auditor: Arc<dyn Auditor>,
    metrics: Arc<BrokerMetrics>,
}

impl AppState {
    pub fn new(
        cfg: BrokerConfig,
        store: Arc<PolicyStore>,
        auditor: Arc<dyn Auditor>,
        metrics: Arc<BrokerMetrics>,
    ) -> Self {
        Self {
            inner: Arc::new(AppStateInner { cfg, store, auditor, metrics }),
        }
    }

    pub fn cfg(&self) -> &BrokerConfig {
        &self.inner.cfg
    }

    pub fn store(&self) -> Arc<PolicyStore> {
        Arc::clone(&self.inner.store)
    }

    pub fn auditor(&self) -> Arc<dyn Auditor> {
        Arc::clone(&self.inner.auditor)
    }

    pub fn metrics(&self) -> Arc<BrokerMetrics> {
        Arc::clone(&self.inner.metrics)
    }
}
