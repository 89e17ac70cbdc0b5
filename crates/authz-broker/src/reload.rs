//! Reload trigger.
//!
//! A parameterless event source decoupled from how events are produced. The
//! worker re-reads the store's file on a blocking thread for each event and
//! keeps serving the previous snapshot when the read fails. Events that
//! arrive while one is already pending are coalesced.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::obs::BrokerMetrics;
use crate::policy::PolicyStore;

/// Sending half; cheap to clone.
#[derive(Debug, Clone)]
pub struct ReloadTrigger {
    tx: mpsc::Sender<()>,
}

/// Receiving half, consumed by [`spawn_reload_worker`].
#[derive(Debug)]
pub struct ReloadEvents {
    rx: mpsc::Receiver<()>,
}

pub fn channel() -> (ReloadTrigger, ReloadEvents) {
    let (tx, rx) = mpsc::channel(1);
    (ReloadTrigger { tx }, ReloadEvents { rx })
}

impl ReloadTrigger {
    /// Request a reload. Returns false once the worker is gone.
    pub fn fire(&self) -> bool {
        match self.tx.try_send(()) {
            Ok(()) | Err(mpsc::error::TrySendError::Full(())) => true,
            Err(mpsc::error::TrySendError::Closed(())) => false,
        }
    }
}

impl ReloadEvents {
    pub async fn next(&mut self) -> Option<()> {
        self.rx.recv().await
    }
}

pub fn spawn_reload_worker(
    store: Arc<PolicyStore>,
    metrics: Arc<BrokerMetrics>,
    mut events: ReloadEvents,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while events.next().await.is_some() {
            let s = Arc::clone(&store);
            match tokio::task::spawn_blocking(move || s.load()).await {
                Ok(Ok(snap)) => {
                    metrics.record_reload("signal", true);
                    metrics.set_policies_loaded(snap.len());
                }
                Ok(Err(e)) => {
                    tracing::error!(error = %e, "error reloading policy; keeping previous policies");
                    metrics.record_reload("signal", false);
                }
                Err(e) => {
                    tracing::error!(error = %e, "policy reload task failed");
                    metrics.record_reload("signal", false);
                }
            }
        }
        tracing::debug!("reload worker shutting down");
    })
}

/// Turn SIGHUP into reload events.
#[cfg(unix)]
pub fn spawn_sighup_source(trigger: ReloadTrigger) -> std::io::Result<JoinHandle<()>> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut hup = signal(SignalKind::hangup())?;
    Ok(tokio::spawn(async move {
        while hup.recv().await.is_some() {
            tracing::info!("received SIGHUP, reloading policies");
            if !trigger.fire() {
                break;
            }
        }
    }))
}
