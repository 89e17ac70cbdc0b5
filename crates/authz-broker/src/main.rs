//! authz-broker
//!
//! Authorization plugin for the container runtime.
//! - Plugin endpoints on `<socket_dir>/<plugin_name>.sock`
//! - Policy file loaded at startup, reloaded on SIGHUP
//! - Legacy `/isulad.auth` endpoint re-reads the file per call
//! - Pid file held for the lifetime of the process

use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use authz_broker::{
    app_state::AppState, audit::TracingAuditor, cli::Cli, obs::BrokerMetrics, pidfile::PidFile,
    policy::PolicyStore, reload, router, transport::socket,
};
use authz_broker::config::BrokerConfig;
use authz_core::error::{AuthzError, Result};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| cli.log_directive().into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, code = e.client_code().as_str(), "authz-broker failed");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let cfg = cli.resolve_config()?;
    let pid_file = PidFile::create(&cfg.broker.pid_file)?;

    let served = serve(cfg).await;

    if let Err(e) = pid_file.remove() {
        tracing::warn!(error = %e, "failed to remove pid file");
    }
    served
}

async fn serve(cfg: BrokerConfig) -> Result<()> {
    let metrics = Arc::new(BrokerMetrics::default());

    let store = match PolicyStore::open(&cfg.policy.file) {
        Ok(store) => Arc::new(store),
        Err(e) => {
            metrics.record_reload("startup", false);
            return Err(e);
        }
    };
    metrics.record_reload("startup", true);
    metrics.set_policies_loaded(store.snapshot().len());

    let (trigger, events) = reload::channel();
    let _worker = reload::spawn_reload_worker(Arc::clone(&store), Arc::clone(&metrics), events);
    let _sighup = reload::spawn_sighup_source(trigger)
        .map_err(|e| AuthzError::Internal(format!("install SIGHUP handler: {e}")))?;

    let listener = socket::bind(&cfg.broker)?;
    let socket_path = cfg.broker.socket_path();

    let state = AppState::new(cfg, store, Arc::new(TracingAuditor), metrics);
    let app = router::build_router(state);

    tracing::info!(socket = %socket_path.display(), "authz-broker listening");
    let served = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| AuthzError::Internal(format!("server failed: {e}")));

    if let Err(e) = socket::remove_socket(&socket_path) {
        tracing::warn!(error = %e, socket = %socket_path.display(), "failed to remove plugin socket");
    }
    served
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("signal received, starting graceful shutdown");
}
