use std::sync::Arc;

use axum::Router;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{error, info, warn};

use efatura::gib::GibClient;
use efatura::http::{self, AppState};
use efatura::service::{EInvoiceService, IncomingPoller};
use efatura::settings::{load_config, run_environment};
use efatura::store::MemoryStore;
use efatura::telemetry::init_tracing;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cfg = load_config()?;
    init_tracing(&cfg.log_level, cfg.log_json);
    info!(profile = %run_environment(), "configuration loaded");

    let store = Arc::new(MemoryStore::new());
    let gateway = Arc::new(GibClient::new(cfg.gib.clone())?);
    let service = Arc::new(EInvoiceService::new(
        store.clone(),
        store,
        gateway,
        cfg.company.clone(),
    ));

    if !service.gateway_reachable().await {
        warn!(base_url = %cfg.gib.base_url(), "GIB gateway not reachable at start-up");
    }

    let poller = cfg
        .poll_interval()
        .map(|every| IncomingPoller::spawn(service.clone(), every));

    let app = Router::new().nest("/api/gib", http::router(AppState::new(service)));
    let addr = cfg.server.addr()?;
    let listener = TcpListener::bind(addr).await?;
    info!(%addr, environment = ?cfg.gib.environment, "e-Invoice server listening");

    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        error!(error = %e, "server error");
    }

    if let Some(poller) = poller {
        poller.shutdown().await;
    }
    info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};

        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "failed to install SIGTERM handler");
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
}
