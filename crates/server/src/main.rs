use anyhow::Result;
use axum::serve;
use gpm_core::{config::AppConfig, upstream::ProxyPool};
use server::router::{build_router, GatewayState};
use std::{sync::Arc, time::Duration};
use tokio::{signal, sync::broadcast};
use tracing::{debug, error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Graceful shutdown drain window in seconds. Connections still open when it
/// elapses are forcibly closed.
const GRACEFUL_SHUTDOWN_TIMEOUT_SECS: u64 = 5;

/// Initializes the logging system.
///
/// `RUST_LOG` overrides the default filter, which keeps third-party crates at
/// `warn` and the gateway's own crates at `info`.
fn init_logging() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn,gpm_core=info,server=info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    init_logging();

    let config = AppConfig::load()
        .map_err(|e| anyhow::anyhow!("Configuration loading failed: {e}"))?;
    config
        .validate()
        .map_err(|e| anyhow::anyhow!("Configuration validation failed: {e}"))?;

    info!("Starting gpm gateway");
    debug!(
        port = config.port,
        concurrent_tries = config.concurrent_tries,
        max_timeout_secs = config.max_timeout,
        auth_enabled = config.auth_enabled(),
        "Configuration loaded"
    );

    let pool = Arc::new(ProxyPool::load(&config.proxy_list)?);
    info!(proxies = pool.count(), list = %config.proxy_list, "Proxy pool loaded");

    let addr = config.socket_addr();
    let state = Arc::new(GatewayState::new(config, pool));
    let app = build_router(state);

    info!(address = %addr, "Gateway listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;

    let (shutdown_tx, _) = broadcast::channel::<()>(1);

    let mut server = {
        let mut shutdown_rx = shutdown_tx.subscribe();
        let graceful = serve(listener, app).with_graceful_shutdown(async move {
            let _ = shutdown_rx.recv().await;
        });
        tokio::spawn(async move { graceful.await })
    };

    tokio::select! {
        result = &mut server => match result {
            Ok(Ok(())) => {}
            Ok(Err(e)) => error!(error = %e, "Server error occurred"),
            Err(e) => error!(error = %e, "Server task failed"),
        },
        () = shutdown_signal() => {
            let _ = shutdown_tx.send(());

            // Drain in-flight connections, but only for the advertised
            // window; whatever is still open afterwards is cut off.
            let drain = Duration::from_secs(GRACEFUL_SHUTDOWN_TIMEOUT_SECS);
            match tokio::time::timeout(drain, &mut server).await {
                Ok(Ok(Ok(()))) => {}
                Ok(Ok(Err(e))) => error!(error = %e, "Server error occurred"),
                Ok(Err(e)) => error!(error = %e, "Server task failed"),
                Err(_) => {
                    warn!(
                        drain_secs = GRACEFUL_SHUTDOWN_TIMEOUT_SECS,
                        "Drain window elapsed, forcing server shutdown"
                    );
                    server.abort();
                }
            }
        }
    }

    info!("Server shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut s) => {
                s.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install signal handler");
                () = std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    info!(
        "Shutdown signal received, starting graceful shutdown (drain window: {}s)",
        GRACEFUL_SHUTDOWN_TIMEOUT_SECS
    );
}
