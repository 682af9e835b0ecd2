//! stockdata HTTP server.

use std::sync::Arc;
use std::time::Duration;

use stockdata::{MarketData, TickerCache, YahooFactory};
use stockdata_server::{AppState, ServerConfig, create_router};
use tokio::net::TcpListener;
use tokio::time::MissedTickBehavior;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "stockdata_server=info,stockdata=info".into()),
        )
        .init();

    let config = ServerConfig::from_env();
    let addr = config.socket_addr().map_err(|e| {
        error!(host = %config.host, port = config.port, error = %e, "Invalid bind address");
        e
    })?;

    let factory = YahooFactory::with_timeout(config.upstream_timeout)?;
    let cache = Arc::new(TickerCache::new(Arc::new(factory)).with_ttl(config.cache_ttl));
    if let Some(every) = config.cache_sweep {
        spawn_sweeper(Arc::clone(&cache), every);
    }

    let app = create_router(AppState::new(MarketData::new(cache)));

    let listener = TcpListener::bind(addr).await?;
    info!(
        %addr,
        cache_ttl_secs = config.cache_ttl.as_secs(),
        upstream_timeout_secs = config.upstream_timeout.as_secs(),
        "Starting stockdata server"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

/// Periodically drops expired handles so idle symbols do not accumulate.
fn spawn_sweeper(cache: Arc<TickerCache>, every: Duration) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            interval.tick().await;
            cache.purge_expired().await;
        }
    });
}

/// Resolves on Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};

        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            warn!("Received Ctrl+C, initiating graceful shutdown");
        }
        () = terminate => {
            warn!("Received SIGTERM, initiating graceful shutdown");
        }
    }
}
