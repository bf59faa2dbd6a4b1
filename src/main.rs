//! Feed Cache - admin server for the response cache
//!
//! Runs the cache with its periodic sweep and serves the admin endpoints.

use std::net::SocketAddr;

use anyhow::Context;
use tokio::signal;
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{debug, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use feed_cache::api::create_router;
use feed_cache::cache::CacheEvent;
use feed_cache::{AppState, Config, ResponseCache};

/// Startup: tracing, configuration, cache with sweep, event log, router,
/// then serve until SIGINT/SIGTERM.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "feed_cache=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Feed Cache");

    let config = Config::from_env();
    info!(
        "Configuration loaded: max_entries={}, default_ttl={}s, port={}, sweep_interval={}s, strict_follow={}",
        config.max_entries,
        config.default_ttl,
        config.server_port,
        config.sweep_interval,
        config.strict_follow_invalidation
    );

    let state = AppState::from_config(&config);
    info!("Cache initialized, sweep running");

    tokio::spawn(log_events(state.cache.subscribe()));

    let cache = state.cache.clone();
    let app = create_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server_port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    info!("Server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(cache))
        .await
        .context("server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Logs cache events at debug level until the channel closes.
async fn log_events(mut events: broadcast::Receiver<CacheEvent>) {
    loop {
        match events.recv().await {
            Ok(CacheEvent::Flushed { removed }) => info!(removed, "cache flushed"),
            Ok(event) => debug!(?event, "cache event"),
            Err(RecvError::Lagged(skipped)) => warn!(skipped, "event log lagged"),
            Err(RecvError::Closed) => break,
        }
    }
}

/// Waits for Ctrl+C or SIGTERM, then stops the cache sweep.
async fn shutdown_signal(cache: ResponseCache) {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", err);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(err) => {
                warn!("Failed to install SIGTERM handler: {}", err);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating shutdown...");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating shutdown...");
        }
    }

    cache.shutdown();
}
