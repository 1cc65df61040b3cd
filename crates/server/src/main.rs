//! repo-proxy server entry point.
//!
//! Boots the caching proxy over HTTP. Logging goes to stderr as JSON,
//! filtered by `RUST_LOG`.

use std::sync::Arc;

use anyhow::Result;
use repoproxy_client::{FetchClient, FetchConfig};
use repoproxy_core::{AppConfig, CacheStore};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

mod error;
mod handler;
mod proxy;
mod response;
mod routes;
mod state;

use proxy::CachingProxy;
use state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    let config = Arc::new(AppConfig::load()?);
    let store = CacheStore::open(&config.cache_dir).await?;
    tracing::debug!(cache_dir = %store.dir().display(), "Cache directory ready");
    let fetcher = FetchClient::new(FetchConfig::from(config.as_ref()))?;

    let proxy = CachingProxy::new(Arc::clone(&config), store, Arc::new(fetcher));
    let app = routes::create_router(Arc::new(AppState::new(Arc::clone(&config), proxy)));

    let listener = TcpListener::bind(config.listen_addr()).await?;
    tracing::info!(
        addr = %listener.local_addr()?,
        owner = %config.owner,
        repo = %config.repo,
        branch = %config.branch,
        "Starting repo-proxy"
    );

    axum::serve(listener, app).with_graceful_shutdown(shutdown_signal()).await?;

    tracing::info!("repo-proxy stopped");

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to listen for SIGTERM");
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

    tracing::info!("Shutdown signal received");
}
