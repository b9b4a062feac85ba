mod api;
mod middleware;
mod refresh;

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tracing_subscriber::EnvFilter;

use crate::api::{build_app, AppState};
use crate::middleware::RateLimitState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = Arc::new(charmtrack_core::load_app_config()?);
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let catalog = charmtrack_core::load_charms(&config.charms_path)?;
    let store = Arc::new(charmtrack_store::CharmStore::new());
    store.seed(
        catalog
            .charms
            .into_iter()
            .map(charmtrack_core::CharmConfig::into_charm)
            .collect(),
    );
    tracing::info!(charms = store.len(), "seeded charm catalog");

    let watchlist = Arc::new(charmtrack_store::Watchlist::new(Box::new(
        charmtrack_store::MemoryKeyValueStore::new(),
    )));

    let source = Arc::new(charmtrack_source::ScrapeClient::new(
        config.source_request_timeout_secs,
        &config.source_user_agent,
        config.source_max_retries,
        config.source_retry_backoff_base_secs,
    )?);

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let refresh_handle = if config.refresh_enabled {
        Some(refresh::spawn_refresh_loop(
            Duration::from_secs(config.refresh_interval_secs),
            shutdown_rx,
            Arc::clone(&store),
            Arc::clone(&source),
            config.source_base_url.clone(),
        ))
    } else {
        tracing::info!("background refresh disabled by configuration");
        None
    };

    let rate_limit = RateLimitState::new(
        config.rate_limit_max_requests,
        Duration::from_secs(config.rate_limit_window_secs),
    );
    let app = build_app(
        AppState {
            store,
            watchlist,
            source,
            config: Arc::clone(&config),
        },
        rate_limit,
    );

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    tracing::info!(addr = %config.bind_addr, env = %config.env, "charmtrack-server listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // Stop the refresh loop after the HTTP side has drained.
    let _ = shutdown_tx.send(true);
    if let Some(handle) = refresh_handle {
        let _ = handle.await;
    }
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to listen for ctrl-c");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("received shutdown signal, starting graceful shutdown");
}
