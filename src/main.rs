use anyhow::Context;
use clap::Parser;
use std::{sync::Arc, time::Duration};
use tokio::signal;
use tracing_subscriber::EnvFilter;

use food_rec_api::{
    config::Config,
    db::{open_cache, open_repository},
    routes::{create_router, AppState},
};

/// Food recommendation HTTP API
#[derive(Parser)]
#[command(name = "food-rec-api", version)]
struct Args {
    /// Keep all data in process memory instead of PostgreSQL
    #[arg(long)]
    in_memory: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Config::from_env()?;
    let addr = format!("{}:{}", config.host, config.port);

    let repo = open_repository(&config, args.in_memory).await?;
    let (cache, cache_handle) = match open_cache(&config)? {
        Some((cache, handle)) => (Some(cache), Some(handle)),
        None => (None, None),
    };

    let retrain_every = config.model_retrain_interval_secs;
    let state = Arc::new(AppState::new(repo, cache, config));

    if let Err(e) = state.recommender.load_persisted().await {
        tracing::warn!(error = %e, "Ignoring unreadable recommendation index");
    }
    let retrain_task = (retrain_every > 0).then(|| {
        tracing::info!(interval_secs = retrain_every, "Scheduled index rebuilds enabled");
        state
            .recommender
            .clone()
            .spawn_retrain_loop(Duration::from_secs(retrain_every))
    });

    let app = create_router(state);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Some(task) = retrain_task {
        task.abort();
    }
    if let Some(handle) = cache_handle {
        handle.shutdown().await;
    }
    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
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
