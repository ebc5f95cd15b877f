use anyhow::Context;
use backend::config::{init_tracing, Config};
use backend::db::TaskRepository;
use backend::{app, AppState};
use clap::Parser;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::parse();
    init_tracing(config.verbose, config.quiet)?;

    let repo = TaskRepository::open(&config.database)
        .with_context(|| format!("failed to open database {}", config.database.display()))?;

    let static_dir = config.static_dir.is_dir().then_some(config.static_dir.as_path());
    if static_dir.is_none() {
        warn!(dir = %config.static_dir.display(), "static directory missing, serving API only");
    }
    let router = app(AppState::new(repo), static_dir);

    let addr = config.addr()?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!(%addr, database = %config.database.display(), "server running");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(error = %err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("shutting down");
}
