use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::EnvFilter;

use vbs_gateway::config::AppConfig;
use vbs_gateway::registrations::{MemoryRegistrationStore, PgRegistrationStore, RegistrationStore};
use vbs_gateway::routes;
use vbs_gateway::state::AppState;

#[tokio::main]
async fn main() {
    // Load .env if present so cargo run picks up API_BASE_URL, JWT_SECRET, etc.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("vbs_gateway=info,tower_http=info")),
        )
        .init();

    if let Err(e) = run().await {
        tracing::error!("{:#}", e);
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    let config = AppConfig::from_env().context("invalid configuration")?;
    tracing::info!("Starting VBS gateway in {:?} mode", config.environment);

    let store = registration_store(&config).await?;
    let port = config.server.port;
    let state = AppState::new(config, store).context("failed to build upstream client")?;

    let bind_addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;

    tracing::info!("VBS gateway listening on http://{}", bind_addr);

    axum::serve(listener, routes::app(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")
}

/// Postgres when `DATABASE_URL` is set; the in-memory store is a
/// development convenience only.
async fn registration_store(config: &AppConfig) -> anyhow::Result<Arc<dyn RegistrationStore>> {
    match &config.database.url {
        Some(url) => {
            let store = PgRegistrationStore::connect_lazy(url, &config.database)
                .context("invalid DATABASE_URL")?;
            store
                .ensure_schema()
                .await
                .context("failed to prepare registrations table")?;
            tracing::info!("Registrations stored in Postgres");
            Ok(Arc::new(store))
        }
        None if config.is_development() => {
            tracing::warn!("DATABASE_URL not set; registrations are kept in memory");
            Ok(Arc::new(MemoryRegistrationStore::new()))
        }
        None => anyhow::bail!(
            "DATABASE_URL is required in {:?} mode",
            config.environment
        ),
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown signal received");
}
