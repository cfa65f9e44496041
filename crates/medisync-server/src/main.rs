use anyhow::Context;
use medisync_core::Database;
use medisync_server::{router, AppState, ServerConfig};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env before reading any configuration
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("medisync_core=info,medisync_server=info")),
        )
        .init();

    let config = ServerConfig::from_env().context("invalid configuration")?;
    let db = Database::open(&config.database_path).with_context(|| {
        format!("failed to open database {}", config.database_path.display())
    })?;

    let bind_addr = config.bind_addr.clone();
    let state = AppState::new(db, config).context("invalid import vocabulary")?;

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;
    tracing::info!("MediSync import API listening on {}", bind_addr);

    axum::serve(listener, router(state)).await?;
    Ok(())
}
