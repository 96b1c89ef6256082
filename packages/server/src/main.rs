use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tracing::info;
use tracing_subscriber::EnvFilter;

use foodgram_server::config::AppConfig;
use foodgram_server::database::init_db;
use foodgram_server::media::filesystem::FilesystemImageStore;
use foodgram_server::seed::{ensure_constraints, seed_default_tags};
use foodgram_server::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = AppConfig::load().context("failed to load configuration")?;

    let db = init_db(&config.database.url)
        .await
        .context("failed to connect to database")?;
    seed_default_tags(&db).await?;
    ensure_constraints(&db).await?;

    let images = FilesystemImageStore::new(config.media.root.clone())
        .await
        .with_context(|| format!("failed to open media root {}", config.media.root.display()))?;

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .context("invalid server address")?;

    let state = AppState {
        db,
        config,
        images: Arc::new(images),
    };
    let app = foodgram_server::build_router(state);

    info!("Server running at http://{}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
