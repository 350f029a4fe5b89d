//! Artifact store: keeps produced images addressable by URL

use flux_imaging::{
    config::Settings,
    file_server::{create_router, spawn_retention_sweep, FileServerState},
};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = Settings::load()?;
    let config = &settings.file_server;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&settings.logging.level));
    let registry = tracing_subscriber::registry().with(filter);
    if settings.logging.format == "pretty" {
        registry.with(fmt::layer().pretty()).init();
    } else {
        registry.with(fmt::layer().json()).init();
    }

    let state = Arc::new(FileServerState::from_config(config)?);
    state.storage.ensure_storage_dir().await?;
    info!(path = ?state.storage.storage_path(), "Serving artifacts");

    if let Some(max_age_secs) = config.max_age_secs {
        info!(max_age_secs, interval_secs = config.sweep_interval_secs, "Retention sweep enabled");
        spawn_retention_sweep(
            state.storage.clone(),
            Duration::from_secs(max_age_secs),
            Duration::from_secs(config.sweep_interval_secs),
        );
    }

    let app = create_router(state, config);

    let addr = format!("{}:{}", config.host, config.port);
    info!("Artifact store listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
