//! gridmap-daemon: HTTP front of the map engine.
//!
//! Single OS process on a Tokio runtime. Clients register viewport batches
//! and upload fragments; viewers fetch tiles and follow the update stream.

mod config;
mod handlers;
mod http;
mod stream;

use std::sync::Arc;
use std::time::Duration;

use gridmap_engine::MapEngine;
use tracing::info;

use crate::config::DaemonConfig;
use crate::http::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Load config
    let config = DaemonConfig::load()?;

    // 2. Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(format!("gridmap={}", config.logging.log_level).parse()?),
        )
        .init();

    info!("gridmap daemon starting");

    // 3. Open database and tile storage
    let data_dir = config.data_dir();
    let engine = MapEngine::open(&data_dir, config.engine_config())?;
    info!("data directory {:?}", data_dir);

    // 4. Serve
    let state = AppState {
        engine: Arc::new(engine),
        flush_interval: Duration::from_secs(config.updates.flush_interval_secs),
    };
    let app = http::router(state);
    let listener = tokio::net::TcpListener::bind(&config.server.listen_addr).await?;
    info!("listening on http://{}", config.server.listen_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Ctrl-C received, shutting down");
        })
        .await?;

    info!("daemon stopped");
    Ok(())
}
