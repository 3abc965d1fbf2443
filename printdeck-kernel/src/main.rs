/**
 * PRINTDECK KERNEL - Central status collector for the printer fleet
 *
 * ROLE: Bootstrap config, status store and HTTP API. Printers report in
 * over HTTP, the latest row per printer is persisted in SQLite, and the
 * dashboard polls derived card views.
 */

mod config;
mod http;
mod ingest;
mod models;
mod projector;
mod store;

use std::net::SocketAddr;

use anyhow::Context;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::http::AppState;
use crate::projector::DisplaySettings;
use crate::store::StatusStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("printdeck_kernel=info")),
        )
        .init();

    let cfg = config::load_config().await;
    info!(
        "display timezone {} / pattern {:?}",
        cfg.display.timezone, cfg.display.datetime_format
    );

    let store = StatusStore::open(&cfg.db_path)
        .with_context(|| format!("failed to open status store at {}", cfg.db_path))?;
    let display = DisplaySettings::from_conf(&cfg.display);

    let app = http::build_router(AppState { store, display });

    let addr = SocketAddr::from(([0, 0, 0, 0], cfg.listen_port));
    info!("kernel listening on http://{addr}");
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    axum::serve(listener, app).await.context("http server failed")?;
    Ok(())
}
