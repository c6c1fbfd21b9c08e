use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use common::storage::filesystem::FilesystemBlobStore;
use tracing::{Level, error, info};

use server::catalog::MemoryCatalog;
use server::config::AppConfig;
use server::service::{MeshService, sweep_orphans};
use server::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_max_level(Level::INFO).init();

    let config = Arc::new(AppConfig::load()?);

    let store = Arc::new(
        FilesystemBlobStore::new(
            PathBuf::from(&config.storage.root),
            config.storage.max_blob_size,
        )
        .await?,
    );
    let catalog = Arc::new(MemoryCatalog::new());
    let service = MeshService::new(store, catalog);

    if config.gc.interval_seconds > 0 {
        spawn_sweep_task(service.clone(), &config);
    }

    let state = AppState {
        config: config.clone(),
        service,
    };

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    let app = server::build_router(state);

    info!("Server running at http://{}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Periodically reclaim blobs orphaned by failed batches and deletions.
fn spawn_sweep_task(service: MeshService, config: &AppConfig) {
    let interval = Duration::from_secs(config.gc.interval_seconds);
    let grace = chrono::Duration::seconds(config.gc.grace_seconds as i64);

    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        // The first tick fires immediately; skip it so startup stays quiet.
        ticker.tick().await;

        loop {
            ticker.tick().await;
            if let Err(err) =
                sweep_orphans(service.store().as_ref(), service.catalog().as_ref(), grace).await
            {
                error!("orphan sweep failed: {err}");
            }
        }
    });
}
