use mimalloc::MiMalloc;
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use asset_lens::db::InventoryStorage;
use asset_lens::pipeline::QueryPipeline;
use asset_lens::router::{LensState, lens_router};
use asset_lens::service::classifier::Classifier;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    let cfg = &asset_lens::config::CONFIG;

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(cfg.basic.loglevel.clone()));
    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_level(true)
                .with_target(false),
        )
        .init();

    info!(
        database_url = %cfg.basic.database_url,
        backend = ?cfg.classifier.backend,
        endpoint = %cfg.classifier.endpoint.as_ref().map(|u| u.as_str()).unwrap_or("<none>"),
        loglevel = %cfg.basic.loglevel,
    );

    let storage = InventoryStorage::connect(&cfg.basic.database_url).await?;
    let count = storage.equipment_count().await?;
    if count == 0 {
        warn!("equipment table is empty; load inventory data before querying");
    } else {
        info!(count, "inventory loaded");
    }

    let classifier = Classifier::from_config(&cfg.classifier)?;
    let pipeline = QueryPipeline::new(classifier, storage, cfg);
    let app = lens_router(LensState::new(pipeline));

    let addr = cfg.basic.listen_addr.as_str();
    let listener = TcpListener::bind(addr).await?;
    info!("HTTP server listening on {}", addr);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for shutdown signal");
    }
    info!("shutting down");
}
