//! Gatekit Replica Server
//!
//! Runs the replication workers against the local bus and serves the
//! read-only profile API behind the gateway's trusted headers.
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `GATEKIT_CONFIG` | - | Path to a TOML config file |
//! | `GATEKIT_HTTP_PORT` | `8080` | HTTP port |
//! | `GATEKIT_MONGODB_URI` | `mongodb://localhost:27017` | MongoDB URI (with the `mongodb` feature) |
//! | `GATEKIT_BUS_PARTITIONS` | `4` | Replication worker count |
//! | `RUST_LOG` | `info` | Log level |

use std::sync::Arc;

use anyhow::Result;
use gk_bus::{FailurePolicy, MemoryBus};
use gk_config::{AppConfig, ConfigLoader};
use gk_replica::api::{router, ApiState};
use gk_replica::{MemoryReplicaStore, ReplicaConsumer, ReplicaStore};
use tokio::{net::TcpListener, signal};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use utoipa_swagger_ui::SwaggerUi;

#[cfg(feature = "mongodb")]
async fn build_store(config: &AppConfig) -> Result<Arc<dyn ReplicaStore>> {
    use gk_replica::MongoReplicaStore;

    if config.dev_mode {
        return Ok(Arc::new(MemoryReplicaStore::new()));
    }

    info!(
        "Connecting to MongoDB: {}/{}",
        config.mongodb.uri, config.mongodb.database
    );
    let client = mongodb::Client::with_uri_str(&config.mongodb.uri).await?;
    let db = client.database(&config.mongodb.database);

    let store = MongoReplicaStore::new(&db);
    store.ensure_indexes().await?;
    Ok(Arc::new(store))
}

#[cfg(not(feature = "mongodb"))]
async fn build_store(config: &AppConfig) -> Result<Arc<dyn ReplicaStore>> {
    if !config.dev_mode {
        warn!("Built without the mongodb feature; falling back to the in-memory store");
    }
    Ok(Arc::new(MemoryReplicaStore::new()))
}

#[tokio::main]
async fn main() -> Result<()> {
    gk_common::logging::init_logging("gk-replica-server");

    let config = ConfigLoader::new().load()?;
    info!("Starting Gatekit Replica Server");

    let store = build_store(&config).await?;

    let bus = MemoryBus::new(config.bus.partitions);
    let consumer = Arc::new(ReplicaConsumer::new(store.clone()));
    let workers = bus.spawn_workers(consumer, FailurePolicy::LogAndDrop);
    info!(workers = workers.len(), "Replication workers started");

    let (api, openapi) = router(ApiState { store }).split_for_parts();
    let app = api
        .merge(SwaggerUi::new("/swagger-ui").url("/q/openapi", openapi))
        .route("/health", axum::routing::get(|| async { "OK" }))
        .layer(TraceLayer::new_for_http());

    let addr = format!("{}:{}", config.http.host, config.http.port);
    info!("Replica listening on http://{addr}");
    let listener = TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Replica server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if signal::ctrl_c().await.is_ok() {
        info!("Shutdown signal received");
    }
}
