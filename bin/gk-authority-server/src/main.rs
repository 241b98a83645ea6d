//! Gatekit Authority Server
//!
//! Serves the auth endpoints and the gateway-only validate endpoint.
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `GATEKIT_CONFIG` | - | Path to a TOML config file |
//! | `GATEKIT_HTTP_PORT` | `8080` | HTTP port |
//! | `GATEKIT_MONGODB_URI` | `mongodb://localhost:27017` | MongoDB URI (with the `mongodb` feature) |
//! | `GATEKIT_TOKEN_SECRET` | - | HMAC signing secret, required outside dev mode |
//! | `GATEKIT_DEV_MODE` | `false` | Use in-memory stores |
//! | `RUST_LOG` | `info` | Log level |

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use gk_authority::api::{router, ApiState};
use gk_authority::{
    AuthorityService, MemoryPrincipalStore, MemoryRefreshTokenStore, PasswordService,
    RefreshTokenStore, TokenCodec,
};
use gk_authority::store::PrincipalStore;
use gk_bus::{Envelope, EventHandler, FailurePolicy, MemoryBus, ProcessOutcome};
use gk_config::{AppConfig, ConfigLoader};
use tokio::{net::TcpListener, signal};
use tower_http::trace::TraceLayer;
use tracing::{debug, info, warn};
use utoipa_swagger_ui::SwaggerUi;

/// Standalone deployments have no co-located consumer; feeds are drained so
/// the in-process log stays bounded. A broker-backed publisher replaces the
/// whole bus when replication spans processes.
struct DrainHandler;

#[async_trait]
impl EventHandler for DrainHandler {
    async fn handle(&self, envelope: Envelope) -> ProcessOutcome {
        debug!(key = %envelope.key, "identity event drained (no local consumer)");
        ProcessOutcome::Processed
    }
}

#[cfg(feature = "mongodb")]
async fn build_stores(
    config: &AppConfig,
) -> Result<(Arc<dyn PrincipalStore>, Arc<dyn RefreshTokenStore>)> {
    use gk_authority::{MongoPrincipalStore, MongoRefreshTokenStore};

    if config.dev_mode {
        return Ok((
            Arc::new(MemoryPrincipalStore::new()),
            Arc::new(MemoryRefreshTokenStore::new()),
        ));
    }

    info!(
        "Connecting to MongoDB: {}/{}",
        config.mongodb.uri, config.mongodb.database
    );
    let client = mongodb::Client::with_uri_str(&config.mongodb.uri).await?;
    let db = client.database(&config.mongodb.database);

    let principals = MongoPrincipalStore::new(&db);
    principals.ensure_indexes().await?;
    let refresh = MongoRefreshTokenStore::new(&db);
    refresh.ensure_indexes().await?;

    Ok((Arc::new(principals), Arc::new(refresh)))
}

#[cfg(not(feature = "mongodb"))]
async fn build_stores(
    config: &AppConfig,
) -> Result<(Arc<dyn PrincipalStore>, Arc<dyn RefreshTokenStore>)> {
    if !config.dev_mode {
        warn!("Built without the mongodb feature; falling back to in-memory stores");
    }
    Ok((
        Arc::new(MemoryPrincipalStore::new()),
        Arc::new(MemoryRefreshTokenStore::new()),
    ))
}

fn token_secret(config: &AppConfig) -> Result<String> {
    if !config.token.secret.is_empty() {
        return Ok(config.token.secret.clone());
    }
    if config.dev_mode {
        warn!("No token secret configured; using the development secret");
        return Ok("gatekit-dev-secret".to_string());
    }
    anyhow::bail!("token.secret must be configured outside dev mode")
}

#[tokio::main]
async fn main() -> Result<()> {
    gk_common::logging::init_logging("gk-authority-server");

    let config = ConfigLoader::new().load()?;
    info!("Starting Gatekit Authority Server");

    let (principals, refresh_tokens) = build_stores(&config).await?;

    let bus = Arc::new(MemoryBus::new(config.bus.partitions));
    bus.spawn_workers(Arc::new(DrainHandler), FailurePolicy::LogAndDrop);

    let service = AuthorityService::new(
        principals,
        refresh_tokens,
        PasswordService::default(),
        TokenCodec::new(
            &token_secret(&config)?,
            &config.token.issuer,
            config.token.access_ttl_secs,
        ),
        bus,
        config.token.refresh_ttl_secs,
    );

    let (api, openapi) = router(ApiState {
        service: Arc::new(service),
    })
    .split_for_parts();

    let app = api
        .merge(SwaggerUi::new("/swagger-ui").url("/q/openapi", openapi))
        .route("/health", axum::routing::get(|| async { "OK" }))
        .layer(TraceLayer::new_for_http());

    let addr = format!("{}:{}", config.http.host, config.http.port);
    info!("Authority listening on http://{addr}");
    let listener = TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Authority server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if signal::ctrl_c().await.is_ok() {
        info!("Shutdown signal received");
    }
}
