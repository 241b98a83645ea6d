//! Gatekit Gateway Server
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `GATEKIT_CONFIG` | - | Path to a TOML config file |
//! | `GATEKIT_HTTP_PORT` | `8080` | HTTP port |
//! | `GATEKIT_AUTHORITY_URL` | `http://localhost:8081` | Authority base URL |
//! | `GATEKIT_VALIDATE_TIMEOUT_MS` | `3000` | Validation timeout (fail-closed) |
//! | `RUST_LOG` | `info` | Log level |

use anyhow::Result;
use gk_config::ConfigLoader;
use gk_gateway::{router, GatewayState};
use tokio::{net::TcpListener, signal};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    gk_common::logging::init_logging("gk-gateway-server");

    let config = ConfigLoader::new().load()?;
    info!("Starting Gatekit Gateway Server");
    info!(
        authority = %config.gateway.authority_url,
        routes = config.gateway.routes.len(),
        "Gateway configuration loaded"
    );

    let state = GatewayState::new(&config.gateway)?;
    let app = router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any));

    let addr = format!("{}:{}", config.http.host, config.http.port);
    info!("Gateway listening on http://{addr}");
    let listener = TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Gateway server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if signal::ctrl_c().await.is_ok() {
        info!("Shutdown signal received");
    }
}
