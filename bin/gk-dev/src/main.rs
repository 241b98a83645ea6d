//! Gatekit Dev Stack
//!
//! Runs the whole system in one process for local development: the
//! authority on 8081, the replica on 8082, and the gateway on 8080, wired
//! over a shared in-process bus and in-memory stores. Point a client at
//! the gateway port and the full register/login/replicate flow works with
//! no external dependencies.
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `GATEKIT_HTTP_PORT` | `8080` | Gateway port |
//! | `GATEKIT_TOKEN_SECRET` | dev secret | HMAC signing secret |
//! | `RUST_LOG` | `info` | Log level |

use std::sync::Arc;

use anyhow::Result;
use gk_authority::api::{router as authority_router, ApiState as AuthorityApiState};
use gk_authority::{
    AuthorityService, MemoryPrincipalStore, MemoryRefreshTokenStore, PasswordService, TokenCodec,
};
use gk_bus::{FailurePolicy, MemoryBus};
use gk_config::{ConfigLoader, RouteRule};
use gk_gateway::{router as gateway_router, GatewayState};
use gk_replica::api::{router as replica_router, ApiState as ReplicaApiState};
use gk_replica::{MemoryReplicaStore, ReplicaConsumer};
use tokio::{net::TcpListener, signal};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;
use utoipa_swagger_ui::SwaggerUi;

const AUTHORITY_PORT: u16 = 8081;
const REPLICA_PORT: u16 = 8082;

#[tokio::main]
async fn main() -> Result<()> {
    gk_common::logging::init_logging("gk-dev");

    let mut config = ConfigLoader::new().load()?;
    config.dev_mode = true;
    if config.token.secret.is_empty() {
        config.token.secret = "gatekit-dev-secret".to_string();
    }

    info!("Starting Gatekit dev stack (authority + replica + gateway)");

    // Shared pipeline: the authority publishes, the replica consumes
    let bus = Arc::new(MemoryBus::new(config.bus.partitions));
    let replica_store = Arc::new(MemoryReplicaStore::new());
    bus.spawn_workers(
        Arc::new(ReplicaConsumer::new(replica_store.clone())),
        FailurePolicy::LogAndDrop,
    );

    // Authority
    let authority = AuthorityService::new(
        Arc::new(MemoryPrincipalStore::new()),
        Arc::new(MemoryRefreshTokenStore::new()),
        PasswordService::default(),
        TokenCodec::new(
            &config.token.secret,
            &config.token.issuer,
            config.token.access_ttl_secs,
        ),
        bus.clone(),
        config.token.refresh_ttl_secs,
    );
    let (authority_api, authority_doc) = authority_router(AuthorityApiState {
        service: Arc::new(authority),
    })
    .split_for_parts();
    let authority_app = authority_api
        .merge(SwaggerUi::new("/swagger-ui").url("/q/openapi", authority_doc))
        .layer(TraceLayer::new_for_http());

    // Replica
    let (replica_api, replica_doc) = replica_router(ReplicaApiState {
        store: replica_store,
    })
    .split_for_parts();
    let replica_app = replica_api
        .merge(SwaggerUi::new("/swagger-ui").url("/q/openapi", replica_doc))
        .layer(TraceLayer::new_for_http());

    // Gateway, routing to the two local services
    config.gateway.authority_url = format!("http://127.0.0.1:{AUTHORITY_PORT}");
    config.gateway.routes = vec![
        RouteRule {
            prefix: "/api/auth".to_string(),
            target: format!("http://127.0.0.1:{AUTHORITY_PORT}"),
        },
        RouteRule {
            prefix: "/api/users".to_string(),
            target: format!("http://127.0.0.1:{REPLICA_PORT}"),
        },
    ];
    let gateway_app = gateway_router(GatewayState::new(&config.gateway)?)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any));

    let authority_listener = TcpListener::bind(("127.0.0.1", AUTHORITY_PORT)).await?;
    let replica_listener = TcpListener::bind(("127.0.0.1", REPLICA_PORT)).await?;
    let gateway_addr = format!("{}:{}", config.http.host, config.http.port);
    let gateway_listener = TcpListener::bind(&gateway_addr).await?;

    info!("Authority on http://127.0.0.1:{AUTHORITY_PORT}");
    info!("Replica on http://127.0.0.1:{REPLICA_PORT}");
    info!("Gateway on http://{gateway_addr} <- use this one");

    tokio::select! {
        result = axum::serve(authority_listener, authority_app) => result?,
        result = axum::serve(replica_listener, replica_app) => result?,
        result = axum::serve(gateway_listener, gateway_app) => result?,
        _ = signal::ctrl_c() => info!("Shutdown signal received"),
    }

    info!("Dev stack stopped");
    Ok(())
}
