//! OIDC Gate Service - main entry point
//!
//! Loads configuration, wires the verification engine and HTTP surface, and
//! serves with graceful shutdown.

use std::net::SocketAddr;
use std::time::Duration;

use tracing::info;

use oidc_gate::config::Config;
use oidc_gate::observability::init_logging;
use oidc_gate::routes::build_router;
use oidc_gate::shutdown::serve_with_graceful_shutdown;
use oidc_gate::state::AppState;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::from_env()?;

    init_logging();

    info!("Starting OIDC Gate Service");

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    let shutdown_timeout = Duration::from_secs(config.shutdown_timeout_seconds);

    let state = AppState::from_config(config)?;
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("OIDC Gate Service listening on {}", addr);

    serve_with_graceful_shutdown(listener, app, shutdown_timeout).await;

    info!("OIDC Gate Service stopped");

    Ok(())
}
