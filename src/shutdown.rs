//! Graceful shutdown
//!
//! Signal handling for SIGTERM/SIGINT; the server drains in-flight
//! connections before exiting, bounded by the configured timeout.

use std::future::IntoFuture;
use std::time::Duration;
use tokio::signal;
use tracing::{info, warn};

/// Waits for SIGTERM or SIGINT.
pub async fn wait_for_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating shutdown");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating shutdown");
        }
    }
}

/// Serves the router until a shutdown signal arrives, then drains in-flight
/// connections. The drain phase (not the server's lifetime) is bounded by
/// `drain_timeout`.
pub async fn serve_with_graceful_shutdown(
    listener: tokio::net::TcpListener,
    app: axum::Router,
    drain_timeout: Duration,
) {
    let (draining_tx, draining_rx) = tokio::sync::oneshot::channel::<()>();

    let server = axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            wait_for_signal().await;
            let _ = draining_tx.send(());
        })
        .into_future();
    tokio::pin!(server);

    tokio::select! {
        result = &mut server => match result {
            Ok(()) => info!("Server stopped normally"),
            Err(e) => warn!(error = %e, "Server error"),
        },
        () = async {
            let _ = draining_rx.await;
            tokio::time::sleep(drain_timeout).await;
        } => {
            warn!("Shutdown timeout reached before connections drained");
        }
    }
}
