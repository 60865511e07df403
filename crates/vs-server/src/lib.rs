//! vs-server: HTTP delivery and ingestion of stored videos.
//!
//! This crate ties the range resolver and the asset store into an Axum
//! application. It provides:
//!
//! - Partial-content playback (`GET /videos?videoId=...`)
//! - Streaming multipart uploads (`POST /videos`)
//! - Request IDs, tracing and open CORS
//! - Graceful shutdown via signal handling

pub mod context;
pub mod delivery;
pub mod error;
pub mod ingest;
pub mod middleware;
pub mod router;
pub mod routes;

use std::net::SocketAddr;

use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use vs_core::config::Config;

use crate::context::AppContext;

/// Start the vidstream server.
///
/// Opens the asset store, binds the configured address and serves until a
/// shutdown signal is received.
pub async fn start(config: Config) -> vs_core::Result<()> {
    config.check()?;
    for warning in config.validate() {
        tracing::warn!("Config warning: {warning}");
    }

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .map_err(|e| vs_core::Error::Internal(format!("Invalid server address: {e}")))?;

    let ctx = AppContext::new(config)?;
    tracing::info!(
        root = %ctx.store.root().display(),
        max_chunk_bytes = ctx.config.streaming.max_chunk_bytes,
        naming_policy = ?ctx.config.ingest.naming_policy,
        "Video store ready"
    );

    let listener = TcpListener::bind(addr)
        .await
        .map_err(|e| vs_core::Error::Internal(format!("Failed to bind to {addr}: {e}")))?;

    serve(listener, ctx, CancellationToken::new()).await
}

/// Serve `ctx` on an already bound listener until a signal arrives or
/// `cancel` is triggered.
pub async fn serve(
    listener: TcpListener,
    ctx: AppContext,
    cancel: CancellationToken,
) -> vs_core::Result<()> {
    if let Ok(addr) = listener.local_addr() {
        tracing::info!("Starting server on {addr}");
    }

    let app = router::build_router(ctx);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(cancel))
        .await
        .map_err(|e| vs_core::Error::Internal(format!("Server error: {e}")))?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

/// Wait for a shutdown signal (SIGINT or SIGTERM) or cancellation.
async fn shutdown_signal(cancel: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
        _ = cancel.cancelled() => {}
    }

    tracing::info!("Shutdown signal received");
}
