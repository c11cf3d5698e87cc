//! API server.

use tokio::net::TcpListener;
use tokio::sync::broadcast;

use crate::api::{router, AppState};

/// Serve the API until the shutdown broadcast fires.
pub async fn serve(
    listener: TcpListener,
    state: AppState,
    mut shutdown: broadcast::Receiver<()>,
) -> Result<(), std::io::Error> {
    let addr = listener.local_addr()?;
    tracing::info!(address = %addr, "API server starting");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(async move {
            let _ = shutdown.recv().await;
            tracing::info!("API server draining");
        })
        .await?;

    tracing::info!("API server stopped");
    Ok(())
}
