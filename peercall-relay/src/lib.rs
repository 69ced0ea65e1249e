mod hub;

pub use hub::*;

use axum::Router;
use axum::routing::get;
use peercall_core::utils::SIGNALING_PATH;
use tokio::net::TcpListener;
use tracing::info;

pub fn router(hub: RelayHub) -> Router {
    Router::new()
        .route(SIGNALING_PATH, get(ws_handler))
        .with_state(hub)
}

/// Serve the relay on an already bound listener until the task is dropped.
pub async fn serve(listener: TcpListener, hub: RelayHub) -> anyhow::Result<()> {
    info!(
        "Relay listening on ws://{}{}",
        listener.local_addr()?,
        SIGNALING_PATH
    );
    axum::serve(listener, router(hub)).await?;
    Ok(())
}
