//! Web server using Axum.

use std::net::SocketAddr;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use super::router::create_app_router;
use super::AppState;
use crate::error::{Error, Result};

/// Run the web server until the process is stopped.
pub async fn run_server(state: AppState) -> Result<()> {
    let addr: SocketAddr = state
        .settings
        .bind_addr()
        .parse()
        .map_err(|e| Error::Web(format!("Invalid address: {}", e)))?;

    let app = create_app_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        );

    tracing::info!("Starting web server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app).await?;

    Ok(())
}
