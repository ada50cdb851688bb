pub mod envelope;
pub mod routes;
pub mod state;

use axum::Router;
use mt5gw_gateway::Gateway;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Build the Axum application router.
pub fn build_router(gateway: Gateway) -> Router {
    let app_state = Arc::new(state::AppState::new(gateway));

    routes::api_routes()
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(app_state)
}

/// Start the API server and run until Ctrl-C.
pub async fn start_server(gateway: Gateway, bind_addr: &str) -> anyhow::Result<()> {
    let app = build_router(gateway);
    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    tracing::info!("API server listening on {}", listener.local_addr()?);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    tracing::info!("API server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Failed to listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
}
