//! Gateway HTTP server

use crate::gate::config::GatewayConfig;
use crate::gate::handlers::{self, GatewayState};
use crate::Client;
use anyhow::Context;
use axum::{
    extract::{Request, State},
    middleware::{self, Next},
    routing::{get, post},
    Json, Router,
};
use std::sync::Arc;
use std::time::Instant;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tracing::{info, warn, Instrument};

/// Path of the chat endpoint
pub const CHAT_PATH: &str = "/api/v1/chat";

/// Build the gateway router
pub fn router(state: GatewayState, config: &GatewayConfig) -> Router {
    let app = Router::new()
        .route(CHAT_PATH, post(handlers::chat_handler))
        // Utility endpoints
        .route("/", get(health_check))
        .route("/health", get(health_check))
        .with_state(state)
        .layer(middleware::from_fn(logging_middleware));

    if config.cors_allow_any {
        app.layer(CorsLayer::permissive())
    } else {
        app
    }
}

/// Serve `app` on an already bound listener until Ctrl-C
pub async fn serve(listener: TcpListener, app: Router) -> anyhow::Result<()> {
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

/// Start the gateway server
pub async fn start_server(config: GatewayConfig, client: Arc<dyn Client>) -> anyhow::Result<()> {
    if !client.is_configured() {
        warn!("No upstream credential configured; chat requests will fail with Unauthenticated");
    }

    let app = router(GatewayState::new(client), &config);

    let addr = config.bind_addr();
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;

    info!("Starting Gateway on http://{}", listener.local_addr()?);

    serve(listener, app).await
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_err() {
        // No signal handler available; run until the process is killed
        std::future::pending::<()>().await;
    }
    info!("Gateway shutting down");
}

/// Health check handler
async fn health_check(State(state): State<GatewayState>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "service": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
        "upstream_configured": state.client.is_configured(),
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

/// Logging middleware
///
/// Logs method, path, status and latency under a per-request id. Headers and
/// bodies are never logged.
async fn logging_middleware(req: Request, next: Next) -> axum::response::Response {
    let start = Instant::now();
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let span = tracing::info_span!("request", id = %uuid::Uuid::new_v4());

    async move {
        let response = next.run(req).await;

        let duration = start.elapsed();
        let status = response.status();

        info!("{} {} {} {:?}", method, path, status, duration);

        response
    }
    .instrument(span)
    .await
}
