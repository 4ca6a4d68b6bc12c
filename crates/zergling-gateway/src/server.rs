//! HTTP server using Axum.

use std::future::Future;
use std::sync::Arc;

use axum::{Router, routing::get};
use zergling_core::config::GatewayConfig;
use zergling_stream::EventBus;

/// Shared state for the gateway server.
#[derive(Clone)]
pub struct GatewayState {
    pub bus: EventBus,
    pub start_time: std::time::Instant,
}

impl GatewayState {
    pub fn new(bus: EventBus) -> Self {
        Self {
            bus,
            start_time: std::time::Instant::now(),
        }
    }
}

async fn health_check() -> &'static str {
    "ok"
}

/// Build the router: `GET /health`, `GET /ws`.
pub fn router(state: Arc<GatewayState>) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/ws", get(super::ws::ws_handler))
        .with_state(state)
}

/// Serve until `shutdown` resolves.
pub async fn start(
    config: &GatewayConfig,
    bus: EventBus,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> anyhow::Result<()> {
    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("🌐 Widget gateway listening on ws://{addr}/ws");
    serve(listener, bus, shutdown).await
}

/// Serve on an already bound listener.
pub async fn serve(
    listener: tokio::net::TcpListener,
    bus: EventBus,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> anyhow::Result<()> {
    let app = router(Arc::new(GatewayState::new(bus)));
    axum::serve(listener, app).with_graceful_shutdown(shutdown).await?;
    tracing::info!("🌐 Widget gateway stopped");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_health_endpoint() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (tx, rx) = tokio::sync::oneshot::channel::<()>();
        let server = tokio::spawn(serve(listener, EventBus::new(), async move {
            let _ = rx.await;
        }));

        let body = reqwest::get(format!("http://{addr}/health"))
            .await
            .unwrap()
            .text()
            .await
            .unwrap();
        assert_eq!(body, "ok");

        tx.send(()).unwrap();
        server.await.unwrap().unwrap();
    }
}
