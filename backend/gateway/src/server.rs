//! HTTP server: health routes plus the optional webhook router.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use anyhow::Result;
use axum::{routing::get, Router};
use tokio::net::TcpListener;
use tokio::sync::watch;
use tower_http::trace::TraceLayer;
use tracing::{info, instrument};

use linkdrop_relay::{Broadcaster, RecipientDirectory};

use crate::health_api;

/// Application state shared across routes.
#[derive(Clone)]
pub struct GatewayState {
    pub started_at: Instant,
    pub directory: Arc<RecipientDirectory>,
    pub broadcaster: Arc<Broadcaster>,
}

impl GatewayState {
    pub fn new(directory: Arc<RecipientDirectory>, broadcaster: Arc<Broadcaster>) -> Self {
        Self { started_at: Instant::now(), directory, broadcaster }
    }
}

/// Health routes, merged with `webhook` when the bot receives pushes.
pub fn build_router(state: GatewayState, webhook: Option<Router>) -> Router {
    let mut app = Router::new()
        .route("/", get(health_api::liveness))
        .route("/health", get(health_api::liveness))
        .route("/api/health", get(health_api::get_health))
        .with_state(state);
    if let Some(webhook) = webhook {
        app = app.merge(webhook);
    }
    app.layer(TraceLayer::new_for_http())
}

/// Serve `app` on `addr` until `shutdown` flips to true.
#[instrument(skip(app, shutdown))]
pub async fn start_server(
    addr: SocketAddr,
    app: Router,
    mut shutdown: watch::Receiver<bool>,
) -> Result<()> {
    info!("HTTP server listening on {}", addr);
    let listener = TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = shutdown.wait_for(|stop| *stop).await;
        })
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::State;
    use linkdrop_core::testkit::RecordingGateway;
    use linkdrop_core::RecipientId;
    use linkdrop_relay::BroadcastPolicy;
    use linkdrop_store::InMemoryStore;

    fn state() -> GatewayState {
        let store = Arc::new(InMemoryStore::new());
        let directory = Arc::new(RecipientDirectory::new(store.clone()));
        let broadcaster = Arc::new(Broadcaster::new(
            directory.clone(),
            Arc::new(RecordingGateway::new()),
            store,
            BroadcastPolicy::default(),
        ));
        GatewayState::new(directory, broadcaster)
    }

    #[tokio::test]
    async fn liveness_is_plain_ok() {
        assert_eq!(health_api::liveness().await, "OK");
    }

    #[tokio::test]
    async fn health_reports_recipients() {
        let state = state();
        state.directory.touch(RecipientId(1), "Ada", None).await.unwrap();
        state.directory.touch(RecipientId(2), "Bob", Some("bob")).await.unwrap();

        let report = health_api::get_health(State(state)).await.0;
        assert_eq!(report.status, "ok");
        assert_eq!(report.recipients, Some(2));
        assert!(!report.broadcast_running);
    }

    #[tokio::test]
    async fn server_stops_on_shutdown() {
        let (tx, rx) = watch::channel(false);
        let addr: SocketAddr = "127.0.0.1:0".parse().unwrap();
        let handle = tokio::spawn(start_server(addr, build_router(state(), None), rx));
        tx.send(true).unwrap();
        handle.await.unwrap().unwrap();
    }
}
