//! Health API
//!
//! `GET /` and `GET /health` answer a plain `OK` for platform probes;
//! `GET /api/health` reports process status as JSON.

use axum::{extract::State, Json};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::warn;

use crate::server::GatewayState;

#[derive(Debug, Serialize)]
pub struct HealthReport {
    pub status: String,
    pub uptime_seconds: u64,
    /// Known recipients; absent when the directory could not be read.
    pub recipients: Option<u64>,
    pub broadcast_running: bool,
    pub timestamp: DateTime<Utc>,
}

/// Handler for `GET /` and `GET /health`
pub async fn liveness() -> &'static str {
    "OK"
}

/// Handler for `GET /api/health`
pub async fn get_health(State(state): State<GatewayState>) -> Json<HealthReport> {
    let recipients = match state.directory.count().await {
        Ok(count) => Some(count),
        Err(e) => {
            warn!(error = %e, "Health check could not count recipients");
            None
        }
    };
    let status = if recipients.is_some() { "ok" } else { "degraded" };

    Json(HealthReport {
        status: status.into(),
        uptime_seconds: state.started_at.elapsed().as_secs(),
        recipients,
        broadcast_running: state.broadcaster.is_running().await,
        timestamp: Utc::now(),
    })
}
