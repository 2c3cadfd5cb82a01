//! linkdrop HTTP server
//!
//! Liveness endpoints for the hosting platform, plus the Telegram webhook
//! route when the bot runs in webhook mode.

pub mod health_api;
pub mod server;

pub use health_api::HealthReport;
pub use server::{build_router, start_server, GatewayState};
