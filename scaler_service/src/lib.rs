//! Autoscaler service: HTTP push ingress plus three background decision
//! loops, composed the way `notify_server::get_router` composes its routes
//! and spawned event processors.

pub mod config;
pub mod error;
pub mod event_loop;
pub mod ingress;
pub mod node_health_loop;
pub mod node_pool_loop;
pub mod observability;
pub mod shutdown;
pub mod state;

pub use config::AppConfig;
pub use error::ServiceError;
pub use state::AppState;

use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::json;

/// Builds the router: the push-ingress endpoint plus health/readiness probes
/// for the orchestrator. Background loops are spawned by the caller
/// (`main.rs`), not here, so tests can mount the router without also racing
/// timer-driven side effects.
pub fn get_router(state: AppState) -> Router {
  Router::new()
    .route("/", post(ingress::ingest))
    .route("/health", get(health_check))
    .route("/ready", get(readiness_check))
    .with_state(state)
}

async fn health_check() -> Json<serde_json::Value> {
  Json(json!({ "status": "healthy", "service": "scaler_service" }))
}

async fn readiness_check() -> Json<serde_json::Value> {
  Json(json!({ "status": "ready" }))
}
