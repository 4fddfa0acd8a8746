//! External-interface adapters consumed by `scaler_service`: narrow traits
//! over the cluster API, cloud metrics, cluster manager and event stream,
//! plus retry/backoff and mock implementations for tests.

pub mod cloud_metrics;
pub mod cluster_api;
pub mod cluster_manager;
pub mod error;
pub mod messaging;
pub mod mock;
pub mod retry;

pub use error::AdapterError;
