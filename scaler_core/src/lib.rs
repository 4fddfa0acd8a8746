//! Pure decision engine for the pulse autoscaler. No I/O: every component
//! here is a plain struct with synchronous methods, driven by the service
//! crate's async loops through the adapter traits in `scaler_adapters`.

pub mod classifier;
pub mod error;
pub mod ledger;
pub mod memory_optimizer;
pub mod model;
pub mod node_health;
pub mod node_pool_scaler;
pub mod pod_health;
pub mod quantity;
pub mod replica_controller;
pub mod time;
pub mod window;

pub use error::CoreError;
