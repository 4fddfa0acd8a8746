//! Cloud metrics adapter trait (component D, backlog probe backend).

use crate::error::AdapterError;
use async_trait::async_trait;
use scaler_core::replica_controller::BacklogStats;

#[async_trait]
pub trait CloudMetrics: Send + Sync {
  /// Queries the 5-minute time series for undelivered message count and
  /// oldest-unacked age, filtered by `subscription_id`, and returns the
  /// first point of each. Implementations must fail open: on any error or
  /// missing series, the caller (the backlog probe) substitutes zeros
  /// rather than propagating — see `scaler_service::event_loop`.
  async fn backlog_stats(&self, subscription_id: &str) -> Result<BacklogStats, AdapterError>;
}
