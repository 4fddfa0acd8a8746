//! Cluster manager adapter trait (component J, node-pool resize backend).

use crate::error::AdapterError;
use async_trait::async_trait;

#[async_trait]
pub trait ClusterManager: Send + Sync {
  async fn set_node_pool_size(&self, project: &str, zone: &str, cluster: &str, pool: &str, count: u32) -> Result<(), AdapterError>;
}
