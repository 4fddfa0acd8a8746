//! Cluster API adapter trait (component J). Narrow surface covering exactly
//! the operations the replica controller and node-pool scaler need.

use crate::error::AdapterError;
use async_trait::async_trait;
use scaler_core::node_health::NodeSnapshot;
use scaler_core::node_pool_scaler::NodeUtilization;
use scaler_core::pod_health::PodStatusSnapshot;

#[derive(Debug, Clone)]
pub struct WorkloadSpec {
  pub replicas: u32,
  pub memory_limit: Option<String>,
  pub memory_request: Option<String>,
}

#[derive(Debug, Clone)]
pub struct PodRef {
  pub name: String,
  pub namespace: String,
  pub node_name: Option<String>,
  /// Owned by a `DaemonSet`. The node-pool scaler's drain step excludes
  /// these (and anything in `kube-system`) from eviction.
  pub is_daemonset: bool,
}

#[derive(Debug, Clone)]
pub struct PendingPodRef {
  pub name: String,
  pub unschedulable_reason: String,
}

#[async_trait]
pub trait ClusterApi: Send + Sync {
  async fn read_workload_spec(&self, namespace: &str, deployment: &str) -> Result<WorkloadSpec, AdapterError>;

  async fn patch_replicas(&self, namespace: &str, deployment: &str, replicas: u32) -> Result<(), AdapterError>;

  async fn patch_memory(&self, namespace: &str, deployment: &str, limit: &str, request: &str) -> Result<(), AdapterError>;

  async fn list_pods_by_label(&self, namespace: &str, label_selector: &str) -> Result<Vec<PodRef>, AdapterError>;

  /// All pods on `node_name` across every namespace (`spec.nodeName=<node_name>`
  /// field selector), used by the node-pool scaler's drain step.
  async fn list_pods_on_node(&self, node_name: &str) -> Result<Vec<PodRef>, AdapterError>;

  /// Pods stuck in `Pending` cluster-wide, with their scheduler-reported
  /// unschedulable reason (e.g. `"Insufficient cpu"`). Feeds the node-pool
  /// scaler's scale-up-on-unschedulable-pods path.
  async fn list_pending_pods(&self) -> Result<Vec<PendingPodRef>, AdapterError>;

  /// Returns `None` when the pod's status could not be decoded — the caller
  /// treats this as "unknown" rather than failing the whole health pass.
  async fn read_pod_status(&self, namespace: &str, pod_name: &str) -> Result<Option<PodStatusSnapshot>, AdapterError>;

  async fn list_nodes(&self) -> Result<Vec<NodeSnapshot>, AdapterError>;

  /// Per-node cpu/memory utilisation as a fraction of allocatable capacity,
  /// read from the `metrics.k8s.io` aggregation layer. A node absent from
  /// the metrics snapshot (metrics-server lag) is simply omitted; the
  /// node-pool scaler treats a shrunken slice the same as a quiet cluster.
  async fn list_node_utilization(&self) -> Result<Vec<NodeUtilization>, AdapterError>;

  async fn patch_node_unschedulable(&self, node_name: &str, unschedulable: bool) -> Result<(), AdapterError>;

  async fn taint_node(&self, node_name: &str, key: &str, value: &str, effect: &str) -> Result<(), AdapterError>;

  async fn delete_pod(&self, namespace: &str, pod_name: &str, grace_period_seconds: u32) -> Result<(), AdapterError>;
}
