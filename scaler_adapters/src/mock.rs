//! Mock adapter implementations for tests, following the pattern of
//! `fechatter_core::services::mock::MockAuthService`: fixed or
//! programmable responses, no network I/O.

use crate::cloud_metrics::CloudMetrics;
use crate::cluster_api::{ClusterApi, PendingPodRef, PodRef, WorkloadSpec};
use scaler_core::node_pool_scaler::NodeUtilization;
use crate::cluster_manager::ClusterManager;
use crate::error::AdapterError;
use crate::messaging::{EventPublisher, EventSubscription};
use async_trait::async_trait;
use scaler_core::node_health::NodeSnapshot;
use scaler_core::pod_health::PodStatusSnapshot;
use scaler_core::replica_controller::BacklogStats;
use std::collections::VecDeque;
use std::sync::Mutex;

/// A pod as the mock cluster knows it: identity/placement fields used by the
/// node-pool drain path, plus the container-status snapshot used by pod
/// health checks.
#[derive(Clone)]
pub struct MockPod {
  pub name: String,
  pub namespace: String,
  pub node_name: Option<String>,
  pub is_daemonset: bool,
  pub status: PodStatusSnapshot,
}

impl MockPod {
  /// A plain workload pod in the default namespace, not pinned to a node —
  /// enough for pod-health tests that only care about container status.
  pub fn unplaced(name: &str, status: PodStatusSnapshot) -> Self {
    Self { name: name.to_string(), namespace: "default".to_string(), node_name: None, is_daemonset: false, status }
  }
}

/// Cluster API mock: holds one workload's state and a fixed fleet of nodes
/// and pods, mutated in place as the controller patches it.
pub struct MockClusterApi {
  pub workload: Mutex<WorkloadSpec>,
  pub nodes: Mutex<Vec<NodeSnapshot>>,
  pub pods: Mutex<Vec<MockPod>>,
  pub patch_replicas_calls: Mutex<Vec<u32>>,
  pub deleted_pods: Mutex<Vec<String>>,
  pub pending_pods: Mutex<Vec<PendingPodRef>>,
  pub node_utilization: Mutex<Vec<NodeUtilization>>,
}

impl Default for MockClusterApi {
  fn default() -> Self {
    Self {
      workload: Mutex::new(WorkloadSpec { replicas: 2, memory_limit: None, memory_request: None }),
      nodes: Mutex::new(Vec::new()),
      pods: Mutex::new(Vec::new()),
      patch_replicas_calls: Mutex::new(Vec::new()),
      deleted_pods: Mutex::new(Vec::new()),
      pending_pods: Mutex::new(Vec::new()),
      node_utilization: Mutex::new(Vec::new()),
    }
  }
}

#[async_trait]
impl ClusterApi for MockClusterApi {
  async fn read_workload_spec(&self, _namespace: &str, _deployment: &str) -> Result<WorkloadSpec, AdapterError> {
    Ok(self.workload.lock().unwrap().clone())
  }

  async fn patch_replicas(&self, _namespace: &str, _deployment: &str, replicas: u32) -> Result<(), AdapterError> {
    self.workload.lock().unwrap().replicas = replicas;
    self.patch_replicas_calls.lock().unwrap().push(replicas);
    Ok(())
  }

  async fn patch_memory(&self, _namespace: &str, _deployment: &str, limit: &str, request: &str) -> Result<(), AdapterError> {
    let mut workload = self.workload.lock().unwrap();
    workload.memory_limit = Some(limit.to_string());
    workload.memory_request = Some(request.to_string());
    Ok(())
  }

  async fn list_pods_by_label(&self, _namespace: &str, _label_selector: &str) -> Result<Vec<PodRef>, AdapterError> {
    Ok(
      self
        .pods
        .lock()
        .unwrap()
        .iter()
        .map(|pod| PodRef { name: pod.name.clone(), namespace: pod.namespace.clone(), node_name: pod.node_name.clone(), is_daemonset: pod.is_daemonset })
        .collect(),
    )
  }

  async fn list_pods_on_node(&self, node_name: &str) -> Result<Vec<PodRef>, AdapterError> {
    Ok(
      self
        .pods
        .lock()
        .unwrap()
        .iter()
        .filter(|pod| pod.node_name.as_deref() == Some(node_name))
        .map(|pod| PodRef { name: pod.name.clone(), namespace: pod.namespace.clone(), node_name: pod.node_name.clone(), is_daemonset: pod.is_daemonset })
        .collect(),
    )
  }

  async fn read_pod_status(&self, _namespace: &str, pod_name: &str) -> Result<Option<PodStatusSnapshot>, AdapterError> {
    Ok(self.pods.lock().unwrap().iter().find(|pod| pod.name == pod_name).map(|pod| pod.status.clone()))
  }

  async fn list_nodes(&self) -> Result<Vec<NodeSnapshot>, AdapterError> {
    Ok(self.nodes.lock().unwrap().clone())
  }

  async fn patch_node_unschedulable(&self, node_name: &str, unschedulable: bool) -> Result<(), AdapterError> {
    let mut nodes = self.nodes.lock().unwrap();
    if let Some(node) = nodes.iter_mut().find(|n| n.name == node_name) {
      node.schedulable = !unschedulable;
    }
    Ok(())
  }

  async fn taint_node(&self, node_name: &str, key: &str, _value: &str, _effect: &str) -> Result<(), AdapterError> {
    let mut nodes = self.nodes.lock().unwrap();
    if let Some(node) = nodes.iter_mut().find(|n| n.name == node_name) {
      if !node.taint_keys.iter().any(|k| k == key) {
        node.taint_keys.push(key.to_string());
      }
    }
    Ok(())
  }

  async fn delete_pod(&self, _namespace: &str, pod_name: &str, _grace_period_seconds: u32) -> Result<(), AdapterError> {
    self.deleted_pods.lock().unwrap().push(pod_name.to_string());
    self.pods.lock().unwrap().retain(|pod| pod.name != pod_name);
    Ok(())
  }

  async fn list_pending_pods(&self) -> Result<Vec<PendingPodRef>, AdapterError> {
    Ok(self.pending_pods.lock().unwrap().clone())
  }

  async fn list_node_utilization(&self) -> Result<Vec<NodeUtilization>, AdapterError> {
    Ok(self.node_utilization.lock().unwrap().clone())
  }
}

/// Cloud metrics mock returning a fixed, settable backlog reading.
pub struct MockCloudMetrics {
  pub stats: Mutex<BacklogStats>,
}

impl Default for MockCloudMetrics {
  fn default() -> Self {
    Self { stats: Mutex::new(BacklogStats::default()) }
  }
}

#[async_trait]
impl CloudMetrics for MockCloudMetrics {
  async fn backlog_stats(&self, _subscription_id: &str) -> Result<BacklogStats, AdapterError> {
    Ok(*self.stats.lock().unwrap())
  }
}

/// Cluster manager mock recording resize requests.
#[derive(Default)]
pub struct MockClusterManager {
  pub resize_calls: Mutex<Vec<u32>>,
}

#[async_trait]
impl ClusterManager for MockClusterManager {
  async fn set_node_pool_size(&self, _project: &str, _zone: &str, _cluster: &str, _pool: &str, count: u32) -> Result<(), AdapterError> {
    self.resize_calls.lock().unwrap().push(count);
    Ok(())
  }
}

/// Event publisher mock recording every `(subject, payload)` pair handed to
/// it, so an ingress test can assert what was published without a real
/// event stream.
#[derive(Default)]
pub struct MockEventPublisher {
  pub published: Mutex<Vec<(String, Vec<u8>)>>,
}

#[async_trait]
impl EventPublisher for MockEventPublisher {
  async fn publish(&self, subject: &str, payload: &[u8]) -> Result<(), AdapterError> {
    self.published.lock().unwrap().push((subject.to_string(), payload.to_vec()));
    Ok(())
  }
}

/// Event subscription mock that drains a fixed queue of payloads and then
/// blocks forever, mirroring a real subscription that simply has nothing new
/// to deliver rather than closing. Tests drive it to completion by racing it
/// against a `CancellationToken`.
#[derive(Default)]
pub struct MockEventSubscription {
  queue: Mutex<VecDeque<Vec<u8>>>,
}

impl MockEventSubscription {
  pub fn new(messages: Vec<Vec<u8>>) -> Self {
    Self { queue: Mutex::new(messages.into_iter().collect()) }
  }
}

#[async_trait]
impl EventSubscription for MockEventSubscription {
  async fn next(&mut self) -> Option<Vec<u8>> {
    let next = self.queue.lock().unwrap().pop_front();
    match next {
      Some(bytes) => Some(bytes),
      None => std::future::pending().await,
    }
  }
}
