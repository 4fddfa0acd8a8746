//! Process-wide shared state. Grounded on `notify_server::state::app_state::AppState`'s
//! `Arc<Inner>` + `Deref` shape, generalised so each decision-engine component
//! is guarded by its own `tokio::sync::Mutex` (§9: single-mutex-per-component).

use crate::config::AppConfig;
use scaler_adapters::cloud_metrics::CloudMetrics;
use scaler_adapters::cluster_api::ClusterApi;
use scaler_adapters::cluster_manager::ClusterManager;
use scaler_adapters::messaging::EventPublisher;
use scaler_adapters::retry::ExponentialBackoffRetry;
use scaler_core::memory_optimizer::MemoryOptimizer;
use scaler_core::node_health::NodeHealthMonitor;
use scaler_core::node_pool_scaler::NodePoolScaler;
use scaler_core::pod_health::PodHealthTracker;
use scaler_core::replica_controller::ReplicaController;
use scaler_core::time::TimeSource;
use scaler_core::window::MetricsWindow;
use std::ops::Deref;
use std::sync::Arc;
use tokio::sync::Mutex;

#[derive(Clone)]
pub struct AppState {
  inner: Arc<AppStateInner>,
}

pub struct AppStateInner {
  pub config: AppConfig,
  pub clock: Arc<dyn TimeSource>,
  pub cluster_api: Arc<dyn ClusterApi>,
  pub cloud_metrics: Arc<dyn CloudMetrics>,
  pub cluster_manager: Arc<dyn ClusterManager>,
  pub publisher: Arc<dyn EventPublisher>,
  /// Retries transient failures on cluster-API patches and event-stream
  /// publishes; conflicts and decode errors fail immediately (§7).
  pub retry: ExponentialBackoffRetry,
  pub window: Mutex<MetricsWindow>,
  pub replica_controller: Mutex<ReplicaController>,
  pub memory_optimizer: Mutex<MemoryOptimizer>,
  pub pod_health: Mutex<PodHealthTracker>,
  pub node_health: Mutex<NodeHealthMonitor>,
  pub node_pool: Mutex<NodePoolScaler>,
}

impl Deref for AppState {
  type Target = AppStateInner;

  fn deref(&self) -> &Self::Target {
    &self.inner
  }
}

impl AppState {
  pub fn new(
    config: AppConfig,
    clock: Arc<dyn TimeSource>,
    cluster_api: Arc<dyn ClusterApi>,
    cloud_metrics: Arc<dyn CloudMetrics>,
    cluster_manager: Arc<dyn ClusterManager>,
    publisher: Arc<dyn EventPublisher>,
  ) -> Self {
    let window_capacity = config.thresholds.window_capacity;
    let node_quarantine_seconds = config.thresholds.node_quarantine_seconds;
    Self {
      inner: Arc::new(AppStateInner {
        config,
        clock,
        cluster_api,
        cloud_metrics,
        cluster_manager,
        publisher,
        retry: ExponentialBackoffRetry::default(),
        window: Mutex::new(MetricsWindow::new(window_capacity)),
        replica_controller: Mutex::new(ReplicaController::new()),
        memory_optimizer: Mutex::new(MemoryOptimizer::new()),
        pod_health: Mutex::new(PodHealthTracker::default()),
        node_health: Mutex::new(NodeHealthMonitor::with_quarantine_seconds(node_quarantine_seconds)),
        node_pool: Mutex::new(NodePoolScaler::new()),
      }),
    }
  }
}
