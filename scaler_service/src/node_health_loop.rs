//! Periodic node-readiness poll (component E's timer half). Runs independently
//! of the event-ingress path and feeds `NodeHealthMonitor::last_summary`.

use crate::state::AppState;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

const POLL_INTERVAL_SECONDS: u64 = 30;

pub async fn run(state: AppState, shutdown: CancellationToken) {
  info!("node health loop starting");
  let mut ticker = tokio::time::interval(Duration::from_secs(POLL_INTERVAL_SECONDS));

  loop {
    tokio::select! {
      biased;
      _ = shutdown.cancelled() => {
        info!("node health loop observed shutdown, exiting");
        return;
      }
      _ = ticker.tick() => {
        tick(&state).await;
      }
    }
  }
}

async fn tick(state: &AppState) {
  let nodes = match state.cluster_api.list_nodes().await {
    Ok(nodes) => nodes,
    Err(e) => {
      error!(error = %e, "failed to list nodes");
      return;
    }
  };

  let (summary, newly_quarantined) = {
    let mut monitor = state.node_health.lock().await;
    monitor.check_node_health(state.clock.as_ref(), &nodes)
  };

  metrics::gauge!("scaler_nodes_quarantined").set(summary.quarantined as f64);
  metrics::gauge!("scaler_nodes_not_ready").set(summary.not_ready as f64);

  for node in newly_quarantined {
    match state.cluster_api.patch_node_unschedulable(&node, true).await {
      Ok(()) => info!(node, "quarantined node after sustained unreadiness"),
      Err(e) => warn!(error = %e, node, "failed to patch node unschedulable after quarantine"),
    }
  }
}
