//! Periodic node-pool sizing poll (component H's timer half). Drains and
//! resizes the underlying cluster node pool, separate from the per-workload
//! replica controller.

use crate::state::AppState;
use scaler_core::ledger::ScaleDirection;
use scaler_core::node_pool_scaler::{NodePoolDecision, NodePoolScaler, PendingPod};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

const POLL_INTERVAL_SECONDS: u64 = 120;

pub async fn run(state: AppState, shutdown: CancellationToken) {
  info!("node pool loop starting");
  let mut ticker = tokio::time::interval(Duration::from_secs(POLL_INTERVAL_SECONDS));

  loop {
    tokio::select! {
      biased;
      _ = shutdown.cancelled() => {
        info!("node pool loop observed shutdown, exiting");
        return;
      }
      _ = ticker.tick() => {
        tick(&state).await;
      }
    }
  }
}

async fn tick(state: &AppState) {
  let utilizations = match state.cluster_api.list_node_utilization().await {
    Ok(utilizations) => utilizations,
    Err(e) => {
      error!(error = %e, "failed to read node utilisation for node-pool check");
      return;
    }
  };
  if utilizations.is_empty() {
    return;
  }

  let node_count = match state.cluster_api.list_nodes().await {
    Ok(nodes) => nodes.len() as u32,
    Err(e) => {
      error!(error = %e, "failed to list nodes for node-pool check");
      return;
    }
  };

  let pending = match state.cluster_api.list_pending_pods().await {
    Ok(pods) => pods
      .into_iter()
      .map(|p| PendingPod { name: p.name, unschedulable_reason: p.unschedulable_reason })
      .collect::<Vec<_>>(),
    Err(e) => {
      warn!(error = %e, "failed to list pending pods, proceeding with none");
      Vec::new()
    }
  };

  let decision = {
    let scaler = state.node_pool.lock().await;
    scaler.check_and_scale(state.clock.as_ref(), &utilizations, &pending, node_count)
  };

  match decision {
    NodePoolDecision::ScaleUp { new_count, reason } => scale_up(state, new_count, &reason).await,
    NodePoolDecision::ScaleDown { target_node, new_count, reason } => scale_down(state, &target_node, new_count, &reason).await,
    NodePoolDecision::Hold { reason } => tracing::debug!(reason, "holding node pool size"),
  }
}

async fn scale_up(state: &AppState, new_count: u32, reason: &str) {
  let old_count = new_count.saturating_sub(1);
  match resize(state, new_count).await {
    Ok(()) => {
      state.node_pool.lock().await.record(state.clock.as_ref(), ScaleDirection::Up, old_count, new_count, reason.to_string());
      metrics::counter!("scaler_node_pool_actions_total", "direction" => "up").increment(1);
      info!(new_count, reason, "scaled node pool up");
    }
    Err(e) => error!(error = %e, "failed to resize node pool up"),
  }
}

async fn scale_down(state: &AppState, target_node: &str, new_count: u32, reason: &str) {
  let plan = NodePoolScaler::drain_plan(target_node);

  let cordon_result = {
    let cluster_api = state.cluster_api.clone();
    let node = plan.node.clone();
    state
      .retry
      .retry(move || {
        let cluster_api = cluster_api.clone();
        let node = node.clone();
        async move { cluster_api.patch_node_unschedulable(&node, true).await }
      })
      .await
  };
  if let Err(e) = cordon_result {
    error!(error = %e, node = %plan.node, "failed to cordon node before drain");
    return;
  }

  let taint_result = {
    let cluster_api = state.cluster_api.clone();
    let node = plan.node.clone();
    let taint_key = plan.taint_key;
    state
      .retry
      .retry(move || {
        let cluster_api = cluster_api.clone();
        let node = node.clone();
        async move { cluster_api.taint_node(&node, taint_key, "true", "NoSchedule").await }
      })
      .await
  };
  if let Err(e) = taint_result {
    error!(error = %e, node = %plan.node, "failed to taint node before drain");
    return;
  }

  let pods = match state.cluster_api.list_pods_on_node(&plan.node).await {
    Ok(pods) => pods,
    Err(e) => {
      error!(error = %e, node = %plan.node, "failed to list pods on draining node");
      return;
    }
  };
  let evictable = pods.into_iter().filter(|pod| !pod.is_daemonset && pod.namespace != "kube-system");
  for pod in evictable {
    if let Err(e) = state.cluster_api.delete_pod(&pod.namespace, &pod.name, plan.grace_period_seconds).await {
      warn!(error = %e, pod = %pod.name, "failed to evict pod during drain");
    }
  }

  tokio::time::sleep(Duration::from_secs(plan.post_drain_wait_seconds)).await;

  let old_count = new_count + 1;
  match resize(state, new_count).await {
    Ok(()) => {
      state.node_pool.lock().await.record(state.clock.as_ref(), ScaleDirection::Down, old_count, new_count, reason.to_string());
      metrics::counter!("scaler_node_pool_actions_total", "direction" => "down").increment(1);
      info!(node = %plan.node, new_count, reason, "scaled node pool down after drain");
    }
    Err(e) => error!(error = %e, node = %plan.node, "failed to resize node pool down"),
  }
}

async fn resize(state: &AppState, count: u32) -> Result<(), scaler_adapters::AdapterError> {
  let cluster_manager = state.cluster_manager.clone();
  let project_id = state.config.cluster.project_id.clone();
  let zone = state.config.cluster.zone.clone();
  let cluster_name = state.config.cluster.cluster_name.clone();
  let node_pool_name = state.config.cluster.node_pool_name.clone();

  state
    .retry
    .retry(move || {
      let cluster_manager = cluster_manager.clone();
      let project_id = project_id.clone();
      let zone = zone.clone();
      let cluster_name = cluster_name.clone();
      let node_pool_name = node_pool_name.clone();
      async move { cluster_manager.set_node_pool_size(&project_id, &zone, &cluster_name, &node_pool_name, count).await }
    })
    .await
}
