//! Event-ingress loop (component I). Grounded on `notify_server::events::processor::EventProcessor`'s
//! subscribe-decode-dispatch shape, generalised to this crate's single event type.

use crate::state::AppState;
use scaler_adapters::messaging::EventSubscription;
use scaler_core::model::Event;
use scaler_core::pod_health::{PodHealthStatus, PodStatusSnapshot};
use scaler_core::replica_controller::{BacklogStats, ExecuteOutcome, ScaleAction};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

const CRITICAL_MULTIPLIER: f64 = 1.0;

pub async fn run(state: AppState, mut subscription: Box<dyn EventSubscription>, shutdown: CancellationToken) {
  info!("event ingress loop starting");

  loop {
    let message = tokio::select! {
      biased;
      _ = shutdown.cancelled() => {
        info!("event ingress loop observed shutdown, exiting");
        return;
      }
      message = subscription.next() => message,
    };

    let Some(bytes) = message else {
      warn!("event subscription closed, exiting ingress loop");
      return;
    };

    let event: Event = match serde_json::from_slice(&bytes) {
      Ok(event) => event,
      Err(e) => {
        warn!(error = %e, "malformed event, acknowledging and skipping");
        continue;
      }
    };

    process_event(&state, event).await;
    // Acks are unconditional after processing (§4.I): at-least-once delivery
    // with idempotent effects, duplicate decisions absorbed by cooldown.
  }
}

async fn process_event(state: &AppState, event: Event) {
  if event.is_critical() {
    execute_if_due(state, ScaleAction::Up, true, CRITICAL_MULTIPLIER, "critical event").await;
    return;
  }

  let Some(metrics) = &event.metrics else {
    debug!("non-critical event without metrics, nothing to decide");
    return;
  };

  {
    let mut window = state.window.lock().await;
    window.add(event.timestamp, metrics);
  }
  let stats = state.window.lock().await.get_stats();

  let pod_health = evaluate_pod_health(state, &event.node_id).await;
  if pod_health == PodHealthStatus::Oom {
    metrics::counter!("scaler_oom_events_total").increment(1);
  }

  let node_summary = state.node_health.lock().await.last_summary();
  let capacity_loss = state.node_health.lock().await.capacity_loss_ratio(&node_summary);
  let backlog = state
    .cloud_metrics
    .backlog_stats(&state.config.messaging.metrics_subscription_id)
    .await
    .unwrap_or_default();
  let backlog = BacklogStats {
    backlog_size: backlog.backlog_size,
    oldest_message_age_seconds: backlog.oldest_message_age_seconds,
  };

  let decision = {
    let controller = state.replica_controller.lock().await;
    controller.should_scale(&stats, false, pod_health, &node_summary, capacity_loss, backlog)
  };

  metrics::counter!("scaler_events_classified_total", "severity" => format!("{:?}", event.severity)).increment(1);

  let Some(action) = decision.action else {
    debug!(reason = %decision.reason, "holding replica count");
    return;
  };

  let bypass = matches!(decision.reason.as_str(), "oom" | "node failure");
  let multiplier = scaler_core::replica_controller::ReplicaController::multiplier_for(&decision.reason);
  execute_if_due(state, action, bypass, multiplier, &decision.reason).await;
}

async fn evaluate_pod_health(state: &AppState, node_id: &str) -> PodHealthStatus {
  let label_selector = format!("app={}", state.config.workload.deployment);
  let pod_refs = match state.cluster_api.list_pods_by_label(&state.config.workload.namespace, &label_selector).await {
    Ok(pods) => pods,
    Err(e) => {
      warn!(error = %e, node_id, "failed to list pods, treating health as unknown");
      return PodHealthStatus::Unknown;
    }
  };

  let mut snapshots = Vec::with_capacity(pod_refs.len());
  let mut decoded: Vec<String> = Vec::new();
  for pod_ref in &pod_refs {
    match state.cluster_api.read_pod_status(&state.config.workload.namespace, &pod_ref.name).await {
      Ok(Some(status)) => {
        decoded.push(status.pod_name.clone());
        snapshots.push(status);
      }
      Ok(None) => snapshots.push(PodStatusSnapshot { pod_name: pod_ref.name.clone(), containers: Vec::new() }),
      Err(e) => warn!(error = %e, pod = %pod_ref.name, "failed to read pod status"),
    }
  }

  let mut tracker = state.pod_health.lock().await;
  let (status, oom_pod) = tracker.evaluate(&snapshots, state.config.thresholds.crashloop_threshold, |name| decoded.iter().any(|d| d == name));
  drop(tracker);

  if let (PodHealthStatus::Oom, Some(pod)) = (status, oom_pod) {
    handle_oom(state, &pod).await;
  }

  status
}

async fn handle_oom(state: &AppState, pod: &str) {
  let reached_threshold = {
    let mut optimizer = state.memory_optimizer.lock().await;
    optimizer.record_oom(state.clock.as_ref(), pod)
  };
  if !reached_threshold {
    return;
  }

  let workload_key = format!("{}/{}", state.config.workload.namespace, state.config.workload.deployment);
  let should_adjust = state.memory_optimizer.lock().await.should_adjust(state.clock.as_ref(), &workload_key);
  if !should_adjust {
    return;
  }

  let spec = match state.cluster_api.read_workload_spec(&state.config.workload.namespace, &state.config.workload.deployment).await {
    Ok(spec) => spec,
    Err(e) => {
      error!(error = %e, "failed to read workload spec for memory adjustment");
      return;
    }
  };

  let adjustment = state.memory_optimizer.lock().await.adjust_memory(spec.memory_limit.as_deref());
  if !adjustment.changed {
    return;
  }

  let limit = adjustment.new_limit.to_string();
  let cluster_api = state.cluster_api.clone();
  let namespace = state.config.workload.namespace.clone();
  let deployment = state.config.workload.deployment.clone();
  let result = state
    .retry
    .retry(move || {
      let cluster_api = cluster_api.clone();
      let namespace = namespace.clone();
      let deployment = deployment.clone();
      let limit = limit.clone();
      async move { cluster_api.patch_memory(&namespace, &deployment, &limit, &limit).await }
    })
    .await;

  match result {
    Ok(()) => {
      state.memory_optimizer.lock().await.record_adjustment(state.clock.as_ref(), &workload_key);
      info!(old = %adjustment.old_limit, new = %adjustment.new_limit, "patched memory limit after repeated oom");
    }
    Err(e) => error!(error = %e, "failed to patch memory limit"),
  }
}

async fn execute_if_due(state: &AppState, action: ScaleAction, bypass: bool, multiplier: f64, reason: &str) {
  let spec = match state.cluster_api.read_workload_spec(&state.config.workload.namespace, &state.config.workload.deployment).await {
    Ok(spec) => spec,
    Err(e) => {
      error!(error = %e, "failed to read workload spec");
      return;
    }
  };

  let outcome = {
    let controller = state.replica_controller.lock().await;
    controller.execute_scale(state.clock.as_ref(), action, bypass, multiplier, spec.replicas)
  };

  match outcome {
    ExecuteOutcome::Patch { old_count, new_count } => {
      let cluster_api = state.cluster_api.clone();
      let namespace = state.config.workload.namespace.clone();
      let deployment = state.config.workload.deployment.clone();
      let result = state
        .retry
        .retry(move || {
          let cluster_api = cluster_api.clone();
          let namespace = namespace.clone();
          let deployment = deployment.clone();
          async move { cluster_api.patch_replicas(&namespace, &deployment, new_count).await }
        })
        .await;

      match result {
        Ok(()) => {
          state.replica_controller.lock().await.cooldown.record(state.clock.as_ref());
          metrics::counter!("scaler_scale_actions_total", "direction" => format!("{:?}", action), "reason" => reason.to_string()).increment(1);
          info!(old_count, new_count, reason, "executed replica scale");
        }
        Err(e) => error!(error = %e, "replica patch rejected"),
      }
    }
    ExecuteOutcome::Rejected { reason } => debug!(reason, "scale action rejected"),
  }
}
