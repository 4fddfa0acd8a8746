//! Per-pod crash-loop / OOM tracking consumed by the replica controller
//! (component `PodHealthState` in §3, algorithm in §4.G `pod_health()`).

use std::collections::HashMap;

/// The subset of container status the decision engine cares about. Adapters
/// translate whatever the cluster API returns into this shape; a pod whose
/// status could not be decoded is simply omitted by the adapter, which the
/// controller then treats as `Unknown` (§7).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContainerState {
  Waiting { reason: String },
  Running,
  Terminated { reason: String },
}

#[derive(Debug, Clone)]
pub struct PodStatusSnapshot {
  pub pod_name: String,
  pub containers: Vec<ContainerState>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PodHealthStatus {
  Healthy,
  Unhealthy,
  Oom,
  Unknown,
}

/// Tracks consecutive `CrashLoopBackOff` observations per pod, resetting on
/// `Running`.
#[derive(Debug, Default)]
pub struct PodHealthTracker {
  crash_loop_counts: HashMap<String, u32>,
}

impl PodHealthTracker {
  /// Evaluates one polling pass across all pods belonging to the workload.
  /// Returns the first `Unhealthy` or `Oom` verdict found (scan order
  /// matches the original: crash-loop check before OOM check, per pod, in
  /// the order pods are listed) plus, for `Oom`, the pod name that OOM'd so
  /// the caller can route it to the memory optimiser.
  pub fn evaluate(
    &mut self,
    pods: &[PodStatusSnapshot],
    crashloop_threshold: u32,
    pod_decoded_ok: impl Fn(&str) -> bool,
  ) -> (PodHealthStatus, Option<String>) {
    let mut saw_any_decoded = false;

    for pod in pods {
      if !pod_decoded_ok(&pod.pod_name) {
        continue;
      }
      saw_any_decoded = true;

      for container in &pod.containers {
        match container {
          ContainerState::Waiting { reason } if reason == "CrashLoopBackOff" => {
            let count = self.crash_loop_counts.entry(pod.pod_name.clone()).or_insert(0);
            *count += 1;
            if *count >= crashloop_threshold {
              return (PodHealthStatus::Unhealthy, None);
            }
          }
          ContainerState::Terminated { reason } if reason == "OOMKilled" => {
            return (PodHealthStatus::Oom, Some(pod.pod_name.clone()));
          }
          ContainerState::Running => {
            self.crash_loop_counts.remove(&pod.pod_name);
          }
          _ => {}
        }
      }
    }

    if pods.is_empty() || !saw_any_decoded {
      (PodHealthStatus::Unknown, None)
    } else {
      (PodHealthStatus::Healthy, None)
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn waiting(reason: &str) -> ContainerState {
    ContainerState::Waiting { reason: reason.to_string() }
  }

  fn terminated(reason: &str) -> ContainerState {
    ContainerState::Terminated { reason: reason.to_string() }
  }

  #[test]
  fn crash_loop_counts_to_threshold() {
    let mut tracker = PodHealthTracker::default();
    let pods = vec![PodStatusSnapshot {
      pod_name: "p1".to_string(),
      containers: vec![waiting("CrashLoopBackOff")],
    }];

    let (status, _) = tracker.evaluate(&pods, 3, |_| true);
    assert_eq!(status, PodHealthStatus::Healthy);
    let (status, _) = tracker.evaluate(&pods, 3, |_| true);
    assert_eq!(status, PodHealthStatus::Healthy);
    let (status, _) = tracker.evaluate(&pods, 3, |_| true);
    assert_eq!(status, PodHealthStatus::Unhealthy);
  }

  #[test]
  fn running_clears_crash_loop_count() {
    let mut tracker = PodHealthTracker::default();
    let crashing = vec![PodStatusSnapshot {
      pod_name: "p1".to_string(),
      containers: vec![waiting("CrashLoopBackOff")],
    }];
    tracker.evaluate(&crashing, 3, |_| true);
    tracker.evaluate(&crashing, 3, |_| true);

    let recovered = vec![PodStatusSnapshot {
      pod_name: "p1".to_string(),
      containers: vec![ContainerState::Running],
    }];
    tracker.evaluate(&recovered, 3, |_| true);

    // Counter reset, so two more crash-loop observations should not yet trip.
    let (status, _) = tracker.evaluate(&crashing, 3, |_| true);
    assert_eq!(status, PodHealthStatus::Healthy);
  }

  #[test]
  fn oom_termination_is_reported_with_pod_name() {
    let mut tracker = PodHealthTracker::default();
    let pods = vec![PodStatusSnapshot {
      pod_name: "p2".to_string(),
      containers: vec![terminated("OOMKilled")],
    }];
    let (status, pod) = tracker.evaluate(&pods, 3, |_| true);
    assert_eq!(status, PodHealthStatus::Oom);
    assert_eq!(pod.as_deref(), Some("p2"));
  }

  #[test]
  fn undecodable_pod_status_yields_unknown() {
    let mut tracker = PodHealthTracker::default();
    let pods = vec![PodStatusSnapshot {
      pod_name: "p3".to_string(),
      containers: vec![waiting("CrashLoopBackOff")],
    }];
    let (status, _) = tracker.evaluate(&pods, 3, |_| false);
    assert_eq!(status, PodHealthStatus::Unknown);
  }
}
