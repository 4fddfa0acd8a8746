//! Fuses window stats, pod health, node health and backlog into a scale
//! decision (component G). Grounded on `autoscaler.py`'s `should_scale` /
//! `execute_scale`.

use crate::ledger::Cooldown;
use crate::node_health::NodeHealthSummary;
use crate::pod_health::PodHealthStatus;
use crate::time::TimeSource;
use crate::window::{Trend, WindowStats};

const DEFAULT_COOLDOWN_SECONDS: i64 = 60;
const DEFAULT_CRITICAL_BYPASS_WINDOW_SECONDS: i64 = 15;
const DEFAULT_MIN_REPLICAS: u32 = 2;
const DEFAULT_MAX_REPLICAS: u32 = 8;

const BACKLOG_SIZE_THRESHOLD: i64 = 1000;
const BACKLOG_AGE_THRESHOLD_SECONDS: i64 = 60;
const CAPACITY_LOSS_THRESHOLD: f64 = 0.25;
const SCORE_UP_THRESHOLD: f64 = 70.0;
const SCORE_DOWN_THRESHOLD: f64 = 30.0;
const P95_UP_THRESHOLD: f64 = 500.0;
const P99_UP_THRESHOLD: f64 = 1000.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScaleAction {
  Up,
  Down,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct BacklogStats {
  pub backlog_size: i64,
  pub oldest_message_age_seconds: i64,
}

#[derive(Debug, Clone)]
pub struct ScaleDecision {
  pub action: Option<ScaleAction>,
  pub reason: String,
}

impl ScaleDecision {
  fn hold(reason: &str) -> Self {
    Self { action: None, reason: reason.to_string() }
  }

  fn up(reason: &str) -> Self {
    Self { action: Some(ScaleAction::Up), reason: reason.to_string() }
  }

  fn down(reason: &str) -> Self {
    Self { action: Some(ScaleAction::Down), reason: reason.to_string() }
  }
}

/// Outcome of `execute_scale`: either a new replica count to patch, or a
/// reason the action was rejected without touching the cluster.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecuteOutcome {
  Patch { old_count: u32, new_count: u32 },
  Rejected { reason: String },
}

pub struct ReplicaController {
  pub cooldown: Cooldown,
  min_replicas: u32,
  max_replicas: u32,
  cooldown_seconds: i64,
  critical_bypass_window_seconds: i64,
}

impl Default for ReplicaController {
  fn default() -> Self {
    Self {
      cooldown: Cooldown::default(),
      min_replicas: DEFAULT_MIN_REPLICAS,
      max_replicas: DEFAULT_MAX_REPLICAS,
      cooldown_seconds: DEFAULT_COOLDOWN_SECONDS,
      critical_bypass_window_seconds: DEFAULT_CRITICAL_BYPASS_WINDOW_SECONDS,
    }
  }
}

impl ReplicaController {
  pub fn new() -> Self {
    Self::default()
  }

  /// How long ago a bypassed CRITICAL decision would still count as "recent"
  /// for observability purposes only — never gates the bypass itself.
  pub fn critical_bypass_window_seconds(&self) -> i64 {
    self.critical_bypass_window_seconds
  }

  pub fn should_scale(
    &self,
    stats: &WindowStats,
    critical: bool,
    pod_health: PodHealthStatus,
    node_summary: &NodeHealthSummary,
    capacity_loss: f64,
    backlog: BacklogStats,
  ) -> ScaleDecision {
    if stats.count < 3 {
      return ScaleDecision::hold("insufficient data");
    }

    match pod_health {
      PodHealthStatus::Unhealthy => return ScaleDecision::hold("pod unhealthy"),
      PodHealthStatus::Oom => return ScaleDecision::up("oom"),
      PodHealthStatus::Healthy | PodHealthStatus::Unknown => {}
    }

    if node_summary.not_ready > 0 && node_summary.healthy == 0 {
      return ScaleDecision::hold("no healthy nodes");
    }
    if capacity_loss > CAPACITY_LOSS_THRESHOLD {
      return ScaleDecision::up("node failure");
    }

    if backlog.backlog_size > BACKLOG_SIZE_THRESHOLD {
      return ScaleDecision::up("backlog high");
    }
    if backlog.oldest_message_age_seconds > BACKLOG_AGE_THRESHOLD_SECONDS {
      return ScaleDecision::up("message age high");
    }

    if critical {
      return ScaleDecision::up("critical event");
    }

    let score = 0.4 * stats.avg_cpu.min(100.0)
      + 0.35 * (100.0 * stats.latency_p95 / 500.0).min(100.0)
      + 0.25 * (100.0 * stats.avg_error_rate / 10.0).min(100.0);

    if score > SCORE_UP_THRESHOLD
      || stats.latency_p95 > P95_UP_THRESHOLD
      || stats.latency_p99 > P99_UP_THRESHOLD
      || stats.trend == Some(Trend::Spiking)
    {
      return ScaleDecision::up("high load");
    }

    if score < SCORE_DOWN_THRESHOLD && !matches!(stats.trend, Some(Trend::Increasing) | Some(Trend::Spiking)) {
      return ScaleDecision::down("low load");
    }

    ScaleDecision::hold("normal")
  }

  /// `multiplier` drives the up-scale step: `OOM -> 2`, `node failure -> 1.5`,
  /// else `1`. Does not itself patch the cluster — the caller applies the
  /// returned `new_count` and, on success, should call `self.cooldown.record`.
  pub fn execute_scale(
    &self,
    clock: &dyn TimeSource,
    action: ScaleAction,
    bypass_cooldown: bool,
    multiplier: f64,
    current_replicas: u32,
  ) -> ExecuteOutcome {
    if !bypass_cooldown && !self.cooldown.has_elapsed(clock, self.cooldown_seconds) {
      return ExecuteOutcome::Rejected { reason: "cooldown active".to_string() };
    }

    let new_count = match action {
      ScaleAction::Up => {
        let step = if multiplier > 1.0 {
          ((current_replicas as f64) * (multiplier - 1.0)).floor().max(1.0) as u32
        } else {
          1
        };
        (current_replicas + step).min(self.max_replicas)
      }
      ScaleAction::Down => current_replicas.saturating_sub(1).max(self.min_replicas),
    };

    if new_count == current_replicas {
      return ExecuteOutcome::Rejected { reason: "no-op at bound or unchanged".to_string() };
    }

    ExecuteOutcome::Patch { old_count: current_replicas, new_count }
  }

  pub fn multiplier_for(reason: &str) -> f64 {
    match reason {
      "oom" => 2.0,
      "node failure" => 1.5,
      _ => 1.0,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::time::MockTimeSource;
  use chrono::Utc;

  fn stats(count: usize, avg_cpu: f64, p95: f64, avg_error_rate: f64, trend: Trend) -> WindowStats {
    WindowStats {
      count,
      avg_cpu,
      avg_memory: 0.0,
      max_cpu: avg_cpu,
      latency_p90: p95,
      latency_p95: p95,
      latency_p99: p95,
      avg_error_rate,
      trend: Some(trend),
      spike_detected: trend == Trend::Spiking,
    }
  }

  fn healthy_nodes() -> NodeHealthSummary {
    NodeHealthSummary { total: 10, not_ready: 0, quarantined: 0, healthy: 10 }
  }

  #[test]
  fn insufficient_data_holds() {
    let controller = ReplicaController::new();
    let decision = controller.should_scale(
      &stats(2, 50.0, 100.0, 0.0, Trend::Stable),
      false,
      PodHealthStatus::Healthy,
      &healthy_nodes(),
      0.0,
      BacklogStats::default(),
    );
    assert!(decision.action.is_none());
    assert_eq!(decision.reason, "insufficient data");
  }

  #[test]
  fn oom_pod_health_forces_scale_up() {
    let controller = ReplicaController::new();
    let decision = controller.should_scale(
      &stats(5, 10.0, 10.0, 0.0, Trend::Stable),
      false,
      PodHealthStatus::Oom,
      &healthy_nodes(),
      0.0,
      BacklogStats::default(),
    );
    assert_eq!(decision.action, Some(ScaleAction::Up));
    assert_eq!(decision.reason, "oom");
  }

  #[test]
  fn node_failure_above_quarter_capacity_loss_scales_up() {
    let controller = ReplicaController::new();
    let summary = NodeHealthSummary { total: 10, not_ready: 4, quarantined: 0, healthy: 6 };
    let decision = controller.should_scale(
      &stats(5, 10.0, 10.0, 0.0, Trend::Stable),
      false,
      PodHealthStatus::Healthy,
      &summary,
      0.4,
      BacklogStats::default(),
    );
    assert_eq!(decision.action, Some(ScaleAction::Up));
    assert_eq!(decision.reason, "node failure");
  }

  #[test]
  fn backlog_over_threshold_scales_up() {
    let controller = ReplicaController::new();
    let decision = controller.should_scale(
      &stats(5, 10.0, 10.0, 0.0, Trend::Stable),
      false,
      PodHealthStatus::Healthy,
      &healthy_nodes(),
      0.0,
      BacklogStats { backlog_size: 1001, oldest_message_age_seconds: 0 },
    );
    assert_eq!(decision.action, Some(ScaleAction::Up));
    assert_eq!(decision.reason, "backlog high");
  }

  #[test]
  fn critical_event_forces_scale_up() {
    let controller = ReplicaController::new();
    let decision = controller.should_scale(
      &stats(5, 10.0, 10.0, 0.0, Trend::Stable),
      true,
      PodHealthStatus::Healthy,
      &healthy_nodes(),
      0.0,
      BacklogStats::default(),
    );
    assert_eq!(decision.action, Some(ScaleAction::Up));
    assert_eq!(decision.reason, "critical event");
  }

  #[test]
  fn spike_scenario_scales_up_on_high_load() {
    let controller = ReplicaController::new();
    let decision = controller.should_scale(
      &stats(5, 66.0, 300.0, 1.0, Trend::Spiking),
      false,
      PodHealthStatus::Healthy,
      &healthy_nodes(),
      0.0,
      BacklogStats::default(),
    );
    assert_eq!(decision.action, Some(ScaleAction::Up));
    assert_eq!(decision.reason, "high load");
  }

  #[test]
  fn sustained_low_load_scales_down() {
    let controller = ReplicaController::new();
    let decision = controller.should_scale(
      &stats(5, 21.0, 80.0, 0.5, Trend::Stable),
      false,
      PodHealthStatus::Healthy,
      &healthy_nodes(),
      0.0,
      BacklogStats::default(),
    );
    assert_eq!(decision.action, Some(ScaleAction::Down));
    assert_eq!(decision.reason, "low load");
  }

  #[test]
  fn low_score_with_increasing_trend_holds_instead_of_down() {
    let controller = ReplicaController::new();
    let decision = controller.should_scale(
      &stats(5, 21.0, 80.0, 0.5, Trend::Increasing),
      false,
      PodHealthStatus::Healthy,
      &healthy_nodes(),
      0.0,
      BacklogStats::default(),
    );
    assert_eq!(decision.action, None);
    assert_eq!(decision.reason, "normal");
  }

  #[test]
  fn execute_scale_rejects_within_cooldown() {
    let clock = MockTimeSource::new(Utc::now());
    let mut controller = ReplicaController::new();
    controller.cooldown.record(&clock);
    let outcome = controller.execute_scale(&clock, ScaleAction::Up, false, 1.0, 3);
    assert_eq!(outcome, ExecuteOutcome::Rejected { reason: "cooldown active".to_string() });
  }

  #[test]
  fn execute_scale_bypasses_cooldown_when_requested() {
    let clock = MockTimeSource::new(Utc::now());
    let mut controller = ReplicaController::new();
    controller.cooldown.record(&clock);
    let outcome = controller.execute_scale(&clock, ScaleAction::Up, true, 1.0, 3);
    assert_eq!(outcome, ExecuteOutcome::Patch { old_count: 3, new_count: 4 });
  }

  #[test]
  fn execute_scale_up_respects_max_replicas() {
    let clock = MockTimeSource::new(Utc::now());
    let controller = ReplicaController::new();
    let outcome = controller.execute_scale(&clock, ScaleAction::Up, true, 1.0, 8);
    assert_eq!(outcome, ExecuteOutcome::Rejected { reason: "no-op at bound or unchanged".to_string() });
  }

  #[test]
  fn execute_scale_down_respects_min_replicas() {
    let clock = MockTimeSource::new(Utc::now());
    let controller = ReplicaController::new();
    let outcome = controller.execute_scale(&clock, ScaleAction::Down, true, 1.0, 2);
    assert_eq!(outcome, ExecuteOutcome::Rejected { reason: "no-op at bound or unchanged".to_string() });
  }

  #[test]
  fn oom_multiplier_doubles_the_scale_step() {
    let clock = MockTimeSource::new(Utc::now());
    let controller = ReplicaController::new();
    let outcome = controller.execute_scale(&clock, ScaleAction::Up, true, ReplicaController::multiplier_for("oom"), 4);
    assert_eq!(outcome, ExecuteOutcome::Patch { old_count: 4, new_count: 8 });
  }

  #[test]
  fn two_critical_events_within_a_second_collapse_via_new_equals_current() {
    let clock = MockTimeSource::new(Utc::now());
    let controller = ReplicaController::new();
    let first = controller.execute_scale(&clock, ScaleAction::Up, true, 1.0, 7);
    assert_eq!(first, ExecuteOutcome::Patch { old_count: 7, new_count: 8 });
    // Second bypassed CRITICAL arrives immediately after; current is now 8,
    // already at max, so it collapses to a no-op rather than over-scaling.
    let second = controller.execute_scale(&clock, ScaleAction::Up, true, 1.0, 8);
    assert_eq!(second, ExecuteOutcome::Rejected { reason: "no-op at bound or unchanged".to_string() });
  }
}
