//! Memory-limit optimiser (component F). Grounded on `memory_optimizer.py`.

use crate::quantity::{parse_or_default_256mi, Quantity};
use crate::time::TimeSource;
use std::collections::HashMap;
use std::str::FromStr;

const OOM_RESET_AFTER_SECONDS: i64 = 3600;
const ADJUSTMENT_COOLDOWN_SECONDS: i64 = 300;
const OOM_THRESHOLD: u32 = 2;
const INCREMENT_FACTOR: f64 = 1.5;

#[derive(Debug, Clone, Copy)]
struct OomRecord {
  count: u32,
  last_seen: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Clone, Copy)]
struct AdjustmentRecord {
  last_adjustment: chrono::DateTime<chrono::Utc>,
}

/// Result of an `adjust_memory` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryAdjustment {
  pub old_limit: Quantity,
  pub new_limit: Quantity,
  pub changed: bool,
}

#[derive(Debug, Default)]
pub struct MemoryOptimizer {
  oom_history: HashMap<String, OomRecord>,
  adjustment_history: HashMap<String, AdjustmentRecord>,
  min_memory: Option<Quantity>,
  max_memory: Option<Quantity>,
}

impl MemoryOptimizer {
  pub fn new() -> Self {
    Self::default()
  }

  fn min(&self) -> Quantity {
    self.min_memory.unwrap_or_else(|| Quantity::from_str("128Mi").unwrap())
  }

  fn max(&self) -> Quantity {
    self.max_memory.unwrap_or_else(|| Quantity::from_str("2Gi").unwrap())
  }

  /// Records an OOM for `pod`; resets the counter if the last OOM was over an
  /// hour ago. Returns `true` once the counter reaches the threshold.
  pub fn record_oom(&mut self, clock: &dyn TimeSource, pod: &str) -> bool {
    let now = clock.now_utc();
    let record = self.oom_history.entry(pod.to_string()).or_insert(OomRecord { count: 0, last_seen: now });

    if (now - record.last_seen).num_seconds() > OOM_RESET_AFTER_SECONDS && record.count > 0 {
      record.count = 1;
    } else {
      record.count += 1;
    }
    record.last_seen = now;

    record.count >= OOM_THRESHOLD
  }

  /// Gates adjustments by a per-workload cooldown (default 300s).
  pub fn should_adjust(&self, clock: &dyn TimeSource, workload: &str) -> bool {
    match self.adjustment_history.get(workload) {
      None => true,
      Some(record) => clock.elapsed_since(record.last_adjustment) >= ADJUSTMENT_COOLDOWN_SECONDS,
    }
  }

  /// Computes the new memory limit for `workload` given its current limit
  /// (as read from the cluster API by the caller). Does not perform the
  /// patch itself — the caller applies `new_limit` to both `limits.memory`
  /// and `requests.memory` and, on success, should call `record_adjustment`.
  pub fn adjust_memory(&self, current_limit: Option<&str>) -> MemoryAdjustment {
    let current = parse_or_default_256mi(current_limit);
    let max = self.max();

    if current.bytes() >= max.bytes() {
      return MemoryAdjustment {
        old_limit: current,
        new_limit: current,
        changed: false,
      };
    }

    let new_limit = current.scale(INCREMENT_FACTOR).clamp(self.min(), max);
    MemoryAdjustment {
      old_limit: current,
      new_limit,
      changed: new_limit != current,
    }
  }

  pub fn record_adjustment(&mut self, clock: &dyn TimeSource, workload: &str) {
    self.adjustment_history.insert(
      workload.to_string(),
      AdjustmentRecord { last_adjustment: clock.now_utc() },
    );
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::time::MockTimeSource;
  use chrono::Utc;

  #[test]
  fn oom_threshold_reached_on_second_event_within_an_hour() {
    let clock = MockTimeSource::new(Utc::now());
    let mut optimizer = MemoryOptimizer::new();
    assert!(!optimizer.record_oom(&clock, "pod-a"));
    clock.advance(60);
    assert!(optimizer.record_oom(&clock, "pod-a"));
  }

  #[test]
  fn oom_counter_resets_after_an_hour() {
    let clock = MockTimeSource::new(Utc::now());
    let mut optimizer = MemoryOptimizer::new();
    assert!(!optimizer.record_oom(&clock, "pod-a"));
    clock.advance(3601);
    assert!(!optimizer.record_oom(&clock, "pod-a"));
  }

  #[test]
  fn adjustment_cooldown_gates_should_adjust() {
    let clock = MockTimeSource::new(Utc::now());
    let mut optimizer = MemoryOptimizer::new();
    assert!(optimizer.should_adjust(&clock, "workload"));
    optimizer.record_adjustment(&clock, "workload");
    assert!(!optimizer.should_adjust(&clock, "workload"));
    clock.advance(300);
    assert!(optimizer.should_adjust(&clock, "workload"));
  }

  #[test]
  fn adjusts_256mi_to_384mi() {
    let optimizer = MemoryOptimizer::new();
    let result = optimizer.adjust_memory(Some("256Mi"));
    assert_eq!(result.new_limit.to_string(), "384Mi");
    assert!(result.changed);
  }

  #[test]
  fn missing_limit_defaults_to_256mi_before_scaling() {
    let optimizer = MemoryOptimizer::new();
    let result = optimizer.adjust_memory(None);
    assert_eq!(result.old_limit.to_string(), "256Mi");
    assert_eq!(result.new_limit.to_string(), "384Mi");
  }

  #[test]
  fn clamps_to_2gi_cap_and_becomes_a_no_op_at_cap() {
    let optimizer = MemoryOptimizer::new();
    let near_cap = optimizer.adjust_memory(Some("1536Mi"));
    assert_eq!(near_cap.new_limit.to_string(), "2Gi");

    let at_cap = optimizer.adjust_memory(Some("2Gi"));
    assert!(!at_cap.changed);
    assert_eq!(at_cap.new_limit, at_cap.old_limit);
  }

  #[test]
  fn result_never_below_128mi_or_above_2gi() {
    let optimizer = MemoryOptimizer::new();
    for input in ["1Ki", "128Mi", "2Gi", "3Gi"] {
      let result = optimizer.adjust_memory(Some(input));
      assert!(result.new_limit.bytes() >= Quantity::from_str("128Mi").unwrap().bytes());
      assert!(result.new_limit.bytes() <= Quantity::from_str("2Gi").unwrap().bytes());
    }
  }
}
