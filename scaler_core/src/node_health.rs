//! Node readiness tracking and quarantine logic (component E). Grounded on
//! `node_monitor.py`.

use crate::time::TimeSource;
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};

const DRAINING_TAINT_KEY: &str = "node-scaler.pulse/draining";
const DEFAULT_QUARANTINE_SECONDS: i64 = 300;

/// The subset of node state the decision engine cares about. Adapters
/// translate the cluster API's node objects into this shape.
#[derive(Debug, Clone)]
pub struct NodeSnapshot {
  pub name: String,
  pub ready: bool,
  pub schedulable: bool,
  pub taint_keys: Vec<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct NodeHealthSummary {
  pub total: usize,
  pub not_ready: usize,
  pub quarantined: usize,
  pub healthy: usize,
}

#[derive(Debug, Clone, Copy)]
struct UnhealthySince {
  since: DateTime<Utc>,
}

/// Tracks per-node first-seen-unhealthy time and the quarantined set across
/// polling passes.
#[derive(Debug, Default)]
pub struct NodeHealthMonitor {
  unhealthy_since: HashMap<String, UnhealthySince>,
  quarantined: HashSet<String>,
  quarantine_after_seconds: Option<i64>,
  last_summary: NodeHealthSummary,
}

impl NodeHealthMonitor {
  pub fn new() -> Self {
    Self::default()
  }

  /// Builds a monitor whose quarantine threshold is the configured
  /// `thresholds.node_quarantine_seconds` rather than the 300 s default.
  pub fn with_quarantine_seconds(quarantine_after_seconds: i64) -> Self {
    Self {
      quarantine_after_seconds: Some(quarantine_after_seconds),
      ..Self::default()
    }
  }

  /// The summary computed by the most recent `check_node_health` pass,
  /// without re-polling the cluster API. The replica controller consults
  /// this between the node-health loop's own 30 s ticks so a quarantine
  /// decided by the timer is immediately visible to the next replica
  /// decision (§4.E).
  pub fn last_summary(&self) -> NodeHealthSummary {
    self.last_summary
  }

  fn quarantine_threshold(&self) -> i64 {
    self.quarantine_after_seconds.unwrap_or(DEFAULT_QUARANTINE_SECONDS)
  }

  pub fn is_quarantined(&self, node: &str) -> bool {
    self.quarantined.contains(node)
  }

  pub fn quarantined_nodes(&self) -> impl Iterator<Item = &String> {
    self.quarantined.iter()
  }

  /// One polling pass. Returns the summary and the set of nodes that need a
  /// fresh `unschedulable=true` + quarantine patch this pass (nodes already
  /// quarantined are not re-patched).
  pub fn check_node_health(&mut self, clock: &dyn TimeSource, nodes: &[NodeSnapshot]) -> (NodeHealthSummary, Vec<String>) {
    let mut summary = NodeHealthSummary {
      total: nodes.len(),
      ..Default::default()
    };
    let mut newly_quarantined = Vec::new();
    let seen: HashSet<&str> = nodes.iter().map(|n| n.name.as_str()).collect();

    for node in nodes {
      let draining = node.taint_keys.iter().any(|k| k == DRAINING_TAINT_KEY);
      let unhealthy = !draining && (!node.ready || !node.schedulable);

      if unhealthy {
        summary.not_ready += 1;
        let since = self
          .unhealthy_since
          .entry(node.name.clone())
          .or_insert(UnhealthySince { since: clock.now_utc() })
          .since;

        if clock.elapsed_since(since) > self.quarantine_threshold() {
          if self.quarantined.insert(node.name.clone()) {
            newly_quarantined.push(node.name.clone());
          }
          summary.quarantined += 1;
        }
      } else {
        self.unhealthy_since.remove(&node.name);
        self.quarantined.remove(&node.name);
        summary.healthy += 1;
      }
    }

    // Nodes that disappeared from the listing no longer need tracking.
    self.unhealthy_since.retain(|name, _| seen.contains(name.as_str()));
    self.quarantined.retain(|name| seen.contains(name.as_str()));
    self.last_summary = summary;

    (summary, newly_quarantined)
  }

  /// `unhealthy_count / total_nodes`, 0 if total is 0.
  pub fn capacity_loss_ratio(&self, summary: &NodeHealthSummary) -> f64 {
    if summary.total == 0 {
      0.0
    } else {
      summary.not_ready as f64 / summary.total as f64
    }
  }
}
