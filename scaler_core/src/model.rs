//! Wire-level data model shared by the classifier, window, and ingress layers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Recognised numeric keys in a raw agent payload. Unknown keys are kept in
/// `extra` but never consulted by the decision engine.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricSample {
  #[serde(default)]
  pub cpu: f64,
  #[serde(default)]
  pub memory: f64,
  #[serde(default)]
  pub disk: f64,
  #[serde(default)]
  pub net_latency_ms: f64,
  #[serde(default)]
  pub process_count: f64,
  #[serde(default)]
  pub load_avg: f64,
  #[serde(default)]
  pub error_rate: f64,
  #[serde(flatten)]
  pub extra: BTreeMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
  Info,
  Warning,
  Error,
  Critical,
}

impl Severity {
  /// Rank used to enforce "severity never downgrades" while classifying.
  fn rank(self) -> u8 {
    match self {
      Severity::Info => 0,
      Severity::Warning => 1,
      Severity::Error => 2,
      Severity::Critical => 3,
    }
  }

  pub fn upgrade_to(&mut self, candidate: Severity) {
    if candidate.rank() > self.rank() {
      *self = candidate;
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
  MetricsEvent,
  LogEvent,
}

/// A classified, severity-tagged event. `event_type = MetricsEvent` iff
/// `metrics.is_some()`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
  pub timestamp: DateTime<Utc>,
  pub source: String,
  pub node_id: String,
  pub event_type: EventType,
  pub severity: Severity,
  #[serde(default)]
  pub reasons: Vec<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub metrics: Option<MetricSample>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub log: Option<String>,
}

impl Event {
  pub fn is_critical(&self) -> bool {
    self.severity == Severity::Critical
  }
}

/// Raw agent payload as received by the HTTP/event ingress, prior to
/// classification. Either `metrics` or `log` is populated; a payload with
/// neither is ignorable (see §9 of SPEC_FULL.md).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawPayload {
  #[serde(default)]
  pub node_id: Option<String>,
  #[serde(default)]
  pub metrics: Option<MetricSample>,
  #[serde(default)]
  pub log: Option<String>,
}
