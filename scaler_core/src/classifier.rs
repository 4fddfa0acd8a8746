//! Pure raw-payload-to-event classification (component B).
//!
//! Grounded on the original aggregator's `classify_event`: metrics payloads
//! are scored against fixed thresholds in a fixed order, log payloads get a
//! coarser two-level severity. No I/O, no fallible paths beyond "ignore".

use crate::model::{Event, EventType, MetricSample, RawPayload, Severity};
use chrono::{DateTime, Utc};

/// Classifies a raw payload into an `Event`. Returns `None` when the payload
/// carries neither `metrics` nor `log` — resolving the spec's open question
/// about a classifier that would otherwise scan a missing log string.
pub fn classify(
  payload: &RawPayload,
  source: &str,
  timestamp: DateTime<Utc>,
) -> Option<Event> {
  let node_id = payload.node_id.clone().unwrap_or_else(|| "unknown".to_string());

  if let Some(metrics) = &payload.metrics {
    return Some(classify_metrics(metrics.clone(), node_id, source, timestamp));
  }

  let log = payload.log.as_ref()?;
  Some(classify_log(log.clone(), node_id, source, timestamp))
}

fn classify_metrics(
  metrics: MetricSample,
  node_id: String,
  source: &str,
  timestamp: DateTime<Utc>,
) -> Event {
  let mut severity = Severity::Info;
  let mut reasons = Vec::new();

  if metrics.cpu > 90.0 {
    severity.upgrade_to(Severity::Critical);
    reasons.push(format!("cpu>{}", metrics.cpu));
  } else if metrics.cpu > 75.0 {
    severity.upgrade_to(Severity::Warning);
    reasons.push(format!("cpu>{}", metrics.cpu));
  }

  if metrics.memory > 90.0 {
    severity.upgrade_to(Severity::Critical);
    reasons.push(format!("mem>{}", metrics.memory));
  }

  if metrics.error_rate > 8.0 {
    severity.upgrade_to(Severity::Critical);
    reasons.push(format!("errors>{}%", metrics.error_rate));
  } else if metrics.error_rate > 5.0 {
    severity.upgrade_to(Severity::Warning);
    reasons.push(format!("errors>{}%", metrics.error_rate));
  }

  if metrics.net_latency_ms > 400.0 {
    severity.upgrade_to(Severity::Warning);
    reasons.push(format!("latency>{}ms", metrics.net_latency_ms));
  }

  Event {
    timestamp,
    source: source.to_string(),
    node_id,
    event_type: EventType::MetricsEvent,
    severity,
    reasons,
    metrics: Some(metrics),
    log: None,
  }
}

fn classify_log(log: String, node_id: String, source: &str, timestamp: DateTime<Utc>) -> Event {
  let severity = if log.contains("CRITICAL") {
    Severity::Critical
  } else {
    Severity::Error
  };

  Event {
    timestamp,
    source: source.to_string(),
    node_id,
    event_type: EventType::LogEvent,
    severity,
    reasons: Vec::new(),
    metrics: None,
    log: Some(log),
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn sample(cpu: f64, memory: f64, error_rate: f64, net_latency_ms: f64) -> MetricSample {
    MetricSample {
      cpu,
      memory,
      error_rate,
      net_latency_ms,
      ..Default::default()
    }
  }

  fn payload_with(metrics: MetricSample) -> RawPayload {
    RawPayload {
      node_id: Some("node-1".to_string()),
      metrics: Some(metrics),
      log: None,
    }
  }

  #[test]
  fn cpu_ninety_is_warning_ninety_one_is_critical() {
    let e90 = classify(&payload_with(sample(90.0, 0.0, 0.0, 0.0)), "agent", Utc::now()).unwrap();
    assert_eq!(e90.severity, Severity::Warning);

    let e91 = classify(&payload_with(sample(91.0, 0.0, 0.0, 0.0)), "agent", Utc::now()).unwrap();
    assert_eq!(e91.severity, Severity::Critical);
  }

  #[test]
  fn error_rate_boundaries() {
    let at5 = classify(&payload_with(sample(0.0, 0.0, 5.0, 0.0)), "agent", Utc::now()).unwrap();
    assert_eq!(at5.severity, Severity::Info);

    let above5 = classify(&payload_with(sample(0.0, 0.0, 5.01, 0.0)), "agent", Utc::now()).unwrap();
    assert_eq!(above5.severity, Severity::Warning);

    let above8 = classify(&payload_with(sample(0.0, 0.0, 8.01, 0.0)), "agent", Utc::now()).unwrap();
    assert_eq!(above8.severity, Severity::Critical);
  }

  #[test]
  fn memory_critical_never_downgrades() {
    let event = classify(
      &payload_with(sample(95.0, 95.0, 0.0, 0.0)),
      "agent",
      Utc::now(),
    )
    .unwrap();
    assert_eq!(event.severity, Severity::Critical);
    assert_eq!(event.reasons, vec!["cpu>95".to_string(), "mem>95".to_string()]);
  }

  #[test]
  fn severity_never_downgrades_across_rules() {
    // error_rate pushes to CRITICAL, then latency rule must not pull it back to WARNING.
    let event = classify(
      &payload_with(sample(0.0, 0.0, 9.0, 500.0)),
      "agent",
      Utc::now(),
    )
    .unwrap();
    assert_eq!(event.severity, Severity::Critical);
  }

  #[test]
  fn log_event_with_critical_substring() {
    let payload = RawPayload {
      node_id: Some("node-2".to_string()),
      metrics: None,
      log: Some("CRITICAL disk full".to_string()),
    };
    let event = classify(&payload, "agent", Utc::now()).unwrap();
    assert_eq!(event.event_type, EventType::LogEvent);
    assert_eq!(event.severity, Severity::Critical);
  }

  #[test]
  fn log_event_without_critical_substring_is_error() {
    let payload = RawPayload {
      node_id: None,
      metrics: None,
      log: Some("disk almost full".to_string()),
    };
    let event = classify(&payload, "agent", Utc::now()).unwrap();
    assert_eq!(event.severity, Severity::Error);
  }

  #[test]
  fn payload_with_neither_metrics_nor_log_is_ignorable() {
    let payload = RawPayload {
      node_id: Some("node-3".to_string()),
      metrics: None,
      log: None,
    };
    assert!(classify(&payload, "agent", Utc::now()).is_none());
  }

  #[test]
  fn classifier_is_pure() {
    let payload = payload_with(sample(80.0, 10.0, 6.0, 450.0));
    let ts = Utc::now();
    let a = classify(&payload, "agent", ts).unwrap();
    let b = classify(&payload, "agent", ts).unwrap();
    assert_eq!(serde_json::to_string(&a).unwrap(), serde_json::to_string(&b).unwrap());
  }
}
