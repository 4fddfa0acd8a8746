//! Bounded FIFO of recent metric samples with percentile/trend aggregation
//! (component C). Grounded on `metrics_window.py`'s `MetricsWindow`.

use crate::model::MetricSample;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::VecDeque;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Trend {
  Spiking,
  Increasing,
  Decreasing,
  Stable,
}

struct Sample {
  #[allow(dead_code)]
  timestamp: DateTime<Utc>,
  cpu: f64,
  memory: f64,
  latency: f64,
  error_rate: f64,
}

/// Fixed-capacity FIFO of the last `capacity` samples.
pub struct MetricsWindow {
  capacity: usize,
  data: VecDeque<Sample>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct WindowStats {
  pub count: usize,
  pub avg_cpu: f64,
  pub avg_memory: f64,
  pub max_cpu: f64,
  pub latency_p90: f64,
  pub latency_p95: f64,
  pub latency_p99: f64,
  pub avg_error_rate: f64,
  pub trend: Option<Trend>,
  pub spike_detected: bool,
}

impl Default for MetricsWindow {
  fn default() -> Self {
    Self::new(5)
  }
}

impl MetricsWindow {
  pub fn new(capacity: usize) -> Self {
    assert!(capacity > 0, "window capacity must be positive");
    Self {
      capacity,
      data: VecDeque::with_capacity(capacity),
    }
  }

  /// Appends a sample, dropping the oldest once `capacity` is exceeded.
  pub fn add(&mut self, timestamp: DateTime<Utc>, sample: &MetricSample) {
    if self.data.len() == self.capacity {
      self.data.pop_front();
    }
    self.data.push_back(Sample {
      timestamp,
      cpu: sample.cpu,
      memory: sample.memory,
      latency: sample.net_latency_ms,
      error_rate: sample.error_rate,
    });
  }

  pub fn len(&self) -> usize {
    self.data.len()
  }

  pub fn is_empty(&self) -> bool {
    self.data.is_empty()
  }

  pub fn get_stats(&self) -> WindowStats {
    if self.data.is_empty() {
      return WindowStats::default();
    }

    let cpu_values: Vec<f64> = self.data.iter().map(|s| s.cpu).collect();
    let mem_values: Vec<f64> = self.data.iter().map(|s| s.memory).collect();
    let latency_values: Vec<f64> = self.data.iter().map(|s| s.latency).collect();
    let error_values: Vec<f64> = self.data.iter().map(|s| s.error_rate).collect();

    let avg_cpu = mean(&cpu_values);
    let avg_memory = mean(&mem_values);
    let max_cpu = cpu_values.iter().cloned().fold(f64::MIN, f64::max);
    let avg_error_rate = mean(&error_values);

    let trend = trend_from_cpu_series(&cpu_values);

    WindowStats {
      count: self.data.len(),
      avg_cpu,
      avg_memory,
      max_cpu,
      latency_p90: percentile(&latency_values, 90.0),
      latency_p95: percentile(&latency_values, 95.0),
      latency_p99: percentile(&latency_values, 99.0),
      avg_error_rate,
      trend,
      spike_detected: trend == Some(Trend::Spiking),
    }
  }
}

fn mean(values: &[f64]) -> f64 {
  if values.is_empty() {
    0.0
  } else {
    values.iter().sum::<f64>() / values.len() as f64
  }
}

/// Percentile `p` at index `floor(len*p/100)`, clamped to the last element,
/// over the ascending-sorted series.
fn percentile(values: &[f64], p: f64) -> f64 {
  if values.is_empty() {
    return 0.0;
  }
  let mut sorted = values.to_vec();
  sorted.sort_by(|a, b| a.partial_cmp(b).unwrap());
  let index = ((sorted.len() as f64) * p / 100.0).floor() as usize;
  let index = index.min(sorted.len() - 1);
  sorted[index]
}

/// Requires >= 4 samples; else `stable`. Compares the mean of the last two
/// samples against the mean of everything before them.
fn trend_from_cpu_series(cpu_values: &[f64]) -> Option<Trend> {
  if cpu_values.len() < 4 {
    return Some(Trend::Stable);
  }
  let split = cpu_values.len() - 2;
  let recent = &cpu_values[split..];
  let older = &cpu_values[..split];
  let recent_avg = mean(recent);
  let older_avg = mean(older);

  Some(if recent_avg > older_avg + 20.0 {
    Trend::Spiking
  } else if recent_avg > older_avg + 10.0 {
    Trend::Increasing
  } else if recent_avg < older_avg - 10.0 {
    Trend::Decreasing
  } else {
    Trend::Stable
  })
}
