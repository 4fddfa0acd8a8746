//! Layered configuration loading. Grounded on `notify_server::config::AppConfig::load`'s
//! file-then-env precedence, generalised to this crate's own fields.

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs::File;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
  pub server: ServerConfig,
  pub workload: WorkloadConfig,
  pub cluster: ClusterConfig,
  pub messaging: MessagingConfig,
  #[serde(default)]
  pub thresholds: ThresholdConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
  pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkloadConfig {
  pub namespace: String,
  pub deployment: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClusterConfig {
  pub project_id: String,
  pub zone: String,
  pub cluster_name: String,
  pub node_pool_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessagingConfig {
  pub nats_url: String,
  pub event_topic: String,
  pub event_subscription: String,
  pub metrics_subscription_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThresholdConfig {
  #[serde(default = "ThresholdConfig::default_window_capacity")]
  pub window_capacity: usize,
  #[serde(default = "ThresholdConfig::default_crashloop_threshold")]
  pub crashloop_threshold: u32,
  #[serde(default = "ThresholdConfig::default_node_quarantine_seconds")]
  pub node_quarantine_seconds: i64,
}

impl ThresholdConfig {
  fn default_window_capacity() -> usize {
    5
  }
  fn default_crashloop_threshold() -> u32 {
    3
  }
  fn default_node_quarantine_seconds() -> i64 {
    300
  }
}

impl Default for ThresholdConfig {
  fn default() -> Self {
    Self {
      window_capacity: Self::default_window_capacity(),
      crashloop_threshold: Self::default_crashloop_threshold(),
      node_quarantine_seconds: Self::default_node_quarantine_seconds(),
    }
  }
}

impl AppConfig {
  /// Reads from (in order of preference) `./scaler.yml`, `/etc/config/scaler.yml`,
  /// or the path named by `SCALER_CONFIG`; then overrides individual fields
  /// from the environment where the deployment wires them in.
  pub fn load() -> Result<Self> {
    let mut config: AppConfig = match (File::open("scaler.yml"), File::open("/etc/config/scaler.yml"), env::var("SCALER_CONFIG")) {
      (Ok(reader), _, _) => serde_yaml::from_reader(reader)?,
      (_, Ok(reader), _) => serde_yaml::from_reader(reader)?,
      (_, _, Ok(path)) => serde_yaml::from_reader(File::open(path)?)?,
      _ => bail!("no scaler.yml found at ./scaler.yml, /etc/config/scaler.yml, or $SCALER_CONFIG"),
    };

    if let Ok(port) = env::var("SCALER_PORT") {
      config.server.port = port.parse()?;
    }
    if let Ok(project_id) = env::var("SCALER_PROJECT_ID") {
      config.cluster.project_id = project_id;
    }
    if let Ok(zone) = env::var("SCALER_ZONE") {
      config.cluster.zone = zone;
    }
    if let Ok(cluster_name) = env::var("SCALER_CLUSTER_NAME") {
      config.cluster.cluster_name = cluster_name;
    }
    if let Ok(node_pool_name) = env::var("SCALER_NODE_POOL_NAME") {
      config.cluster.node_pool_name = node_pool_name;
    }
    if let Ok(deployment) = env::var("SCALER_DEPLOYMENT") {
      config.workload.deployment = deployment;
    }
    if let Ok(namespace) = env::var("SCALER_NAMESPACE") {
      config.workload.namespace = namespace;
    }

    Ok(config)
  }

  /// Fails if fields that must never be left at placeholder values in a
  /// production deployment are empty.
  pub fn validate_production_readiness(&self) -> Result<()> {
    if self.cluster.project_id.is_empty() {
      bail!("cluster.project_id must be set in production");
    }
    if self.messaging.nats_url.is_empty() {
      bail!("messaging.nats_url must be set in production");
    }
    Ok(())
  }

  pub fn summary(&self) -> String {
    format!(
      "scaler_service config: port={} namespace={} deployment={} cluster={}/{}/{}",
      self.server.port, self.workload.namespace, self.workload.deployment, self.cluster.project_id, self.cluster.zone, self.cluster.cluster_name
    )
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn threshold_defaults_match_spec() {
    let thresholds = ThresholdConfig::default();
    assert_eq!(thresholds.window_capacity, 5);
    assert_eq!(thresholds.crashloop_threshold, 3);
    assert_eq!(thresholds.node_quarantine_seconds, 300);
  }
}
