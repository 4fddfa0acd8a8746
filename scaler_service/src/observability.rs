//! Tracing and Prometheus metrics bootstrap. Grounded on
//! `notify_server::observability::metrics::init_metrics` and its tracing
//! init in `notify_server::main`.

use anyhow::Result;
use metrics::{counter, gauge};
use metrics_exporter_prometheus::PrometheusBuilder;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::{fmt::Layer, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer as _};

pub fn init_tracing() {
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
  let layer = Layer::new().with_filter(filter).with_filter(LevelFilter::TRACE);
  tracing_subscriber::registry().with(layer).init();
}

/// Starts the Prometheus exporter on `bind_address` and pre-registers every
/// metric this service emits, so dashboards see a zero series before the
/// first event rather than a missing one.
pub fn init_metrics(bind_address: &str) -> Result<()> {
  let addr = bind_address.parse::<std::net::SocketAddr>()?;
  PrometheusBuilder::new().with_http_listener(addr).install()?;

  counter!("scaler_events_classified_total", "severity" => "INFO").absolute(0);
  counter!("scaler_scale_actions_total", "direction" => "up", "reason" => "startup").absolute(0);
  counter!("scaler_node_pool_actions_total", "direction" => "up").absolute(0);
  counter!("scaler_oom_events_total").absolute(0);
  gauge!("scaler_nodes_quarantined").set(0.0);
  gauge!("scaler_nodes_not_ready").set(0.0);

  tracing::info!(bind_address, "prometheus exporter started");
  Ok(())
}
