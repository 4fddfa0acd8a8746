use anyhow::Result;
use scaler_adapters::messaging::NatsEventBus;
use scaler_adapters::mock::{MockCloudMetrics, MockClusterApi, MockClusterManager};
use scaler_core::time::SystemTimeSource;
use scaler_service::{get_router, AppConfig, AppState};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
  scaler_service::observability::init_tracing();

  let config = match AppConfig::load() {
    Ok(config) => {
      info!("{}", config.summary());
      if std::env::var("ENVIRONMENT").unwrap_or_default() == "production" {
        if let Err(e) = config.validate_production_readiness() {
          eprintln!("production readiness check failed: {e}");
          std::process::exit(1);
        }
      }
      config
    }
    Err(e) => {
      eprintln!("failed to load configuration: {e}");
      eprintln!("copy scaler.yml.example to scaler.yml or set SCALER_CONFIG");
      std::process::exit(1);
    }
  };

  if let Err(e) = scaler_service::observability::init_metrics("0.0.0.0:9091") {
    eprintln!("failed to initialize metrics exporter: {e}");
    std::process::exit(1);
  }

  let event_bus = match NatsEventBus::connect_with_retry(&config.messaging.nats_url).await {
    Ok(bus) => bus,
    Err(e) => {
      eprintln!("failed to connect to event stream: {e}");
      std::process::exit(1);
    }
  };
  let subscription = match event_bus.subscribe(&config.messaging.event_subscription).await {
    Ok(sub) => sub,
    Err(e) => {
      eprintln!("failed to subscribe to event stream: {e}");
      std::process::exit(1);
    }
  };

  // Cluster API / cloud metrics / cluster manager backends are the
  // deployment-specific seam: in-process mocks here, a real GKE/Cloud
  // Monitoring implementation behind the same traits in a production
  // rollout. Swapping requires no change to `scaler_core` or the loops.
  let cluster_api = Arc::new(MockClusterApi::default());
  let cloud_metrics = Arc::new(MockCloudMetrics::default());
  let cluster_manager = Arc::new(MockClusterManager::default());

  let state = AppState::new(
    config.clone(),
    Arc::new(SystemTimeSource),
    cluster_api,
    cloud_metrics,
    cluster_manager,
    Arc::new(event_bus),
  );

  let shutdown = scaler_service::shutdown::token();

  let event_loop_handle = tokio::spawn(scaler_service::event_loop::run(state.clone(), Box::new(subscription), shutdown.clone()));
  let node_health_handle = tokio::spawn(scaler_service::node_health_loop::run(state.clone(), shutdown.clone()));
  let node_pool_handle = tokio::spawn(scaler_service::node_pool_loop::run(state.clone(), shutdown.clone()));

  let addr = format!("0.0.0.0:{}", config.server.port);
  let listener = TcpListener::bind(&addr).await?;
  let app = get_router(state);

  info!(addr, "scaler_service listening");

  let server = axum::serve(listener, app.into_make_service()).with_graceful_shutdown(scaler_service::shutdown::wait_for_signal(shutdown));

  server.await?;

  let _ = tokio::join!(event_loop_handle, node_health_handle, node_pool_handle);

  Ok(())
}
