//! Cooperative shutdown signal shared by the ingress server and the
//! background loops. A single `CancellationToken` is cloned into each task;
//! SIGINT/SIGTERM cancel it once, every observer unwinds at its own next
//! checkpoint rather than being aborted mid-operation.

use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::info;

pub fn token() -> CancellationToken {
  CancellationToken::new()
}

pub async fn wait_for_signal(token: CancellationToken) {
  let ctrl_c = async {
    signal::ctrl_c().await.expect("failed to install SIGINT handler");
  };

  #[cfg(unix)]
  let terminate = async {
    signal::unix::signal(signal::unix::SignalKind::terminate())
      .expect("failed to install SIGTERM handler")
      .recv()
      .await;
  };

  #[cfg(not(unix))]
  let terminate = std::future::pending::<()>();

  tokio::select! {
    _ = ctrl_c => info!("received SIGINT, shutting down"),
    _ = terminate => info!("received SIGTERM, shutting down"),
  }

  token.cancel();
}
