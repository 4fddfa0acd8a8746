//! Event-stream publish/subscribe adapter over NATS. Grounded on
//! `notify_server::events::nats::NatsClient`'s connect-with-retry and thin
//! publish/subscribe wrappers.

use crate::error::AdapterError;
use crate::retry::ExponentialBackoffRetry;
use async_trait::async_trait;
use std::time::Duration;
use tracing::{error, info, warn};

#[async_trait]
pub trait EventPublisher: Send + Sync {
  async fn publish(&self, subject: &str, payload: &[u8]) -> Result<(), AdapterError>;
}

#[async_trait]
pub trait EventSubscription: Send + Sync {
  /// Pulls the next message, or `None` once the subscription is closed.
  /// Acking happens out-of-band: callers are expected to treat receipt as
  /// at-least-once and apply idempotent effects (§5 ordering guarantee).
  async fn next(&mut self) -> Option<Vec<u8>>;
}

pub struct NatsEventBus {
  client: async_nats::Client,
  retry: ExponentialBackoffRetry,
}

impl NatsEventBus {
  /// Connects with exponential backoff, matching the teacher's
  /// `connect_with_retry`. The connect loop stays hand-rolled rather than
  /// going through `ExponentialBackoffRetry`: `async_nats::ConnectOptions`
  /// isn't `Clone`, so the teacher rebuilds it on every attempt instead of
  /// sharing one `Fn` closure across retries.
  pub async fn connect_with_retry(url: &str) -> Result<Self, AdapterError> {
    let mut retries = 0;
    const MAX_RETRIES: u32 = 5;

    loop {
      let connect_options = async_nats::ConnectOptions::new()
        .connection_timeout(Duration::from_secs(10))
        .ping_interval(Duration::from_secs(30))
        .max_reconnects(Some(10))
        .reconnect_delay_callback(|attempts: usize| Duration::from_secs(std::cmp::min(2u64.saturating_pow(attempts as u32), 30)));

      info!(url, "connecting to event stream");
      match connect_options.connect(url).await {
        Ok(client) => {
          info!(url, "connected to event stream");
          return Ok(Self { client, retry: ExponentialBackoffRetry::default() });
        }
        Err(e) => {
          retries += 1;
          if retries >= MAX_RETRIES {
            error!(url, retries, error = %e, "failed to connect to event stream");
            return Err(AdapterError::Messaging(e.to_string()));
          }
          warn!(url, attempt = retries, max = MAX_RETRIES, error = %e, "retrying event stream connection");
          tokio::time::sleep(Duration::from_secs(2)).await;
        }
      }
    }
  }

  pub async fn subscribe(&self, subject: &str) -> Result<NatsSubscription, AdapterError> {
    let subscriber = self
      .client
      .subscribe(subject.to_string())
      .await
      .map_err(|e| AdapterError::Messaging(e.to_string()))?;
    Ok(NatsSubscription { subscriber })
  }
}

#[async_trait]
impl EventPublisher for NatsEventBus {
  async fn publish(&self, subject: &str, payload: &[u8]) -> Result<(), AdapterError> {
    let client = self.client.clone();
    let subject = subject.to_string();
    let payload = payload.to_vec();

    self
      .retry
      .retry(move || {
        let client = client.clone();
        let subject = subject.clone();
        let payload = payload.clone();
        async move { client.publish(subject, payload.into()).await.map_err(|e| AdapterError::Messaging(e.to_string())) }
      })
      .await
  }
}

pub struct NatsSubscription {
  subscriber: async_nats::Subscriber,
}

#[async_trait]
impl EventSubscription for NatsSubscription {
  async fn next(&mut self) -> Option<Vec<u8>> {
    use futures::StreamExt;
    self.subscriber.next().await.map(|msg| msg.payload.to_vec())
  }
}
