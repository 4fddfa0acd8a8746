//! Exponential backoff for transient adapter failures. Grounded on
//! `fechatter_core::services::retry::ExponentialBackoffRetry`.

use crate::error::AdapterError;
use std::time::Duration;
use tokio::time::sleep;

#[derive(Debug, Clone)]
pub struct ExponentialBackoffRetry {
  pub base_delay_ms: u64,
  pub max_retries: u32,
  pub backoff_multiplier: f64,
  pub max_delay_ms: u64,
}

impl Default for ExponentialBackoffRetry {
  fn default() -> Self {
    Self {
      base_delay_ms: 500,
      max_retries: 3,
      backoff_multiplier: 2.0,
      max_delay_ms: 15_000,
    }
  }
}

impl ExponentialBackoffRetry {
  pub fn new(base_delay_ms: u64, max_retries: u32) -> Self {
    Self { base_delay_ms, max_retries, ..Default::default() }
  }

  fn calculate_delay(&self, attempt: u32) -> Duration {
    let delay_ms = (self.base_delay_ms as f64 * self.backoff_multiplier.powi(attempt as i32)) as u64;
    Duration::from_millis(delay_ms.min(self.max_delay_ms))
  }

  pub async fn retry<F, Fut, T>(&self, operation: F) -> Result<T, AdapterError>
  where
    F: Fn() -> Fut + Send + Sync,
    Fut: std::future::Future<Output = Result<T, AdapterError>> + Send,
    T: Send,
  {
    let mut last_error: Option<AdapterError> = None;

    for attempt in 0..=self.max_retries {
      match operation().await {
        Ok(result) => return Ok(result),
        Err(error) => {
          if !error.is_retryable() {
            return Err(error);
          }
          last_error = Some(error.clone());
          if attempt == self.max_retries {
            return Err(error);
          }
          let delay = self.calculate_delay(attempt);
          tracing::warn!(attempt = attempt + 1, error = %error, delay_ms = delay.as_millis() as u64, "retrying adapter call");
          sleep(delay).await;
        }
      }
    }

    Err(last_error.unwrap_or_else(|| AdapterError::Messaging("max retries exceeded".to_string())))
  }
}
