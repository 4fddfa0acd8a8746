//! Typed error boundary for adapter I/O, following `fechatter_core::error`'s
//! split between retryable and terminal failure kinds.

use thiserror::Error;

#[derive(Debug, Error, Clone)]
pub enum AdapterError {
  #[error("cluster api error: {0}")]
  ClusterApi(String),

  #[error("cluster api conflict (409): {0}")]
  Conflict(String),

  #[error("cloud metrics unavailable: {0}")]
  CloudMetrics(String),

  #[error("cluster manager error: {0}")]
  ClusterManager(String),

  #[error("messaging error: {0}")]
  Messaging(String),

  #[error("decode error: {0}")]
  Decode(String),
}

impl AdapterError {
  /// Transient failures the retry helper should retry; conflicts and decode
  /// errors are terminal for the current attempt.
  pub fn is_retryable(&self) -> bool {
    matches!(
      self,
      AdapterError::ClusterApi(_) | AdapterError::CloudMetrics(_) | AdapterError::ClusterManager(_) | AdapterError::Messaging(_)
    )
  }
}
