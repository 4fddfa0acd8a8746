//! Typed error boundary for this crate, following `notify_server::error`'s
//! shape of one enum per crate rather than `anyhow` internally.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
  #[error("invalid quantity: {0}")]
  InvalidQuantity(#[from] crate::quantity::QuantityError),

  #[error("invalid window capacity: {0}")]
  InvalidWindowCapacity(usize),
}
