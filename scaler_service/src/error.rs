//! Typed error boundary at the HTTP edge, following `notify_server::error::NotifyError`'s
//! `IntoResponse` mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use scaler_adapters::AdapterError;
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServiceError {
  #[error("malformed push envelope: {0}")]
  MalformedEnvelope(String),

  #[error("adapter error: {0}")]
  Adapter(#[from] AdapterError),

  #[error("configuration error: {0}")]
  Config(String),
}

impl IntoResponse for ServiceError {
  fn into_response(self) -> Response {
    let (status, message) = match &self {
      ServiceError::MalformedEnvelope(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
      ServiceError::Adapter(err) => (StatusCode::SERVICE_UNAVAILABLE, err.to_string()),
      ServiceError::Config(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone()),
    };

    (status, Json(json!({ "error": message, "status": status.as_u16() }))).into_response()
  }
}
