//! `POST /` push-envelope endpoint (component K). Grounded on the original
//! aggregator's `index()`: decode the push envelope, classify, publish.

use crate::error::ServiceError;
use crate::state::AppState;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use scaler_core::model::RawPayload;
use serde::Deserialize;
use tracing::info;

#[derive(Debug, Deserialize)]
pub struct PushEnvelope {
  pub message: PushMessage,
}

#[derive(Debug, Deserialize)]
pub struct PushMessage {
  pub data: String,
}

/// Accepts the envelope as a bare `Value` rather than `Json<PushEnvelope>` so
/// a body missing `message`/`message.data` is reported the same way as a bad
/// base64 payload (400), instead of axum's extractor rejecting it with 422
/// before this handler ever runs. Matches the original handler's
/// `if not body / if not pubsub_message: return ("", 400)`.
pub async fn ingest(State(state): State<AppState>, Json(body): Json<serde_json::Value>) -> Result<StatusCode, ServiceError> {
  let envelope: PushEnvelope =
    serde_json::from_value(body).map_err(|e| ServiceError::MalformedEnvelope(format!("missing or malformed push envelope: {e}")))?;

  let decoded = BASE64
    .decode(envelope.message.data.as_bytes())
    .map_err(|e| ServiceError::MalformedEnvelope(e.to_string()))?;
  let decoded = String::from_utf8(decoded).map_err(|e| ServiceError::MalformedEnvelope(e.to_string()))?;

  // Invalid JSON is treated as a bare log line, matching the source's
  // `except: obj = {"log": payload}` fallback.
  let payload: RawPayload = serde_json::from_str(&decoded).unwrap_or(RawPayload {
    node_id: None,
    metrics: None,
    log: Some(decoded),
  });

  let timestamp = state.clock.now_utc();
  let Some(event) = scaler_core::classifier::classify(&payload, "aggregator", timestamp) else {
    return Ok(StatusCode::NO_CONTENT);
  };

  let body = serde_json::to_vec(&event).map_err(|e| ServiceError::MalformedEnvelope(e.to_string()))?;
  state.publisher.publish(&state.config.messaging.event_topic, &body).await?;

  info!(severity = ?event.severity, node_id = %event.node_id, "published classified event");
  Ok(StatusCode::NO_CONTENT)
}
