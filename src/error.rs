//! User-visible error taxonomy and its HTTP mapping.
//!
//! Fetch-level failures never appear here: the resolver absorbs them into
//! fallback decisions. Only exhaustion and projection misses reach callers,
//! each serialized as a JSON `{"error": …}` body.

use axum::{
  http::StatusCode,
  response::{IntoResponse, Response},
  Json,
};
use thiserror::Error;

/// Errors surfaced to API callers.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ServiceError {
  /// Every fallback offset was exhausted without a positive result.
  /// Retryable: a publication may land at any moment.
  #[error("No data available after fallback")]
  NoData,

  /// Resolution succeeded but the snapshot has no record for the station.
  #[error("Station ID not found")]
  StationNotFound,

  /// Station record found, requested metric absent.
  #[error("Metric '{metric}' not found for station '{station}'")]
  MetricNotFound { station: String, metric: String },
}

impl ServiceError {
  pub fn status_code(&self) -> StatusCode {
    match self {
      Self::NoData => StatusCode::SERVICE_UNAVAILABLE,
      Self::StationNotFound | Self::MetricNotFound { .. } => StatusCode::NOT_FOUND,
    }
  }
}

impl IntoResponse for ServiceError {
  fn into_response(self) -> Response {
    let body = Json(serde_json::json!({ "error": self.to_string() }));
    (self.status_code(), body).into_response()
  }
}
