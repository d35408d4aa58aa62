//! API error type and [`axum::response::IntoResponse`] implementation.
//!
//! Every error renders as `{"success": false, "error": ...}`. Storage
//! failures are logged here and reach the client only as an opaque
//! `"Database error"`.

use axum::{
  Json,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use serde_json::json;
use taste_core::ValidationErrors;
use thiserror::Error;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error("not found: {0}")]
  NotFound(String),

  #[error("bad request: {0}")]
  BadRequest(String),

  #[error("{0}")]
  Validation(ValidationErrors),

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl ApiError {
  pub fn store(e: impl std::error::Error + Send + Sync + 'static) -> Self {
    Self::Store(Box::new(e))
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let (status, error) = match self {
      ApiError::NotFound(m) => (StatusCode::NOT_FOUND, json!(m)),
      ApiError::BadRequest(m) => (StatusCode::BAD_REQUEST, json!(m)),
      ApiError::Validation(errors) => (StatusCode::BAD_REQUEST, json!(errors)),
      ApiError::Store(e) => {
        tracing::error!(error = %e, "storage failure");
        (StatusCode::INTERNAL_SERVER_ERROR, json!("Database error"))
      }
    };
    (status, Json(json!({ "success": false, "error": error }))).into_response()
  }
}
