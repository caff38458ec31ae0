//! API error type and [`axum::response::IntoResponse`] implementation.

use axum::{
  Json,
  http::{HeaderValue, StatusCode, header},
  response::{IntoResponse, Response},
};
use lineup_core::{ValidationErrors, store::CoreError};
use serde_json::json;
use thiserror::Error;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error("unauthorized")]
  Unauthorized,

  /// Rejected input, keyed by field. Always a 400.
  #[error("validation failed: {0}")]
  Validation(ValidationErrors),

  #[error("not found: {0}")]
  NotFound(String),

  /// Unexpected backend failure. The detail is logged, never returned.
  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl ApiError {
  fn single(field: &str, message: impl Into<String>) -> Self {
    let mut errors = ValidationErrors::new();
    errors.add(field, message);
    ApiError::Validation(errors)
  }

  /// Map a backend error: a core error it carries keeps its own status,
  /// everything else is a store failure.
  pub fn from_store<E>(err: E) -> Self
  where
    E: std::error::Error + CoreError + Send + Sync + 'static,
  {
    match err.as_core() {
      Some(core) => Self::from_core(core),
      None => ApiError::Store(Box::new(err)),
    }
  }

  fn from_core(err: &lineup_core::Error) -> Self {
    use lineup_core::Error as E;
    match err {
      E::Validation(errors) => ApiError::Validation(errors.clone()),
      E::MissingBasicInfo(slug) => Self::single(
        "basic_info",
        format!("basic_info is required to create event {slug:?}."),
      ),
      E::InvalidExportMode(mode) => Self::single(
        "mode",
        format!("{mode:?} is not a valid choice; expected \"full\" or \"delta\"."),
      ),
      E::InvalidSince(raw) if raw.is_empty() => {
        Self::single("since", "This parameter is required when mode=delta.")
      }
      E::InvalidSince(raw) => {
        Self::single("since", format!("{raw:?} is not a valid ISO-8601 timestamp."))
      }
      E::NoLiveEvent => ApiError::NotFound("no live event is configured".into()),
    }
  }

  /// A request body that could not be read as a sync payload.
  pub fn malformed_body(detail: impl Into<String>) -> Self {
    Self::single("body", detail)
  }
}

impl From<lineup_core::Error> for ApiError {
  fn from(err: lineup_core::Error) -> Self { Self::from_core(&err) }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    match self {
      ApiError::Unauthorized => {
        let mut res = (
          StatusCode::UNAUTHORIZED,
          Json(json!({ "status": "error", "message": "unauthorized" })),
        )
          .into_response();
        res.headers_mut().insert(
          header::WWW_AUTHENTICATE,
          HeaderValue::from_static("Basic realm=\"lineup\""),
        );
        res
      }
      ApiError::Validation(errors) => (
        StatusCode::BAD_REQUEST,
        Json(json!({ "status": "error", "errors": errors })),
      )
        .into_response(),
      ApiError::NotFound(message) => (
        StatusCode::NOT_FOUND,
        Json(json!({ "status": "error", "message": message })),
      )
        .into_response(),
      ApiError::Store(e) => {
        tracing::error!(error = %e, "request failed in the store");
        (
          StatusCode::INTERNAL_SERVER_ERROR,
          Json(json!({ "status": "error", "message": "internal server error" })),
        )
          .into_response()
      }
    }
  }
}
