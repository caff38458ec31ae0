//! `POST /sync`: apply one spreadsheet payload to the store.

use axum::{Json, extract::{State, rejection::JsonRejection}};
use lineup_core::{payload::SyncPayload, store::ScheduleStore};
use serde_json::{Value, json};

use crate::{AppState, error::ApiError};

pub async fn handler<S>(
  State(state): State<AppState<S>>,
  body: Result<Json<SyncPayload>, JsonRejection>,
) -> Result<Json<Value>, ApiError>
where
  S: ScheduleStore + Clone + 'static,
{
  let Json(payload) = body.map_err(|e| ApiError::malformed_body(e.body_text()))?;

  tracing::debug!(
    slug     = %payload.slug,
    is_live  = payload.is_live,
    schedule = payload.schedule.is_some(),
    "sync requested",
  );

  let receipt = state.store.sync(payload).await.map_err(ApiError::from_store)?;

  Ok(Json(json!({
    "status":     "success",
    "event_uuid": receipt.event_uuid,
    "slug":       receipt.slug,
    "is_live":    receipt.is_live,
  })))
}
