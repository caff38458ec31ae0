//! `GET /sync/export`: flatten the live event into worksheet rows.

use axum::{
  Json,
  extract::{Query, State},
  http::{HeaderValue, header},
  response::{IntoResponse, Response},
};
use lineup_core::{
  export::{self, ExportRequest},
  store::ScheduleStore,
};
use serde::Deserialize;

use crate::{AppState, error::ApiError, etag::compute_etag};

#[derive(Debug, Default, Deserialize)]
pub struct ExportParams {
  pub mode:  Option<String>,
  pub since: Option<String>,
}

pub async fn handler<S>(
  State(state): State<AppState<S>>,
  Query(params): Query<ExportParams>,
) -> Result<Response, ApiError>
where
  S: ScheduleStore + Clone + 'static,
{
  let request = ExportRequest::from_params(params.mode.as_deref(), params.since.as_deref())?;

  let snapshot = state
    .store
    .live_snapshot()
    .await
    .map_err(ApiError::from_store)?
    .ok_or(lineup_core::Error::NoLiveEvent)?;

  let response = export::export(&snapshot, &request, &state.config.export_source);
  let etag = compute_etag(&response.meta, snapshot.event.updated_at);

  tracing::debug!(
    slug          = %snapshot.event.slug,
    mode          = ?request.mode(),
    delta_changed = response.meta.delta_changed,
    "export served",
  );

  let mut res = Json(response).into_response();
  if let Ok(value) = HeaderValue::from_str(&etag) {
    res.headers_mut().insert(header::ETAG, value);
  }
  Ok(res)
}
