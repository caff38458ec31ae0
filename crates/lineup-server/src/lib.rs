//! HTTP surface for lineup.
//!
//! Exposes an axum [`Router`] with the spreadsheet sync endpoint and the
//! worksheet export endpoint, backed by any [`ScheduleStore`].

pub mod auth;
pub mod error;
pub mod etag;
pub mod handlers;

pub use error::ApiError;

use std::{path::PathBuf, sync::Arc};

use axum::{
  Router,
  middleware,
  routing::{get, post},
};
use lineup_core::store::ScheduleStore;
use serde::Deserialize;
use tower_http::trace::TraceLayer;

use auth::AuthConfig;

// ─── Configuration ────────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml` and
/// `LINEUP_*` environment variables.
#[derive(Deserialize, Clone)]
pub struct ServerConfig {
  pub host:               String,
  pub port:               u16,
  pub store_path:         PathBuf,
  pub auth_username:      String,
  pub auth_password_hash: String,
  /// Reported as `meta.source` in every export.
  #[serde(default = "default_export_source")]
  pub export_source:      String,
}

fn default_export_source() -> String { "lineup".to_string() }

// ─── Application state ────────────────────────────────────────────────────────

/// Shared state threaded through all axum handlers.
#[derive(Clone)]
pub struct AppState<S: ScheduleStore> {
  pub store:  Arc<S>,
  pub config: Arc<ServerConfig>,
  pub auth:   Arc<AuthConfig>,
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// Build an axum [`Router`] for the sync server.
pub fn router<S>(state: AppState<S>) -> Router
where
  S: ScheduleStore + Clone + 'static,
{
  Router::new()
    .route("/sync",        post(handlers::sync::handler::<S>))
    .route("/sync/export", get(handlers::export::handler::<S>))
    .route_layer(middleware::from_fn_with_state(
      Arc::clone(&state.auth),
      auth::require_basic_auth,
    ))
    .layer(TraceLayer::new_for_http())
    .with_state(state)
}

// ─── Integration tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
  use super::*;

  use argon2::{Argon2, PasswordHasher, password_hash::SaltString};
  use axum::{
    body::Body,
    http::{Request, StatusCode, header},
  };
  use base64::Engine as _;
  use base64::engine::general_purpose::STANDARD as B64;
  use lineup_store_sqlite::SqliteStore;
  use rand_core::OsRng;
  use serde_json::{Value, json};
  use tower::ServiceExt as _;

  async fn make_state(password: &str) -> AppState<SqliteStore> {
    let store = SqliteStore::open_in_memory().await.unwrap();
    let salt  = SaltString::generate(&mut OsRng);
    let hash  = Argon2::default()
      .hash_password(password.as_bytes(), &salt)
      .unwrap()
      .to_string();

    AppState {
      store: Arc::new(store),
      config: Arc::new(ServerConfig {
        host:               "127.0.0.1".to_string(),
        port:               8080,
        store_path:         PathBuf::from(":memory:"),
        auth_username:      "sheets".to_string(),
        auth_password_hash: hash.clone(),
        export_source:      "lineup-test".to_string(),
      }),
      auth: Arc::new(AuthConfig {
        username:      "sheets".to_string(),
        password_hash: hash,
      }),
    }
  }

  fn auth_header() -> String {
    format!("Basic {}", B64.encode("sheets:secret"))
  }

  async fn send(
    state:  &AppState<SqliteStore>,
    method: &str,
    uri:    &str,
    body:   Option<&str>,
    auth:   bool,
  ) -> axum::response::Response {
    let mut builder = Request::builder().method(method).uri(uri);
    if auth {
      builder = builder.header(header::AUTHORIZATION, auth_header());
    }
    let req = match body {
      Some(b) => builder
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(b.to_string()))
        .unwrap(),
      None => builder.body(Body::empty()).unwrap(),
    };
    router(state.clone()).oneshot(req).await.unwrap()
  }

  async fn json_body(resp: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
  }

  fn live_payload() -> Value {
    json!({
      "slug": "spring-2024",
      "is_live": true,
      "basic_info": {
        "event_name": "Spring Expo",
        "event_date": "2024-06-15",
        "event_time": "17:30",
        "upper_bullet_points": ["Welcome"],
        "lower_bullet_points": []
      },
      "schedule": [{
        "program_name": "Capstone",
        "tracks": [{
          "track_name": "AI", "room": "101", "start_time": "13:00",
          "presentations": [
            { "order": 1, "team_id": "T1", "team_name": "Alpha", "project_title": "Vision" },
            { "order": 2, "project_title": "Break", "team_name": "" }
          ]
        }]
      }],
      "expo_table": [
        { "time": "Room:", "description": "Main Hall" },
        { "time": "2024-06-15T18:00:00Z", "description": "Judging" }
      ],
      "winners": {
        "track_winners": [{ "track_name": "AI", "winner_name": "Alpha" }],
        "special_awards": [{ "program_name": "Capstone", "award_winner": "Alpha" }]
      }
    })
  }

  async fn sync_live(state: &AppState<SqliteStore>) -> Value {
    let resp = send(state, "POST", "/sync", Some(&live_payload().to_string()), true).await;
    assert_eq!(resp.status(), StatusCode::OK);
    json_body(resp).await
  }

  // ── Auth ─────────────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn endpoints_require_credentials() {
    let state = make_state("secret").await;
    let resp  = send(&state, "POST", "/sync", Some("{}"), false).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    assert!(resp.headers().contains_key(header::WWW_AUTHENTICATE));

    let resp = send(&state, "GET", "/sync/export", None, false).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
  }

  // ── Store failures ───────────────────────────────────────────────────────────

  #[derive(Clone)]
  struct BrokenStore;

  #[derive(Debug, thiserror::Error)]
  #[error("disk I/O error at /var/lib/lineup/lineup.db")]
  struct DiskError;

  impl lineup_core::store::CoreError for DiskError {
    fn as_core(&self) -> Option<&lineup_core::Error> { None }
  }

  impl ScheduleStore for BrokenStore {
    type Error = DiskError;

    async fn sync(
      &self,
      _: lineup_core::payload::SyncPayload,
    ) -> Result<lineup_core::payload::SyncReceipt, DiskError> {
      Err(DiskError)
    }

    async fn live_snapshot(&self) -> Result<Option<lineup_core::event::EventSnapshot>, DiskError> {
      Err(DiskError)
    }

    async fn get_event(&self, _: &str) -> Result<Option<lineup_core::event::EventSnapshot>, DiskError> {
      Err(DiskError)
    }
  }

  #[tokio::test]
  async fn store_failures_are_opaque_500s() {
    let sqlite = make_state("secret").await;
    let state  = AppState {
      store:  Arc::new(BrokenStore),
      config: sqlite.config,
      auth:   sqlite.auth,
    };

    for (method, uri, body) in [
      ("POST", "/sync", Some(r#"{"slug":"spring-2024"}"#)),
      ("GET", "/sync/export", None),
    ] {
      let req = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::AUTHORIZATION, auth_header())
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.unwrap_or_default().to_string()))
        .unwrap();
      let resp = router(state.clone()).oneshot(req).await.unwrap();
      assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR, "{method} {uri}");

      let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
      let text  = std::str::from_utf8(&bytes).unwrap();
      assert!(!text.contains("disk I/O"), "store detail leaked: {text}");
      assert!(!text.contains("/var/lib"), "store detail leaked: {text}");

      let body: Value = serde_json::from_slice(&bytes).unwrap();
      assert_eq!(body["status"], "error");
      assert_eq!(body["message"], "internal server error");
    }
  }

  // ── POST /sync ───────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn sync_returns_success_shape() {
    let state = make_state("secret").await;
    let body  = sync_live(&state).await;
    assert_eq!(body["status"], "success");
    assert_eq!(body["slug"], "spring-2024");
    assert_eq!(body["is_live"], true);
    assert!(uuid::Uuid::parse_str(body["event_uuid"].as_str().unwrap()).is_ok());
  }

  #[tokio::test]
  async fn resync_keeps_event_uuid() {
    let state  = make_state("secret").await;
    let first  = sync_live(&state).await;
    let second = sync_live(&state).await;
    assert_eq!(first["event_uuid"], second["event_uuid"]);
  }

  #[tokio::test]
  async fn missing_team_name_is_keyed_400() {
    let state = make_state("secret").await;
    let mut payload = live_payload();
    payload["schedule"][0]["tracks"][0]["presentations"][0]["team_name"] = json!("");
    let resp = send(&state, "POST", "/sync", Some(&payload.to_string()), true).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body = json_body(resp).await;
    assert_eq!(body["status"], "error");
    assert!(body["errors"]["schedule[0].tracks[0].presentations[0].team_name"].is_array());
  }

  #[tokio::test]
  async fn order_below_one_is_400() {
    let state = make_state("secret").await;
    let mut payload = live_payload();
    payload["schedule"][0]["tracks"][0]["presentations"][0]["order"] = json!(0);
    let resp = send(&state, "POST", "/sync", Some(&payload.to_string()), true).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body = json_body(resp).await;
    assert!(body["errors"]["schedule[0].tracks[0].presentations[0].order"].is_array());
  }

  #[tokio::test]
  async fn create_without_basic_info_is_400() {
    let state = make_state("secret").await;
    let resp  = send(&state, "POST", "/sync", Some(r#"{"slug":"new-event"}"#), true).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body = json_body(resp).await;
    assert!(body["errors"]["basic_info"].is_array());
  }

  #[tokio::test]
  async fn malformed_json_is_400() {
    let state = make_state("secret").await;
    let resp  = send(&state, "POST", "/sync", Some("{not json"), true).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body = json_body(resp).await;
    assert!(body["errors"]["body"].is_array());
  }

  // ── GET /sync/export ─────────────────────────────────────────────────────────

  #[tokio::test]
  async fn export_without_live_event_is_404() {
    let state = make_state("secret").await;
    let resp  = send(&state, "GET", "/sync/export", None, true).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
  }

  #[tokio::test]
  async fn full_export_flattens_live_event() {
    let state = make_state("secret").await;
    sync_live(&state).await;

    let resp = send(&state, "GET", "/sync/export?mode=full", None, true).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(resp.headers().contains_key(header::ETAG));
    let body = json_body(resp).await;

    assert_eq!(body["meta"]["source"], "lineup-test");
    assert_eq!(body["meta"]["scope"], "live_event");
    assert_eq!(body["meta"]["mode"], "full");
    assert_eq!(body["meta"]["delta_changed"], true);
    assert_eq!(body["meta"]["event"]["slug"], "spring-2024");

    let sheets = &body["worksheets"];
    assert_eq!(sheets["event_basic"].as_array().unwrap().len(), 1);
    assert_eq!(sheets["event_bullets"].as_array().unwrap().len(), 1);
    assert_eq!(sheets["event_schedule"].as_array().unwrap().len(), 2);
    assert_eq!(sheets["event_schedule"][1]["is_break"], true);
    assert_eq!(sheets["event_schedule"][1]["team_name"], "");
    assert_eq!(sheets["event_expo"][0]["time"], "6:00 PM");
    assert_eq!(sheets["event_expo"][0]["room"], "Main Hall");
    assert_eq!(sheets["event_track_winners"][0]["winner_name"], "Alpha");
    assert_eq!(sheets["event_special_awards"][0]["award_winner"], "Alpha");
  }

  #[tokio::test]
  async fn mode_defaults_to_full() {
    let state = make_state("secret").await;
    sync_live(&state).await;
    let body = json_body(send(&state, "GET", "/sync/export", None, true).await).await;
    assert_eq!(body["meta"]["mode"], "full");
  }

  #[tokio::test]
  async fn delta_without_since_is_400() {
    let state = make_state("secret").await;
    sync_live(&state).await;
    let resp = send(&state, "GET", "/sync/export?mode=delta", None, true).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body = json_body(resp).await;
    assert!(body["errors"]["since"].is_array());
  }

  #[tokio::test]
  async fn delta_with_garbage_since_is_400() {
    let state = make_state("secret").await;
    sync_live(&state).await;
    let resp = send(&state, "GET", "/sync/export?mode=delta&since=yesterday", None, true).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
  }

  #[tokio::test]
  async fn unknown_mode_is_400() {
    let state = make_state("secret").await;
    sync_live(&state).await;
    let resp = send(&state, "GET", "/sync/export?mode=partial", None, true).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body = json_body(resp).await;
    assert!(body["errors"]["mode"].is_array());
  }

  #[tokio::test]
  async fn delta_after_watermark_is_empty() {
    let state = make_state("secret").await;
    sync_live(&state).await;
    let resp = send(
      &state, "GET", "/sync/export?mode=delta&since=2999-01-01T00:00:00Z", None, true,
    ).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body = json_body(resp).await;
    assert_eq!(body["meta"]["mode"], "delta");
    assert_eq!(body["meta"]["delta_changed"], false);
    for (_, rows) in body["worksheets"].as_object().unwrap() {
      assert!(rows.as_array().unwrap().is_empty());
    }
  }

  #[tokio::test]
  async fn delta_before_watermark_matches_full() {
    let state = make_state("secret").await;
    sync_live(&state).await;
    let full  = json_body(send(&state, "GET", "/sync/export?mode=full", None, true).await).await;
    let delta = json_body(send(
      &state, "GET", "/sync/export?mode=delta&since=2000-01-01T00:00:00Z", None, true,
    ).await).await;
    assert_eq!(delta["meta"]["delta_changed"], true);
    assert_eq!(delta["worksheets"], full["worksheets"]);
  }

  #[tokio::test]
  async fn etag_tracks_the_watermark() {
    let state = make_state("secret").await;
    sync_live(&state).await;
    let etag = |resp: &axum::response::Response| {
      resp.headers().get(header::ETAG).unwrap().to_str().unwrap().to_owned()
    };

    let a = etag(&send(&state, "GET", "/sync/export", None, true).await);
    let b = etag(&send(&state, "GET", "/sync/export", None, true).await);
    assert_eq!(a, b);

    sync_live(&state).await;
    let c = etag(&send(&state, "GET", "/sync/export", None, true).await);
    assert_ne!(a, c);
  }
}
