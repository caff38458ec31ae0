//! HTTP Basic credentials for the sync endpoints.
//!
//! The spreadsheet integration is the only caller. It either presents the
//! configured username and a password matching the argon2 hash, or every
//! route answers 401. Enforcement happens once, as a route layer, so the
//! handlers never see an unauthenticated request.

use std::sync::Arc;

use argon2::{Argon2, PasswordHash, PasswordVerifier};
use axum::{
  extract::{Request, State},
  http::{HeaderMap, header},
  middleware::Next,
  response::Response,
};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as B64;

use crate::error::ApiError;

/// Credentials accepted as valid for this server instance.
#[derive(Clone)]
pub struct AuthConfig {
  pub username:      String,
  /// PHC string produced by argon2, e.g. `$argon2id$v=19$…`
  pub password_hash: String,
}

/// A decoded `Authorization: Basic …` header.
#[derive(Debug, PartialEq, Eq)]
struct Credentials {
  username: String,
  password: String,
}

impl Credentials {
  /// `None` for a missing header, another scheme, or an undecodable value.
  fn from_headers(headers: &HeaderMap) -> Option<Self> {
    let value   = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let encoded = value.strip_prefix("Basic ")?.trim();
    let decoded = B64.decode(encoded).ok()?;
    let (username, password) = std::str::from_utf8(&decoded).ok()?.split_once(':')?;
    Some(Self { username: username.to_owned(), password: password.to_owned() })
  }
}

impl AuthConfig {
  /// An unparseable configured hash accepts nobody.
  fn accepts(&self, creds: &Credentials) -> bool {
    if creds.username != self.username {
      return false;
    }
    let Ok(hash) = PasswordHash::new(&self.password_hash) else {
      tracing::error!("configured auth_password_hash is not a valid PHC string");
      return false;
    };
    Argon2::default()
      .verify_password(creds.password.as_bytes(), &hash)
      .is_ok()
  }
}

/// Route layer: reject the request with 401 unless its Basic credentials
/// match `auth`. Hash verification runs off the async runtime.
pub async fn require_basic_auth(
  State(auth): State<Arc<AuthConfig>>,
  request: Request,
  next: Next,
) -> Result<Response, ApiError> {
  let Some(creds) = Credentials::from_headers(request.headers()) else {
    tracing::warn!(uri = %request.uri(), "missing or malformed credentials");
    return Err(ApiError::Unauthorized);
  };

  let accepted = tokio::task::spawn_blocking(move || auth.accepts(&creds))
    .await
    .unwrap_or(false);
  if !accepted {
    tracing::warn!(uri = %request.uri(), "rejected credentials");
    return Err(ApiError::Unauthorized);
  }

  Ok(next.run(request).await)
}
