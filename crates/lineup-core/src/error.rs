//! Error types for `lineup-core`.

use std::{collections::BTreeMap, fmt};

use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("validation failed: {0}")]
  Validation(ValidationErrors),

  #[error("event {0:?} does not exist and the payload has no basic_info")]
  MissingBasicInfo(String),

  #[error("no live event is configured")]
  NoLiveEvent,

  #[error("invalid export mode: {0:?}")]
  InvalidExportMode(String),

  #[error("invalid since timestamp: {0:?}")]
  InvalidSince(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

// ─── Field-keyed validation errors ───────────────────────────────────────────

/// Validation failures keyed by the offending field path, e.g.
/// `schedule[0].tracks[1].presentations[2].team_name`.
///
/// Serializes as a plain JSON object of `field -> [message, ...]`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ValidationErrors(BTreeMap<String, Vec<String>>);

impl ValidationErrors {
  pub fn new() -> Self { Self::default() }

  pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
    self.0.entry(field.into()).or_default().push(message.into());
  }

  pub fn is_empty(&self) -> bool { self.0.is_empty() }

  pub fn contains(&self, field: &str) -> bool { self.0.contains_key(field) }

  /// `Ok(())` when nothing was recorded, otherwise the collected errors.
  pub fn into_result(self) -> Result<()> {
    if self.is_empty() {
      Ok(())
    } else {
      Err(Error::Validation(self))
    }
  }
}

impl fmt::Display for ValidationErrors {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let mut first = true;
    for (field, messages) in &self.0 {
      for message in messages {
        if !first {
          f.write_str("; ")?;
        }
        write!(f, "{field}: {message}")?;
        first = false;
      }
    }
    Ok(())
  }
}
