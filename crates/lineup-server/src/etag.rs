//! ETag computation for export responses.
//!
//! The tag is a SHA-256 over the event identity, its watermark, the export
//! mode and the delta flag. Two exports with the same tag carry the same
//! worksheets.

use chrono::{DateTime, Utc};
use lineup_core::export::{ExportMeta, ExportMode};
use sha2::{Digest, Sha256};

/// Compute the ETag for an export described by `meta` at watermark `updated_at`.
pub fn compute_etag(meta: &ExportMeta, updated_at: DateTime<Utc>) -> String {
  let mut hasher = Sha256::new();
  hasher.update(meta.event.event_uuid.as_bytes());
  hasher.update(updated_at.timestamp_micros().to_le_bytes());
  hasher.update([match meta.mode {
    ExportMode::Full => 0u8,
    ExportMode::Delta => 1u8,
  }]);
  hasher.update([u8::from(meta.delta_changed)]);
  format!("\"{}\"", hex::encode(hasher.finalize()))
}
