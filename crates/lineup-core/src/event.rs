//! The event hierarchy: event → program → track → presentation, plus the
//! track winners. Special awards ride on the event itself.
//!
//! These are read models. The store assembles them already ordered; nothing
//! here re-sorts.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ─── Event-owned JSON fields ─────────────────────────────────────────────────

/// One entry of the expo or reception table, after room-header resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableEntry {
  pub time:        String,
  pub room:        String,
  pub description: String,
}

/// An award tied to an event and a program name.
///
/// Stored as a JSON array on the event row; that array is the single source
/// of truth for sync and export.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpecialAward {
  #[serde(default)]
  pub program_name: String,
  #[serde(default)]
  pub award_winner: String,
}

// ─── Event ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
  pub event_uuid:          Uuid,
  pub slug:                String,
  pub name:                String,
  pub event_date:          NaiveDate,
  pub event_time:          NaiveTime,
  pub upper_bullet_points: Vec<String>,
  pub lower_bullet_points: Vec<String>,
  pub expo_table:          Vec<TableEntry>,
  pub reception_table:     Vec<TableEntry>,
  pub special_awards:      Vec<SpecialAward>,
  pub is_published:        bool,
  pub is_live:             bool,
  pub created_at:          DateTime<Utc>,
  /// Watermark: bumped whenever the event or anything beneath it changes.
  pub updated_at:          DateTime<Utc>,
}

impl Event {
  /// Whether anything under this event changed strictly after `since`.
  pub fn changed_since(&self, since: DateTime<Utc>) -> bool {
    self.updated_at > since
  }
}

// ─── Schedule tree ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Program {
  pub name:   String,
  pub order:  i64,
  pub tracks: Vec<Track>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Track {
  pub name:          String,
  pub room:          String,
  pub start_time:    Option<NaiveTime>,
  pub order:         i64,
  pub presentations: Vec<Presentation>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Presentation {
  pub order:         i64,
  pub team_id:       Option<String>,
  pub team_name:     Option<String>,
  pub project_title: String,
  pub organization:  Option<String>,
  #[serde(rename = "abstract")]
  pub abstract_text: Option<String>,
}

impl Presentation {
  pub fn is_break(&self) -> bool {
    is_break_row(&self.project_title, self.organization.as_deref())
  }
}

/// Marker used by the spreadsheet for schedule gaps (lunch, intermission).
pub const BREAK_MARKER: &str = "Break";

/// A break row is identified by its project title, or by the same marker
/// placed in the organization column.
pub fn is_break_row(project_title: &str, organization: Option<&str>) -> bool {
  let is_marker = |s: &str| s.trim().eq_ignore_ascii_case(BREAK_MARKER);
  is_marker(project_title) || organization.is_some_and(is_marker)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackWinner {
  #[serde(default)]
  pub track_name:  String,
  #[serde(default)]
  pub winner_name: String,
}

// ─── Snapshot ────────────────────────────────────────────────────────────────

/// Everything the exporter needs for one event, read consistently.
///
/// `programs` is ordered by (program order, program id), each program's tracks
/// by (track order, track id), and each track's presentations by order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventSnapshot {
  pub event:         Event,
  pub programs:      Vec<Program>,
  pub track_winners: Vec<TrackWinner>,
}

impl EventSnapshot {
  pub fn track_count(&self) -> usize {
    self.programs.iter().map(|p| p.tracks.len()).sum()
  }

  pub fn presentation_count(&self) -> usize {
    self
      .programs
      .iter()
      .flat_map(|p| &p.tracks)
      .map(|t| t.presentations.len())
      .sum()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn break_detected_from_title_or_organization() {
    assert!(is_break_row("Break", None));
    assert!(is_break_row("  break ", Some("Acme")));
    assert!(is_break_row("Lunch", Some("BREAK")));
    assert!(!is_break_row("Breakthrough Robotics", Some("Acme")));
    assert!(!is_break_row("Demo", None));
  }
}
