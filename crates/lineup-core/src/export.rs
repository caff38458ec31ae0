//! Snapshot exporter: flattens an [`EventSnapshot`] into seven independent
//! worksheet row collections, in full or delta mode.

use std::str::FromStr;

use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  Error, Result,
  event::{EventSnapshot, TableEntry},
  normalize::format_clock,
};

/// Fixed `meta.scope`: exports always describe the single live event.
pub const EXPORT_SCOPE: &str = "live_event";

// ─── Request ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportMode {
  #[default]
  Full,
  Delta,
}

impl FromStr for ExportMode {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self> {
    match s.trim().to_ascii_lowercase().as_str() {
      "full" => Ok(Self::Full),
      "delta" => Ok(Self::Delta),
      _ => Err(Error::InvalidExportMode(s.to_owned())),
    }
  }
}

/// A checked export request. Delta mode always carries a watermark.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportRequest {
  Full,
  Delta { since: DateTime<Utc> },
}

impl ExportRequest {
  /// Build a request from raw query parameters. `mode` defaults to full;
  /// `since` is ignored in full mode and required in delta mode.
  pub fn from_params(mode: Option<&str>, since: Option<&str>) -> Result<Self> {
    let mode = match mode {
      Some(m) if !m.trim().is_empty() => m.parse()?,
      _ => ExportMode::Full,
    };
    match mode {
      ExportMode::Full => Ok(Self::Full),
      ExportMode::Delta => {
        let raw = since
          .filter(|s| !s.trim().is_empty())
          .ok_or_else(|| Error::InvalidSince(String::new()))?;
        Ok(Self::Delta { since: parse_since(raw)? })
      }
    }
  }

  pub fn mode(&self) -> ExportMode {
    match self {
      Self::Full => ExportMode::Full,
      Self::Delta { .. } => ExportMode::Delta,
    }
  }
}

/// Parse an ISO-8601 watermark. Offsets and `Z` are honoured; a naive
/// date-time is taken as UTC. A space where a `+` offset sign was decoded
/// from a query string is put back.
pub fn parse_since(raw: &str) -> Result<DateTime<Utc>> {
  let s = raw.trim();
  let repaired = match s.rsplit_once(' ') {
    Some((head, offset))
      if head.contains('T') && offset.len() == 5 && offset.as_bytes()[2] == b':' =>
    {
      format!("{head}+{offset}")
    }
    _ => s.to_owned(),
  };

  if let Ok(dt) = DateTime::parse_from_rfc3339(&repaired) {
    return Ok(dt.with_timezone(&Utc));
  }

  ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S%.f"]
    .iter()
    .find_map(|fmt| NaiveDateTime::parse_from_str(&repaired, fmt).ok())
    .map(|naive| naive.and_utc())
    .ok_or_else(|| Error::InvalidSince(raw.to_owned()))
}

/// UTC timestamp in `Z`-suffixed ISO form.
pub fn format_utc(dt: DateTime<Utc>) -> String {
  dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

// ─── Response ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRef {
  pub event_uuid: Uuid,
  pub slug:       String,
  pub event_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportMeta {
  pub source:        String,
  pub scope:         String,
  pub mode:          ExportMode,
  pub delta_changed: bool,
  pub event:         EventRef,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportResponse {
  pub meta:       ExportMeta,
  pub worksheets: Worksheets,
}

/// The seven worksheets. `Default` is the all-empty delta answer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Worksheets {
  pub event_basic:          Vec<BasicRow>,
  pub event_bullets:        Vec<BulletRow>,
  pub event_expo:           Vec<TableRow>,
  pub event_reception:      Vec<TableRow>,
  pub event_schedule:       Vec<ScheduleRow>,
  pub event_track_winners:  Vec<TrackWinnerRow>,
  pub event_special_awards: Vec<SpecialAwardRow>,
}

impl Worksheets {
  pub fn is_empty(&self) -> bool {
    self.event_basic.is_empty()
      && self.event_bullets.is_empty()
      && self.event_expo.is_empty()
      && self.event_reception.is_empty()
      && self.event_schedule.is_empty()
      && self.event_track_winners.is_empty()
      && self.event_special_awards.is_empty()
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BasicRow {
  pub event_uuid:   Uuid,
  pub slug:         String,
  pub event_name:   String,
  pub event_date:   String,
  pub event_time:   String,
  pub is_published: bool,
  pub is_live:      bool,
  pub updated_at:   String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BulletSection {
  Upper,
  Lower,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BulletRow {
  pub section:  BulletSection,
  pub position: usize,
  pub text:     String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableRow {
  pub position:    usize,
  pub time:        String,
  pub room:        String,
  pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleRow {
  pub program_name:       String,
  pub program_order:      i64,
  pub track_name:         String,
  pub track_order:        i64,
  pub room:               String,
  pub start_time:         String,
  pub presentation_order: i64,
  pub team_id:            String,
  pub team_name:          String,
  pub project_title:      String,
  pub organization:       String,
  #[serde(rename = "abstract")]
  pub abstract_text:      String,
  pub is_break:           bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackWinnerRow {
  pub position:    usize,
  pub track_name:  String,
  pub winner_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpecialAwardRow {
  pub position:     usize,
  pub program_name: String,
  pub award_winner: String,
}

// ─── Flattening ──────────────────────────────────────────────────────────────

/// Export `snapshot` for `request`.
///
/// Full mode always reports `delta_changed = true`. Delta mode reports
/// whether the event watermark is strictly newer than `since`, and when it is
/// not, every worksheet is empty.
pub fn export(
  snapshot: &EventSnapshot,
  request: &ExportRequest,
  source: &str,
) -> ExportResponse {
  let event = &snapshot.event;
  let delta_changed = match request {
    ExportRequest::Full => true,
    ExportRequest::Delta { since } => event.changed_since(*since),
  };

  let worksheets = if delta_changed {
    flatten(snapshot)
  } else {
    Worksheets::default()
  };

  ExportResponse {
    meta: ExportMeta {
      source: source.to_owned(),
      scope: EXPORT_SCOPE.to_owned(),
      mode: request.mode(),
      delta_changed,
      event: EventRef {
        event_uuid: event.event_uuid,
        slug:       event.slug.clone(),
        event_name: event.name.clone(),
      },
    },
    worksheets,
  }
}

/// Flatten the whole snapshot into worksheets.
pub fn flatten(snapshot: &EventSnapshot) -> Worksheets {
  let event = &snapshot.event;

  let event_basic = vec![BasicRow {
    event_uuid:   event.event_uuid,
    slug:         event.slug.clone(),
    event_name:   event.name.clone(),
    event_date:   event.event_date.format("%Y-%m-%d").to_string(),
    event_time:   event.event_time.format("%H:%M:%S").to_string(),
    is_published: event.is_published,
    is_live:      event.is_live,
    updated_at:   format_utc(event.updated_at),
  }];

  let bullets = |section, points: &[String]| {
    points
      .iter()
      .enumerate()
      .map(move |(i, text)| BulletRow { section, position: i + 1, text: text.clone() })
      .collect::<Vec<_>>()
  };
  let mut event_bullets = bullets(BulletSection::Upper, &event.upper_bullet_points);
  event_bullets.extend(bullets(BulletSection::Lower, &event.lower_bullet_points));

  let mut event_schedule = Vec::with_capacity(snapshot.presentation_count());
  for program in &snapshot.programs {
    for track in &program.tracks {
      for presentation in &track.presentations {
        event_schedule.push(ScheduleRow {
          program_name:       program.name.clone(),
          program_order:      program.order,
          track_name:         track.name.clone(),
          track_order:        track.order,
          room:               track.room.clone(),
          start_time:         track.start_time.map(format_clock).unwrap_or_default(),
          presentation_order: presentation.order,
          team_id:            presentation.team_id.clone().unwrap_or_default(),
          team_name:          presentation.team_name.clone().unwrap_or_default(),
          project_title:      presentation.project_title.clone(),
          organization:       presentation.organization.clone().unwrap_or_default(),
          abstract_text:      presentation.abstract_text.clone().unwrap_or_default(),
          is_break:           presentation.is_break(),
        });
      }
    }
  }

  let event_track_winners = snapshot
    .track_winners
    .iter()
    .enumerate()
    .map(|(i, w)| TrackWinnerRow {
      position:    i + 1,
      track_name:  w.track_name.clone(),
      winner_name: w.winner_name.clone(),
    })
    .collect();

  let event_special_awards = event
    .special_awards
    .iter()
    .enumerate()
    .map(|(i, a)| SpecialAwardRow {
      position:     i + 1,
      program_name: a.program_name.clone(),
      award_winner: a.award_winner.clone(),
    })
    .collect();

  Worksheets {
    event_basic,
    event_bullets,
    event_expo: table_rows(&event.expo_table),
    event_reception: table_rows(&event.reception_table),
    event_schedule,
    event_track_winners,
    event_special_awards,
  }
}

fn table_rows(entries: &[TableEntry]) -> Vec<TableRow> {
  entries
    .iter()
    .enumerate()
    .map(|(i, e)| TableRow {
      position:    i + 1,
      time:        e.time.clone(),
      room:        e.room.clone(),
      description: e.description.clone(),
    })
    .collect()
}
