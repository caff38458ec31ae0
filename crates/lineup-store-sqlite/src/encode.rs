//! Encoding and decoding helpers between domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are RFC 3339 strings, dates `YYYY-MM-DD`, clock times
//! `HH:MM:SS`. Event-owned arrays (bullets, tables, special awards) are
//! compact JSON. UUIDs are hyphenated lowercase strings.

use chrono::{DateTime, NaiveDate, NaiveTime, SecondsFormat, Utc};
use lineup_core::event::Event;
use serde::{Serialize, de::DeserializeOwned};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Uuid ─────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

/// Fixed-width so that stored timestamps also sort lexically.
pub fn encode_dt(dt: DateTime<Utc>) -> String {
  dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── Dates and clock times ───────────────────────────────────────────────────

pub fn encode_date(d: NaiveDate) -> String { d.format("%Y-%m-%d").to_string() }

pub fn decode_date(s: &str) -> Result<NaiveDate> {
  NaiveDate::parse_from_str(s, "%Y-%m-%d")
    .map_err(|e| Error::DateParse(format!("date {s:?}: {e}")))
}

pub fn encode_time(t: NaiveTime) -> String { t.format("%H:%M:%S").to_string() }

pub fn decode_time(s: &str) -> Result<NaiveTime> {
  NaiveTime::parse_from_str(s, "%H:%M:%S")
    .map_err(|e| Error::DateParse(format!("time {s:?}: {e}")))
}

// ─── JSON columns ────────────────────────────────────────────────────────────

pub fn encode_json<T: Serialize + ?Sized>(value: &T) -> Result<String> {
  Ok(serde_json::to_string(value)?)
}

pub fn decode_json<T: DeserializeOwned>(s: &str) -> Result<T> {
  Ok(serde_json::from_str(s)?)
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Column list matching [`RawEvent::from_row`].
pub const EVENT_COLUMNS: &str = "event_id, event_uuid, slug, name, event_date, event_time,
   upper_bullet_points, lower_bullet_points, expo_table, reception_table,
   special_awards, is_published, is_live, created_at, updated_at";

/// Raw strings read directly from an `events` row.
pub struct RawEvent {
  pub event_id:            i64,
  pub event_uuid:          String,
  pub slug:                String,
  pub name:                String,
  pub event_date:          String,
  pub event_time:          String,
  pub upper_bullet_points: String,
  pub lower_bullet_points: String,
  pub expo_table:          String,
  pub reception_table:     String,
  pub special_awards:      String,
  pub is_published:        bool,
  pub is_live:             bool,
  pub created_at:          String,
  pub updated_at:          String,
}

impl RawEvent {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      event_id:            row.get(0)?,
      event_uuid:          row.get(1)?,
      slug:                row.get(2)?,
      name:                row.get(3)?,
      event_date:          row.get(4)?,
      event_time:          row.get(5)?,
      upper_bullet_points: row.get(6)?,
      lower_bullet_points: row.get(7)?,
      expo_table:          row.get(8)?,
      reception_table:     row.get(9)?,
      special_awards:      row.get(10)?,
      is_published:        row.get(11)?,
      is_live:             row.get(12)?,
      created_at:          row.get(13)?,
      updated_at:          row.get(14)?,
    })
  }

  pub fn into_event(self) -> Result<Event> {
    Ok(Event {
      event_uuid:          decode_uuid(&self.event_uuid)?,
      slug:                self.slug,
      name:                self.name,
      event_date:          decode_date(&self.event_date)?,
      event_time:          decode_time(&self.event_time)?,
      upper_bullet_points: decode_json(&self.upper_bullet_points)?,
      lower_bullet_points: decode_json(&self.lower_bullet_points)?,
      expo_table:          decode_json(&self.expo_table)?,
      reception_table:     decode_json(&self.reception_table)?,
      special_awards:      decode_json(&self.special_awards)?,
      is_published:        self.is_published,
      is_live:             self.is_live,
      created_at:          decode_dt(&self.created_at)?,
      updated_at:          decode_dt(&self.updated_at)?,
    })
  }
}

/// One row of the program ⟕ track ⟕ presentation join, in export order.
pub struct RawScheduleRow {
  pub program_id:    i64,
  pub program_name:  String,
  pub program_order: i64,
  pub track:         Option<RawTrack>,
}

pub struct RawTrack {
  pub track_id:     i64,
  pub name:         String,
  pub room:         String,
  pub start_time:   Option<String>,
  pub order:        i64,
  pub presentation: Option<RawPresentation>,
}

pub struct RawPresentation {
  pub order:         i64,
  pub team_id:       Option<String>,
  pub team_name:     Option<String>,
  pub project_title: String,
  pub organization:  Option<String>,
  pub abstract_text: Option<String>,
}
