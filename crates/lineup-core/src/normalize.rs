//! Time/room normalization for loosely structured spreadsheet cells.
//!
//! Nothing here fails: a cell that cannot be understood is passed through so
//! one bad cell never rejects a whole sync.

use std::sync::LazyLock;

use chrono::{DateTime, NaiveDateTime, NaiveTime};
use regex::Regex;

use crate::{event::TableEntry, payload::TableRowInput};

/// Value of the `time` column that turns a row into a room header.
pub const ROOM_HEADER_MARKER: &str = "Room:";

static DATETIME_PREFIX: LazyLock<Regex> =
  LazyLock::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2}[T ]\d").unwrap());

static MERIDIEM: LazyLock<Regex> =
  LazyLock::new(|| Regex::new(r"(?i)(?:\d\s*|\b)[ap]\.?\s?m\b").unwrap());

static BARE_CLOCK: LazyLock<Regex> =
  LazyLock::new(|| Regex::new(r"^\d{1,2}:\d{2}(:\d{2})?$").unwrap());

static ANY_CLOCK: LazyLock<Regex> =
  LazyLock::new(|| Regex::new(r"(\d{1,2}):(\d{2})").unwrap());

static TRAILING_PAREN: LazyLock<Regex> =
  LazyLock::new(|| Regex::new(r"\s*\([^)]*\)\s*$").unwrap());

const NAIVE_DATETIME_FORMATS: &[&str] = &[
  "%Y-%m-%dT%H:%M:%S%.f",
  "%Y-%m-%dT%H:%M",
  "%Y-%m-%d %H:%M:%S%.f",
  "%Y-%m-%d %H:%M",
  "%a %b %d %Y %H:%M:%S",
  "%a %b %d %Y %H:%M",
];

// ─── Clock formatting ────────────────────────────────────────────────────────

/// Render a wall-clock time as `"H:MM AM"` / `"H:MM PM"`.
pub fn format_clock(time: NaiveTime) -> String {
  time.format("%-I:%M %p").to_string()
}

/// Parse an ISO-8601 date-time carrying a `Z`, a ` GMT…` suffix, or an
/// optional parenthetical zone name, and return its UTC wall-clock time.
/// An explicit offset is converted to UTC first.
fn parse_datetime_cell(raw: &str) -> Option<NaiveTime> {
  if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
    return Some(dt.naive_utc().time());
  }

  let mut s = TRAILING_PAREN.replace(raw, "").into_owned();
  if let Some(idx) = s.find(" GMT") {
    s.truncate(idx);
  }
  let s = s.trim().trim_end_matches(['Z', 'z']);

  NAIVE_DATETIME_FORMATS
    .iter()
    .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
    .map(|dt| dt.time())
}

fn looks_like_datetime(s: &str) -> bool {
  DATETIME_PREFIX.is_match(s) || s.contains(" GMT")
}

fn parse_bare_clock(s: &str) -> Option<NaiveTime> {
  if !BARE_CLOCK.is_match(s) {
    return None;
  }
  NaiveTime::parse_from_str(s, "%H:%M:%S")
    .or_else(|_| NaiveTime::parse_from_str(s, "%H:%M"))
    .ok()
}

// ─── Public entry points ─────────────────────────────────────────────────────

/// Convert a time cell into the canonical `"H:MM AM/PM"` display string.
///
/// Accepted forms, in order: an ISO-8601 date-time (`…Z`, `… GMT…`, with an
/// optional trailing `(Zone Name)`); a string that already says AM/PM, which
/// is returned unchanged; a bare 24-hour `HH:MM[:SS]`. Anything else falls
/// back to the first `H:MM` found in the cell, and failing that the input is
/// returned as-is.
pub fn normalize_time_cell(raw: &str) -> String {
  let trimmed = raw.trim();
  if trimmed.is_empty() {
    return raw.to_owned();
  }

  if looks_like_datetime(trimmed)
    && let Some(time) = parse_datetime_cell(trimmed)
  {
    return format_clock(time);
  }

  if MERIDIEM.is_match(trimmed) {
    return raw.to_owned();
  }

  if let Some(time) = parse_bare_clock(trimmed) {
    return format_clock(time);
  }

  extract_clock(raw)
}

/// Best-effort extraction of the first `H:MM` in `raw`.
fn extract_clock(raw: &str) -> String {
  let Some(caps) = ANY_CLOCK.captures(raw) else {
    tracing::debug!(cell = raw, "time cell passed through unparsed");
    return raw.to_owned();
  };

  tracing::debug!(cell = raw, "time cell normalized by fallback extraction");
  let hour: u32 = caps[1].parse().unwrap_or(u32::MAX);
  let minute: u32 = caps[2].parse().unwrap_or(u32::MAX);
  match NaiveTime::from_hms_opt(hour, minute, 0) {
    Some(time) => format_clock(time),
    None => caps[0].to_owned(),
  }
}

/// Parse a cell into a wall-clock time, for typed fields such as a track's
/// start time. Accepts every form [`normalize_time_cell`] understands except
/// the fallback extraction.
pub fn parse_clock(raw: &str) -> Option<NaiveTime> {
  let s = raw.trim();
  if s.is_empty() {
    return None;
  }
  if looks_like_datetime(s) {
    return parse_datetime_cell(s);
  }
  if let Some(time) = parse_bare_clock(s) {
    return Some(time);
  }
  let upper = s.to_ascii_uppercase();
  ["%I:%M %p", "%I:%M%p", "%I:%M:%S %p", "%I %p"]
    .iter()
    .find_map(|fmt| NaiveTime::parse_from_str(&upper, fmt).ok())
}

/// Resolve room headers in an expo/reception row collection.
///
/// A row whose `time` is [`ROOM_HEADER_MARKER`] sets the current room to its
/// description and is dropped. Every other row is stamped with the current
/// room unless it carries its own non-empty `room`. Rows with an empty `time`
/// or `description` are dropped. The current room only changes at a header.
pub fn apply_room_headers<'a, I>(rows: I) -> Vec<TableEntry>
where
  I: IntoIterator<Item = &'a TableRowInput>,
{
  let mut current_room = String::new();
  let mut out = Vec::new();

  for row in rows {
    let time = row.time.trim();
    let description = row.description.trim();

    if time == ROOM_HEADER_MARKER {
      current_room = description.to_owned();
      continue;
    }
    if time.is_empty() || description.is_empty() {
      continue;
    }

    let room = match row.room.as_deref().map(str::trim) {
      Some(explicit) if !explicit.is_empty() => explicit.to_owned(),
      _ => current_room.clone(),
    };

    out.push(TableEntry {
      time: normalize_time_cell(time),
      room,
      description: description.to_owned(),
    });
  }

  out
}

#[cfg(test)]
mod tests {
  use super::*;

  fn row(time: &str, description: &str) -> TableRowInput {
    TableRowInput {
      time:        time.into(),
      description: description.into(),
      room:        None,
    }
  }

  #[test]
  fn iso_utc_renders_afternoon() {
    let out = normalize_time_cell("2024-06-15T14:30:00Z");
    assert!(out.contains("PM"));
    assert_eq!(out, "2:30 PM");
  }

  #[test]
  fn iso_with_fraction_and_sheet_epoch() {
    assert_eq!(normalize_time_cell("1899-12-30T09:05:00.000Z"), "9:05 AM");
  }

  #[test]
  fn gmt_suffix_with_zone_name() {
    assert_eq!(
      normalize_time_cell("Sat Jun 15 2024 18:00:00 GMT-0700 (Pacific Daylight Time)"),
      "6:00 PM"
    );
    assert_eq!(normalize_time_cell("2024-06-15 00:15:00 GMT"), "12:15 AM");
  }

  #[test]
  fn bare_twenty_four_hour_clock() {
    assert_eq!(normalize_time_cell("11:00"), "11:00 AM");
    assert_eq!(normalize_time_cell("13:45"), "1:45 PM");
    assert_eq!(normalize_time_cell("00:00"), "12:00 AM");
    assert_eq!(normalize_time_cell("12:00:00"), "12:00 PM");
  }

  #[test]
  fn meridiem_passes_through_unchanged() {
    assert_eq!(normalize_time_cell("10:00 AM"), "10:00 AM");
    assert_eq!(normalize_time_cell("3:15pm"), "3:15pm");
    assert_eq!(normalize_time_cell("Noon - 1 PM"), "Noon - 1 PM");
  }

  #[test]
  fn dotted_meridiem_passes_through_unchanged() {
    assert_eq!(normalize_time_cell("3:00 p.m."), "3:00 p.m.");
    assert_eq!(normalize_time_cell("9:30 A.M."), "9:30 A.M.");
    assert_eq!(normalize_time_cell("11:15a.m."), "11:15a.m.");
  }

  #[test]
  fn offset_timestamps_render_in_utc() {
    assert_eq!(normalize_time_cell("2024-06-15T14:30:00+02:00"), "12:30 PM");
    assert_eq!(normalize_time_cell("2024-06-15T08:00:00-05:00"), "1:00 PM");
  }

  #[test]
  fn fallback_extracts_first_clock() {
    assert_eq!(normalize_time_cell("approx. 14:05-ish"), "2:05 PM");
    assert_eq!(normalize_time_cell("at 99:99"), "99:99");
  }

  #[test]
  fn no_digits_passes_through() {
    assert_eq!(normalize_time_cell("TBD"), "TBD");
    assert_eq!(normalize_time_cell(""), "");
  }

  #[test]
  fn parse_clock_accepts_typed_forms() {
    let t = NaiveTime::from_hms_opt(14, 30, 0).unwrap();
    assert_eq!(parse_clock("14:30"), Some(t));
    assert_eq!(parse_clock("2:30 PM"), Some(t));
    assert_eq!(parse_clock("2:30pm"), Some(t));
    assert_eq!(parse_clock("2024-06-15T14:30:00Z"), Some(t));
    assert_eq!(parse_clock("whenever"), None);
    assert_eq!(parse_clock(""), None);
  }

  #[test]
  fn room_headers_propagate_until_next_header() {
    let rows = vec![
      row("Room:", "A"),
      row("10:00 AM", "x"),
      row("Room:", "B"),
      row("11:00", "y"),
    ];
    let out = apply_room_headers(&rows);
    assert_eq!(out, vec![
      TableEntry {
        time:        "10:00 AM".into(),
        room:        "A".into(),
        description: "x".into(),
      },
      TableEntry {
        time:        "11:00 AM".into(),
        room:        "B".into(),
        description: "y".into(),
      },
    ]);
  }

  #[test]
  fn explicit_room_wins_and_blank_rows_drop() {
    let mut explicit = row("9:00 AM", "Coffee");
    explicit.room = Some("Lobby".into());
    let rows = vec![
      row("Room:", "Hall 1"),
      explicit,
      row("", "orphan description"),
      row("9:30 AM", "  "),
      row("10:00 AM", "Keynote"),
    ];
    let out = apply_room_headers(&rows);
    assert_eq!(out.len(), 2);
    assert_eq!(out[0].room, "Lobby");
    assert_eq!(out[1].room, "Hall 1");
    assert_eq!(out[1].description, "Keynote");
  }

  #[test]
  fn rows_before_any_header_have_empty_room() {
    let out = apply_room_headers(&[row("8:00 AM", "Doors open")]);
    assert_eq!(out[0].room, "");
  }
}
