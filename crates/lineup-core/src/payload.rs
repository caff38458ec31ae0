//! The inbound `POST /sync` payload and its validation.
//!
//! Every section except `slug` is optional. A present section is a full
//! replace of what is stored under it; an absent section leaves it alone.
//!
//! String fields default to empty when missing so that validation can report
//! them by field path instead of failing the whole body at parse time.

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Deserializer, Serialize};

use crate::{
  Result, ValidationErrors,
  event::{SpecialAward, TrackWinner, is_break_row},
  normalize::parse_clock,
};

// ─── Payload ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SyncPayload {
  #[serde(default)]
  pub slug:            String,
  #[serde(default)]
  pub is_live:         bool,
  pub basic_info:      Option<BasicInfo>,
  pub schedule:        Option<Vec<ProgramInput>>,
  pub expo_table:      Option<Vec<TableRowInput>>,
  pub reception_table: Option<Vec<TableRowInput>>,
  pub winners:         Option<WinnersInput>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BasicInfo {
  #[serde(default)]
  pub event_name:          String,
  pub event_date:          Option<NaiveDate>,
  #[serde(default, deserialize_with = "de::clock")]
  pub event_time:          Option<NaiveTime>,
  #[serde(default)]
  pub upper_bullet_points: Vec<String>,
  #[serde(default)]
  pub lower_bullet_points: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProgramInput {
  #[serde(default)]
  pub program_name: String,
  #[serde(default)]
  pub tracks:       Vec<TrackInput>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TrackInput {
  #[serde(default)]
  pub track_name:    String,
  /// `None` only when the key is missing; an empty room is allowed.
  pub room:          Option<String>,
  #[serde(default, deserialize_with = "de::clock")]
  pub start_time:    Option<NaiveTime>,
  #[serde(default)]
  pub presentations: Vec<PresentationInput>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PresentationInput {
  #[serde(default)]
  pub order:         i64,
  #[serde(default, deserialize_with = "de::cell")]
  pub team_id:       Option<String>,
  #[serde(default, deserialize_with = "de::cell")]
  pub team_name:     Option<String>,
  #[serde(default)]
  pub project_title: String,
  #[serde(default, deserialize_with = "de::cell")]
  pub organization:  Option<String>,
  #[serde(default, rename = "abstract", deserialize_with = "de::cell")]
  pub abstract_text: Option<String>,
}

impl PresentationInput {
  pub fn is_break(&self) -> bool {
    is_break_row(&self.project_title, self.organization.as_deref())
  }
}

/// One raw expo/reception row before room-header resolution.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableRowInput {
  #[serde(default, deserialize_with = "de::cell_string")]
  pub time:        String,
  #[serde(default, deserialize_with = "de::cell_string")]
  pub description: String,
  #[serde(default, deserialize_with = "de::cell")]
  pub room:        Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WinnersInput {
  pub track_winners:  Option<Vec<TrackWinner>>,
  pub special_awards: Option<Vec<SpecialAward>>,
}

/// Identifiers returned to the caller after a successful sync.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncReceipt {
  pub event_uuid: uuid::Uuid,
  pub slug:       String,
  pub is_live:    bool,
}

// ─── Empty-to-null ───────────────────────────────────────────────────────────

/// Break rows arrive with empty team cells; those are stored as null.
pub fn blank_to_none(value: Option<&str>) -> Option<String> {
  value
    .map(str::trim)
    .filter(|s| !s.is_empty())
    .map(str::to_owned)
}

// ─── Validation ──────────────────────────────────────────────────────────────

const REQUIRED: &str = "This field is required.";

fn require(errors: &mut ValidationErrors, field: String, value: &str) {
  if value.trim().is_empty() {
    errors.add(field, REQUIRED);
  }
}

impl SyncPayload {
  /// Check everything that can be checked without the store.
  ///
  /// Whether `basic_info` is needed depends on whether the event exists, so
  /// that rule is enforced by the store inside its transaction.
  pub fn validate(&self) -> Result<()> {
    let mut errors = ValidationErrors::new();

    require(&mut errors, "slug".into(), &self.slug);

    if let Some(info) = &self.basic_info {
      require(&mut errors, "basic_info.event_name".into(), &info.event_name);
      if info.event_date.is_none() {
        errors.add("basic_info.event_date", REQUIRED);
      }
      if info.event_time.is_none() {
        errors.add("basic_info.event_time", REQUIRED);
      }
    }

    if let Some(schedule) = &self.schedule {
      validate_schedule(&mut errors, schedule);
    }

    if let Some(winners) = &self.winners {
      validate_winners(&mut errors, winners);
    }

    errors.into_result()
  }
}

fn validate_schedule(errors: &mut ValidationErrors, schedule: &[ProgramInput]) {
  let mut program_names = Vec::new();

  for (pi, program) in schedule.iter().enumerate() {
    let at = format!("schedule[{pi}]");
    require(errors, format!("{at}.program_name"), &program.program_name);
    let name = program.program_name.trim();
    if !name.is_empty() {
      if program_names.contains(&name) {
        errors.add(format!("{at}.program_name"), "Program names must be unique within an event.");
      }
      program_names.push(name);
    }

    let mut track_names = Vec::new();
    for (ti, track) in program.tracks.iter().enumerate() {
      let at = format!("{at}.tracks[{ti}]");
      require(errors, format!("{at}.track_name"), &track.track_name);
      if track.room.is_none() {
        errors.add(format!("{at}.room"), REQUIRED);
      }
      let name = track.track_name.trim();
      if !name.is_empty() {
        if track_names.contains(&name) {
          errors.add(format!("{at}.track_name"), "Track names must be unique within a program.");
        }
        track_names.push(name);
      }

      let mut orders = Vec::new();
      for (ri, presentation) in track.presentations.iter().enumerate() {
        let at = format!("{at}.presentations[{ri}]");
        if presentation.order < 1 {
          errors.add(format!("{at}.order"), "Ensure this value is greater than or equal to 1.");
        } else if orders.contains(&presentation.order) {
          errors.add(format!("{at}.order"), "Presentation order must be unique within a track.");
        } else {
          orders.push(presentation.order);
        }
        require(errors, format!("{at}.project_title"), &presentation.project_title);
        if !presentation.is_break()
          && blank_to_none(presentation.team_name.as_deref()).is_none()
        {
          errors.add(
            format!("{at}.team_name"),
            "team_name is required for presentations that are not breaks.",
          );
        }
      }
    }
  }
}

fn validate_winners(errors: &mut ValidationErrors, winners: &WinnersInput) {
  if let Some(track_winners) = &winners.track_winners {
    let mut seen = Vec::new();
    for (i, winner) in track_winners.iter().enumerate() {
      let at = format!("winners.track_winners[{i}]");
      require(errors, format!("{at}.track_name"), &winner.track_name);
      require(errors, format!("{at}.winner_name"), &winner.winner_name);
      let name = winner.track_name.trim();
      if !name.is_empty() {
        if seen.contains(&name) {
          errors.add(format!("{at}.track_name"), "Only one winner per track.");
        }
        seen.push(name);
      }
    }
  }

  if let Some(awards) = &winners.special_awards {
    for (i, award) in awards.iter().enumerate() {
      let at = format!("winners.special_awards[{i}]");
      require(errors, format!("{at}.program_name"), &award.program_name);
      require(errors, format!("{at}.award_winner"), &award.award_winner);
    }
  }
}

// ─── Lenient cell deserializers ──────────────────────────────────────────────

mod de {
  use super::*;

  /// A spreadsheet cell: text, or a number the sheet decided to type for us.
  #[derive(Deserialize)]
  #[serde(untagged)]
  enum Cell {
    Text(String),
    Int(i64),
    Float(f64),
    Bool(bool),
  }

  impl Cell {
    fn into_string(self) -> String {
      match self {
        Cell::Text(s) => s,
        Cell::Int(n) => n.to_string(),
        Cell::Float(f) => f.to_string(),
        Cell::Bool(b) => b.to_string(),
      }
    }
  }

  pub fn cell<'de, D>(d: D) -> Result<Option<String>, D::Error>
  where
    D: Deserializer<'de>,
  {
    Ok(Option::<Cell>::deserialize(d)?.map(Cell::into_string))
  }

  pub fn cell_string<'de, D>(d: D) -> Result<String, D::Error>
  where
    D: Deserializer<'de>,
  {
    Ok(cell(d)?.unwrap_or_default())
  }

  pub fn clock<'de, D>(d: D) -> Result<Option<NaiveTime>, D::Error>
  where
    D: Deserializer<'de>,
  {
    let Some(raw) = Option::<String>::deserialize(d)? else {
      return Ok(None);
    };
    if raw.trim().is_empty() {
      return Ok(None);
    }
    parse_clock(&raw)
      .map(Some)
      .ok_or_else(|| serde::de::Error::custom(format!("unrecognised time: {raw:?}")))
  }
}

#[cfg(test)]
mod tests {
  use serde_json::json;

  use super::*;
  use crate::Error;

  fn errors_of(payload: &SyncPayload) -> ValidationErrors {
    match payload.validate() {
      Err(Error::Validation(e)) => e,
      other => panic!("expected validation error, got {other:?}"),
    }
  }

  fn parse(v: serde_json::Value) -> SyncPayload {
    serde_json::from_value(v).expect("payload parses")
  }

  #[test]
  fn minimal_payload_is_valid() {
    let p = parse(json!({ "slug": "spring-expo" }));
    assert!(p.validate().is_ok());
    assert!(!p.is_live);
    assert!(p.schedule.is_none());
  }

  #[test]
  fn missing_slug_is_keyed() {
    let e = errors_of(&parse(json!({})));
    assert!(e.contains("slug"));
  }

  #[test]
  fn basic_info_fields_required() {
    let e = errors_of(&parse(json!({
      "slug": "x",
      "basic_info": { "event_name": "" }
    })));
    assert!(e.contains("basic_info.event_name"));
    assert!(e.contains("basic_info.event_date"));
    assert!(e.contains("basic_info.event_time"));
  }

  #[test]
  fn event_time_accepts_twelve_hour_form() {
    let p = parse(json!({
      "slug": "x",
      "basic_info": {
        "event_name": "Expo", "event_date": "2024-06-15", "event_time": "6:00 PM"
      }
    }));
    let info = p.basic_info.unwrap();
    assert_eq!(info.event_time, NaiveTime::from_hms_opt(18, 0, 0));
  }

  #[test]
  fn unparseable_time_fails_deserialization() {
    let r: serde_json::Result<SyncPayload> = serde_json::from_value(json!({
      "slug": "x",
      "basic_info": { "event_name": "E", "event_date": "2024-06-15", "event_time": "soon" }
    }));
    assert!(r.is_err());
  }

  #[test]
  fn presentation_rules() {
    let e = errors_of(&parse(json!({
      "slug": "x",
      "schedule": [{
        "program_name": "Capstone",
        "tracks": [{
          "track_name": "AI", "room": "101",
          "presentations": [
            { "order": 0, "team_name": "A", "project_title": "P" },
            { "order": 2, "project_title": "No team" },
            { "order": 3, "project_title": "Break" },
            { "order": 3, "team_name": "B", "project_title": "Dup" }
          ]
        }]
      }]
    })));
    let base = "schedule[0].tracks[0].presentations";
    assert!(e.contains(&format!("{base}[0].order")));
    assert!(e.contains(&format!("{base}[1].team_name")));
    assert!(!e.contains(&format!("{base}[2].team_name")));
    assert!(e.contains(&format!("{base}[3].order")));
  }

  #[test]
  fn duplicate_program_and_missing_room() {
    let e = errors_of(&parse(json!({
      "slug": "x",
      "schedule": [
        { "program_name": "A", "tracks": [{ "track_name": "T" }] },
        { "program_name": "A", "tracks": [] }
      ]
    })));
    assert!(e.contains("schedule[0].tracks[0].room"));
    assert!(e.contains("schedule[1].program_name"));
  }

  #[test]
  fn numeric_cells_become_strings() {
    let p = parse(json!({
      "slug": "x",
      "schedule": [{ "program_name": "A", "tracks": [{
        "track_name": "T", "room": "", "start_time": "",
        "presentations": [{ "order": 1, "team_id": 42, "team_name": "Team 42",
                            "project_title": "Robot", "organization": "" }]
      }]}],
      "expo_table": [{ "time": "10:00", "description": 7 }]
    }));
    assert!(p.validate().is_ok());
    let track = &p.schedule.as_ref().unwrap()[0].tracks[0];
    assert_eq!(track.start_time, None);
    let pres = &track.presentations[0];
    assert_eq!(pres.team_id.as_deref(), Some("42"));
    assert_eq!(blank_to_none(pres.organization.as_deref()), None);
    assert_eq!(p.expo_table.unwrap()[0].description, "7");
  }

  #[test]
  fn winners_rules() {
    let e = errors_of(&parse(json!({
      "slug": "x",
      "winners": {
        "track_winners": [
          { "track_name": "AI", "winner_name": "Team A" },
          { "track_name": "AI", "winner_name": "" }
        ],
        "special_awards": [{ "program_name": "", "award_winner": "Z" }]
      }
    })));
    assert!(e.contains("winners.track_winners[1].track_name"));
    assert!(e.contains("winners.track_winners[1].winner_name"));
    assert!(e.contains("winners.special_awards[0].program_name"));
  }
}
