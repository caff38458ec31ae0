//! Hierarchy reconciler: applies one sync payload inside one transaction.
//!
//! Every section is a full replace. Absent sections are untouched; a present
//! section (even an empty one) discards whatever was stored under it and
//! recreates it from the payload in array order. Any error drops the
//! transaction, which rolls everything back.

use std::sync::{
  Arc,
  atomic::{AtomicBool, Ordering},
};

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use lineup_core::{
  ValidationErrors,
  event::TrackWinner,
  normalize::apply_room_headers,
  payload::{
    BasicInfo, ProgramInput, SyncPayload, SyncReceipt, TableRowInput, blank_to_none,
  },
};
use rusqlite::{Connection, OptionalExtension as _, Transaction};
use uuid::Uuid;

use crate::{
  Error, Result,
  encode::{decode_uuid, encode_date, encode_dt, encode_json, encode_time, encode_uuid},
  watermark::{self, Owner},
};

// ─── Cancellation ────────────────────────────────────────────────────────────

/// Marks a sync as abandoned when dropped before [`AbandonGuard::disarm`].
///
/// The reconciler checks the flag immediately before committing, so a request
/// future dropped mid-sync leaves nothing behind.
pub struct AbandonGuard {
  flag:  Arc<AtomicBool>,
  armed: bool,
}

impl AbandonGuard {
  pub fn armed() -> Self {
    Self { flag: Arc::new(AtomicBool::new(false)), armed: true }
  }

  pub fn flag(&self) -> Arc<AtomicBool> { Arc::clone(&self.flag) }

  pub fn disarm(mut self) { self.armed = false; }
}

impl Drop for AbandonGuard {
  fn drop(&mut self) {
    if self.armed {
      self.flag.store(true, Ordering::SeqCst);
    }
  }
}

// ─── Counts ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScheduleCounts {
  pub programs:      usize,
  pub tracks:        usize,
  pub presentations: usize,
}

// ─── Entry point ─────────────────────────────────────────────────────────────

/// Validate `payload` and apply it in a single transaction.
///
/// On any error the transaction is dropped uncommitted, so nothing from the
/// payload is left behind.
pub fn reconcile(
  conn: &mut Connection,
  payload: &SyncPayload,
  now: DateTime<Utc>,
  abandoned: &AtomicBool,
) -> Result<SyncReceipt> {
  let outcome = apply(conn, payload, now, abandoned);
  if let Err(e) = &outcome {
    tracing::warn!(slug = payload.slug.trim(), error = %e, "sync rolled back");
  }
  outcome
}

fn apply(
  conn: &mut Connection,
  payload: &SyncPayload,
  now: DateTime<Utc>,
  abandoned: &AtomicBool,
) -> Result<SyncReceipt> {
  payload.validate()?;
  let slug = payload.slug.trim();

  let tx = conn.transaction()?;

  // At most one live event: clear the others before touching this one.
  if payload.is_live {
    let cleared = tx.execute(
      "UPDATE events SET is_live = 0 WHERE is_live = 1 AND slug != ?1",
      rusqlite::params![slug],
    )?;
    if cleared > 0 {
      tracing::info!(slug, cleared, "live flag moved to this event");
    }
  }

  let (event_id, event_uuid, is_live) =
    upsert_event(&tx, slug, payload.is_live, payload.basic_info.as_ref(), now)?;

  if let Some(rows) = &payload.expo_table {
    replace_table(&tx, event_id, TableColumn::Expo, rows)?;
  }
  if let Some(rows) = &payload.reception_table {
    replace_table(&tx, event_id, TableColumn::Reception, rows)?;
  }

  let counts = payload
    .schedule
    .as_deref()
    .map(|schedule| replace_schedule(&tx, event_id, schedule, now))
    .transpose()?;

  let mut winner_count = None;
  if let Some(winners) = &payload.winners {
    if let Some(track_winners) = &winners.track_winners {
      winner_count = Some(replace_track_winners(&tx, event_id, track_winners, now)?);
    }
    if let Some(awards) = &winners.special_awards {
      tx.execute(
        "UPDATE events SET special_awards = ?1 WHERE event_id = ?2",
        rusqlite::params![encode_json(awards)?, event_id],
      )?;
      watermark::propagate(&tx, Owner::Event(event_id), now)?;
    }
  }

  if abandoned.load(Ordering::SeqCst) {
    return Err(Error::Abandoned);
  }
  tx.commit()?;

  tracing::info!(
    slug,
    %event_uuid,
    is_live,
    programs = counts.map(|c| c.programs),
    tracks = counts.map(|c| c.tracks),
    presentations = counts.map(|c| c.presentations),
    track_winners = winner_count,
    "sync committed"
  );

  Ok(SyncReceipt {
    event_uuid,
    slug: slug.to_owned(),
    is_live,
  })
}

// ─── Event upsert ────────────────────────────────────────────────────────────

fn basic_fields(info: &BasicInfo) -> Result<(NaiveDate, NaiveTime)> {
  match (info.event_date, info.event_time) {
    (Some(date), Some(time)) => Ok((date, time)),
    _ => {
      let mut errors = ValidationErrors::new();
      errors.add("basic_info", "event_date and event_time are required.");
      Err(lineup_core::Error::Validation(errors).into())
    }
  }
}

/// Upsert keyed on slug. Any sync publishes the event.
///
/// `is_live` is written along with `basic_info`. A partial sync without
/// `basic_info` can switch the event live but never takes it offline.
/// Returns the event id, its uuid and the live flag as stored.
fn upsert_event(
  tx: &Transaction<'_>,
  slug: &str,
  is_live: bool,
  info: Option<&BasicInfo>,
  now: DateTime<Utc>,
) -> Result<(i64, Uuid, bool)> {
  let existing: Option<(i64, String, bool)> = tx
    .query_row(
      "SELECT event_id, event_uuid, is_live FROM events WHERE slug = ?1",
      rusqlite::params![slug],
      |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
    )
    .optional()?;
  let now_str = encode_dt(now);

  match (existing, info) {
    (Some((event_id, uuid_str, _)), Some(info)) => {
      let (date, time) = basic_fields(info)?;
      tx.execute(
        "UPDATE events SET
           name = ?1, event_date = ?2, event_time = ?3,
           upper_bullet_points = ?4, lower_bullet_points = ?5,
           is_published = 1, is_live = ?6, updated_at = ?7
         WHERE event_id = ?8",
        rusqlite::params![
          info.event_name.trim(),
          encode_date(date),
          encode_time(time),
          encode_json(&info.upper_bullet_points)?,
          encode_json(&info.lower_bullet_points)?,
          is_live,
          now_str,
          event_id,
        ],
      )?;
      Ok((event_id, decode_uuid(&uuid_str)?, is_live))
    }
    (Some((event_id, uuid_str, was_live)), None) => {
      let is_live = is_live || was_live;
      tx.execute(
        "UPDATE events SET is_published = 1, is_live = ?1, updated_at = ?2
         WHERE event_id = ?3",
        rusqlite::params![is_live, now_str, event_id],
      )?;
      Ok((event_id, decode_uuid(&uuid_str)?, is_live))
    }
    (None, Some(info)) => {
      let (date, time) = basic_fields(info)?;
      let event_uuid = Uuid::new_v4();
      tx.execute(
        "INSERT INTO events (
           event_uuid, slug, name, event_date, event_time,
           upper_bullet_points, lower_bullet_points,
           is_published, is_live, created_at, updated_at
         ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, 1, ?8, ?9, ?9)",
        rusqlite::params![
          encode_uuid(event_uuid),
          slug,
          info.event_name.trim(),
          encode_date(date),
          encode_time(time),
          encode_json(&info.upper_bullet_points)?,
          encode_json(&info.lower_bullet_points)?,
          is_live,
          now_str,
        ],
      )?;
      tracing::info!(slug, %event_uuid, "event created");
      Ok((tx.last_insert_rowid(), event_uuid, is_live))
    }
    (None, None) => Err(lineup_core::Error::MissingBasicInfo(slug.to_owned()).into()),
  }
}

// ─── Event-owned tables ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy)]
enum TableColumn {
  Expo,
  Reception,
}

/// Resolve room headers and store the result verbatim, replacing the column.
fn replace_table(
  tx: &Transaction<'_>,
  event_id: i64,
  column: TableColumn,
  rows: &[TableRowInput],
) -> Result<()> {
  let entries = apply_room_headers(rows);
  let sql = match column {
    TableColumn::Expo => "UPDATE events SET expo_table = ?1 WHERE event_id = ?2",
    TableColumn::Reception => "UPDATE events SET reception_table = ?1 WHERE event_id = ?2",
  };
  tx.execute(sql, rusqlite::params![encode_json(&entries)?, event_id])?;
  Ok(())
}

// ─── Schedule ────────────────────────────────────────────────────────────────

/// Full replace of the event's program → track → presentation tree.
///
/// Existing programs are deleted (tracks and presentations cascade) and the
/// tree is rebuilt from `schedule`. Program order is the 1-based array index;
/// track order likewise within its program; presentations keep their own
/// `order`. Empty team/organization/abstract cells are stored as NULL.
fn replace_schedule(
  tx: &Transaction<'_>,
  event_id: i64,
  schedule: &[ProgramInput],
  now: DateTime<Utc>,
) -> Result<ScheduleCounts> {
  let existing: Vec<i64> = tx
    .prepare("SELECT program_id FROM programs WHERE event_id = ?1")?
    .query_map(rusqlite::params![event_id], |row| row.get(0))?
    .collect::<rusqlite::Result<_>>()?;
  for program_id in &existing {
    watermark::propagate(tx, Owner::Program(*program_id), now)?;
  }
  tx.execute("DELETE FROM programs WHERE event_id = ?1", rusqlite::params![event_id])?;

  let mut counts = ScheduleCounts::default();
  let mut insert_program = tx.prepare_cached(
    "INSERT INTO programs (event_id, name, position) VALUES (?1, ?2, ?3)",
  )?;
  let mut insert_track = tx.prepare_cached(
    "INSERT INTO tracks (program_id, name, room, start_time, position)
     VALUES (?1, ?2, ?3, ?4, ?5)",
  )?;
  let mut insert_presentation = tx.prepare_cached(
    "INSERT INTO presentations (
       track_id, position, team_id, team_name, project_title, organization, abstract
     ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
  )?;

  for (pi, program) in schedule.iter().enumerate() {
    let program_id = insert_program.insert(rusqlite::params![
      event_id,
      program.program_name.trim(),
      position(pi),
    ])?;
    watermark::propagate(tx, Owner::Program(program_id), now)?;
    counts.programs += 1;

    for (ti, track) in program.tracks.iter().enumerate() {
      let track_id = insert_track.insert(rusqlite::params![
        program_id,
        track.track_name.trim(),
        track.room.as_deref().map(str::trim).unwrap_or_default(),
        track.start_time.map(encode_time),
        position(ti),
      ])?;
      watermark::propagate(tx, Owner::Track(track_id), now)?;
      counts.tracks += 1;

      for presentation in &track.presentations {
        let presentation_id = insert_presentation.insert(rusqlite::params![
          track_id,
          presentation.order,
          blank_to_none(presentation.team_id.as_deref()),
          blank_to_none(presentation.team_name.as_deref()),
          presentation.project_title.trim(),
          blank_to_none(presentation.organization.as_deref()),
          blank_to_none(presentation.abstract_text.as_deref()),
        ])?;
        watermark::propagate(tx, Owner::Presentation(presentation_id), now)?;
        counts.presentations += 1;
      }
    }
  }

  Ok(counts)
}

fn position(index: usize) -> i64 { index as i64 + 1 }

// ─── Winners ─────────────────────────────────────────────────────────────────

/// Full replace of the event's track winners, kept in payload order.
fn replace_track_winners(
  tx: &Transaction<'_>,
  event_id: i64,
  winners: &[TrackWinner],
  now: DateTime<Utc>,
) -> Result<usize> {
  let existing: Vec<i64> = tx
    .prepare("SELECT track_winner_id FROM track_winners WHERE event_id = ?1")?
    .query_map(rusqlite::params![event_id], |row| row.get(0))?
    .collect::<rusqlite::Result<_>>()?;
  for id in &existing {
    watermark::propagate(tx, Owner::TrackWinner(*id), now)?;
  }
  tx.execute(
    "DELETE FROM track_winners WHERE event_id = ?1",
    rusqlite::params![event_id],
  )?;

  let mut insert = tx.prepare_cached(
    "INSERT INTO track_winners (event_id, track_name, winner_name) VALUES (?1, ?2, ?3)",
  )?;
  for winner in winners {
    let id = insert.insert(rusqlite::params![
      event_id,
      winner.track_name.trim(),
      winner.winner_name.trim(),
    ])?;
    watermark::propagate(tx, Owner::TrackWinner(id), now)?;
  }
  Ok(winners.len())
}
