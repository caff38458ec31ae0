//! Reads an event and its whole hierarchy back into an [`EventSnapshot`].

use lineup_core::event::{EventSnapshot, Presentation, Program, Track, TrackWinner};
use rusqlite::{Connection, OptionalExtension as _};

use crate::{
  Result,
  encode::{
    EVENT_COLUMNS, RawEvent, RawPresentation, RawScheduleRow, RawTrack, decode_time,
  },
};

/// Which event to read.
#[derive(Debug, Clone)]
pub enum Selector {
  Live,
  Slug(String),
}

/// Read the selected event inside one transaction so the event row and its
/// descendants come from the same state.
pub fn read(conn: &mut Connection, selector: &Selector) -> Result<Option<EventSnapshot>> {
  let tx = conn.transaction()?;

  let raw = match selector {
    // `ORDER BY` only matters if the single-live invariant was ever broken
    // outside the reconciler.
    Selector::Live => tx
      .query_row(
        &format!(
          "SELECT {EVENT_COLUMNS} FROM events WHERE is_live = 1
           ORDER BY updated_at DESC LIMIT 1"
        ),
        [],
        RawEvent::from_row,
      )
      .optional()?,
    Selector::Slug(slug) => tx
      .query_row(
        &format!("SELECT {EVENT_COLUMNS} FROM events WHERE slug = ?1"),
        rusqlite::params![slug],
        RawEvent::from_row,
      )
      .optional()?,
  };

  let Some(raw) = raw else {
    return Ok(None);
  };
  let event_id = raw.event_id;
  let event = raw.into_event()?;
  let programs = read_programs(&tx, event_id)?;
  let track_winners = read_track_winners(&tx, event_id)?;
  tx.commit()?;

  Ok(Some(EventSnapshot { event, programs, track_winners }))
}

/// The schedule tree in export order:
/// (program order, program id, track order, track id, presentation order).
fn read_programs(conn: &Connection, event_id: i64) -> Result<Vec<Program>> {
  let mut stmt = conn.prepare(
    "SELECT
       p.program_id, p.name, p.position,
       t.track_id, t.name, t.room, t.start_time, t.position,
       pr.position, pr.team_id, pr.team_name, pr.project_title,
       pr.organization, pr.abstract
     FROM programs p
     LEFT JOIN tracks t         ON t.program_id = p.program_id
     LEFT JOIN presentations pr ON pr.track_id  = t.track_id
     WHERE p.event_id = ?1
     ORDER BY p.position, p.program_id, t.position, t.track_id, pr.position",
  )?;

  let rows = stmt
    .query_map(rusqlite::params![event_id], |row| {
      let track_id: Option<i64> = row.get(3)?;
      let track = match track_id {
        None => None,
        Some(track_id) => {
          let presentation_order: Option<i64> = row.get(8)?;
          let presentation = match presentation_order {
            None => None,
            Some(order) => Some(RawPresentation {
              order,
              team_id:       row.get(9)?,
              team_name:     row.get(10)?,
              project_title: row.get(11)?,
              organization:  row.get(12)?,
              abstract_text: row.get(13)?,
            }),
          };
          Some(RawTrack {
            track_id,
            name: row.get(4)?,
            room: row.get(5)?,
            start_time: row.get(6)?,
            order: row.get(7)?,
            presentation,
          })
        }
      };
      Ok(RawScheduleRow {
        program_id: row.get(0)?,
        program_name: row.get(1)?,
        program_order: row.get(2)?,
        track,
      })
    })?
    .collect::<rusqlite::Result<Vec<_>>>()?;

  let mut programs: Vec<Program> = Vec::new();
  let mut current_program = None;
  let mut current_track = None;

  for row in rows {
    if current_program != Some(row.program_id) {
      programs.push(Program {
        name:   row.program_name,
        order:  row.program_order,
        tracks: Vec::new(),
      });
      current_program = Some(row.program_id);
      current_track = None;
    }
    let (Some(program), Some(raw_track)) = (programs.last_mut(), row.track) else {
      continue;
    };

    if current_track != Some(raw_track.track_id) {
      program.tracks.push(Track {
        name:          raw_track.name,
        room:          raw_track.room,
        start_time:    raw_track.start_time.as_deref().map(decode_time).transpose()?,
        order:         raw_track.order,
        presentations: Vec::new(),
      });
      current_track = Some(raw_track.track_id);
    }

    if let (Some(track), Some(p)) = (program.tracks.last_mut(), raw_track.presentation) {
      track.presentations.push(Presentation {
        order:         p.order,
        team_id:       p.team_id,
        team_name:     p.team_name,
        project_title: p.project_title,
        organization:  p.organization,
        abstract_text: p.abstract_text,
      });
    }
  }

  Ok(programs)
}

fn read_track_winners(conn: &Connection, event_id: i64) -> Result<Vec<TrackWinner>> {
  let mut stmt = conn.prepare(
    "SELECT track_name, winner_name FROM track_winners
     WHERE event_id = ?1 ORDER BY track_winner_id",
  )?;
  let winners = stmt
    .query_map(rusqlite::params![event_id], |row| {
      Ok(TrackWinner {
        track_name:  row.get(0)?,
        winner_name: row.get(1)?,
      })
    })?
    .collect::<rusqlite::Result<Vec<_>>>()?;
  Ok(winners)
}
