//! Watermark propagation.
//!
//! Every write to a program, track, presentation or track winner moves the
//! owning event's `updated_at` to "now", so "has this event changed since T"
//! is a single comparison against the event row. The reconciler calls
//! [`propagate`] explicitly after each insert and before each delete.

use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension as _};

use crate::encode::encode_dt;

/// The entity that was written, identified by its row id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Owner {
  Event(i64),
  Program(i64),
  Track(i64),
  Presentation(i64),
  TrackWinner(i64),
}

impl Owner {
  /// Query resolving the owning `event_id`, walking up the hierarchy.
  fn resolve_sql(self) -> &'static str {
    match self {
      Owner::Event(_) => "SELECT event_id FROM events WHERE event_id = ?1",
      Owner::Program(_) => "SELECT event_id FROM programs WHERE program_id = ?1",
      Owner::Track(_) => {
        "SELECT p.event_id
         FROM tracks t
         JOIN programs p ON p.program_id = t.program_id
         WHERE t.track_id = ?1"
      }
      Owner::Presentation(_) => {
        "SELECT p.event_id
         FROM presentations pr
         JOIN tracks t   ON t.track_id   = pr.track_id
         JOIN programs p ON p.program_id = t.program_id
         WHERE pr.presentation_id = ?1"
      }
      Owner::TrackWinner(_) => {
        "SELECT event_id FROM track_winners WHERE track_winner_id = ?1"
      }
    }
  }

  fn id(self) -> i64 {
    match self {
      Owner::Event(id)
      | Owner::Program(id)
      | Owner::Track(id)
      | Owner::Presentation(id)
      | Owner::TrackWinner(id) => id,
    }
  }
}

/// Find the event owning `owner`, if it still exists.
pub fn resolve_event(conn: &Connection, owner: Owner) -> rusqlite::Result<Option<i64>> {
  conn
    .prepare_cached(owner.resolve_sql())?
    .query_row(rusqlite::params![owner.id()], |row| row.get(0))
    .optional()
}

/// Set the owning event's `updated_at` to `now`.
///
/// This is a bookkeeping write straight to the column. When the owner cannot
/// be resolved (its parent is already gone) nothing happens and `None` is
/// returned; otherwise the touched event id.
pub fn propagate(
  conn: &Connection,
  owner: Owner,
  now: DateTime<Utc>,
) -> rusqlite::Result<Option<i64>> {
  let Some(event_id) = resolve_event(conn, owner)? else {
    tracing::debug!(?owner, "watermark owner unresolved; skipping");
    return Ok(None);
  };

  conn
    .prepare_cached("UPDATE events SET updated_at = ?1 WHERE event_id = ?2")?
    .execute(rusqlite::params![encode_dt(now), event_id])?;

  tracing::debug!(?owner, event_id, "watermark advanced");
  Ok(Some(event_id))
}
