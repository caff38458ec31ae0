//! [`SqliteStore`]: the SQLite implementation of [`ScheduleStore`].

use std::path::Path;

use chrono::Utc;
use lineup_core::{
  event::EventSnapshot,
  payload::{SyncPayload, SyncReceipt},
  store::ScheduleStore,
};

use crate::{
  Result,
  reconcile::{AbandonGuard, reconcile},
  schema::SCHEMA,
  snapshot::{self, Selector},
  watermark::{self, Owner},
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A lineup schedule store backed by a single SQLite file.
///
/// Clones share one background connection.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an empty in-memory store.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Advance the watermark of whichever event owns `owner`.
  ///
  /// For writers outside the reconciler. Returns `false` when the owner no
  /// longer resolves to an event.
  pub async fn touch(&self, owner: Owner) -> Result<bool> {
    let touched = self
      .conn
      .call(move |conn| Ok(watermark::propagate(conn, owner, Utc::now())?))
      .await?;
    Ok(touched.is_some())
  }

  async fn read(&self, selector: Selector) -> Result<Option<EventSnapshot>> {
    self
      .conn
      .call(move |conn| Ok(snapshot::read(conn, &selector)))
      .await?
  }

  /// Run `f` against the raw connection. Test-only escape hatch.
  #[cfg(test)]
  pub(crate) async fn with_conn<R, F>(&self, f: F) -> Result<R>
  where
    R: Send + 'static,
    F: FnOnce(&mut rusqlite::Connection) -> Result<R> + Send + 'static,
  {
    self.conn.call(move |conn| Ok(f(conn))).await?
  }
}

// ─── ScheduleStore impl ──────────────────────────────────────────────────────

impl ScheduleStore for SqliteStore {
  type Error = crate::Error;

  async fn sync(&self, payload: SyncPayload) -> Result<SyncReceipt> {
    let guard = AbandonGuard::armed();
    let abandoned = guard.flag();

    let outcome = self
      .conn
      .call(move |conn| Ok(reconcile(conn, &payload, Utc::now(), &abandoned)))
      .await;

    guard.disarm();
    outcome?
  }

  async fn live_snapshot(&self) -> Result<Option<EventSnapshot>> {
    self.read(Selector::Live).await
  }

  async fn get_event(&self, slug: &str) -> Result<Option<EventSnapshot>> {
    self.read(Selector::Slug(slug.to_owned())).await
  }
}
