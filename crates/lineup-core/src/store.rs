//! The `ScheduleStore` trait.
//!
//! Implemented by storage backends (e.g. `lineup-store-sqlite`). The HTTP
//! layer depends on this abstraction, not on any concrete backend.

use std::future::Future;

use crate::{
  event::EventSnapshot,
  payload::{SyncPayload, SyncReceipt},
};

/// Lets a backend error say "this was really a core error", so callers can
/// tell a rejected payload apart from a storage failure without knowing the
/// backend's error type.
pub trait CoreError {
  fn as_core(&self) -> Option<&crate::Error>;
}

/// Abstraction over a schedule store backend.
///
/// All methods return `Send` futures so the trait can be used in multi-threaded
/// async runtimes (e.g. tokio with `axum`).
pub trait ScheduleStore: Send + Sync {
  type Error: std::error::Error + CoreError + Send + Sync + 'static;

  /// Apply `payload` to the event it names, all or nothing.
  ///
  /// Each section present in the payload fully replaces what is stored under
  /// it; absent sections are left untouched. A live payload clears `is_live`
  /// on every other event first. Any sync publishes the event.
  ///
  /// Implementations validate the payload before opening a transaction and
  /// report [`crate::Error::MissingBasicInfo`] when asked to create an event
  /// without `basic_info`.
  fn sync(
    &self,
    payload: SyncPayload,
  ) -> impl Future<Output = Result<SyncReceipt, Self::Error>> + Send + '_;

  /// Read the unique live event and its full hierarchy in one consistent
  /// read. Returns `None` when no event is live.
  fn live_snapshot(
    &self,
  ) -> impl Future<Output = Result<Option<EventSnapshot>, Self::Error>> + Send + '_;

  /// Read an event and its full hierarchy by slug.
  fn get_event<'a>(
    &'a self,
    slug: &'a str,
  ) -> impl Future<Output = Result<Option<EventSnapshot>, Self::Error>> + Send + 'a;
}
