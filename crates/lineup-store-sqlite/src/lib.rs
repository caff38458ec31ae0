//! SQLite backend for the lineup schedule store.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated thread
//! without blocking the async runtime. Every sync is one SQLite transaction.

mod encode;
mod reconcile;
mod schema;
mod snapshot;
mod store;
mod watermark;

pub mod error;

pub use error::{Error, Result};
pub use store::SqliteStore;
pub use watermark::Owner;
