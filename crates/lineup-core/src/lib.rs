//! Core types and trait definitions for the lineup schedule sync service.
//!
//! This crate is deliberately free of HTTP and database dependencies.
//! It holds the event hierarchy, the inbound sync payload and its validation,
//! the time/room normalizer applied to spreadsheet cells, and the worksheet
//! exporter. Storage backends implement [`store::ScheduleStore`].

pub mod error;
pub mod event;
pub mod export;
pub mod normalize;
pub mod payload;
pub mod store;

pub use error::{Error, Result, ValidationErrors};
