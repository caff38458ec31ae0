//! SQL schema for the lineup SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

-- Events are upserted by slug and never deleted.
-- JSON columns hold ordered arrays written wholesale by each sync.
CREATE TABLE IF NOT EXISTS events (
    event_id            INTEGER PRIMARY KEY AUTOINCREMENT,
    event_uuid          TEXT NOT NULL UNIQUE,
    slug                TEXT NOT NULL UNIQUE,
    name                TEXT NOT NULL,
    event_date          TEXT NOT NULL,   -- YYYY-MM-DD
    event_time          TEXT NOT NULL,   -- HH:MM:SS
    upper_bullet_points TEXT NOT NULL DEFAULT '[]',
    lower_bullet_points TEXT NOT NULL DEFAULT '[]',
    expo_table          TEXT NOT NULL DEFAULT '[]',
    reception_table     TEXT NOT NULL DEFAULT '[]',
    special_awards      TEXT NOT NULL DEFAULT '[]',
    is_published        INTEGER NOT NULL DEFAULT 0,
    is_live             INTEGER NOT NULL DEFAULT 0,
    created_at          TEXT NOT NULL,   -- ISO 8601 UTC
    updated_at          TEXT NOT NULL    -- watermark; see watermark.rs
);

CREATE TABLE IF NOT EXISTS programs (
    program_id INTEGER PRIMARY KEY AUTOINCREMENT,
    event_id   INTEGER NOT NULL REFERENCES events(event_id) ON DELETE CASCADE,
    name       TEXT NOT NULL,
    position   INTEGER NOT NULL,
    UNIQUE (event_id, name)
);

CREATE TABLE IF NOT EXISTS tracks (
    track_id   INTEGER PRIMARY KEY AUTOINCREMENT,
    program_id INTEGER NOT NULL REFERENCES programs(program_id) ON DELETE CASCADE,
    name       TEXT NOT NULL,
    room       TEXT NOT NULL DEFAULT '',
    start_time TEXT,                     -- HH:MM:SS or NULL
    position   INTEGER NOT NULL,
    UNIQUE (program_id, name)
);

-- Break rows carry NULL team columns.
CREATE TABLE IF NOT EXISTS presentations (
    presentation_id INTEGER PRIMARY KEY AUTOINCREMENT,
    track_id        INTEGER NOT NULL REFERENCES tracks(track_id) ON DELETE CASCADE,
    position        INTEGER NOT NULL CHECK (position >= 1),
    team_id         TEXT,
    team_name       TEXT,
    project_title   TEXT NOT NULL,
    organization    TEXT,
    abstract        TEXT,
    UNIQUE (track_id, position)
);

CREATE TABLE IF NOT EXISTS track_winners (
    track_winner_id INTEGER PRIMARY KEY AUTOINCREMENT,
    event_id        INTEGER NOT NULL REFERENCES events(event_id) ON DELETE CASCADE,
    track_name      TEXT NOT NULL,
    winner_name     TEXT NOT NULL,
    UNIQUE (event_id, track_name)
);

CREATE INDEX IF NOT EXISTS events_live_idx         ON events(is_live);
CREATE INDEX IF NOT EXISTS programs_event_idx      ON programs(event_id);
CREATE INDEX IF NOT EXISTS tracks_program_idx      ON tracks(program_id);
CREATE INDEX IF NOT EXISTS track_winners_event_idx ON track_winners(event_id);

PRAGMA user_version = 1;
";
