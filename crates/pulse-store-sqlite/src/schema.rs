//! SQL schema for the PulseTrack SQLite store.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
///
/// Score and count columns are untyped. They may hold text written by other
/// tools and are decoded leniently on read.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;

CREATE TABLE IF NOT EXISTS approval_ratings (
    id            INTEGER PRIMARY KEY AUTOINCREMENT,
    timestamp     TEXT NOT NULL,   -- RFC 3339 UTC, fixed width
    candidate     TEXT NOT NULL,
    rating_score,                  -- 0-100, usually REAL
    change_delta,
    state         TEXT             -- 'National', a state name, or NULL
);

CREATE TABLE IF NOT EXISTS sentiment_breakdown (
    id               INTEGER PRIMARY KEY AUTOINCREMENT,
    timestamp        TEXT NOT NULL,
    candidate        TEXT NOT NULL,
    positive,
    negative,
    neutral,
    trending_phrases TEXT NOT NULL DEFAULT '',
    headlines        TEXT NOT NULL DEFAULT ''
);

CREATE TABLE IF NOT EXISTS state_demographics (
    state                 TEXT PRIMARY KEY,
    total_population,
    voting_age_population,
    registered_voters,
    political_affiliation TEXT NOT NULL DEFAULT '',
    tribal_affiliation    TEXT NOT NULL DEFAULT ''
);

-- Written by the opinion form, read only by the external ETL.
CREATE TABLE IF NOT EXISTS raw_inputs (
    id        INTEGER PRIMARY KEY AUTOINCREMENT,
    source    TEXT NOT NULL,
    content   TEXT NOT NULL,
    user_id   TEXT NOT NULL,
    location  TEXT NOT NULL,
    candidate TEXT NOT NULL,
    timestamp TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS preferences (
    key   TEXT PRIMARY KEY,
    value TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS approval_timestamp_idx  ON approval_ratings(timestamp);
CREATE INDEX IF NOT EXISTS sentiment_timestamp_idx ON sentiment_breakdown(timestamp);

PRAGMA user_version = 1;
";
