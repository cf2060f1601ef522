//! SQL schema for the Shutter SQLite store.
//!
//! Executed once at connection startup via `PRAGMA user_version`. Future
//! migrations will be gated on that version number.

/// Every table derived from the event tables; emptied before a replay.
pub const PROJECTION_TABLES: [&str; 8] = [
  "album_authorization",
  "album_photo",
  "album",
  "photo_authorization",
  "photo_person",
  "photo",
  "person",
  "\"user\"",
];

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

-- Event tables are strictly append-only.
-- No UPDATE or DELETE is ever issued against them.
CREATE TABLE IF NOT EXISTS user_event (
    subject_id  TEXT    NOT NULL,
    number      INTEGER NOT NULL,   -- 1-based position in the stream
    date        TEXT    NOT NULL,   -- RFC 3339 UTC; server-assigned
    source      TEXT    NOT NULL,   -- JSON-encoded EventSource
    kind        TEXT    NOT NULL,   -- discriminant of the event enum
    content     TEXT    NOT NULL,   -- JSON payload (inner data only)
    UNIQUE (subject_id, number)
);

CREATE TABLE IF NOT EXISTS album_event (
    subject_id  TEXT    NOT NULL,
    number      INTEGER NOT NULL,
    date        TEXT    NOT NULL,
    source      TEXT    NOT NULL,
    kind        TEXT    NOT NULL,
    content     TEXT    NOT NULL,
    UNIQUE (subject_id, number)
);

CREATE TABLE IF NOT EXISTS photo_event (
    subject_id  TEXT    NOT NULL,
    number      INTEGER NOT NULL,
    date        TEXT    NOT NULL,
    source      TEXT    NOT NULL,
    kind        TEXT    NOT NULL,
    content     TEXT    NOT NULL,
    UNIQUE (subject_id, number)
);

CREATE TABLE IF NOT EXISTS person_event (
    subject_id  TEXT    NOT NULL,
    number      INTEGER NOT NULL,
    date        TEXT    NOT NULL,
    source      TEXT    NOT NULL,
    kind        TEXT    NOT NULL,
    content     TEXT    NOT NULL,
    UNIQUE (subject_id, number)
);

-- Projections. Rewritten only as a side effect of an event insertion.
CREATE TABLE IF NOT EXISTS \"user\" (
    id             TEXT PRIMARY KEY,
    creation_date  TEXT NOT NULL,
    name           TEXT NOT NULL UNIQUE,
    role           TEXT NOT NULL,   -- 'user' | 'admin'
    password_hash  TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS person (
    id             TEXT PRIMARY KEY,
    creation_date  TEXT NOT NULL,
    last_name      TEXT NOT NULL,
    first_name     TEXT NOT NULL,
    UNIQUE (last_name, first_name)
);

CREATE TABLE IF NOT EXISTS photo (
    id             TEXT PRIMARY KEY,
    owner_id       TEXT    NOT NULL,
    upload_date    TEXT    NOT NULL,
    hash           TEXT    NOT NULL,
    content_type   TEXT    NOT NULL,
    shooting_date  TEXT,
    version        INTEGER NOT NULL DEFAULT 1,
    UNIQUE (owner_id, hash)
);

-- Rows survive the deletion of the person; reads join on person.
CREATE TABLE IF NOT EXISTS photo_person (
    photo_id   TEXT NOT NULL,
    person_id  TEXT NOT NULL,
    PRIMARY KEY (photo_id, person_id)
);

CREATE TABLE IF NOT EXISTS photo_authorization (
    subject_id          TEXT    NOT NULL,
    photo_id            TEXT    NOT NULL,
    \"read\"              INTEGER NOT NULL DEFAULT 0,
    \"update\"            INTEGER NOT NULL DEFAULT 0,
    \"delete\"            INTEGER NOT NULL DEFAULT 0,
    update_permissions  INTEGER NOT NULL DEFAULT 0,
    PRIMARY KEY (subject_id, photo_id)
);

CREATE TABLE IF NOT EXISTS album (
    id             TEXT PRIMARY KEY,
    owner_id       TEXT NOT NULL,
    creation_date  TEXT NOT NULL,
    name           TEXT NOT NULL
);

-- Rows survive the deletion of the photo; reads join on photo.
CREATE TABLE IF NOT EXISTS album_photo (
    album_id  TEXT NOT NULL,
    photo_id  TEXT NOT NULL,
    PRIMARY KEY (album_id, photo_id)
);

CREATE TABLE IF NOT EXISTS album_authorization (
    subject_id          TEXT    NOT NULL,
    album_id            TEXT    NOT NULL,
    \"read\"              INTEGER NOT NULL DEFAULT 0,
    \"update\"            INTEGER NOT NULL DEFAULT 0,
    \"delete\"            INTEGER NOT NULL DEFAULT 0,
    update_permissions  INTEGER NOT NULL DEFAULT 0,
    PRIMARY KEY (subject_id, album_id)
);

CREATE INDEX IF NOT EXISTS photo_upload_idx    ON photo(upload_date);
CREATE INDEX IF NOT EXISTS album_creation_idx  ON album(creation_date);
CREATE INDEX IF NOT EXISTS album_photo_idx     ON album_photo(photo_id);
CREATE INDEX IF NOT EXISTS album_authz_idx     ON album_authorization(album_id);
CREATE INDEX IF NOT EXISTS photo_authz_idx     ON photo_authorization(photo_id);

PRAGMA user_version = 1;
";
