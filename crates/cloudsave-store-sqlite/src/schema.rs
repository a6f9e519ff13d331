//! SQL schema for the cloudsave SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;

-- Blobs are never updated; they leave by sweep or oldest-first eviction.
CREATE TABLE IF NOT EXISTS saved_blobs (
    code          TEXT PRIMARY KEY,   -- 5 letters, uniqueness enforced here
    data          TEXT NOT NULL,
    size_kb       REAL NOT NULL,
    address_hash  TEXT NOT NULL,
    device_hash   TEXT,
    combined_hash TEXT NOT NULL,
    created_at    TEXT NOT NULL       -- fixed-width RFC 3339 UTC
);

-- Append-only. Rows are only ever inserted or swept by age.
CREATE TABLE IF NOT EXISTS request_log (
    log_id        INTEGER PRIMARY KEY AUTOINCREMENT,
    identity_hash TEXT NOT NULL,
    action        TEXT NOT NULL,      -- 'save' | 'load' | 'load_failed' | 'invalid'
    created_at    TEXT NOT NULL
);

-- Provisioned out of band; request handlers only read it.
CREATE TABLE IF NOT EXISTS subscription_codes (
    code      TEXT PRIMARY KEY,
    tier      TEXT NOT NULL,
    is_active INTEGER NOT NULL DEFAULT 1
);

CREATE INDEX IF NOT EXISTS saved_blobs_created_idx ON saved_blobs(created_at);
CREATE INDEX IF NOT EXISTS saved_blobs_address_idx ON saved_blobs(address_hash, created_at);
CREATE INDEX IF NOT EXISTS saved_blobs_device_idx  ON saved_blobs(device_hash, created_at);
CREATE INDEX IF NOT EXISTS request_log_created_idx ON request_log(created_at);
CREATE INDEX IF NOT EXISTS request_log_identity_idx
    ON request_log(identity_hash, action, created_at);

PRAGMA user_version = 1;
";
