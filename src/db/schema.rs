//! SQL DDL for the user store.
//!
//! Defines the `users`, `user_tags`, `conversation_cids`, and `schema_meta`
//! tables. All DDL uses `IF NOT EXISTS` for idempotent initialization.

use rusqlite::Connection;

/// All schema DDL statements for the core tables.
const SCHEMA_SQL: &str = r#"
-- One row per identity. wallet_address is NULL until the user registers;
-- SQLite treats NULLs as distinct under UNIQUE.
CREATE TABLE IF NOT EXISTS users (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    uid TEXT NOT NULL UNIQUE,
    wallet_address TEXT UNIQUE,
    is_setup_completed INTEGER NOT NULL DEFAULT 1,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

-- Interest tags, a set per user. Insertion order is rowid order.
CREATE TABLE IF NOT EXISTS user_tags (
    user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    tag TEXT NOT NULL CHECK(tag IN (
        'anime','football','cricket','art','therapy','music','travel','food',
        'gardening','dance','tech','web3','shows-movies','night-life','gaming','student'
    )),
    added_at TEXT NOT NULL,
    PRIMARY KEY (user_id, tag)
);

-- Archived conversation exports, append-only.
CREATE TABLE IF NOT EXISTS conversation_cids (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    cid TEXT NOT NULL,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_cids_user ON conversation_cids(user_id);

-- Schema metadata
CREATE TABLE IF NOT EXISTS schema_meta (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
);
"#;

/// Initialize all schema tables. Idempotent (uses IF NOT EXISTS).
pub fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(SCHEMA_SQL)?;

    // Set initial schema version if not already present
    conn.execute(
        "INSERT OR IGNORE INTO schema_meta (key, value) VALUES ('schema_version', '1')",
        [],
    )?;

    Ok(())
}
