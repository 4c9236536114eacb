//! Database schema definitions
//!
//! This module contains all SQL schema definitions for the Hotel-Sweep database.

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
-- Request queue
CREATE TABLE IF NOT EXISTS requests (
    unique_key TEXT PRIMARY KEY,
    url TEXT NOT NULL,
    label TEXT NOT NULL,
    detail_order INTEGER,
    position INTEGER NOT NULL,
    state TEXT NOT NULL,
    retry_count INTEGER NOT NULL DEFAULT 0,
    error_messages TEXT NOT NULL DEFAULT '[]',
    added_at TEXT NOT NULL,
    handled_at TEXT
);

CREATE INDEX IF NOT EXISTS idx_requests_state_position ON requests(state, position);

-- Crawl progress, config hash and diagnostic artifacts
CREATE TABLE IF NOT EXISTS key_value (
    key TEXT PRIMARY KEY,
    value BLOB NOT NULL,
    content_type TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

-- Output records
CREATE TABLE IF NOT EXISTS dataset (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    record TEXT NOT NULL,
    created_at TEXT NOT NULL
);
"#;

/// Initializes the database schema
///
/// # Arguments
///
/// * `conn` - The database connection
///
/// # Returns
///
/// * `Ok(())` - Schema initialized successfully
/// * `Err(rusqlite::Error)` - Failed to initialize schema
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}
