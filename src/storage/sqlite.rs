//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the queue, key-value
//! and dataset traits.

use crate::crawler::{CrawlRequest, RequestLabel};
use crate::state::RequestState;
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{
    Dataset, KeyValueStore, RequestQueue, StorageError, StorageResult,
};
use crate::SweepError;
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;

const REQUEST_COLUMNS: &str = "unique_key, url, label, detail_order, retry_count, error_messages";

/// SQLite storage backend
pub struct SqliteStorage {
    conn: Connection,
}

impl SqliteStorage {
    /// Creates a new SqliteStorage instance
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteStorage)` - Successfully opened/created database
    /// * `Err(SweepError)` - Failed to open database
    pub fn new(path: &Path) -> Result<Self, SweepError> {
        let conn = Connection::open(path).map_err(StorageError::from)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA temp_store = MEMORY;
        ",
        )
        .map_err(StorageError::from)?;

        initialize_schema(&conn).map_err(StorageError::from)?;

        Ok(Self { conn })
    }

    /// Creates an in-memory database
    pub fn new_in_memory() -> Result<Self, SweepError> {
        let conn = Connection::open_in_memory().map_err(StorageError::from)?;
        initialize_schema(&conn).map_err(StorageError::from)?;
        Ok(Self { conn })
    }

    /// Deletes every request, value and record
    pub fn clear(&mut self) -> StorageResult<()> {
        self.conn.execute_batch(
            "
            DELETE FROM requests;
            DELETE FROM key_value;
            DELETE FROM dataset;
        ",
        )?;
        Ok(())
    }

    fn current_state(&self, unique_key: &str) -> StorageResult<RequestState> {
        self.request_state(unique_key)?
            .ok_or_else(|| StorageError::RequestNotFound(unique_key.to_string()))
    }

    fn expect_in_progress(&self, unique_key: &str, to: RequestState) -> StorageResult<()> {
        let from = self.current_state(unique_key)?;
        if from != RequestState::InProgress {
            return Err(StorageError::InvalidTransition {
                key: unique_key.to_string(),
                from,
                to,
            });
        }
        Ok(())
    }

    fn back_position(&self) -> StorageResult<i64> {
        let position: i64 = self.conn.query_row(
            "SELECT COALESCE(MAX(position), 0) + 1 FROM requests",
            [],
            |row| row.get(0),
        )?;
        Ok(position)
    }

    fn front_position(&self) -> StorageResult<i64> {
        let position: i64 = self.conn.query_row(
            "SELECT COALESCE(MIN(position), 0) - 1 FROM requests",
            [],
            |row| row.get(0),
        )?;
        Ok(position)
    }
}

fn request_from_row(row: &Row<'_>) -> rusqlite::Result<(CrawlRequest, String)> {
    let label_name: String = row.get(2)?;
    let order: Option<u32> = row.get(3)?;
    let errors: String = row.get(5)?;

    let label = RequestLabel::from_parts(&label_name, order).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            2,
            rusqlite::types::Type::Text,
            Box::new(StorageError::Database(format!(
                "Unknown request label '{}'",
                label_name
            ))),
        )
    })?;
    Ok((
        CrawlRequest {
            unique_key: row.get(0)?,
            url: row.get(1)?,
            label,
            retry_count: row.get(4)?,
            error_messages: Vec::new(),
        },
        errors,
    ))
}

impl RequestQueue for SqliteStorage {
    fn add_request(&mut self, request: &CrawlRequest, forefront: bool) -> StorageResult<bool> {
        let position = if forefront {
            self.front_position()?
        } else {
            self.back_position()?
        };
        let errors = serde_json::to_string(&request.error_messages)?;

        let inserted = self.conn.execute(
            "INSERT OR IGNORE INTO requests
                (unique_key, url, label, detail_order, position, state, retry_count, error_messages, added_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                request.unique_key,
                request.url,
                request.label.name(),
                request.label.order(),
                position,
                RequestState::Pending.to_db_string(),
                request.retry_count,
                errors,
                Utc::now().to_rfc3339(),
            ],
        )?;

        if inserted == 0 {
            tracing::trace!("Request {} already queued", request.unique_key);
        }
        Ok(inserted > 0)
    }

    fn fetch_next(&mut self) -> StorageResult<Option<CrawlRequest>> {
        let row = self
            .conn
            .query_row(
                &format!(
                    "SELECT {} FROM requests WHERE state = ?1 ORDER BY position ASC LIMIT 1",
                    REQUEST_COLUMNS
                ),
                params![RequestState::Pending.to_db_string()],
                request_from_row,
            )
            .optional()?;

        let Some((mut request, errors)) = row else {
            return Ok(None);
        };
        request.error_messages = serde_json::from_str(&errors)?;

        self.conn.execute(
            "UPDATE requests SET state = ?1 WHERE unique_key = ?2",
            params![RequestState::InProgress.to_db_string(), request.unique_key],
        )?;

        Ok(Some(request))
    }

    fn mark_handled(&mut self, unique_key: &str) -> StorageResult<()> {
        self.expect_in_progress(unique_key, RequestState::Handled)?;
        self.conn.execute(
            "UPDATE requests SET state = ?1, handled_at = ?2 WHERE unique_key = ?3",
            params![
                RequestState::Handled.to_db_string(),
                Utc::now().to_rfc3339(),
                unique_key
            ],
        )?;
        Ok(())
    }

    fn reclaim(&mut self, request: &CrawlRequest) -> StorageResult<()> {
        self.expect_in_progress(&request.unique_key, RequestState::Pending)?;
        let position = self.back_position()?;
        let errors = serde_json::to_string(&request.error_messages)?;

        self.conn.execute(
            "UPDATE requests SET state = ?1, position = ?2, retry_count = ?3, error_messages = ?4
             WHERE unique_key = ?5",
            params![
                RequestState::Pending.to_db_string(),
                position,
                request.retry_count,
                errors,
                request.unique_key
            ],
        )?;
        Ok(())
    }

    fn mark_failed(&mut self, request: &CrawlRequest) -> StorageResult<()> {
        self.expect_in_progress(&request.unique_key, RequestState::Failed)?;
        let errors = serde_json::to_string(&request.error_messages)?;

        self.conn.execute(
            "UPDATE requests SET state = ?1, retry_count = ?2, error_messages = ?3, handled_at = ?4
             WHERE unique_key = ?5",
            params![
                RequestState::Failed.to_db_string(),
                request.retry_count,
                errors,
                Utc::now().to_rfc3339(),
                request.unique_key
            ],
        )?;
        Ok(())
    }

    fn is_finished(&self) -> StorageResult<bool> {
        let open: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM requests WHERE state IN (?1, ?2)",
            params![
                RequestState::Pending.to_db_string(),
                RequestState::InProgress.to_db_string()
            ],
            |row| row.get(0),
        )?;
        Ok(open == 0)
    }

    fn request_state(&self, unique_key: &str) -> StorageResult<Option<RequestState>> {
        let state: Option<String> = self
            .conn
            .query_row(
                "SELECT state FROM requests WHERE unique_key = ?1",
                params![unique_key],
                |row| row.get(0),
            )
            .optional()?;

        match state {
            Some(s) => RequestState::from_db_string(&s)
                .map(Some)
                .ok_or_else(|| StorageError::Database(format!("Unknown request state '{}'", s))),
            None => Ok(None),
        }
    }

    fn count_by_state(&self, state: RequestState) -> StorageResult<u64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM requests WHERE state = ?1",
            params![state.to_db_string()],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    fn recover_interrupted(&mut self) -> StorageResult<u64> {
        let recovered = self.conn.execute(
            "UPDATE requests SET state = ?1 WHERE state = ?2",
            params![
                RequestState::Pending.to_db_string(),
                RequestState::InProgress.to_db_string()
            ],
        )?;
        Ok(recovered as u64)
    }
}

impl KeyValueStore for SqliteStorage {
    fn get_value(&self, key: &str) -> StorageResult<Option<Vec<u8>>> {
        let value = self
            .conn
            .query_row(
                "SELECT value FROM key_value WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }

    fn set_value(&mut self, key: &str, value: &[u8], content_type: &str) -> StorageResult<()> {
        self.conn.execute(
            "INSERT INTO key_value (key, value, content_type, updated_at)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                content_type = excluded.content_type,
                updated_at = excluded.updated_at",
            params![key, value, content_type, Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }
}

impl Dataset for SqliteStorage {
    fn push_records(&mut self, records: &[serde_json::Value]) -> StorageResult<()> {
        let tx = self.conn.transaction()?;
        {
            let mut stmt =
                tx.prepare("INSERT INTO dataset (record, created_at) VALUES (?1, ?2)")?;
            let now = Utc::now().to_rfc3339();
            for record in records {
                stmt.execute(params![serde_json::to_string(record)?, now])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    fn records(&self) -> StorageResult<Vec<serde_json::Value>> {
        let mut stmt = self.conn.prepare("SELECT record FROM dataset ORDER BY id ASC")?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;

        let mut records = Vec::new();
        for row in rows {
            records.push(serde_json::from_str(&row?)?);
        }
        Ok(records)
    }

    fn record_count(&self) -> StorageResult<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM dataset", [], |row| row.get(0))?;
        Ok(count as u64)
    }
}
