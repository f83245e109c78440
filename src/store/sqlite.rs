//! `rusqlite`-backed [`ResponseStore`], grounded on the pooled-connection /
//! `spawn_blocking` pattern used for the outbox repository in the example pack:
//! blocking SQLite calls never run on the async executor directly.

use super::ResponseStore;
use crate::error::SyncError;
use crate::record::{ResponseRecord, ResponseStatus};
use async_trait::async_trait;
use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{params, Connection, OpenFlags, OptionalExtension, Row};
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::task;

/// Shared-cache in-memory databases are named and process-global: two pools
/// opened with the identical URI would see each other's rows. Each
/// `open_in_memory` call gets its own name so stores stay isolated from one
/// another while still sharing state across the connections of one pool.
static MEMORY_DB_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Applied to every connection the pool creates (`SqliteConnectionManager::with_init`),
/// the way PulseArc's `apply_connection_pragmas` is wired through its pool's `with_init`
/// callback: WAL so readers don't block writers, and a non-zero busy timeout so a
/// writer blocked behind another writer's transaction retries instead of returning
/// `SQLITE_BUSY` immediately (rollback-journal's default is an exclusive lock with a
/// 0ms busy timeout).
fn apply_connection_pragmas(conn: &mut Connection) -> rusqlite::Result<()> {
    conn.execute_batch("PRAGMA journal_mode=WAL;")?;
    conn.busy_timeout(Duration::from_secs(5))?;
    Ok(())
}

const SCHEMA_SQL: &str = "
CREATE TABLE IF NOT EXISTS response_records (
    id              TEXT PRIMARY KEY,
    farmer_id       TEXT NOT NULL,
    created_at      INTEGER NOT NULL,
    answers_json    TEXT NOT NULL,
    status          TEXT NOT NULL,
    retry_count     INTEGER NOT NULL,
    last_attempt_at INTEGER,
    media_paths     TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_response_records_pending
    ON response_records (status, created_at, id);
";

/// Pooled SQLite implementation of [`ResponseStore`].
pub struct SqliteResponseStore {
    pool: Pool<SqliteConnectionManager>,
}

impl SqliteResponseStore {
    /// Opens (creating if absent) the database at `path` and applies the schema.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, SyncError> {
        let manager = SqliteConnectionManager::file(path.as_ref()).with_init(apply_connection_pragmas);
        let pool = Pool::new(manager)?;
        let conn = pool.get()?;
        conn.execute_batch(SCHEMA_SQL)?;
        Ok(Self { pool })
    }

    /// Opens an in-memory database; convenient for tests that still want to
    /// exercise real SQL rather than [`super::InMemoryResponseStore`]'s HashMap.
    ///
    /// Uses a shared-cache URI rather than `SqliteConnectionManager::memory()`:
    /// a plain `:memory:` database is private to the connection that opened it,
    /// so as soon as the pool hands out a second connection (its default
    /// `max_size` is 10) a write on one connection would be invisible to a read
    /// on another, silently breaking the store's durability contract. A shared
    /// cache gives every pooled connection the same in-memory database.
    pub fn open_in_memory() -> Result<Self, SyncError> {
        let id = MEMORY_DB_COUNTER.fetch_add(1, Ordering::Relaxed);
        let uri = format!("file:survey_sync_engine_mem_{id}?mode=memory&cache=shared");
        let manager = SqliteConnectionManager::file(uri)
            .with_flags(OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_CREATE | OpenFlags::SQLITE_OPEN_URI)
            .with_init(apply_connection_pragmas);
        let pool = Pool::new(manager)?;
        let conn = pool.get()?;
        conn.execute_batch(SCHEMA_SQL)?;
        Ok(Self { pool })
    }

    fn insert_or_replace_sync(conn: &Connection, record: &ResponseRecord) -> Result<(), SyncError> {
        let media_json = serde_json::to_string(&record.media_paths)
            .map_err(|e| SyncError::new(format!("encoding media_paths: {e}")))?;
        conn.execute(
            "INSERT INTO response_records
                (id, farmer_id, created_at, answers_json, status, retry_count, last_attempt_at, media_paths)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
             ON CONFLICT(id) DO UPDATE SET
                status = excluded.status,
                retry_count = excluded.retry_count,
                last_attempt_at = excluded.last_attempt_at,
                media_paths = excluded.media_paths",
            params![
                record.id,
                record.farmer_id,
                record.created_at,
                record.answers_json,
                record.status.as_str(),
                record.retry_count,
                record.last_attempt_at,
                media_json,
            ],
        )?;
        Ok(())
    }

    fn get_by_id_sync(conn: &Connection, id: &str) -> Result<Option<ResponseRecord>, SyncError> {
        conn.query_row(
            "SELECT id, farmer_id, created_at, answers_json, status, retry_count, last_attempt_at, media_paths
             FROM response_records WHERE id = ?1",
            params![id],
            map_row,
        )
        .optional()
        .map_err(SyncError::from)
    }

    fn get_pending_sync(conn: &Connection) -> Result<Vec<ResponseRecord>, SyncError> {
        let mut stmt = conn.prepare(
            "SELECT id, farmer_id, created_at, answers_json, status, retry_count, last_attempt_at, media_paths
             FROM response_records
             WHERE status IN ('PENDING', 'FAILED_RETRYABLE')
             ORDER BY created_at ASC, id ASC",
        )?;
        let rows = stmt.query_map(params![], map_row)?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }

    fn update_status_sync(
        conn: &Connection,
        id: &str,
        status: ResponseStatus,
        retry_count: u32,
        last_attempt_at: i64,
    ) -> Result<(), SyncError> {
        conn.execute(
            "UPDATE response_records SET status = ?1, retry_count = ?2, last_attempt_at = ?3 WHERE id = ?4",
            params![status.as_str(), retry_count, last_attempt_at, id],
        )?;
        Ok(())
    }

    fn mark_synced_sync(conn: &Connection, id: &str) -> Result<(), SyncError> {
        conn.execute(
            "UPDATE response_records SET status = ?1, media_paths = '[]' WHERE id = ?2",
            params![ResponseStatus::Synced.as_str(), id],
        )?;
        Ok(())
    }

    fn delete_synced_before_sync(conn: &Connection, ts: i64) -> Result<(), SyncError> {
        conn.execute(
            "DELETE FROM response_records WHERE status = ?1 AND created_at < ?2",
            params![ResponseStatus::Synced.as_str(), ts],
        )?;
        Ok(())
    }

    fn count_sync(conn: &Connection) -> Result<usize, SyncError> {
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM response_records", params![], |r| r.get(0))?;
        Ok(count as usize)
    }
}

fn map_row(row: &Row<'_>) -> rusqlite::Result<ResponseRecord> {
    let status_raw: String = row.get(4)?;
    let status = ResponseStatus::parse(&status_raw).unwrap_or(ResponseStatus::Pending);
    let media_json: String = row.get(7)?;
    let media_paths: Vec<String> = serde_json::from_str(&media_json).unwrap_or_default();

    Ok(ResponseRecord {
        id: row.get(0)?,
        farmer_id: row.get(1)?,
        created_at: row.get(2)?,
        answers_json: row.get(3)?,
        status,
        retry_count: row.get(5)?,
        last_attempt_at: row.get(6)?,
        media_paths,
    })
}

fn join_error(err: task::JoinError) -> SyncError {
    SyncError::new(format!("response store task panicked: {err}"))
}

#[async_trait]
impl ResponseStore for SqliteResponseStore {
    async fn insert_or_replace(&self, record: ResponseRecord) -> Result<(), SyncError> {
        let pool = self.pool.clone();
        task::spawn_blocking(move || {
            let conn = pool.get()?;
            Self::insert_or_replace_sync(&conn, &record)
        })
        .await
        .map_err(join_error)?
    }

    async fn get_by_id(&self, id: &str) -> Result<Option<ResponseRecord>, SyncError> {
        let pool = self.pool.clone();
        let id = id.to_string();
        task::spawn_blocking(move || {
            let conn = pool.get()?;
            Self::get_by_id_sync(&conn, &id)
        })
        .await
        .map_err(join_error)?
    }

    async fn get_pending(&self) -> Result<Vec<ResponseRecord>, SyncError> {
        let pool = self.pool.clone();
        task::spawn_blocking(move || {
            let conn = pool.get()?;
            Self::get_pending_sync(&conn)
        })
        .await
        .map_err(join_error)?
    }

    async fn update_status(
        &self,
        id: &str,
        status: ResponseStatus,
        retry_count: u32,
        last_attempt_at: i64,
    ) -> Result<(), SyncError> {
        let pool = self.pool.clone();
        let id = id.to_string();
        task::spawn_blocking(move || {
            let conn = pool.get()?;
            Self::update_status_sync(&conn, &id, status, retry_count, last_attempt_at)
        })
        .await
        .map_err(join_error)?
    }

    async fn mark_synced(&self, id: &str) -> Result<(), SyncError> {
        let pool = self.pool.clone();
        let id = id.to_string();
        task::spawn_blocking(move || {
            let conn = pool.get()?;
            Self::mark_synced_sync(&conn, &id)
        })
        .await
        .map_err(join_error)?
    }

    async fn delete_synced_before(&self, ts: i64) -> Result<(), SyncError> {
        let pool = self.pool.clone();
        task::spawn_blocking(move || {
            let conn = pool.get()?;
            Self::delete_synced_before_sync(&conn, ts)
        })
        .await
        .map_err(join_error)?
    }

    async fn count(&self) -> Result<usize, SyncError> {
        let pool = self.pool.clone();
        task::spawn_blocking(move || {
            let conn = pool.get()?;
            Self::count_sync(&conn)
        })
        .await
        .map_err(join_error)?
    }
}
