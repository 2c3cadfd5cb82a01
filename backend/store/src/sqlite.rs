/// SQLite-backed durable store.
///
/// One connection behind an async mutex serves the `files`, `users` and
/// `broadcasts` tables. Timestamps are stored as Unix milliseconds so that
/// listing order is a plain integer sort.
use std::path::Path;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, ErrorCode, OptionalExtension};
use tokio::sync::Mutex;
use tracing::{debug, info};

use linkdrop_core::{Code, ContentKind, ContentReference, RecipientId, RecipientRecord};

use crate::store::{BroadcastLog, RecipientStore, ReferenceStore, StoreError};
use crate::types::BroadcastCheckpoint;

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS files (
        code        TEXT PRIMARY KEY,
        kind        TEXT NOT NULL,
        external_id TEXT NOT NULL,
        name        TEXT NOT NULL,
        caption     TEXT,
        downloads   INTEGER NOT NULL DEFAULT 0,
        created_at  INTEGER NOT NULL
    );
    CREATE INDEX IF NOT EXISTS idx_files_created ON files(created_at);
    CREATE TABLE IF NOT EXISTS users (
        id          INTEGER PRIMARY KEY,
        name        TEXT NOT NULL,
        username    TEXT,
        first_seen  INTEGER NOT NULL,
        last_seen   INTEGER NOT NULL
    );
    CREATE TABLE IF NOT EXISTS broadcasts (
        id          TEXT PRIMARY KEY,
        body        TEXT NOT NULL,
        updated_at  INTEGER NOT NULL
    );";

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Create or open a database at the given path.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let conn = Connection::open(path.as_ref()).map_err(backend)?;
        conn.execute_batch("PRAGMA journal_mode=WAL;").map_err(backend)?;
        conn.execute_batch(SCHEMA).map_err(backend)?;
        info!(path = ?path.as_ref(), "SqliteStore opened");
        Ok(Self { conn: Mutex::new(conn) })
    }

    /// Open an in-memory database (for tests).
    pub fn in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory().map_err(backend)?;
        conn.execute_batch(SCHEMA).map_err(backend)?;
        Ok(Self { conn: Mutex::new(conn) })
    }
}

#[async_trait]
impl ReferenceStore for SqliteStore {
    async fn insert(&self, reference: &ContentReference) -> Result<(), StoreError> {
        let conn = self.conn.lock().await;
        conn.execute(
            "INSERT INTO files (code, kind, external_id, name, caption, downloads, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                reference.code.as_str(),
                reference.kind.as_str(),
                reference.external_id,
                reference.display_name,
                reference.caption,
                reference.download_count as i64,
                reference.created_at.timestamp_millis(),
            ],
        )
        .map_err(|e| write_error(e, reference.code.as_str()))?;
        debug!(code = %reference.code, kind = %reference.kind, "Inserted file");
        Ok(())
    }

    async fn get(&self, code: &Code) -> Result<Option<ContentReference>, StoreError> {
        let conn = self.conn.lock().await;
        conn.query_row(
            "SELECT code, kind, external_id, name, caption, downloads, created_at
             FROM files WHERE code = ?1",
            params![code.as_str()],
            row_to_reference,
        )
        .optional()
        .map_err(read_error)
    }

    async fn increment_downloads(&self, code: &Code) -> Result<Option<u64>, StoreError> {
        let conn = self.conn.lock().await;
        let count = conn
            .query_row(
                "UPDATE files SET downloads = downloads + 1 WHERE code = ?1 RETURNING downloads",
                params![code.as_str()],
                |row| row.get::<_, i64>(0),
            )
            .optional()
            .map_err(backend)?;
        Ok(count.map(|c| c as u64))
    }

    async fn delete(&self, code: &Code) -> Result<Option<ContentReference>, StoreError> {
        let conn = self.conn.lock().await;
        conn.query_row(
            "DELETE FROM files WHERE code = ?1
             RETURNING code, kind, external_id, name, caption, downloads, created_at",
            params![code.as_str()],
            row_to_reference,
        )
        .optional()
        .map_err(read_error)
    }

    async fn list(&self) -> Result<Vec<ContentReference>, StoreError> {
        let conn = self.conn.lock().await;
        let mut stmt = conn
            .prepare(
                "SELECT code, kind, external_id, name, caption, downloads, created_at
                 FROM files ORDER BY created_at DESC, rowid DESC",
            )
            .map_err(backend)?;
        let rows = stmt
            .query_map([], row_to_reference)
            .map_err(backend)?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(read_error)?;
        Ok(rows)
    }
}

#[async_trait]
impl RecipientStore for SqliteStore {
    async fn upsert(&self, record: &RecipientRecord) -> Result<(), StoreError> {
        let conn = self.conn.lock().await;
        conn.execute(
            "INSERT INTO users (id, name, username, first_seen, last_seen)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(id) DO UPDATE SET
               name = excluded.name,
               username = excluded.username,
               last_seen = excluded.last_seen",
            params![
                record.id.0,
                record.display_name,
                record.username,
                record.first_seen.timestamp_millis(),
                record.last_seen.timestamp_millis(),
            ],
        )
        .map_err(backend)?;
        Ok(())
    }

    async fn get(&self, id: RecipientId) -> Result<Option<RecipientRecord>, StoreError> {
        let conn = self.conn.lock().await;
        conn.query_row(
            "SELECT id, name, username, first_seen, last_seen FROM users WHERE id = ?1",
            params![id.0],
            |row| {
                Ok(RecipientRecord {
                    id: RecipientId(row.get(0)?),
                    display_name: row.get(1)?,
                    username: row.get(2)?,
                    first_seen: millis_to_utc(row.get(3)?, 3)?,
                    last_seen: millis_to_utc(row.get(4)?, 4)?,
                })
            },
        )
        .optional()
        .map_err(read_error)
    }

    async fn ids(&self) -> Result<Vec<RecipientId>, StoreError> {
        let conn = self.conn.lock().await;
        let mut stmt = conn
            .prepare("SELECT id FROM users ORDER BY id ASC")
            .map_err(backend)?;
        let ids = stmt
            .query_map([], |row| row.get::<_, i64>(0).map(RecipientId))
            .map_err(backend)?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(backend)?;
        Ok(ids)
    }

    async fn count(&self) -> Result<u64, StoreError> {
        let conn = self.conn.lock().await;
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))
            .map_err(backend)?;
        Ok(count as u64)
    }
}

#[async_trait]
impl BroadcastLog for SqliteStore {
    async fn save(&self, checkpoint: &BroadcastCheckpoint) -> Result<(), StoreError> {
        let body =
            serde_json::to_string(checkpoint).map_err(|e| StoreError::Backend(e.to_string()))?;
        let conn = self.conn.lock().await;
        conn.execute(
            "INSERT INTO broadcasts (id, body, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(id) DO UPDATE SET body = excluded.body, updated_at = excluded.updated_at",
            params![checkpoint.id, body, checkpoint.updated_at.timestamp_millis()],
        )
        .map_err(backend)?;
        Ok(())
    }

    async fn pending(&self) -> Result<Option<BroadcastCheckpoint>, StoreError> {
        let conn = self.conn.lock().await;
        let body: Option<String> = conn
            .query_row(
                "SELECT body FROM broadcasts ORDER BY updated_at DESC LIMIT 1",
                [],
                |row| row.get(0),
            )
            .optional()
            .map_err(backend)?;
        body.map(|b| serde_json::from_str(&b).map_err(|e| StoreError::Corrupt(e.to_string())))
            .transpose()
    }

    async fn clear(&self, id: &str) -> Result<(), StoreError> {
        let conn = self.conn.lock().await;
        conn.execute("DELETE FROM broadcasts WHERE id = ?1", params![id])
            .map_err(backend)?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Row decoding and error mapping
// ---------------------------------------------------------------------------

fn row_to_reference(row: &rusqlite::Row) -> rusqlite::Result<ContentReference> {
    let code: String = row.get(0)?;
    let kind: String = row.get(1)?;
    let kind: ContentKind = kind
        .parse()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(1, Type::Text, Box::new(e)))?;
    let code = Code::parse(&code)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(0, Type::Text, Box::new(e)))?;
    Ok(ContentReference {
        code,
        kind,
        external_id: row.get(2)?,
        display_name: row.get(3)?,
        caption: row.get(4)?,
        download_count: row.get::<_, i64>(5)?.max(0) as u64,
        created_at: millis_to_utc(row.get(6)?, 6)?,
    })
}

fn millis_to_utc(millis: i64, column: usize) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::from_timestamp_millis(millis).ok_or(rusqlite::Error::IntegralValueOutOfRange(
        column, millis,
    ))
}

fn backend(err: rusqlite::Error) -> StoreError {
    StoreError::Backend(err.to_string())
}

fn read_error(err: rusqlite::Error) -> StoreError {
    match err {
        rusqlite::Error::FromSqlConversionFailure(..)
        | rusqlite::Error::IntegralValueOutOfRange(..) => StoreError::Corrupt(err.to_string()),
        other => backend(other),
    }
}

fn write_error(err: rusqlite::Error, key: &str) -> StoreError {
    match &err {
        rusqlite::Error::SqliteFailure(e, _) if e.code == ErrorCode::ConstraintViolation => {
            StoreError::Conflict(key.to_string())
        }
        _ => backend(err),
    }
}
