//! SQLite backend: schema, pragmas, and migrations for the file cache.

use crate::model::types::FileItem;
use anyhow::{Context, Result, anyhow};
use parking_lot::Mutex;
use rusqlite::{Connection, OptionalExtension, Row, params};
use std::fs;
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

const SCHEMA_VERSION: i64 = 1;

const MIGRATION_V1: &str = r#"
CREATE TABLE IF NOT EXISTS files (
    id INTEGER PRIMARY KEY,
    account TEXT NOT NULL,
    remote_path TEXT NOT NULL,
    remote_id TEXT,
    mime_type TEXT NOT NULL,
    size INTEGER NOT NULL,
    modified_ms INTEGER NOT NULL,
    etag TEXT,
    updated_at INTEGER NOT NULL,
    UNIQUE(account, remote_path)
);

CREATE INDEX IF NOT EXISTS idx_files_account_modified
    ON files(account, modified_ms DESC);
"#;

/// Per-account file cache the list adapter writes merged search results into.
///
/// The connection sits behind a lock so merges can run off the UI thread.
pub struct FileStore {
    conn: Mutex<Connection>,
    account: String,
}

impl FileStore {
    pub fn open(path: &Path, account: impl Into<String>) -> Result<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("creating db directory {}", parent.display()))?;
        }

        let conn = Connection::open(path)
            .with_context(|| format!("opening sqlite db at {}", path.display()))?;
        Self::init(conn, account.into(), true)
    }

    pub fn open_in_memory(account: impl Into<String>) -> Result<Self> {
        let conn = Connection::open_in_memory().context("opening in-memory sqlite db")?;
        Self::init(conn, account.into(), false)
    }

    fn init(mut conn: Connection, account: String, on_disk: bool) -> Result<Self> {
        if on_disk {
            apply_pragmas(&mut conn)?;
        }
        init_meta(&mut conn)?;
        migrate(&mut conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
            account,
        })
    }

    pub fn account(&self) -> &str {
        &self.account
    }

    /// Inserts or refreshes every item in one transaction. Returns rows written.
    pub fn save_files(&self, items: &[FileItem]) -> Result<usize> {
        let now = now_millis();
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare_cached(
                "INSERT INTO files(account, remote_path, remote_id, mime_type, size, modified_ms, etag, updated_at)
                 VALUES(?,?,?,?,?,?,?,?)
                 ON CONFLICT(account, remote_path) DO UPDATE SET
                    remote_id=excluded.remote_id, mime_type=excluded.mime_type, size=excluded.size,
                    modified_ms=excluded.modified_ms, etag=excluded.etag, updated_at=excluded.updated_at",
            )?;
            for item in items {
                stmt.execute(params![
                    &self.account,
                    &item.remote_path,
                    &item.remote_id,
                    &item.mime_type,
                    item.size as i64,
                    item.modified_ms,
                    &item.etag,
                    now
                ])
                .with_context(|| format!("saving {}", item.remote_path))?;
            }
        }
        tx.commit()?;
        tracing::debug!(account = %self.account, rows = items.len(), "file_store_save");
        Ok(items.len())
    }

    pub fn file_by_path(&self, remote_path: &str) -> Result<Option<FileItem>> {
        let conn = self.conn.lock();
        conn.query_row(
            "SELECT remote_path, remote_id, mime_type, size, modified_ms, etag
             FROM files WHERE account = ? AND remote_path = ?",
            params![&self.account, remote_path],
            row_to_item,
        )
        .optional()
        .with_context(|| format!("looking up {remote_path}"))
    }

    /// Newest-first listing of cached files.
    pub fn recent_files(&self, limit: usize) -> Result<Vec<FileItem>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT remote_path, remote_id, mime_type, size, modified_ms, etag
             FROM files WHERE account = ? ORDER BY modified_ms DESC LIMIT ?",
        )?;
        let rows = stmt.query_map(params![&self.account, limit as i64], row_to_item)?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }

    pub fn count(&self) -> Result<usize> {
        let conn = self.conn.lock();
        let n: i64 = conn.query_row(
            "SELECT COUNT(*) FROM files WHERE account = ?",
            params![&self.account],
            |row| row.get(0),
        )?;
        Ok(n as usize)
    }
}

fn row_to_item(row: &Row<'_>) -> rusqlite::Result<FileItem> {
    Ok(FileItem {
        remote_path: row.get(0)?,
        remote_id: row.get(1)?,
        mime_type: row.get(2)?,
        size: row.get::<_, i64>(3)? as u64,
        modified_ms: row.get(4)?,
        etag: row.get(5)?,
    })
}

fn apply_pragmas(conn: &mut Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        PRAGMA journal_mode = WAL;
        PRAGMA synchronous = NORMAL;
        PRAGMA temp_store = MEMORY;
        "#,
    )?;
    Ok(())
}

fn init_meta(conn: &mut Connection) -> Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS meta (key TEXT PRIMARY KEY, value TEXT NOT NULL)",
        [],
    )?;
    conn.execute(
        "INSERT OR IGNORE INTO meta(key, value) VALUES('schema_version', '0')",
        [],
    )?;
    Ok(())
}

fn migrate(conn: &mut Connection) -> Result<()> {
    let current: i64 = conn
        .query_row(
            "SELECT value FROM meta WHERE key = 'schema_version'",
            [],
            |row| row.get::<_, String>(0).map(|s| s.parse().unwrap_or(0)),
        )
        .optional()?
        .unwrap_or(0);

    match current {
        0 => {
            conn.execute_batch(MIGRATION_V1)?;
            conn.execute(
                "UPDATE meta SET value = ? WHERE key = 'schema_version'",
                params![SCHEMA_VERSION.to_string()],
            )?;
        }
        v if v == SCHEMA_VERSION => {}
        v => return Err(anyhow!("unsupported schema version {}", v)),
    }

    Ok(())
}

fn now_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as i64
}
