//! SQLite-backed store.
//!
//! All keys live in one `kv` table ordered by their encoded bytes (SQLite
//! compares BLOBs with memcmp, which matches [`Key`] ordering). A single row
//! in `kv_meta` holds the last assigned versionstamp.

use super::backend::{
    AtomicBatch, CommitOutcome, Entry, KvStore, Mutation, PrefixScan, StoreError, StoreResult,
};
use super::keys::Key;
use rusqlite::{Connection, ErrorCode, OptionalExtension, TransactionBehavior, params};
use std::collections::VecDeque;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

/// Rows fetched per round trip while scanning a prefix.
const SCAN_PAGE_SIZE: usize = 128;

/// Store handle over one SQLite connection.
pub struct SqliteStore {
    path: Option<PathBuf>,
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open (creating if needed) the database at `path`.
    pub fn open(path: &Path, busy_timeout: Duration) -> StoreResult<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path).map_err(|e| {
            StoreError::Unavailable(format!("cannot open {}: {}", path.display(), e))
        })?;
        conn.busy_timeout(busy_timeout)?;
        let _mode: String = conn.query_row("PRAGMA journal_mode = WAL", [], |row| row.get(0))?;
        Self::init_schema(&conn)?;

        tracing::debug!(path = %path.display(), "opened sqlite store");
        Ok(Self {
            path: Some(path.to_path_buf()),
            conn: Mutex::new(conn),
        })
    }

    /// Open a private in-memory database.
    pub fn open_in_memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory()?;
        Self::init_schema(&conn)?;
        Ok(Self {
            path: None,
            conn: Mutex::new(conn),
        })
    }

    /// Initialize the SQLite schema.
    fn init_schema(conn: &Connection) -> StoreResult<()> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS kv (
                key BLOB PRIMARY KEY,
                value BLOB NOT NULL,
                versionstamp INTEGER NOT NULL
            ) WITHOUT ROWID;

            CREATE TABLE IF NOT EXISTS kv_meta (
                name TEXT PRIMARY KEY,
                value INTEGER NOT NULL
            );

            INSERT OR IGNORE INTO kv_meta (name, value) VALUES ('versionstamp', 0);
            "#,
        )?;
        Ok(())
    }

    /// Close the connection, surfacing any error SQLite reports on close.
    pub fn close(self) -> StoreResult<()> {
        let conn = self
            .conn
            .into_inner()
            .map_err(|_| StoreError::Unavailable("connection lock poisoned".to_string()))?;
        conn.close().map_err(|(_, e)| StoreError::Sqlite(e))
    }

    fn lock(&self) -> StoreResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| StoreError::Unavailable("connection lock poisoned".to_string()))
    }

    fn apply(conn: &mut Connection, batch: &AtomicBatch) -> StoreResult<CommitOutcome> {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        for check in batch.checks() {
            let current: Option<i64> = tx
                .query_row(
                    "SELECT versionstamp FROM kv WHERE key = ?1",
                    [check.key.as_bytes()],
                    |row| row.get(0),
                )
                .optional()?;
            if current.map(|v| v as u64) != check.versionstamp {
                tracing::debug!(key = %check.key, "versionstamp check failed");
                return Ok(CommitOutcome::Conflict);
            }
        }

        tx.execute(
            "UPDATE kv_meta SET value = value + 1 WHERE name = 'versionstamp'",
            [],
        )?;
        let versionstamp: i64 = tx.query_row(
            "SELECT value FROM kv_meta WHERE name = 'versionstamp'",
            [],
            |row| row.get(0),
        )?;

        for mutation in batch.mutations() {
            match mutation {
                Mutation::Put { key, value } => {
                    tx.execute(
                        "INSERT INTO kv (key, value, versionstamp) VALUES (?1, ?2, ?3)
                         ON CONFLICT(key) DO UPDATE SET
                             value = excluded.value,
                             versionstamp = excluded.versionstamp",
                        params![key.as_bytes(), value, versionstamp],
                    )?;
                }
                Mutation::Delete { key } => {
                    tx.execute("DELETE FROM kv WHERE key = ?1", [key.as_bytes()])?;
                }
            }
        }

        tx.commit()?;
        Ok(CommitOutcome::Committed {
            versionstamp: versionstamp as u64,
        })
    }
}

fn is_contention(err: &rusqlite::Error) -> bool {
    matches!(
        err.sqlite_error_code(),
        Some(ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked)
    )
}

impl KvStore for SqliteStore {
    fn get(&self, key: &Key) -> StoreResult<Option<Entry>> {
        let conn = self.lock()?;
        let row = conn
            .query_row(
                "SELECT value, versionstamp FROM kv WHERE key = ?1",
                [key.as_bytes()],
                |row| Ok((row.get::<_, Vec<u8>>(0)?, row.get::<_, i64>(1)?)),
            )
            .optional()?;

        Ok(row.map(|(value, versionstamp)| Entry {
            key: key.clone(),
            value,
            versionstamp: versionstamp as u64,
        }))
    }

    fn scan_prefix<'a>(&'a self, prefix: &Key) -> StoreResult<PrefixScan<'a>> {
        Ok(Box::new(SqliteScan {
            store: self,
            cursor: prefix.as_bytes().to_vec(),
            inclusive: true,
            end: prefix.prefix_end(),
            buffer: VecDeque::new(),
            exhausted: false,
        }))
    }

    fn commit(&self, batch: AtomicBatch) -> StoreResult<CommitOutcome> {
        let mut conn = self.lock()?;
        match Self::apply(&mut conn, &batch) {
            Err(StoreError::Sqlite(e)) if is_contention(&e) => {
                tracing::warn!(error = %e, "commit lost to a concurrent writer");
                Ok(CommitOutcome::Conflict)
            }
            other => other,
        }
    }

    fn location(&self) -> String {
        match &self.path {
            Some(path) => path.display().to_string(),
            None => ":memory:".to_string(),
        }
    }

    fn backend_type(&self) -> &'static str {
        "sqlite"
    }
}

/// Paged range scan over `[cursor, end)`.
struct SqliteScan<'a> {
    store: &'a SqliteStore,
    cursor: Vec<u8>,
    inclusive: bool,
    end: Vec<u8>,
    buffer: VecDeque<Entry>,
    exhausted: bool,
}

impl SqliteScan<'_> {
    fn fetch_page(&mut self) -> StoreResult<()> {
        let store = self.store;
        let conn = store.lock()?;
        let sql = if self.inclusive {
            "SELECT key, value, versionstamp FROM kv
             WHERE key >= ?1 AND key < ?2 ORDER BY key LIMIT ?3"
        } else {
            "SELECT key, value, versionstamp FROM kv
             WHERE key > ?1 AND key < ?2 ORDER BY key LIMIT ?3"
        };
        let mut stmt = conn.prepare_cached(sql)?;
        let rows = stmt.query_map(
            params![self.cursor, self.end, SCAN_PAGE_SIZE as i64],
            |row| {
                Ok(Entry {
                    key: Key::from_bytes(row.get(0)?),
                    value: row.get(1)?,
                    versionstamp: row.get::<_, i64>(2)? as u64,
                })
            },
        )?;

        let mut fetched = 0;
        for row in rows {
            self.buffer.push_back(row?);
            fetched += 1;
        }

        if fetched < SCAN_PAGE_SIZE {
            self.exhausted = true;
        }
        if let Some(last) = self.buffer.back() {
            self.cursor = last.key.as_bytes().to_vec();
            self.inclusive = false;
        }
        Ok(())
    }
}

impl Iterator for SqliteScan<'_> {
    type Item = StoreResult<Entry>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.buffer.is_empty() && !self.exhausted {
            if let Err(e) = self.fetch_page() {
                self.exhausted = true;
                return Some(Err(e));
            }
        }
        self.buffer.pop_front().map(Ok)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::keys::{project_index_key, todo_key, todo_prefix};
    use tempfile::TempDir;

    fn create_test_store() -> (TempDir, SqliteStore) {
        let temp_dir = TempDir::new().unwrap();
        let store =
            SqliteStore::open(&temp_dir.path().join("todos.db"), Duration::from_secs(1)).unwrap();
        (temp_dir, store)
    }

    fn put(store: &SqliteStore, key: Key, value: &str) -> CommitOutcome {
        let mut batch = AtomicBatch::new();
        batch.put(key, value.as_bytes().to_vec());
        store.commit(batch).unwrap()
    }

    #[test]
    fn test_put_then_get() {
        let (_temp, store) = create_test_store();
        let outcome = put(&store, todo_key("a"), "hello");
        assert!(outcome.is_committed());

        let entry = store.get(&todo_key("a")).unwrap().unwrap();
        assert_eq!(entry.value, b"hello");
        assert!(store.get(&todo_key("b")).unwrap().is_none());
    }

    #[test]
    fn test_versionstamps_increase() {
        let (_temp, store) = create_test_store();
        put(&store, todo_key("a"), "1");
        let first = store.get(&todo_key("a")).unwrap().unwrap().versionstamp;
        put(&store, todo_key("a"), "2");
        let second = store.get(&todo_key("a")).unwrap().unwrap().versionstamp;
        assert!(second > first);
    }

    #[test]
    fn test_scan_prefix_is_ordered_and_bounded() {
        let (_temp, store) = create_test_store();
        put(&store, todo_key("b"), "b");
        put(&store, todo_key("a"), "a");
        put(&store, project_index_key("home").child("a"), "\"a\"");

        let keys: Vec<Key> = store
            .scan_prefix(&todo_prefix())
            .unwrap()
            .map(|e| e.unwrap().key)
            .collect();
        assert_eq!(keys, vec![todo_key("a"), todo_key("b")]);
    }

    #[test]
    fn test_scan_prefix_pages_through_large_ranges() {
        let (_temp, store) = create_test_store();
        let mut batch = AtomicBatch::new();
        for i in 0..(SCAN_PAGE_SIZE * 2 + 5) {
            batch.put(todo_key(&format!("{:04}", i)), vec![1]);
        }
        store.commit(batch).unwrap();

        let keys: Vec<Key> = store
            .scan_prefix(&todo_prefix())
            .unwrap()
            .map(|e| e.unwrap().key)
            .collect();
        assert_eq!(keys.len(), SCAN_PAGE_SIZE * 2 + 5);
        assert!(keys.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_check_conflict_applies_nothing() {
        let (_temp, store) = create_test_store();
        put(&store, todo_key("a"), "1");
        let stamp = store.get(&todo_key("a")).unwrap().unwrap().versionstamp;
        put(&store, todo_key("a"), "2");

        let mut batch = AtomicBatch::new();
        batch
            .check(todo_key("a"), Some(stamp))
            .put(todo_key("a"), b"3".to_vec())
            .put(todo_key("z"), b"z".to_vec());
        assert_eq!(store.commit(batch).unwrap(), CommitOutcome::Conflict);

        assert_eq!(store.get(&todo_key("a")).unwrap().unwrap().value, b"2");
        assert!(store.get(&todo_key("z")).unwrap().is_none());
    }

    #[test]
    fn test_absent_check_guards_creation() {
        let (_temp, store) = create_test_store();
        let mut batch = AtomicBatch::new();
        batch.check(todo_key("a"), None).put(todo_key("a"), vec![1]);
        assert!(store.commit(batch.clone()).unwrap().is_committed());
        assert_eq!(store.commit(batch).unwrap(), CommitOutcome::Conflict);
    }

    #[test]
    fn test_delete_then_put_same_key() {
        let (_temp, store) = create_test_store();
        put(&store, todo_key("a"), "1");
        let mut batch = AtomicBatch::new();
        batch.delete(todo_key("a")).put(todo_key("a"), b"2".to_vec());
        store.commit(batch).unwrap();
        assert_eq!(store.get(&todo_key("a")).unwrap().unwrap().value, b"2");
    }

    #[test]
    fn test_data_survives_reopen() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join("todos.db");
        let store = SqliteStore::open(&path, Duration::from_secs(1)).unwrap();
        put(&store, todo_key("a"), "kept");
        store.close().unwrap();

        let reopened = SqliteStore::open(&path, Duration::from_secs(1)).unwrap();
        assert_eq!(reopened.get(&todo_key("a")).unwrap().unwrap().value, b"kept");
        assert_eq!(reopened.location(), path.display().to_string());
    }

    #[test]
    fn test_locked_database_reports_conflict() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("todos.db");
        let store = SqliteStore::open(&path, Duration::ZERO).unwrap();

        let holder = Connection::open(&path).unwrap();
        holder.execute_batch("BEGIN IMMEDIATE").unwrap();

        let mut batch = AtomicBatch::new();
        batch.put(todo_key("a"), vec![1]);
        assert_eq!(store.commit(batch).unwrap(), CommitOutcome::Conflict);

        holder.execute_batch("ROLLBACK").unwrap();
        assert!(store.get(&todo_key("a")).unwrap().is_none());
    }
}
