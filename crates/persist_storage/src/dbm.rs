//! Key-value (DBM style) record store.

use crate::backend::{check_delimited, LockMode, RecordLayout, RecordStore, Row, StoreKind};
use crate::error::{StorageError, StorageResult};
use crate::lock::LockFile;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::trace;

/// How long a connection waits on the medium's own page locks.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

const CREATE_TABLE: &str =
    "CREATE TABLE IF NOT EXISTS records (key TEXT PRIMARY KEY NOT NULL, value TEXT NOT NULL) WITHOUT ROWID";

/// A record store kept in an embedded key-value database.
///
/// The key of an entry is the identity tuple joined by the delimiter; the
/// value is the remaining persisted fields joined the same way.
///
/// The medium is a single SQLite file holding one `records` table. Each
/// store owns its own connection, so any number of stores, in this process
/// or others, may read the data side by side under the shared token lock.
/// An open store runs inside one transaction: `close` commits it and
/// `discard` rolls it back.
#[derive(Debug)]
pub struct DbmStore {
    path: PathBuf,
    delimiter: char,
    layout: Option<RecordLayout>,
    lock: LockFile,
    conn: Option<Connection>,
}

impl DbmStore {
    /// Delimiter used when none is configured.
    pub const DEFAULT_DELIMITER: char = '\u{1f}';

    /// Creates a store over the database at `path`. Nothing is touched
    /// until [`RecordStore::open`].
    #[must_use]
    pub fn new(path: &Path, delimiter: char) -> Self {
        Self {
            path: path.to_path_buf(),
            delimiter,
            layout: None,
            lock: LockFile::for_location(path),
            conn: None,
        }
    }

    /// Returns the path of the database.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the path of the lock token file.
    #[must_use]
    pub fn lock_path(&self) -> &Path {
        self.lock.path()
    }

    fn layout(&self) -> StorageResult<&RecordLayout> {
        self.layout.as_ref().ok_or(StorageError::Unbound)
    }

    fn conn(&self) -> StorageResult<&Connection> {
        self.conn.as_ref().ok_or(StorageError::Closed)
    }

    fn encode(&self, fields: &[String]) -> String {
        fields.join(&self.delimiter.to_string())
    }

    fn decode(&self, text: &str, expected: usize) -> StorageResult<Vec<String>> {
        if expected == 0 {
            return if text.is_empty() {
                Ok(Vec::new())
            } else {
                Err(StorageError::Corrupted(format!(
                    "expected no value fields, found {text:?}"
                )))
            };
        }
        let fields: Vec<String> = text.split(self.delimiter).map(str::to_string).collect();
        if fields.len() == expected {
            Ok(fields)
        } else {
            Err(StorageError::Corrupted(format!(
                "entry has {} fields, expected {expected}",
                fields.len()
            )))
        }
    }

    fn row_from(&self, key: &str, value: &str) -> StorageResult<Row> {
        let layout = self.layout()?;
        let key_width = layout.key_columns().len();
        let key = self.decode(key, key_width)?;
        let rest = self.decode(value, layout.width() - key_width)?;
        layout.join(key, rest)
    }

    /// Ends the open transaction with `statement` and drops the
    /// connection. The store is detached even when the statement fails.
    fn finish(&mut self, statement: &str) -> StorageResult<()> {
        let Some(conn) = self.conn.take() else {
            return Ok(());
        };
        let ended = conn.execute_batch(statement);
        let closed = conn.close().map_err(|(_, e)| e);
        trace!(path = %self.path.display(), statement, "dbm store detached");
        ended?;
        closed?;
        Ok(())
    }
}

impl RecordStore for DbmStore {
    fn kind(&self) -> StoreKind {
        StoreKind::Dbm
    }

    fn location(&self) -> Option<&Path> {
        Some(&self.path)
    }

    fn bind_layout(&mut self, layout: RecordLayout) {
        self.layout = Some(layout);
    }

    fn open(&mut self) -> StorageResult<()> {
        if self.conn.is_some() {
            return Ok(());
        }
        let conn = Connection::open(&self.path)?;
        conn.busy_timeout(BUSY_TIMEOUT)?;

        // Only a fresh database writes its schema, so readers never
        // contend for the write lock.
        let created: bool = conn.query_row(
            "SELECT EXISTS (SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = 'records')",
            [],
            |row| row.get(0),
        )?;
        if !created {
            conn.execute_batch(CREATE_TABLE)?;
        }

        let begin = match self.lock.mode() {
            Some(LockMode::Exclusive) => "BEGIN IMMEDIATE",
            _ => "BEGIN",
        };
        conn.execute_batch(begin)?;
        trace!(path = %self.path.display(), begin, "dbm store attached");
        self.conn = Some(conn);
        Ok(())
    }

    fn close(&mut self) -> StorageResult<()> {
        self.finish("COMMIT")
    }

    fn discard(&mut self) -> StorageResult<()> {
        self.finish("ROLLBACK")
    }

    fn is_open(&self) -> bool {
        self.conn.is_some()
    }

    fn lock_shared(&mut self) -> StorageResult<()> {
        self.lock.acquire(LockMode::Shared)
    }

    fn lock_exclusive(&mut self) -> StorageResult<()> {
        self.lock.acquire(LockMode::Exclusive)
    }

    fn unlock(&mut self) -> StorageResult<()> {
        self.lock.release()
    }

    fn get(&self, key: &[String]) -> StorageResult<Option<Row>> {
        let key = self.encode(key);
        let value: Option<String> = self
            .conn()?
            .query_row(
                "SELECT value FROM records WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()?;
        value.map(|value| self.row_from(&key, &value)).transpose()
    }

    fn put(&mut self, row: Row) -> StorageResult<()> {
        let layout = self.layout()?;
        layout.check_width(&row)?;
        check_delimited(&row, self.delimiter)?;
        let (key, rest) = layout.split(&row);

        self.conn()?.execute(
            "INSERT OR REPLACE INTO records (key, value) VALUES (?1, ?2)",
            params![self.encode(&key), self.encode(&rest)],
        )?;
        Ok(())
    }

    fn delete(&mut self, key: &[String]) -> StorageResult<bool> {
        let removed = self
            .conn()?
            .execute("DELETE FROM records WHERE key = ?1", params![self.encode(key)])?;
        Ok(removed > 0)
    }

    fn scan(&self) -> StorageResult<Vec<Row>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare("SELECT key, value FROM records ORDER BY key")?;
        let entries = stmt
            .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))?
            .collect::<Result<Vec<_>, _>>()?;
        entries
            .iter()
            .map(|(key, value)| self.row_from(key, value))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn row(fields: &[&str]) -> Row {
        fields.iter().map(|s| s.to_string()).collect()
    }

    fn store_at(path: &Path) -> DbmStore {
        let mut store = DbmStore::new(path, ':');
        store.bind_layout(RecordLayout::new(vec![0, 1], 3).unwrap());
        store
    }

    #[test]
    fn dbm_put_get_across_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("people.db");

        {
            let mut store = store_at(&path);
            store.open().unwrap();
            store.put(row(&["Flintstone", "Fred", "555-1000"])).unwrap();
            store.close().unwrap();
        }

        let mut store = store_at(&path);
        store.open().unwrap();
        assert_eq!(
            store.get(&row(&["Flintstone", "Fred"])).unwrap(),
            Some(row(&["Flintstone", "Fred", "555-1000"]))
        );
        assert_eq!(store.get(&row(&["Flintstone", "Wilma"])).unwrap(), None);
    }

    #[test]
    fn dbm_interleaves_key_columns() {
        let dir = tempdir().unwrap();
        let mut store = DbmStore::new(&dir.path().join("db"), ':');
        store.bind_layout(RecordLayout::new(vec![1], 3).unwrap());
        store.open().unwrap();
        store.put(row(&["x", "key", "z"])).unwrap();
        assert_eq!(store.scan().unwrap(), vec![row(&["x", "key", "z"])]);
    }

    #[test]
    fn dbm_key_only_rows() {
        let dir = tempdir().unwrap();
        let mut store = DbmStore::new(&dir.path().join("db"), ':');
        store.bind_layout(RecordLayout::new(vec![0], 1).unwrap());
        store.open().unwrap();
        store.put(row(&["solo"])).unwrap();
        assert_eq!(store.get(&row(&["solo"])).unwrap(), Some(row(&["solo"])));
    }

    #[test]
    fn dbm_delete_and_scan() {
        let dir = tempdir().unwrap();
        let mut store = store_at(&dir.path().join("db"));
        store.open().unwrap();
        store.put(row(&["b", "1", "x"])).unwrap();
        store.put(row(&["a", "1", "y"])).unwrap();

        assert!(store.delete(&row(&["b", "1"])).unwrap());
        assert!(!store.delete(&row(&["b", "1"])).unwrap());
        assert_eq!(store.scan().unwrap(), vec![row(&["a", "1", "y"])]);
    }

    #[test]
    fn dbm_rejects_delimiter_in_field() {
        let dir = tempdir().unwrap();
        let mut store = store_at(&dir.path().join("db"));
        store.open().unwrap();
        assert!(matches!(
            store.put(row(&["a", "b", "12:30"])),
            Err(StorageError::InvalidField { column: 2, .. })
        ));
    }

    #[test]
    fn dbm_close_is_idempotent_and_closed_ops_fail() {
        let dir = tempdir().unwrap();
        let mut store = store_at(&dir.path().join("db"));
        store.close().unwrap();
        assert!(matches!(
            store.get(&row(&["a", "b"])),
            Err(StorageError::Closed)
        ));
        store.open().unwrap();
        store.close().unwrap();
        store.close().unwrap();
    }

    #[test]
    fn dbm_failed_commit_still_detaches() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("db");
        let mut store = store_at(&path);
        store.open().unwrap();
        store.put(row(&["a", "1", "x"])).unwrap();

        // End the session's transaction behind the store's back so the
        // COMMIT issued by close has nothing to commit.
        store.conn.as_ref().unwrap().execute_batch("COMMIT").unwrap();

        assert!(matches!(store.close(), Err(StorageError::Dbm(_))));
        assert!(!store.is_open());
        assert!(matches!(
            store.get(&row(&["a", "1"])),
            Err(StorageError::Closed)
        ));

        store.open().unwrap();
        assert_eq!(store.scan().unwrap(), vec![row(&["a", "1", "x"])]);
        store.close().unwrap();
    }

    #[test]
    fn dbm_discard_rolls_back() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("db");
        let mut store = store_at(&path);
        store.open().unwrap();
        store.put(row(&["a", "1", "x"])).unwrap();
        store.close().unwrap();

        store.open().unwrap();
        store.put(row(&["b", "1", "y"])).unwrap();
        assert!(store.delete(&row(&["a", "1"])).unwrap());
        store.discard().unwrap();
        assert!(!store.is_open());

        store.open().unwrap();
        assert_eq!(store.scan().unwrap(), vec![row(&["a", "1", "x"])]);
    }

    #[test]
    fn dbm_readers_open_side_by_side() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("db");
        {
            let mut writer = store_at(&path);
            writer.lock_exclusive().unwrap();
            writer.open().unwrap();
            writer.put(row(&["a", "1", "x"])).unwrap();
            writer.put(row(&["b", "2", "y"])).unwrap();
            writer.close().unwrap();
            writer.unlock().unwrap();
        }

        let mut a = store_at(&path);
        let mut b = store_at(&path);
        a.lock_shared().unwrap();
        b.lock_shared().unwrap();
        a.open().unwrap();
        b.open().unwrap();

        assert_eq!(a.scan().unwrap().len(), 2);
        assert_eq!(
            b.get(&row(&["b", "2"])).unwrap(),
            Some(row(&["b", "2", "y"]))
        );

        a.close().unwrap();
        assert_eq!(b.scan().unwrap().len(), 2);
        b.close().unwrap();
        a.unlock().unwrap();
        b.unlock().unwrap();
    }

    #[test]
    fn dbm_lock_token_beside_database() {
        let dir = tempdir().unwrap();
        let mut store = store_at(&dir.path().join("people.db"));
        store.lock_exclusive().unwrap();
        assert!(dir.path().join("people.db.lock").exists());
        store.unlock().unwrap();
    }
}
