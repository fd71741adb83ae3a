//! Delimited flat-file record store.

use crate::backend::{check_delimited, LockMode, RecordLayout, RecordStore, Row, StoreKind};
use crate::error::{StorageError, StorageResult};
use crate::lock::LockFile;
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{trace, warn};

/// Suffix of the scratch file a flush writes before renaming into place.
const TEMP_SUFFIX: &str = ".tmp";

/// A record store kept in a delimited text file.
///
/// One line per row, fields joined by the delimiter in schema order.
/// `open` reads the whole file into an index keyed by identity tuple;
/// `close` rewrites the whole file from that index if anything changed.
/// A missing file is an empty store; it is created by the first flush.
///
/// Field values may not contain the delimiter or a line terminator;
/// such rows are rejected by `put`.
///
/// # Example
///
/// ```no_run
/// use persist_storage::{FileStore, RecordLayout, RecordStore};
/// use std::path::Path;
///
/// let mut store = FileStore::new(Path::new("people.txt"), '|');
/// store.bind_layout(RecordLayout::new(vec![0, 1], 3).unwrap());
/// store.lock_exclusive().unwrap();
/// store.open().unwrap();
/// store.put(vec!["Flintstone".into(), "Fred".into(), "555-1000".into()]).unwrap();
/// store.close().unwrap();
/// store.unlock().unwrap();
/// ```
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    delimiter: char,
    layout: Option<RecordLayout>,
    lock: LockFile,
    index: Option<BTreeMap<Vec<String>, Row>>,
    dirty: bool,
}

impl FileStore {
    /// Delimiter used when none is configured.
    pub const DEFAULT_DELIMITER: char = '|';

    /// Creates a store over the file at `path`. Nothing is read until
    /// [`RecordStore::open`].
    #[must_use]
    pub fn new(path: &Path, delimiter: char) -> Self {
        Self {
            path: path.to_path_buf(),
            delimiter,
            layout: None,
            lock: LockFile::for_location(path),
            index: None,
            dirty: false,
        }
    }

    /// Returns the path of the data file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the field delimiter.
    #[must_use]
    pub fn delimiter(&self) -> char {
        self.delimiter
    }

    /// Returns the path of the lock token file.
    #[must_use]
    pub fn lock_path(&self) -> &Path {
        self.lock.path()
    }

    fn layout(&self) -> StorageResult<&RecordLayout> {
        self.layout.as_ref().ok_or(StorageError::Unbound)
    }

    fn index(&self) -> StorageResult<&BTreeMap<Vec<String>, Row>> {
        self.index.as_ref().ok_or(StorageError::Closed)
    }

    fn load(&self) -> StorageResult<BTreeMap<Vec<String>, Row>> {
        let layout = self.layout()?;
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == io::ErrorKind::NotFound => String::new(),
            Err(e) => return Err(e.into()),
        };

        let mut index = BTreeMap::new();
        for (number, line) in contents.lines().enumerate() {
            if line.is_empty() {
                continue;
            }
            let row: Row = line.split(self.delimiter).map(str::to_string).collect();
            if row.len() != layout.width() {
                return Err(StorageError::Corrupted(format!(
                    "{} line {}: {} fields, expected {}",
                    self.path.display(),
                    number + 1,
                    row.len(),
                    layout.width()
                )));
            }
            index.insert(layout.key_of(&row), row);
        }
        Ok(index)
    }

    fn flush(&self, index: &BTreeMap<Vec<String>, Row>) -> StorageResult<()> {
        let mut temp = self.path.as_os_str().to_os_string();
        temp.push(TEMP_SUFFIX);
        let temp = PathBuf::from(temp);

        let mut out = BufWriter::new(File::create(&temp)?);
        let delimiter = self.delimiter.to_string();
        for row in index.values() {
            out.write_all(row.join(&delimiter).as_bytes())?;
            out.write_all(b"\n")?;
        }
        let file = out.into_inner().map_err(io::IntoInnerError::into_error)?;
        file.sync_all()?;
        drop(file);

        fs::rename(&temp, &self.path)?;
        Ok(())
    }
}

impl RecordStore for FileStore {
    fn kind(&self) -> StoreKind {
        StoreKind::File
    }

    fn location(&self) -> Option<&Path> {
        Some(&self.path)
    }

    fn bind_layout(&mut self, layout: RecordLayout) {
        self.layout = Some(layout);
    }

    fn open(&mut self) -> StorageResult<()> {
        if self.index.is_some() {
            return Ok(());
        }
        let index = self.load()?;
        trace!(path = %self.path.display(), rows = index.len(), "file store opened");
        self.index = Some(index);
        self.dirty = false;
        Ok(())
    }

    fn close(&mut self) -> StorageResult<()> {
        let Some(index) = self.index.take() else {
            return Ok(());
        };
        let dirty = std::mem::take(&mut self.dirty);
        if dirty {
            self.flush(&index)?;
        }
        trace!(path = %self.path.display(), rows = index.len(), flushed = dirty, "file store closed");
        Ok(())
    }

    fn discard(&mut self) -> StorageResult<()> {
        if self.index.take().is_some() && std::mem::take(&mut self.dirty) {
            warn!(path = %self.path.display(), "discarding unflushed changes");
        }
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.index.is_some()
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
        Ok(self.index()?.get(key).cloned())
    }

    fn put(&mut self, row: Row) -> StorageResult<()> {
        let layout = self.layout()?;
        layout.check_width(&row)?;
        check_delimited(&row, self.delimiter)?;
        let key = layout.key_of(&row);

        let index = self.index.as_mut().ok_or(StorageError::Closed)?;
        index.insert(key, row);
        self.dirty = true;
        Ok(())
    }

    fn delete(&mut self, key: &[String]) -> StorageResult<bool> {
        let index = self.index.as_mut().ok_or(StorageError::Closed)?;
        let removed = index.remove(key).is_some();
        self.dirty |= removed;
        Ok(removed)
    }

    fn scan(&self) -> StorageResult<Vec<Row>> {
        Ok(self.index()?.values().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn row(fields: &[&str]) -> Row {
        fields.iter().map(|s| s.to_string()).collect()
    }

    fn store_at(path: &Path) -> FileStore {
        let mut store = FileStore::new(path, '|');
        store.bind_layout(RecordLayout::new(vec![0, 1], 3).unwrap());
        store
    }

    #[test]
    fn file_missing_is_empty() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("people.txt");

        let mut store = store_at(&path);
        store.open().unwrap();
        assert!(store.scan().unwrap().is_empty());
        store.close().unwrap();
        assert!(!path.exists());
    }

    #[test]
    fn file_writes_delimited_lines_in_key_order() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("people.txt");

        let mut store = store_at(&path);
        store.open().unwrap();
        store.put(row(&["Flintstone", "Wilma", "555-1001"])).unwrap();
        store.put(row(&["Flintstone", "Fred", "555-1000"])).unwrap();
        store.close().unwrap();

        let contents = fs::read_to_string(&path).unwrap();
        assert_eq!(
            contents,
            "Flintstone|Fred|555-1000\nFlintstone|Wilma|555-1001\n"
        );
    }

    #[test]
    fn file_persistence() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("people.txt");

        {
            let mut store = store_at(&path);
            store.open().unwrap();
            store.put(row(&["Rubble", "Barney", "555-2000"])).unwrap();
            store.close().unwrap();
        }

        {
            let mut store = store_at(&path);
            store.open().unwrap();
            let got = store.get(&row(&["Rubble", "Barney"])).unwrap();
            assert_eq!(got, Some(row(&["Rubble", "Barney", "555-2000"])));
        }
    }

    #[test]
    fn file_delete_persists() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("people.txt");
        fs::write(&path, "a|b|1\nc|d|2\n").unwrap();

        let mut store = store_at(&path);
        store.open().unwrap();
        assert!(store.delete(&row(&["a", "b"])).unwrap());
        assert!(!store.delete(&row(&["x", "y"])).unwrap());
        store.close().unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "c|d|2\n");
    }

    #[test]
    fn file_close_is_idempotent() {
        let dir = tempdir().unwrap();
        let mut store = store_at(&dir.path().join("people.txt"));
        store.close().unwrap();
        store.open().unwrap();
        store.close().unwrap();
        store.close().unwrap();
        assert!(!store.is_open());
    }

    #[test]
    fn file_closed_operations_fail() {
        let dir = tempdir().unwrap();
        let mut store = store_at(&dir.path().join("people.txt"));
        assert!(matches!(store.scan(), Err(StorageError::Closed)));
        assert!(matches!(
            store.put(row(&["a", "b", "c"])),
            Err(StorageError::Closed)
        ));
    }

    #[test]
    fn file_rejects_delimiter_in_field() {
        let dir = tempdir().unwrap();
        let mut store = store_at(&dir.path().join("people.txt"));
        store.open().unwrap();
        let err = store.put(row(&["a", "b|c", "d"])).unwrap_err();
        assert!(matches!(err, StorageError::InvalidField { column: 1, .. }));
        assert!(store.scan().unwrap().is_empty());
    }

    #[test]
    fn file_wrong_field_count_is_corruption() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("people.txt");
        fs::write(&path, "a|b|1\nc|d\n").unwrap();

        let mut store = store_at(&path);
        assert!(matches!(store.open(), Err(StorageError::Corrupted(_))));
        assert!(!store.is_open());
    }

    #[test]
    fn file_discard_drops_changes() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("people.txt");
        fs::write(&path, "a|b|1\n").unwrap();

        let mut store = store_at(&path);
        store.open().unwrap();
        store.delete(&row(&["a", "b"])).unwrap();
        store.discard().unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "a|b|1\n");
    }

    #[test]
    fn file_accepts_crlf_lines() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("people.txt");
        fs::write(&path, "a|b|1\r\n").unwrap();

        let mut store = store_at(&path);
        store.open().unwrap();
        assert_eq!(store.get(&row(&["a", "b"])).unwrap().unwrap()[2], "1");
    }

    #[test]
    fn file_lock_path_is_sibling() {
        let dir = tempdir().unwrap();
        let store = store_at(&dir.path().join("people.txt"));
        assert_eq!(store.lock_path(), dir.path().join("people.txt.lock"));
    }
}
