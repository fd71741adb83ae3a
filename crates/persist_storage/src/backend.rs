//! Record store trait definition.

use crate::error::{StorageError, StorageResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// One stored record: every persisted field, serialized, in schema order.
pub type Row = Vec<String>;

/// Which columns of a [`Row`] form its key.
///
/// The key of a row is the tuple of its identity fields, taken in
/// declaration order. A store keys every row it holds by that tuple.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordLayout {
    key_columns: Vec<usize>,
    width: usize,
}

impl RecordLayout {
    /// Creates a layout of `width` columns keyed by `key_columns`.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Corrupted`] if there are no key columns or a
    /// key column lies outside the row.
    pub fn new(key_columns: Vec<usize>, width: usize) -> StorageResult<Self> {
        if key_columns.is_empty() {
            return Err(StorageError::Corrupted(
                "layout needs at least one key column".to_string(),
            ));
        }
        if let Some(&bad) = key_columns.iter().find(|&&c| c >= width) {
            return Err(StorageError::Corrupted(format!(
                "key column {bad} outside row of width {width}"
            )));
        }
        Ok(Self { key_columns, width })
    }

    /// Number of fields in a row.
    #[must_use]
    pub fn width(&self) -> usize {
        self.width
    }

    /// Column positions of the key fields.
    #[must_use]
    pub fn key_columns(&self) -> &[usize] {
        &self.key_columns
    }

    /// Checks that a row has exactly `width` fields.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::WidthMismatch`] otherwise.
    pub fn check_width(&self, row: &[String]) -> StorageResult<()> {
        if row.len() == self.width {
            Ok(())
        } else {
            Err(StorageError::WidthMismatch {
                expected: self.width,
                actual: row.len(),
            })
        }
    }

    /// Extracts the key tuple of a row.
    #[must_use]
    pub fn key_of(&self, row: &[String]) -> Vec<String> {
        self.key_columns.iter().map(|&c| row[c].clone()).collect()
    }

    /// Splits a row into its key fields and its remaining fields.
    #[must_use]
    pub fn split(&self, row: &[String]) -> (Vec<String>, Vec<String>) {
        let key = self.key_of(row);
        let rest = row
            .iter()
            .enumerate()
            .filter(|(i, _)| !self.key_columns.contains(i))
            .map(|(_, f)| f.clone())
            .collect();
        (key, rest)
    }

    /// Reassembles a row from the parts produced by [`RecordLayout::split`].
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Corrupted`] if the parts do not add up to
    /// the layout's width.
    pub fn join(&self, key: Vec<String>, rest: Vec<String>) -> StorageResult<Row> {
        if key.len() != self.key_columns.len() || key.len() + rest.len() != self.width {
            return Err(StorageError::Corrupted(format!(
                "{} key and {} value fields do not fill a row of width {}",
                key.len(),
                rest.len(),
                self.width
            )));
        }
        let mut row = vec![String::new(); self.width];
        for (&column, field) in self.key_columns.iter().zip(key) {
            row[column] = field;
        }
        let free = (0..self.width).filter(|c| !self.key_columns.contains(c));
        for (column, field) in free.zip(rest) {
            row[column] = field;
        }
        Ok(row)
    }
}

/// Rejects fields that would break a delimited line format.
///
/// # Errors
///
/// Returns [`StorageError::InvalidField`] naming the first offending column.
pub fn check_delimited(row: &[String], delimiter: char) -> StorageResult<()> {
    for (column, field) in row.iter().enumerate() {
        if field.contains(delimiter) {
            return Err(StorageError::InvalidField {
                column,
                reason: format!("contains the field delimiter {delimiter:?}"),
            });
        }
        if field.contains(['\n', '\r']) {
            return Err(StorageError::InvalidField {
                column,
                reason: "contains a line terminator".to_string(),
            });
        }
    }
    Ok(())
}

/// Lock strength requested on a store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockMode {
    /// Many readers may hold the lock together.
    Shared,
    /// One writer holds the lock alone.
    Exclusive,
}

impl fmt::Display for LockMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LockMode::Shared => f.write_str("shared"),
            LockMode::Exclusive => f.write_str("exclusive"),
        }
    }
}

/// The medium behind a store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreKind {
    /// Process-local map.
    Memory,
    /// Delimited flat file.
    File,
    /// Key-value file.
    #[default]
    Dbm,
}

impl fmt::Display for StoreKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreKind::Memory => f.write_str("memory"),
            StoreKind::File => f.write_str("file"),
            StoreKind::Dbm => f.write_str("dbm"),
        }
    }
}

impl FromStr for StoreKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "memory" | "mem" => Ok(StoreKind::Memory),
            "file" | "flat" => Ok(StoreKind::File),
            "dbm" | "kv" => Ok(StoreKind::Dbm),
            other => Err(format!("unknown store kind: {other}")),
        }
    }
}

/// A keyed record store.
///
/// A store holds [`Row`]s keyed by the tuple of their identity fields, as
/// described by the bound [`RecordLayout`]. Stores do not interpret field
/// contents; serialization belongs to the datatype converters.
///
/// # Lifecycle
///
/// Callers bracket every unit of work as
/// `lock_* -> open -> get/put/delete/scan -> close -> unlock`.
/// `open` and `close` are idempotent: opening an open store and closing a
/// closed store do nothing.
///
/// # Implementors
///
/// - [`super::MemoryStore`] - process-local, locking is a no-op
/// - [`super::FileStore`] - delimited text file, rewritten on close
/// - [`super::DbmStore`] - key-value file, written through
pub trait RecordStore: Send + fmt::Debug {
    /// The medium this store keeps its rows in.
    fn kind(&self) -> StoreKind;

    /// Location of the data on disk, if any.
    fn location(&self) -> Option<&Path>;

    /// Binds the layout rows are keyed by.
    ///
    /// Must be called before any row operation.
    fn bind_layout(&mut self, layout: RecordLayout);

    /// Attaches to the medium.
    ///
    /// # Errors
    ///
    /// Returns an error if the medium cannot be read or attached.
    fn open(&mut self) -> StorageResult<()>;

    /// Persists pending changes and detaches from the medium.
    ///
    /// # Errors
    ///
    /// Returns an error if pending changes cannot be written. The store
    /// is closed afterwards either way.
    fn close(&mut self) -> StorageResult<()>;

    /// Detaches from the medium, dropping changes not yet persisted.
    ///
    /// # Errors
    ///
    /// Returns an error if detaching fails.
    fn discard(&mut self) -> StorageResult<()> {
        self.close()
    }

    /// Whether the store is attached.
    fn is_open(&self) -> bool;

    /// Takes a shared lock, blocking until granted.
    ///
    /// # Errors
    ///
    /// Returns [`crate::StorageError::Lock`] if the lock cannot be taken.
    fn lock_shared(&mut self) -> StorageResult<()>;

    /// Takes an exclusive lock, blocking until granted.
    ///
    /// # Errors
    ///
    /// Returns [`crate::StorageError::Lock`] if the lock cannot be taken.
    fn lock_exclusive(&mut self) -> StorageResult<()>;

    /// Releases whatever lock is held. Releasing no lock is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`crate::StorageError::Lock`] if the release fails.
    fn unlock(&mut self) -> StorageResult<()>;

    /// Looks up the row stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns an error if the store is closed or unbound, or the medium fails.
    fn get(&self, key: &[String]) -> StorageResult<Option<Row>>;

    /// Stores a row under its key, replacing any row already there.
    ///
    /// # Errors
    ///
    /// Returns an error if the row does not fit the layout or the format,
    /// or the medium fails. Nothing is written on error.
    fn put(&mut self, row: Row) -> StorageResult<()>;

    /// Removes the row under `key`, reporting whether one was there.
    ///
    /// # Errors
    ///
    /// Returns an error if the store is closed or the medium fails.
    fn delete(&mut self, key: &[String]) -> StorageResult<bool>;

    /// Returns every stored row, ordered by key.
    ///
    /// # Errors
    ///
    /// Returns an error if the store is closed or the medium fails.
    fn scan(&self) -> StorageResult<Vec<Row>>;
}
