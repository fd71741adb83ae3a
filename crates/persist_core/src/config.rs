//! Store configuration.

use crate::error::{CoreError, CoreResult};
use persist_storage::{DbmStore, FileStore, MemoryStore, RecordStore, StoreKind};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Configuration naming the store a record engine persists to.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Medium of the store. Defaults to [`StoreKind::Dbm`].
    pub kind: StoreKind,

    /// Path of the store's data. Required for file and DBM stores.
    pub location: Option<PathBuf>,

    /// Field delimiter. `None` uses the medium's default
    /// (`|` for file, the unit separator `\u{1f}` for DBM).
    pub field_delimiter: Option<char>,
}

impl StoreConfig {
    /// Creates a configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Configuration for an in-memory store.
    #[must_use]
    pub fn memory() -> Self {
        Self::new().kind(StoreKind::Memory)
    }

    /// Configuration for a delimited file at `path`.
    #[must_use]
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self::new().kind(StoreKind::File).location(path)
    }

    /// Configuration for a DBM store at `path`.
    #[must_use]
    pub fn dbm(path: impl Into<PathBuf>) -> Self {
        Self::new().kind(StoreKind::Dbm).location(path)
    }

    /// Sets the store medium.
    #[must_use]
    pub const fn kind(mut self, kind: StoreKind) -> Self {
        self.kind = kind;
        self
    }

    /// Sets the store medium by name (`memory`, `file` or `dbm`, any case).
    ///
    /// # Errors
    ///
    /// Returns a configuration error for an unknown name.
    pub fn kind_str(self, kind: &str) -> CoreResult<Self> {
        let kind = kind.parse::<StoreKind>().map_err(CoreError::config)?;
        Ok(self.kind(kind))
    }

    /// Sets the store location.
    #[must_use]
    pub fn location(mut self, path: impl Into<PathBuf>) -> Self {
        self.location = Some(path.into());
        self
    }

    /// Sets the field delimiter.
    #[must_use]
    pub const fn field_delimiter(mut self, delimiter: char) -> Self {
        self.field_delimiter = Some(delimiter);
        self
    }

    /// Sets the field delimiter from a string holding exactly one character.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if `delimiter` is not one character.
    pub fn field_delimiter_str(self, delimiter: &str) -> CoreResult<Self> {
        let mut chars = delimiter.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => Ok(self.field_delimiter(c)),
            _ => Err(CoreError::config(format!(
                "field delimiter must be one character, got {delimiter:?}"
            ))),
        }
    }

    /// The delimiter the built store will use.
    #[must_use]
    pub fn effective_delimiter(&self) -> Option<char> {
        match self.kind {
            StoreKind::Memory => None,
            StoreKind::File => Some(self.field_delimiter.unwrap_or(FileStore::DEFAULT_DELIMITER)),
            StoreKind::Dbm => Some(self.field_delimiter.unwrap_or(DbmStore::DEFAULT_DELIMITER)),
        }
    }

    /// Checks that the configuration can build a store.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if a location is missing or the
    /// delimiter is a line terminator.
    pub fn validate(&self) -> CoreResult<()> {
        if self.kind != StoreKind::Memory && self.location.is_none() {
            return Err(CoreError::config(format!(
                "{} store requires a location",
                self.kind
            )));
        }
        if matches!(self.field_delimiter, Some('\n' | '\r')) {
            return Err(CoreError::config(
                "field delimiter must not be a line terminator",
            ));
        }
        Ok(())
    }

    /// Builds the configured store.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the configuration is invalid.
    pub fn build(&self) -> CoreResult<Box<dyn RecordStore>> {
        self.validate()?;
        let location = self.location.as_deref().unwrap_or_else(|| Path::new(""));
        let store: Box<dyn RecordStore> = match (self.kind, self.effective_delimiter()) {
            (StoreKind::File, Some(delimiter)) => Box::new(FileStore::new(location, delimiter)),
            (StoreKind::Dbm, Some(delimiter)) => Box::new(DbmStore::new(location, delimiter)),
            _ => Box::new(MemoryStore::new()),
        };
        Ok(store)
    }
}
