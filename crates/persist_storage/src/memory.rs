//! In-memory record store.

use crate::backend::{RecordLayout, RecordStore, Row, StoreKind};
use crate::error::{StorageError, StorageResult};
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

/// An in-memory record store.
///
/// Rows live in a process-local map. Cloning the store clones the handle,
/// not the rows: every clone sees the same records, so several engines in
/// one process can share a store. There is no cross-process contention, so
/// `open`, `close` and locking are no-ops.
///
/// # Example
///
/// ```rust
/// use persist_storage::{MemoryStore, RecordLayout, RecordStore};
///
/// let mut store = MemoryStore::new();
/// store.bind_layout(RecordLayout::new(vec![0], 2).unwrap());
/// store.put(vec!["fred".into(), "555-1000".into()]).unwrap();
///
/// let shared = store.clone();
/// assert!(shared.get(&["fred".to_string()]).unwrap().is_some());
/// ```
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    rows: Arc<RwLock<BTreeMap<Vec<String>, Row>>>,
    layout: Option<RecordLayout>,
}

impl MemoryStore {
    /// Creates a new empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.read().len()
    }

    /// Whether the store holds no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.read().is_empty()
    }

    /// Removes every row, for all clones of this handle.
    pub fn clear(&mut self) {
        self.rows.write().clear();
    }

    fn layout(&self) -> StorageResult<&RecordLayout> {
        self.layout.as_ref().ok_or(StorageError::Unbound)
    }
}

impl RecordStore for MemoryStore {
    fn kind(&self) -> StoreKind {
        StoreKind::Memory
    }

    fn location(&self) -> Option<&Path> {
        None
    }

    fn bind_layout(&mut self, layout: RecordLayout) {
        self.layout = Some(layout);
    }

    fn open(&mut self) -> StorageResult<()> {
        Ok(())
    }

    fn close(&mut self) -> StorageResult<()> {
        Ok(())
    }

    fn is_open(&self) -> bool {
        true
    }

    fn lock_shared(&mut self) -> StorageResult<()> {
        Ok(())
    }

    fn lock_exclusive(&mut self) -> StorageResult<()> {
        Ok(())
    }

    fn unlock(&mut self) -> StorageResult<()> {
        Ok(())
    }

    fn get(&self, key: &[String]) -> StorageResult<Option<Row>> {
        self.layout()?;
        Ok(self.rows.read().get(key).cloned())
    }

    fn put(&mut self, row: Row) -> StorageResult<()> {
        let layout = self.layout()?;
        layout.check_width(&row)?;
        let key = layout.key_of(&row);
        self.rows.write().insert(key, row);
        Ok(())
    }

    fn delete(&mut self, key: &[String]) -> StorageResult<bool> {
        self.layout()?;
        Ok(self.rows.write().remove(key).is_some())
    }

    fn scan(&self) -> StorageResult<Vec<Row>> {
        self.layout()?;
        Ok(self.rows.read().values().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bound() -> MemoryStore {
        let mut store = MemoryStore::new();
        store.bind_layout(RecordLayout::new(vec![0, 1], 3).unwrap());
        store
    }

    fn row(fields: &[&str]) -> Row {
        fields.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn memory_new_is_empty() {
        let store = bound();
        assert!(store.is_empty());
        assert!(store.scan().unwrap().is_empty());
    }

    #[test]
    fn memory_put_then_get() {
        let mut store = bound();
        store.put(row(&["Flintstone", "Fred", "555-1000"])).unwrap();

        let got = store.get(&row(&["Flintstone", "Fred"])).unwrap();
        assert_eq!(got, Some(row(&["Flintstone", "Fred", "555-1000"])));
        assert_eq!(store.get(&row(&["Flintstone", "Wilma"])).unwrap(), None);
    }

    #[test]
    fn memory_put_replaces_same_key() {
        let mut store = bound();
        store.put(row(&["a", "b", "1"])).unwrap();
        store.put(row(&["a", "b", "2"])).unwrap();
        assert_eq!(store.len(), 1);
        assert_eq!(store.get(&row(&["a", "b"])).unwrap().unwrap()[2], "2");
    }

    #[test]
    fn memory_delete_reports_presence() {
        let mut store = bound();
        store.put(row(&["a", "b", "1"])).unwrap();
        assert!(store.delete(&row(&["a", "b"])).unwrap());
        assert!(!store.delete(&row(&["a", "b"])).unwrap());
    }

    #[test]
    fn memory_scan_is_key_ordered() {
        let mut store = bound();
        store.put(row(&["b", "x", "1"])).unwrap();
        store.put(row(&["a", "y", "2"])).unwrap();
        store.put(row(&["a", "x", "3"])).unwrap();
        let keys: Vec<_> = store
            .scan()
            .unwrap()
            .into_iter()
            .map(|r| format!("{}{}", r[0], r[1]))
            .collect();
        assert_eq!(keys, vec!["ax", "ay", "bx"]);
    }

    #[test]
    fn memory_clones_share_rows() {
        let mut a = bound();
        let b = a.clone();
        a.put(row(&["a", "b", "1"])).unwrap();
        assert_eq!(b.len(), 1);
    }

    #[test]
    fn memory_rejects_wrong_width() {
        let mut store = bound();
        assert!(matches!(
            store.put(row(&["a", "b"])),
            Err(StorageError::WidthMismatch { expected: 3, actual: 2 })
        ));
    }

    #[test]
    fn memory_unbound_fails() {
        let store = MemoryStore::new();
        assert!(matches!(store.scan(), Err(StorageError::Unbound)));
    }

    #[test]
    fn memory_lifecycle_is_noop() {
        let mut store = bound();
        store.lock_exclusive().unwrap();
        store.open().unwrap();
        store.close().unwrap();
        store.close().unwrap();
        store.unlock().unwrap();
        assert!(store.is_open());
    }
}
