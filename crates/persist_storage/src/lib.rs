//! # Persist Storage
//!
//! Record store trait and implementations for persist.
//!
//! A store keeps rows of serialized fields keyed by their identity tuple.
//! Stores never interpret field contents; the datatype converters in
//! `persist_codec` own the text each field holds.
//!
//! ## Available Stores
//!
//! - [`MemoryStore`] - process-local map, no locking
//! - [`FileStore`] - one delimited line per record, rewritten on close
//! - [`DbmStore`] - embedded key-value database, written through
//!
//! ## Locking
//!
//! On-disk stores take an advisory lock on a sibling token file
//! (`<location>.lock`, see [`LockFile`]) before touching data: shared for
//! reads, exclusive for writes. The lock is held by the store instance and
//! released with [`RecordStore::unlock`].
//!
//! ## Example
//!
//! ```rust
//! use persist_storage::{MemoryStore, RecordLayout, RecordStore};
//!
//! let mut store = MemoryStore::new();
//! store.bind_layout(RecordLayout::new(vec![0], 2).unwrap());
//! store.put(vec!["id-1".into(), "payload".into()]).unwrap();
//! assert_eq!(store.scan().unwrap().len(), 1);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod backend;
mod dbm;
mod error;
mod file;
mod lock;
mod memory;

pub use backend::{check_delimited, LockMode, RecordLayout, RecordStore, Row, StoreKind};
pub use dbm::DbmStore;
pub use error::{StorageError, StorageResult};
pub use file::FileStore;
pub use lock::{lock_path_for, LockFile, LOCK_SUFFIX};
pub use memory::MemoryStore;
