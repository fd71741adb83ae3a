//! Test fixtures and engine helpers.
//!
//! Provides temporary stores for every medium and a ready-made phone book
//! entity to run scenarios against.

use persist_core::{
    Datatype, MemoryStore, RecordEngine, Role, Schema, StoreConfig, StoreKind,
};
use std::path::Path;
use tempfile::TempDir;

/// Every store medium, for tests that run once per medium.
pub const ALL_KINDS: [StoreKind; 3] = [StoreKind::Memory, StoreKind::File, StoreKind::Dbm];

/// A store location with automatic cleanup.
///
/// Disk stores live in a temporary directory removed on drop. Memory
/// stores keep one shared handle so every engine made from the same
/// `TestStore` sees the same rows.
pub struct TestStore {
    config: StoreConfig,
    shared: Option<MemoryStore>,
    _temp_dir: Option<TempDir>,
}

impl TestStore {
    /// Creates an empty store of the given medium.
    pub fn new(kind: StoreKind) -> Self {
        match kind {
            StoreKind::Memory => Self {
                config: StoreConfig::memory(),
                shared: Some(MemoryStore::new()),
                _temp_dir: None,
            },
            StoreKind::File | StoreKind::Dbm => {
                let temp_dir = TempDir::new().expect("Failed to create temp directory");
                let name = if kind == StoreKind::File {
                    "store.txt"
                } else {
                    "store.db"
                };
                Self {
                    config: StoreConfig::new().kind(kind).location(temp_dir.path().join(name)),
                    shared: None,
                    _temp_dir: Some(temp_dir),
                }
            }
        }
    }

    /// Creates an in-memory store.
    pub fn memory() -> Self {
        Self::new(StoreKind::Memory)
    }

    /// Creates a flat-file store in a temporary directory.
    pub fn file() -> Self {
        Self::new(StoreKind::File)
    }

    /// Creates a DBM store in a temporary directory.
    pub fn dbm() -> Self {
        Self::new(StoreKind::Dbm)
    }

    /// The store's configuration.
    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// The store medium.
    pub fn kind(&self) -> StoreKind {
        self.config.kind
    }

    /// Location of the data, `None` for memory stores.
    pub fn path(&self) -> Option<&Path> {
        self.config.location.as_deref()
    }

    /// Binds a new engine over `schema` to this store.
    pub fn engine(&self, schema: Schema) -> RecordEngine {
        match &self.shared {
            Some(store) => RecordEngine::with_store(schema, Box::new(store.clone())),
            None => RecordEngine::open(schema, &self.config),
        }
        .expect("Failed to bind engine")
    }
}

/// The phone book entity used throughout the tests.
///
/// | attribute | role | datatype |
/// |---|---|---|
/// | `lastname` | identity | `VarChar(40)` |
/// | `firstname` | identity | `VarChar(40)` |
/// | `telnum` | persistent | `VarChar(15)` |
/// | `age` | persistent | `Number` |
/// | `born` | persistent | `Timestamp` |
/// | `notes` | transient | `Text` |
pub fn phone_book_schema() -> Schema {
    let mut schema = Schema::new();
    for (name, role, datatype) in [
        ("lastname", Role::Identity, Datatype::varchar(40)),
        ("firstname", Role::Identity, Datatype::varchar(40)),
        ("telnum", Role::Persistent, Datatype::varchar(15)),
        ("age", Role::Persistent, Datatype::number()),
        ("born", Role::Persistent, Datatype::timestamp()),
        ("notes", Role::Transient, Datatype::text()),
    ] {
        schema
            .add_attribute(name, role, datatype)
            .expect("Failed to declare phone book attribute");
    }
    schema
}

/// An engine over a temporary store, kept alive together.
pub struct TestEngine {
    /// The engine instance.
    pub engine: RecordEngine,
    /// The store backing it.
    pub store: TestStore,
}

impl TestEngine {
    /// A phone book engine over a fresh store of the given medium.
    pub fn phone_book(kind: StoreKind) -> Self {
        let store = TestStore::new(kind);
        let engine = store.engine(phone_book_schema());
        Self { engine, store }
    }

    /// A second, independent phone book engine over the same store.
    pub fn reopen(&self) -> RecordEngine {
        self.store.engine(phone_book_schema())
    }
}

impl std::ops::Deref for TestEngine {
    type Target = RecordEngine;

    fn deref(&self) -> &Self::Target {
        &self.engine
    }
}

impl std::ops::DerefMut for TestEngine {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.engine
    }
}

/// Runs a test with a phone book engine over a temporary store.
pub fn with_phone_book<F, R>(kind: StoreKind, f: F) -> R
where
    F: FnOnce(&mut RecordEngine) -> R,
{
    let mut test = TestEngine::phone_book(kind);
    f(&mut test.engine)
}

/// Test scenario helpers.
pub mod scenarios {
    use persist_core::RecordEngine;

    /// Inserts one phone book entry, replacing the engine's record.
    pub fn add_person(engine: &mut RecordEngine, last: &str, first: &str, telnum: &str, age: f64) {
        engine.clear();
        engine.set("lastname", last).expect("Failed to set lastname");
        engine.set("firstname", first).expect("Failed to set firstname");
        engine.set("telnum", telnum).expect("Failed to set telnum");
        engine.set("age", age).expect("Failed to set age");
        engine.insert().expect("Failed to insert person");
    }

    /// Populates the Flintstone and Rubble households.
    pub fn flintstones(engine: &mut RecordEngine) {
        add_person(engine, "Flintstone", "Fred", "555-1000", 35.0);
        add_person(engine, "Flintstone", "Wilma", "555-1001", 33.0);
        add_person(engine, "Flintstone", "Pebbles", "555-1002", 2.0);
        add_person(engine, "Rubble", "Barney", "555-2000", 34.0);
        add_person(engine, "Rubble", "Betty", "555-2001", 32.0);
    }
}
