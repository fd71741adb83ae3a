//! The record engine.
//!
//! A [`RecordEngine`] holds one in-memory record shaped by a [`Schema`] and
//! moves it to and from a bound [`RecordStore`]. Every store operation runs
//! inside a session: lock, open, work, close (or discard on failure),
//! unlock. Shared locks are taken for reads, exclusive locks for writes.

use crate::config::StoreConfig;
use crate::error::{CoreError, CoreResult};
use crate::query::{Cursor, OrderBy, Predicate, SortKeys};
use crate::record::Record;
use crate::schema::{Role, Schema};
use persist_codec::{Converter, Datatype, Value};
use persist_storage::{LockMode, RecordStore, StoreKind};
use std::fmt;
use std::path::Path;
use tracing::{debug, trace, warn};

/// Lifecycle state of an engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    /// No store bound yet.
    Unconfigured,
    /// Bound to a store with an identity-bearing schema.
    Configured,
    /// A query cursor is open.
    Querying,
}

impl fmt::Display for EngineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineState::Unconfigured => f.write_str("unconfigured"),
            EngineState::Configured => f.write_str("configured"),
            EngineState::Querying => f.write_str("querying"),
        }
    }
}

/// Schema-driven persistence for one record at a time.
///
/// # Example
///
/// ```rust
/// use persist_core::{Datatype, RecordEngine, Role, Schema, StoreConfig};
///
/// let mut schema = Schema::new();
/// schema.add_attribute("lastname", Role::Identity, Datatype::varchar(40)).unwrap();
/// schema.add_attribute("firstname", Role::Identity, Datatype::varchar(40)).unwrap();
/// schema.add_attribute("telnum", Role::Persistent, Datatype::varchar(15)).unwrap();
///
/// let mut engine = RecordEngine::open(schema, &StoreConfig::memory()).unwrap();
/// engine.set("lastname", "Flintstone").unwrap();
/// engine.set("firstname", "Fred").unwrap();
/// engine.set("telnum", "555-1000").unwrap();
/// engine.insert().unwrap();
///
/// engine.clear();
/// assert!(engine.restore(&["Flintstone".into(), "Fred".into()]).unwrap());
/// assert_eq!(engine.get("telnum").unwrap().as_text(), Some("555-1000"));
/// ```
#[derive(Debug)]
pub struct RecordEngine {
    schema: Schema,
    record: Record,
    store: Option<Box<dyn RecordStore>>,
    last_known_id: Option<Vec<String>>,
    cursor: Option<Cursor>,
}

impl RecordEngine {
    /// Creates an unconfigured engine over `schema`.
    #[must_use]
    pub fn new(schema: Schema) -> Self {
        let record = Record::with_width(schema.len());
        Self {
            schema,
            record,
            store: None,
            last_known_id: None,
            cursor: None,
        }
    }

    /// Creates an engine and binds it to a prepared store.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the schema has no identity
    /// attribute.
    pub fn with_store(schema: Schema, store: Box<dyn RecordStore>) -> CoreResult<Self> {
        let mut engine = Self::new(schema);
        engine.set_store(store)?;
        Ok(engine)
    }

    /// Creates an engine and binds it to the store `config` describes.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the configuration is invalid or the
    /// schema has no identity attribute.
    pub fn open(schema: Schema, config: &StoreConfig) -> CoreResult<Self> {
        let mut engine = Self::new(schema);
        engine.configure(config)?;
        Ok(engine)
    }

    /// Builds the store `config` describes and binds it.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the configuration is invalid or the
    /// schema has no identity attribute.
    pub fn configure(&mut self, config: &StoreConfig) -> CoreResult<()> {
        let store = config.build()?;
        self.set_store(store)
    }

    /// Binds a store, replacing any previous one.
    ///
    /// Forgets the last known identity and any open query.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the schema has no identity
    /// attribute.
    pub fn set_store(&mut self, mut store: Box<dyn RecordStore>) -> CoreResult<()> {
        store.bind_layout(self.schema.layout()?);
        debug!(kind = %store.kind(), location = ?store.location(), "store bound");
        self.store = Some(store);
        self.last_known_id = None;
        self.cursor = None;
        Ok(())
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> EngineState {
        match (&self.store, &self.cursor) {
            (None, _) => EngineState::Unconfigured,
            (Some(_), None) => EngineState::Configured,
            (Some(_), Some(_)) => EngineState::Querying,
        }
    }

    /// The engine's schema.
    #[must_use]
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// The current record.
    #[must_use]
    pub fn record(&self) -> &Record {
        &self.record
    }

    /// Medium of the bound store.
    #[must_use]
    pub fn store_kind(&self) -> Option<StoreKind> {
        self.store.as_ref().map(|s| s.kind())
    }

    /// On-disk location of the bound store.
    #[must_use]
    pub fn location(&self) -> Option<&Path> {
        self.store.as_ref().and_then(|s| s.location())
    }

    /// Identity tuple of the record as last read from or written to the
    /// store.
    #[must_use]
    pub fn last_known_id(&self) -> Option<&[String]> {
        self.last_known_id.as_deref()
    }

    /// The open query, if any.
    #[must_use]
    pub fn cursor(&self) -> Option<&Cursor> {
        self.cursor.as_ref()
    }

    /// Records left in the open query, if any.
    #[must_use]
    pub fn cursor_remaining(&self) -> Option<usize> {
        self.cursor.as_ref().map(Cursor::remaining)
    }

    /// Declares another attribute. The current record gains a null slot,
    /// any open query is closed and a bound store is re-keyed to the new
    /// layout.
    ///
    /// # Errors
    ///
    /// Returns a schema error if the name is empty or taken.
    pub fn add_attribute(
        &mut self,
        name: impl Into<String>,
        role: Role,
        datatype: Datatype,
    ) -> CoreResult<()> {
        self.schema.add_attribute(name, role, datatype)?;
        self.record.widen(self.schema.len());
        self.cursor = None;
        if let Some(store) = self.store.as_mut() {
            store.bind_layout(self.schema.layout()?);
        }
        Ok(())
    }

    /// Sets an attribute, coercing the value to its datatype.
    ///
    /// # Errors
    ///
    /// Returns a schema error for an unknown attribute or a datatype error
    /// if the value does not coerce. The record is unchanged on error.
    pub fn set(&mut self, name: &str, value: impl Into<Value>) -> CoreResult<()> {
        let (position, descriptor) = self.schema.require(name)?;
        let value = descriptor.datatype.coerce(value.into())?;
        self.record.set(position, value);
        Ok(())
    }

    /// Reads an attribute.
    ///
    /// # Errors
    ///
    /// Returns a schema error for an unknown attribute.
    pub fn get(&self, name: &str) -> CoreResult<&Value> {
        let (position, _) = self.schema.require(name)?;
        Ok(self.record.get(position).unwrap_or(&Value::Null))
    }

    /// Every attribute with its value, in declaration order.
    #[must_use]
    pub fn data(&self) -> Vec<(&str, &Value)> {
        self.schema
            .iter()
            .map(|a| a.name.as_str())
            .zip(self.record.values())
            .collect()
    }

    /// Values of the identity attributes, in declaration order.
    #[must_use]
    pub fn identity_values(&self) -> Vec<&Value> {
        self.schema
            .iter()
            .zip(self.record.values())
            .filter(|(a, _)| a.role == Role::Identity)
            .map(|(_, v)| v)
            .collect()
    }

    /// Resets every attribute to null and forgets the last known
    /// identity, so the next `save` inserts unless the new identity is
    /// already stored.
    pub fn clear(&mut self) {
        self.record.clear();
        self.last_known_id = None;
    }

    /// Loads the record stored under `id` into the engine.
    ///
    /// `id` holds one value per identity attribute, in declaration order.
    /// On a hit the whole record is replaced (transient attributes become
    /// null) and `id` becomes the last known identity. On a miss nothing
    /// changes.
    ///
    /// # Errors
    ///
    /// Returns an error if the engine is unconfigured, `id` is malformed,
    /// or the store fails.
    pub fn restore(&mut self, id: &[Value]) -> CoreResult<bool> {
        let key = self.key_from_values(id)?;
        let store = self.bound_store()?;
        let row = in_session(store, LockMode::Shared, |s| Ok(s.get(&key)?))?;

        let Some(row) = row else {
            debug!(key = ?key, "restore missed");
            return Ok(false);
        };
        self.record = Record::from_row(&self.schema, &row)?;
        debug!(key = ?key, "restored");
        self.last_known_id = Some(key);
        Ok(true)
    }

    /// Stores the current record as a new entry.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::DuplicateKey`] if the identity is already
    /// stored, or an invalid operation error if an identity value is empty.
    pub fn insert(&mut self) -> CoreResult<()> {
        let row = self.record.to_row(&self.schema)?;
        let key = self.record.identity_key(&self.schema)?;
        let store = self.bound_store()?;

        in_session(store, LockMode::Exclusive, |s| {
            if s.get(&key)?.is_some() {
                return Err(CoreError::DuplicateKey { key: key.clone() });
            }
            s.put(row)?;
            Ok(())
        })?;
        debug!(key = ?key, "inserted");
        self.last_known_id = Some(key);
        Ok(())
    }

    /// Rewrites a stored entry from the current record.
    ///
    /// The entry replaced is the one under `previous` if given, otherwise
    /// the last known identity, otherwise the record's current identity.
    /// When the identity changed, the old entry is removed. Returns `true`
    /// once the entry has been rewritten.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::NotFound`] if no entry exists under the previous
    /// identity and [`CoreError::DuplicateKey`] if the new identity is
    /// taken by another entry.
    pub fn update(&mut self, previous: Option<&[Value]>) -> CoreResult<bool> {
        let row = self.record.to_row(&self.schema)?;
        let key = self.record.identity_key(&self.schema)?;
        let old = match previous {
            Some(id) => self.key_from_values(id)?,
            None => self.last_known_id.clone().unwrap_or_else(|| key.clone()),
        };
        let store = self.bound_store()?;

        let replaced = in_session(store, LockMode::Exclusive, |s| rewrite(s, &old, &key, row))?;
        if !replaced {
            return Err(CoreError::NotFound { key: old });
        }
        debug!(from = ?old, to = ?key, "updated");
        self.last_known_id = Some(key);
        Ok(true)
    }

    /// Updates the stored entry if there is one, otherwise inserts.
    /// Returns `true` if an existing entry was updated.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::DuplicateKey`] if the record's identity is
    /// taken by an entry other than the one being replaced.
    pub fn save(&mut self) -> CoreResult<bool> {
        let row = self.record.to_row(&self.schema)?;
        let key = self.record.identity_key(&self.schema)?;
        let old = self.last_known_id.clone().unwrap_or_else(|| key.clone());
        let store = self.bound_store()?;

        let updated = in_session(store, LockMode::Exclusive, |s| {
            if rewrite(s, &old, &key, row.clone())? {
                return Ok(true);
            }
            if s.get(&key)?.is_some() {
                return Err(CoreError::DuplicateKey { key: key.clone() });
            }
            s.put(row)?;
            Ok(false)
        })?;
        debug!(key = ?key, updated, "saved");
        self.last_known_id = Some(key);
        Ok(updated)
    }

    /// Removes the entry under `id`, or under the record's current identity
    /// if `id` is `None`. Returns whether an entry was removed.
    ///
    /// # Errors
    ///
    /// Returns an error if the identity is incomplete or the store fails.
    pub fn delete(&mut self, id: Option<&[Value]>) -> CoreResult<bool> {
        let key = match id {
            Some(id) => self.key_from_values(id)?,
            None => self.record.identity_key(&self.schema)?,
        };
        let store = self.bound_store()?;

        let removed = in_session(store, LockMode::Exclusive, |s| Ok(s.delete(&key)?))?;
        debug!(key = ?key, removed, "deleted");
        if removed && self.last_known_id.as_deref() == Some(key.as_slice()) {
            self.last_known_id = None;
        }
        Ok(removed)
    }

    /// Runs a query from its textual form and opens a cursor over the
    /// matches. Any previous cursor is discarded first, even when the
    /// query text is rejected. Returns the number of matches.
    ///
    /// `order_by` is a comma-separated list of `attribute [asc|desc]`; an
    /// empty string keeps identity order. See [`Predicate`] for the
    /// predicate grammar.
    ///
    /// # Errors
    ///
    /// Returns a query error for malformed input, or a store error.
    pub fn restore_where(&mut self, predicate: &str, order_by: &str) -> CoreResult<usize> {
        self.cursor = None;
        let predicate = Predicate::parse(predicate, &self.schema)?;
        let order = OrderBy::parse_list(order_by)?;
        self.restore_where_with(&predicate, &order)
    }

    /// Runs a prepared query and opens a cursor over the matches. Any
    /// previous cursor is discarded first. Returns the number of matches.
    ///
    /// # Errors
    ///
    /// Returns a query error for unknown order attributes, or a store
    /// error.
    pub fn restore_where_with(
        &mut self,
        predicate: &Predicate,
        order: &[OrderBy],
    ) -> CoreResult<usize> {
        self.cursor = None;
        let keys = SortKeys::resolve(order, &self.schema)?;
        let layout = self.schema.layout()?;
        let store = self.bound_store()?;
        let rows = in_session(store, LockMode::Shared, |s| Ok(s.scan()?))?;
        let scanned = rows.len();

        let mut matches = Vec::new();
        for row in rows {
            let record = Record::from_row(&self.schema, &row)?;
            if predicate.evaluate(&record)? {
                matches.push((layout.key_of(&row), record));
            }
        }
        if !keys.is_empty() {
            matches.sort_by(|(_, a), (_, b)| keys.compare(a, b));
        }

        let count = matches.len();
        debug!(%predicate, scanned, matched = count, "query opened");
        self.cursor = Some(Cursor::new(matches));
        Ok(count)
    }

    /// Loads the next query result into the engine. Returns `false` and
    /// closes the query once the results are exhausted.
    ///
    /// # Errors
    ///
    /// Returns an invalid operation error if no query is open.
    pub fn restore_next(&mut self) -> CoreResult<bool> {
        let cursor = self
            .cursor
            .as_mut()
            .ok_or_else(|| CoreError::invalid_operation("no query is open"))?;
        match cursor.advance() {
            Some((key, record)) => {
                trace!(key = ?key, remaining = cursor.remaining(), "query advanced");
                self.record = record;
                self.last_known_id = Some(key);
                Ok(true)
            }
            None => {
                trace!("query exhausted");
                self.cursor = None;
                Ok(false)
            }
        }
    }

    fn bound_store(&mut self) -> CoreResult<&mut dyn RecordStore> {
        match self.store.as_deref_mut() {
            Some(store) => Ok(store),
            None => Err(CoreError::config("no store bound")),
        }
    }

    /// Coerces and serializes a caller-supplied identity tuple.
    fn key_from_values(&self, id: &[Value]) -> CoreResult<Vec<String>> {
        let identity = self.schema.attributes_of(Role::Identity);
        if id.len() != identity.len() {
            return Err(CoreError::invalid_operation(format!(
                "expected {} identity values, got {}",
                identity.len(),
                id.len()
            )));
        }
        identity
            .iter()
            .zip(id)
            .map(|(attribute, value)| {
                let value = attribute.datatype.coerce(value.clone())?;
                let raw = attribute.datatype.serialize(&value)?;
                if raw.is_empty() {
                    return Err(CoreError::invalid_operation(format!(
                        "identity attribute `{}` has no value",
                        attribute.name
                    )));
                }
                Ok(raw)
            })
            .collect()
    }
}

/// Replaces the entry under `old` with `row` (keyed `new`). Returns `false`
/// if there is no entry under `old`.
///
/// The new row is written before the old one is removed, so a rejected row
/// leaves the store untouched.
fn rewrite(
    store: &mut dyn RecordStore,
    old: &[String],
    new: &[String],
    row: Vec<String>,
) -> CoreResult<bool> {
    if store.get(old)?.is_none() {
        return Ok(false);
    }
    let renamed = old != new;
    if renamed && store.get(new)?.is_some() {
        return Err(CoreError::DuplicateKey { key: new.to_vec() });
    }
    store.put(row)?;
    if renamed {
        store.delete(old)?;
    }
    Ok(true)
}

/// Runs `op` against the store under a lock of the given mode.
///
/// The store is opened after locking and closed before unlocking. If `op`
/// fails the store is discarded instead of closed and the error from `op`
/// is returned.
fn in_session<T>(
    store: &mut dyn RecordStore,
    mode: LockMode,
    op: impl FnOnce(&mut dyn RecordStore) -> CoreResult<T>,
) -> CoreResult<T> {
    match mode {
        LockMode::Shared => store.lock_shared()?,
        LockMode::Exclusive => store.lock_exclusive()?,
    }
    trace!(%mode, kind = %store.kind(), "store locked");

    if let Err(e) = store.open() {
        if let Err(unlock) = store.unlock() {
            warn!(error = %unlock, "unlock after failed open");
        }
        return Err(e.into());
    }

    let result = op(&mut *store);
    let finished = match &result {
        Ok(_) => store.close(),
        Err(_) => store.discard(),
    };
    let unlocked = store.unlock();

    match result {
        Ok(value) => {
            finished?;
            unlocked?;
            Ok(value)
        }
        Err(e) => {
            if let Err(close) = finished {
                warn!(error = %close, "discard after failed operation");
            }
            if let Err(unlock) = unlocked {
                warn!(error = %unlock, "unlock after failed operation");
            }
            Err(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use persist_storage::MemoryStore;
    use tempfile::tempdir;

    fn phone_book() -> Schema {
        let mut schema = Schema::new();
        schema.add_attribute("lastname", Role::Identity, Datatype::varchar(40)).unwrap();
        schema.add_attribute("firstname", Role::Identity, Datatype::varchar(40)).unwrap();
        schema.add_attribute("telnum", Role::Persistent, Datatype::varchar(15)).unwrap();
        schema.add_attribute("age", Role::Persistent, Datatype::number()).unwrap();
        schema.add_attribute("dirty", Role::Transient, Datatype::text()).unwrap();
        schema
    }

    fn id(last: &str, first: &str) -> Vec<Value> {
        vec![Value::from(last), Value::from(first)]
    }

    fn add(engine: &mut RecordEngine, last: &str, first: &str, tel: &str, age: f64) {
        engine.clear();
        engine.set("lastname", last).unwrap();
        engine.set("firstname", first).unwrap();
        engine.set("telnum", tel).unwrap();
        engine.set("age", age).unwrap();
        engine.insert().unwrap();
    }

    fn memory_engine() -> RecordEngine {
        RecordEngine::open(phone_book(), &StoreConfig::memory()).unwrap()
    }

    fn flintstones(engine: &mut RecordEngine) {
        add(engine, "Flintstone", "Fred", "555-1000", 35.0);
        add(engine, "Flintstone", "Wilma", "555-1001", 33.0);
        add(engine, "Flintstone", "Pebbles", "555-1002", 2.0);
        add(engine, "Rubble", "Barney", "555-2000", 34.0);
    }

    #[test]
    fn unconfigured_engine_rejects_store_operations() {
        let mut engine = RecordEngine::new(phone_book());
        assert_eq!(engine.state(), EngineState::Unconfigured);
        engine.set("lastname", "x").unwrap();
        engine.set("firstname", "y").unwrap();
        assert!(matches!(engine.insert(), Err(CoreError::Config { .. })));
        assert!(matches!(
            engine.restore(&id("x", "y")),
            Err(CoreError::Config { .. })
        ));
    }

    #[test]
    fn schema_without_identity_cannot_bind() {
        let mut schema = Schema::new();
        schema.add_attribute("a", Role::Persistent, Datatype::text()).unwrap();
        let err = RecordEngine::open(schema, &StoreConfig::memory()).unwrap_err();
        assert!(matches!(err, CoreError::Config { .. }));
    }

    #[test]
    fn set_coerces_and_rejects() {
        let mut engine = memory_engine();
        engine.set("age", "42").unwrap();
        assert_eq!(engine.get("age").unwrap(), &Value::Number(42.0));

        assert!(matches!(engine.set("age", "old"), Err(CoreError::Datatype(_))));
        assert_eq!(engine.get("age").unwrap(), &Value::Number(42.0));

        assert!(matches!(engine.set("height", 1), Err(CoreError::Schema { .. })));
        assert!(matches!(engine.get("height"), Err(CoreError::Schema { .. })));
    }

    #[test]
    fn data_and_identity_values() {
        let mut engine = memory_engine();
        engine.set("lastname", "Rubble").unwrap();
        engine.set("firstname", "Betty").unwrap();

        let data = engine.data();
        assert_eq!(data.len(), 5);
        assert_eq!(data[0], ("lastname", &Value::from("Rubble")));
        assert_eq!(
            engine.identity_values(),
            vec![&Value::from("Rubble"), &Value::from("Betty")]
        );
    }

    #[test]
    fn insert_then_restore() {
        let mut engine = memory_engine();
        add(&mut engine, "Flintstone", "Fred", "555-1000", 35.0);
        assert_eq!(
            engine.last_known_id(),
            Some(&["Flintstone".to_string(), "Fred".to_string()][..])
        );

        engine.clear();
        engine.set("dirty", "yes").unwrap();
        assert!(engine.restore(&id("Flintstone", "Fred")).unwrap());
        assert_eq!(engine.get("telnum").unwrap(), &Value::from("555-1000"));
        assert_eq!(engine.get("age").unwrap(), &Value::Number(35.0));
        assert_eq!(engine.get("dirty").unwrap(), &Value::Null);
    }

    #[test]
    fn restore_miss_leaves_record() {
        let mut engine = memory_engine();
        engine.set("telnum", "keep").unwrap();
        assert!(!engine.restore(&id("Nobody", "Here")).unwrap());
        assert_eq!(engine.get("telnum").unwrap(), &Value::from("keep"));
        assert_eq!(engine.last_known_id(), None);
    }

    #[test]
    fn restore_checks_identity_arity() {
        let mut engine = memory_engine();
        assert!(matches!(
            engine.restore(&[Value::from("Flintstone")]),
            Err(CoreError::InvalidOperation { .. })
        ));
    }

    #[test]
    fn duplicate_insert_fails() {
        let mut engine = memory_engine();
        add(&mut engine, "Flintstone", "Fred", "555-1000", 35.0);
        engine.set("telnum", "other").unwrap();
        assert!(matches!(engine.insert(), Err(CoreError::DuplicateKey { .. })));

        engine.clear();
        engine.restore(&id("Flintstone", "Fred")).unwrap();
        assert_eq!(engine.get("telnum").unwrap(), &Value::from("555-1000"));
    }

    #[test]
    fn insert_requires_identity_values() {
        let mut engine = memory_engine();
        engine.set("lastname", "Flintstone").unwrap();
        assert!(matches!(
            engine.insert(),
            Err(CoreError::InvalidOperation { .. })
        ));
    }

    #[test]
    fn update_in_place() {
        let mut engine = memory_engine();
        add(&mut engine, "Flintstone", "Fred", "555-1000", 35.0);
        engine.set("telnum", "555-9999").unwrap();
        assert!(engine.update(None).unwrap());

        engine.clear();
        engine.restore(&id("Flintstone", "Fred")).unwrap();
        assert_eq!(engine.get("telnum").unwrap(), &Value::from("555-9999"));
    }

    #[test]
    fn update_renames_identity() {
        let mut engine = memory_engine();
        add(&mut engine, "Slate", "Fred", "555-3000", 50.0);

        engine.set("lastname", "Slaghoople").unwrap();
        engine.update(None).unwrap();

        assert!(!engine.restore(&id("Slate", "Fred")).unwrap());
        assert!(engine.restore(&id("Slaghoople", "Fred")).unwrap());
        assert_eq!(engine.get("telnum").unwrap(), &Value::from("555-3000"));
    }

    #[test]
    fn update_with_explicit_previous_identity() {
        let mut engine = memory_engine();
        add(&mut engine, "A", "One", "1", 1.0);
        engine.clear();
        engine.set("lastname", "B").unwrap();
        engine.set("firstname", "Two").unwrap();
        engine.update(Some(&id("A", "One"))).unwrap();

        assert!(!engine.restore(&id("A", "One")).unwrap());
        assert!(engine.restore(&id("B", "Two")).unwrap());
    }

    #[test]
    fn update_missing_is_not_found() {
        let mut engine = memory_engine();
        engine.set("lastname", "Ghost").unwrap();
        engine.set("firstname", "Casper").unwrap();
        assert!(matches!(engine.update(None), Err(CoreError::NotFound { .. })));
    }

    #[test]
    fn update_onto_existing_identity_is_duplicate() {
        let mut engine = memory_engine();
        add(&mut engine, "A", "One", "1", 1.0);
        add(&mut engine, "B", "Two", "2", 2.0);

        engine.set("lastname", "A").unwrap();
        engine.set("firstname", "One").unwrap();
        assert!(matches!(
            engine.update(None),
            Err(CoreError::DuplicateKey { .. })
        ));
        engine.restore(&id("B", "Two")).unwrap();
        assert_eq!(engine.get("telnum").unwrap(), &Value::from("2"));
    }

    #[test]
    fn save_inserts_then_updates() {
        let mut engine = memory_engine();
        engine.set("lastname", "Rubble").unwrap();
        engine.set("firstname", "Betty").unwrap();
        engine.set("telnum", "555-2001").unwrap();
        assert!(!engine.save().unwrap());

        engine.set("telnum", "555-2002").unwrap();
        assert!(engine.save().unwrap());

        engine.clear();
        engine.restore(&id("Rubble", "Betty")).unwrap();
        assert_eq!(engine.get("telnum").unwrap(), &Value::from("555-2002"));
    }

    #[test]
    fn delete_by_current_and_explicit_identity() {
        let mut engine = memory_engine();
        flintstones(&mut engine);

        assert!(engine.delete(Some(&id("Flintstone", "Pebbles"))).unwrap());
        assert!(!engine.delete(Some(&id("Flintstone", "Pebbles"))).unwrap());

        engine.restore(&id("Rubble", "Barney")).unwrap();
        assert!(engine.delete(None).unwrap());
        assert_eq!(engine.last_known_id(), None);
        assert!(!engine.restore(&id("Rubble", "Barney")).unwrap());
    }

    #[test]
    fn delete_nonexistent_is_false() {
        let mut engine = memory_engine();
        assert!(!engine.delete(Some(&id("No", "One"))).unwrap());
    }

    #[test]
    fn query_with_ordering() {
        let mut engine = memory_engine();
        flintstones(&mut engine);

        let count = engine
            .restore_where("lastname == 'Flintstone'", "age desc")
            .unwrap();
        assert_eq!(count, 3);
        assert_eq!(engine.state(), EngineState::Querying);

        let mut names = Vec::new();
        while engine.restore_next().unwrap() {
            names.push(engine.get("firstname").unwrap().as_text().unwrap().to_string());
        }
        assert_eq!(names, vec!["Fred", "Wilma", "Pebbles"]);
        assert_eq!(engine.state(), EngineState::Configured);
    }

    #[test]
    fn query_without_order_is_identity_ordered() {
        let mut engine = memory_engine();
        flintstones(&mut engine);
        assert_eq!(engine.restore_where("", "").unwrap(), 4);

        let mut names = Vec::new();
        while engine.restore_next().unwrap() {
            names.push(engine.get("firstname").unwrap().as_text().unwrap().to_string());
        }
        assert_eq!(names, vec!["Fred", "Pebbles", "Wilma", "Barney"]);
    }

    #[test]
    fn query_sets_last_known_id_for_update() {
        let mut engine = memory_engine();
        flintstones(&mut engine);
        engine.restore_where("firstname = 'Wilma'", "").unwrap();
        assert!(engine.restore_next().unwrap());
        assert_eq!(
            engine.last_known_id(),
            Some(&["Flintstone".to_string(), "Wilma".to_string()][..])
        );

        engine.set("lastname", "Slaghoople").unwrap();
        engine.update(None).unwrap();
        assert!(engine.restore(&id("Slaghoople", "Wilma")).unwrap());
        assert!(!engine.restore(&id("Flintstone", "Wilma")).unwrap());
    }

    #[test]
    fn query_with_no_matches() {
        let mut engine = memory_engine();
        flintstones(&mut engine);
        assert_eq!(engine.restore_where("age > 100", "").unwrap(), 0);
        assert!(engine.cursor().is_some_and(Cursor::is_exhausted));
        assert!(!engine.restore_next().unwrap());
        assert_eq!(engine.cursor_remaining(), None);
    }

    #[test]
    fn restore_next_without_query_fails() {
        let mut engine = memory_engine();
        assert!(matches!(
            engine.restore_next(),
            Err(CoreError::InvalidOperation { .. })
        ));
    }

    #[test]
    fn new_query_discards_old_cursor() {
        let mut engine = memory_engine();
        flintstones(&mut engine);
        engine.restore_where("", "").unwrap();
        engine.restore_next().unwrap();
        assert_eq!(engine.restore_where("lastname = 'Rubble'", "").unwrap(), 1);
        assert_eq!(engine.cursor_remaining(), Some(1));
    }

    #[test]
    fn cursor_is_a_snapshot() {
        let store = MemoryStore::new();
        let mut engine = RecordEngine::with_store(phone_book(), Box::new(store.clone())).unwrap();
        flintstones(&mut engine);
        engine.restore_where("lastname = 'Flintstone'", "").unwrap();

        let mut other = RecordEngine::with_store(phone_book(), Box::new(store)).unwrap();
        other.delete(Some(&id("Flintstone", "Wilma"))).unwrap();

        let mut seen = 0;
        while engine.restore_next().unwrap() {
            seen += 1;
        }
        assert_eq!(seen, 3);
    }

    #[test]
    fn bad_query_leaves_no_cursor() {
        let mut engine = memory_engine();
        flintstones(&mut engine);
        engine.restore_where("", "").unwrap();
        assert_eq!(engine.state(), EngineState::Querying);
        assert!(matches!(
            engine.restore_where("height > 1", ""),
            Err(CoreError::Query { .. })
        ));
        assert_eq!(engine.state(), EngineState::Configured);
        assert!(engine.cursor().is_none());
        assert!(matches!(engine.restore_next(), Err(CoreError::InvalidOperation { .. })));

        engine.restore_where("", "").unwrap();
        assert!(matches!(
            engine.restore_where("", "height"),
            Err(CoreError::Query { .. })
        ));
        assert_eq!(engine.state(), EngineState::Configured);
        assert!(engine.cursor().is_none());
    }

    #[test]
    fn set_store_resets_session_state() {
        let store = MemoryStore::new();
        let mut engine = RecordEngine::with_store(phone_book(), Box::new(store.clone())).unwrap();
        flintstones(&mut engine);
        engine.restore_where("", "").unwrap();
        assert!(engine.last_known_id().is_some());

        engine.set_store(Box::new(store)).unwrap();
        assert_eq!(engine.state(), EngineState::Configured);
        assert_eq!(engine.last_known_id(), None);
    }

    #[test]
    fn engines_share_a_memory_store() {
        let store = MemoryStore::new();
        let mut writer = RecordEngine::with_store(phone_book(), Box::new(store.clone())).unwrap();
        let mut reader = RecordEngine::with_store(phone_book(), Box::new(store)).unwrap();

        add(&mut writer, "Flintstone", "Fred", "555-1000", 35.0);
        assert!(reader.restore(&id("Flintstone", "Fred")).unwrap());
    }

    #[test]
    fn add_attribute_widens_record() {
        let mut engine = memory_engine();
        engine
            .add_attribute("email", Role::Persistent, Datatype::text())
            .unwrap();
        engine.set("lastname", "Rubble").unwrap();
        engine.set("firstname", "Bamm-Bamm").unwrap();
        engine.set("email", "bb@bedrock").unwrap();
        engine.insert().unwrap();

        engine.clear();
        engine.restore(&id("Rubble", "Bamm-Bamm")).unwrap();
        assert_eq!(engine.get("email").unwrap(), &Value::from("bb@bedrock"));
    }

    #[test]
    fn file_store_round_trip() {
        let dir = tempdir().unwrap();
        let config = StoreConfig::file(dir.path().join("people.txt"));

        let mut engine = RecordEngine::open(phone_book(), &config).unwrap();
        add(&mut engine, "Flintstone", "Fred", "555-1000", 35.0);
        drop(engine);

        let contents = std::fs::read_to_string(dir.path().join("people.txt")).unwrap();
        assert_eq!(contents, "Flintstone|Fred|555-1000|35\n");

        let mut engine = RecordEngine::open(phone_book(), &config).unwrap();
        assert!(engine.restore(&id("Flintstone", "Fred")).unwrap());
        assert_eq!(engine.get("age").unwrap(), &Value::Number(35.0));
    }

    #[test]
    fn rejected_field_leaves_file_untouched() {
        let dir = tempdir().unwrap();
        let config = StoreConfig::file(dir.path().join("people.txt"));
        let mut engine = RecordEngine::open(phone_book(), &config).unwrap();
        add(&mut engine, "Flintstone", "Fred", "555-1000", 35.0);

        engine.set("telnum", "555|1000").unwrap();
        assert!(matches!(engine.update(None), Err(CoreError::Storage(_))));

        engine.clear();
        engine.restore(&id("Flintstone", "Fred")).unwrap();
        assert_eq!(engine.get("telnum").unwrap(), &Value::from("555-1000"));
    }

    #[test]
    fn dbm_store_round_trip() {
        let dir = tempdir().unwrap();
        let config = StoreConfig::dbm(dir.path().join("people.db"));
        {
            let mut engine = RecordEngine::open(phone_book(), &config).unwrap();
            flintstones(&mut engine);
        }
        let mut engine = RecordEngine::open(phone_book(), &config).unwrap();
        assert_eq!(engine.restore_where("age >= 33", "age").unwrap(), 3);
        engine.restore_next().unwrap();
        assert_eq!(engine.get("firstname").unwrap(), &Value::from("Wilma"));
    }
}
