//! Model-checking harness.
//!
//! Mirrors every write made through a phone book engine in an in-memory
//! map, so tests can check the store against what it should contain.

use crate::fixtures::{phone_book_schema, TestStore};
use crate::generators::Person;
use persist_core::{CoreError, CoreResult, RecordEngine, StoreKind, Value};
use std::collections::BTreeMap;

/// A phone book engine paired with the contents it should hold.
pub struct ModelHarness {
    /// The engine under test.
    pub engine: RecordEngine,
    _store: TestStore,
    model: BTreeMap<(String, String), (String, f64)>,
}

impl ModelHarness {
    /// Creates a harness over a fresh store of the given medium.
    pub fn new(kind: StoreKind) -> Self {
        let store = TestStore::new(kind);
        let engine = store.engine(phone_book_schema());
        Self {
            engine,
            _store: store,
            model: BTreeMap::new(),
        }
    }

    /// Entries the store should contain.
    pub fn expected_len(&self) -> usize {
        self.model.len()
    }

    /// Inserts a person, mirroring the outcome in the model.
    pub fn insert(&mut self, person: &Person) -> CoreResult<()> {
        let (last, first, telnum, age) = person;
        load(&mut self.engine, person)?;
        let result = self.engine.insert();
        let key = (last.clone(), first.clone());
        match &result {
            Ok(()) => {
                assert!(
                    !self.model.contains_key(&key),
                    "insert succeeded over existing {key:?}"
                );
                self.model.insert(key, (telnum.clone(), *age));
            }
            Err(CoreError::DuplicateKey { .. }) => {
                assert!(self.model.contains_key(&key), "spurious duplicate {key:?}");
            }
            Err(_) => {}
        }
        result
    }

    /// Saves a person, mirroring the outcome in the model.
    ///
    /// The record is cleared first, so `save` upserts by the person's own
    /// identity.
    pub fn save(&mut self, person: &Person) -> CoreResult<bool> {
        let (last, first, telnum, age) = person;
        load(&mut self.engine, person)?;

        let updated = self.engine.save()?;
        let key = (last.clone(), first.clone());
        assert_eq!(updated, self.model.contains_key(&key), "save outcome for {key:?}");
        self.model.insert(key, (telnum.clone(), *age));
        Ok(updated)
    }

    /// Deletes a person by identity, mirroring the outcome in the model.
    pub fn delete(&mut self, last: &str, first: &str) -> CoreResult<bool> {
        let removed = self
            .engine
            .delete(Some(&[Value::from(last), Value::from(first)]))?;
        let expected = self
            .model
            .remove(&(last.to_string(), first.to_string()))
            .is_some();
        assert_eq!(removed, expected, "delete outcome for {last}/{first}");
        Ok(removed)
    }

    /// Checks every modelled entry through `restore` and the full set
    /// through an unfiltered query.
    pub fn verify(&mut self) {
        for ((last, first), (telnum, age)) in &self.model {
            let found = self
                .engine
                .restore(&[Value::from(last.as_str()), Value::from(first.as_str())])
                .expect("Failed to restore");
            assert!(found, "missing {last}/{first}");
            assert_eq!(self.engine.get("telnum").unwrap(), &Value::from(telnum.as_str()));
            assert_eq!(self.engine.get("age").unwrap(), &Value::Number(*age));
        }

        let count = self.engine.restore_where("", "").expect("Failed to query");
        assert_eq!(count, self.model.len(), "query count");

        let mut keys = Vec::new();
        while self.engine.restore_next().expect("Failed to advance") {
            let last = self.engine.get("lastname").unwrap().as_text().unwrap_or_default();
            let first = self.engine.get("firstname").unwrap().as_text().unwrap_or_default();
            keys.push((last.to_string(), first.to_string()));
        }
        let expected: Vec<_> = self.model.keys().cloned().collect();
        assert_eq!(keys, expected, "query returns identity order");
    }
}

fn load(engine: &mut RecordEngine, person: &Person) -> CoreResult<()> {
    let (last, first, telnum, age) = person;
    engine.clear();
    engine.set("lastname", last.as_str())?;
    engine.set("firstname", first.as_str())?;
    engine.set("telnum", telnum.as_str())?;
    engine.set("age", *age)?;
    Ok(())
}
