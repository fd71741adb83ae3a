//! # Persist Core
//!
//! Schema-driven record persistence.
//!
//! An entity is described by a [`Schema`]: an ordered list of attributes,
//! each with a [`Role`] and a [`Datatype`]. A [`RecordEngine`] holds one
//! record of that shape and moves it to and from a store:
//!
//! - [`RecordEngine::restore`] loads a record by identity
//! - [`RecordEngine::insert`], [`RecordEngine::update`] and
//!   [`RecordEngine::save`] write it
//! - [`RecordEngine::delete`] removes it
//! - [`RecordEngine::restore_where`] and [`RecordEngine::restore_next`]
//!   iterate over the records a [`Predicate`] selects
//!
//! The store is chosen with a [`StoreConfig`]: in-memory, a delimited flat
//! file, or a DBM-style key-value file. On-disk stores coordinate readers
//! and writers through a lock file beside the data.
//!
//! ## Example
//!
//! ```rust
//! use persist_core::{Datatype, RecordEngine, Role, Schema, StoreConfig};
//!
//! let mut schema = Schema::new();
//! schema.add_attribute("lastname", Role::Identity, Datatype::varchar(40)).unwrap();
//! schema.add_attribute("firstname", Role::Identity, Datatype::varchar(40)).unwrap();
//! schema.add_attribute("age", Role::Persistent, Datatype::number()).unwrap();
//!
//! let mut engine = RecordEngine::open(schema, &StoreConfig::memory()).unwrap();
//! for (first, age) in [("Fred", 35), ("Wilma", 33), ("Pebbles", 2)] {
//!     engine.clear();
//!     engine.set("lastname", "Flintstone").unwrap();
//!     engine.set("firstname", first).unwrap();
//!     engine.set("age", age).unwrap();
//!     engine.insert().unwrap();
//! }
//!
//! let adults = engine.restore_where("age >= 18", "age desc").unwrap();
//! assert_eq!(adults, 2);
//! while engine.restore_next().unwrap() {
//!     println!("{:?}", engine.get("firstname").unwrap());
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod definition;
mod engine;
mod error;
mod query;
mod record;
mod schema;

pub use config::StoreConfig;
pub use definition::SchemaDef;
pub use engine::{EngineState, RecordEngine};
pub use error::{CoreError, CoreResult};
pub use query::{Cursor, Direction, OrderBy, Predicate};
pub use record::Record;
pub use schema::{AttributeDescriptor, Role, Schema};

// Re-export the value model and store layer for convenience
pub use persist_codec::{Converter, Datatype, Operand, Operator, Value};
pub use persist_storage::{LockMode, MemoryStore, RecordStore, StoreKind};
