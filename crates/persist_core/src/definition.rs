//! Declarative entity definitions.

use crate::config::StoreConfig;
use crate::engine::RecordEngine;
use crate::error::{CoreError, CoreResult};
use crate::schema::{AttributeDescriptor, Schema};
use serde::{Deserialize, Serialize};

/// A schema and store configuration loaded from JSON.
///
/// ```json
/// {
///   "attributes": [
///     { "name": "lastname", "role": "identity", "datatype": { "text": { "max_len": 40, "padded": false } } },
///     { "name": "telnum", "role": "persistent", "datatype": { "text": { "max_len": 15, "padded": false } } }
///   ],
///   "store": { "kind": "file", "location": "people.txt" }
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaDef {
    /// Attribute declarations, in order.
    pub attributes: Vec<AttributeDescriptor>,
    /// Store the entity persists to.
    #[serde(default)]
    pub store: StoreConfig,
}

impl SchemaDef {
    /// Parses a definition from JSON.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the JSON is malformed.
    pub fn from_json(json: &str) -> CoreResult<Self> {
        serde_json::from_str(json).map_err(|e| CoreError::config(format!("invalid definition: {e}")))
    }

    /// Renders the definition as pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if serialization fails.
    pub fn to_json(&self) -> CoreResult<String> {
        serde_json::to_string_pretty(self).map_err(|e| CoreError::config(e.to_string()))
    }

    /// Builds the schema this definition declares.
    ///
    /// # Errors
    ///
    /// Returns a schema error for empty or duplicate attribute names.
    pub fn schema(&self) -> CoreResult<Schema> {
        Schema::from_descriptors(self.attributes.iter().cloned())
    }

    /// Builds a configured engine.
    ///
    /// # Errors
    ///
    /// Returns a schema or configuration error if the definition is
    /// inconsistent.
    pub fn into_engine(self) -> CoreResult<RecordEngine> {
        let schema = Schema::from_descriptors(self.attributes)?;
        RecordEngine::open(schema, &self.store)
    }
}
