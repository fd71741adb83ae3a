//! In-memory record values and their stored row form.

use crate::error::{CoreError, CoreResult};
use crate::schema::{Role, Schema};
use persist_codec::{Converter, Value};
use persist_storage::Row;

/// The current values of one entity, one slot per schema attribute.
///
/// Slots are indexed by declaration position. A fresh record holds
/// [`Value::Null`] everywhere.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    values: Vec<Value>,
}

impl Record {
    /// Creates a record of `width` null slots.
    #[must_use]
    pub fn with_width(width: usize) -> Self {
        Self {
            values: vec![Value::Null; width],
        }
    }

    /// Number of slots.
    #[must_use]
    pub fn width(&self) -> usize {
        self.values.len()
    }

    /// Value at a declaration position.
    #[must_use]
    pub fn get(&self, position: usize) -> Option<&Value> {
        self.values.get(position)
    }

    /// Replaces the value at a declaration position. The value is stored
    /// as given; coercion is the caller's job.
    pub(crate) fn set(&mut self, position: usize, value: Value) {
        if let Some(slot) = self.values.get_mut(position) {
            *slot = value;
        }
    }

    /// Grows the record to `width` slots, filling with nulls.
    pub(crate) fn widen(&mut self, width: usize) {
        if width > self.values.len() {
            self.values.resize(width, Value::Null);
        }
    }

    /// Resets every slot to null.
    pub fn clear(&mut self) {
        self.values.iter_mut().for_each(|v| *v = Value::Null);
    }

    /// All slots in declaration order.
    #[must_use]
    pub fn values(&self) -> &[Value] {
        &self.values
    }

    /// Serializes the persisted attributes into a stored row.
    ///
    /// # Errors
    ///
    /// Returns a datatype error if a value falls outside its attribute's
    /// domain.
    pub fn to_row(&self, schema: &Schema) -> CoreResult<Row> {
        schema
            .iter()
            .zip(&self.values)
            .filter(|(a, _)| a.role.is_persisted())
            .map(|(a, v)| a.datatype.serialize(v).map_err(CoreError::from))
            .collect()
    }

    /// Rebuilds a record from a stored row. Transient slots are null.
    ///
    /// # Errors
    ///
    /// Returns a datatype error if a stored field does not parse.
    pub fn from_row(schema: &Schema, row: &[String]) -> CoreResult<Self> {
        let mut fields = row.iter();
        let mut values = Vec::with_capacity(schema.len());
        for attribute in schema {
            if !attribute.role.is_persisted() {
                values.push(Value::Null);
                continue;
            }
            let raw = fields.next().ok_or_else(|| {
                CoreError::schema(format!(
                    "stored row has {} fields, schema persists more",
                    row.len()
                ))
            })?;
            values.push(attribute.datatype.deserialize(raw)?);
        }
        Ok(Self { values })
    }

    /// Serialized identity tuple, in declaration order.
    ///
    /// # Errors
    ///
    /// Returns an invalid operation error if any identity value is empty,
    /// or a datatype error if one does not serialize.
    pub fn identity_key(&self, schema: &Schema) -> CoreResult<Vec<String>> {
        schema
            .iter()
            .zip(&self.values)
            .filter(|(a, _)| a.role == Role::Identity)
            .map(|(a, v)| {
                let raw = a.datatype.serialize(v)?;
                if raw.is_empty() {
                    Err(CoreError::invalid_operation(format!(
                        "identity attribute `{}` has no value",
                        a.name
                    )))
                } else {
                    Ok(raw)
                }
            })
            .collect()
    }
}
