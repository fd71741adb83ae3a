//! Result ordering.

use crate::error::{CoreError, CoreResult};
use crate::record::Record;
use crate::schema::Schema;
use persist_codec::{Converter, Datatype, Value};
use std::cmp::Ordering;
use std::fmt;

/// Sort direction of one ordering key.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Direction {
    /// Smallest first. Nulls sort before every value.
    #[default]
    Asc,
    /// Largest first.
    Desc,
}

/// One ordering key: an attribute and a direction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderBy {
    /// Attribute to order by.
    pub attribute: String,
    /// Sort direction.
    pub direction: Direction,
}

impl OrderBy {
    /// Ascending order on `attribute`.
    pub fn asc(attribute: impl Into<String>) -> Self {
        Self {
            attribute: attribute.into(),
            direction: Direction::Asc,
        }
    }

    /// Descending order on `attribute`.
    pub fn desc(attribute: impl Into<String>) -> Self {
        Self {
            attribute: attribute.into(),
            direction: Direction::Desc,
        }
    }

    /// Parses a comma-separated list such as `"lastname, age desc"`.
    ///
    /// Each entry is an attribute name optionally followed by `asc` or
    /// `desc` (any case). An empty or blank string yields no keys.
    ///
    /// # Errors
    ///
    /// Returns a query error for empty entries or unknown directions.
    pub fn parse_list(input: &str) -> CoreResult<Vec<OrderBy>> {
        if input.trim().is_empty() {
            return Ok(Vec::new());
        }
        input.split(',').map(Self::parse_one).collect()
    }

    fn parse_one(entry: &str) -> CoreResult<OrderBy> {
        let mut words = entry.split_whitespace();
        let attribute = words
            .next()
            .ok_or_else(|| CoreError::query("empty entry in order list"))?;
        let direction = match words.next().map(str::to_ascii_lowercase).as_deref() {
            None | Some("asc" | "ascending") => Direction::Asc,
            Some("desc" | "descending") => Direction::Desc,
            Some(other) => {
                return Err(CoreError::query(format!(
                    "unknown sort direction `{other}` for `{attribute}`"
                )))
            }
        };
        if let Some(extra) = words.next() {
            return Err(CoreError::query(format!(
                "unexpected `{extra}` in order entry `{}`",
                entry.trim()
            )));
        }
        Ok(OrderBy {
            attribute: attribute.to_string(),
            direction,
        })
    }
}

impl fmt::Display for OrderBy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.direction {
            Direction::Asc => write!(f, "{} asc", self.attribute),
            Direction::Desc => write!(f, "{} desc", self.attribute),
        }
    }
}

/// Ordering keys resolved against a schema.
#[derive(Debug, Clone)]
pub(crate) struct SortKeys {
    keys: Vec<(usize, Datatype, Direction)>,
}

impl SortKeys {
    pub(crate) fn resolve(order: &[OrderBy], schema: &Schema) -> CoreResult<Self> {
        let keys = order
            .iter()
            .map(|o| {
                let (position, descriptor) = schema.require(&o.attribute).map_err(|_| {
                    CoreError::query(format!("unknown order attribute `{}`", o.attribute))
                })?;
                Ok((position, descriptor.datatype.clone(), o.direction))
            })
            .collect::<CoreResult<Vec<_>>>()?;
        Ok(Self { keys })
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub(crate) fn compare(&self, a: &Record, b: &Record) -> Ordering {
        for (position, datatype, direction) in &self.keys {
            let left = a.get(*position).unwrap_or(&Value::Null);
            let right = b.get(*position).unwrap_or(&Value::Null);
            let ordering = match direction {
                Direction::Asc => datatype.compare(left, right),
                Direction::Desc => datatype.compare(right, left),
            };
            if ordering != Ordering::Equal {
                return ordering;
            }
        }
        Ordering::Equal
    }
}
