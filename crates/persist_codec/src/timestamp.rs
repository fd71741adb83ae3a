//! Timestamp datatype.

use crate::datatype::{compare_nulls, Converter};
use crate::error::{CodecError, CodecResult};
use crate::value::Value;
use chrono::{Datelike, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Canonical stored form. Fixed-width fields keep lexicographic and
/// chronological order identical; the fraction is omitted when zero.
pub const CANONICAL_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";

const ACCEPTED_FORMATS: [&str; 2] = [CANONICAL_FORMAT, "%Y-%m-%dT%H:%M:%S%.f"];

/// A calendar timestamp in years 0000 through 9999.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimestampType;

impl TimestampType {
    fn check(ts: NaiveDateTime) -> CodecResult<Value> {
        if (0..=9999).contains(&ts.year()) {
            Ok(Value::Timestamp(ts))
        } else {
            Err(CodecError::invalid_timestamp(format!(
                "year {} is outside 0000-9999",
                ts.year()
            )))
        }
    }

    fn parse(raw: &str) -> CodecResult<Value> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Ok(Value::Null);
        }
        for format in ACCEPTED_FORMATS {
            if let Ok(ts) = NaiveDateTime::parse_from_str(trimmed, format) {
                return Self::check(ts);
            }
        }
        let midnight = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
            .ok()
            .and_then(|d| d.and_hms_opt(0, 0, 0));
        match midnight {
            Some(ts) => Self::check(ts),
            None => Err(CodecError::invalid_timestamp(format!(
                "'{raw}' is not YYYY-MM-DD[ HH:MM:SS[.fff]]"
            ))),
        }
    }
}

impl Converter for TimestampType {
    fn name(&self) -> &'static str {
        "Timestamp"
    }

    fn coerce(&self, value: Value) -> CodecResult<Value> {
        match value {
            Value::Null => Ok(Value::Null),
            Value::Timestamp(ts) => Self::check(ts),
            Value::Text(s) => Self::parse(&s),
            other @ Value::Number(_) => {
                Err(CodecError::type_mismatch("Timestamp", other.to_string()))
            }
        }
    }

    fn serialize(&self, value: &Value) -> CodecResult<String> {
        match self.coerce(value.clone())? {
            Value::Timestamp(ts) => Ok(ts.format(CANONICAL_FORMAT).to_string()),
            _ => Ok(String::new()),
        }
    }

    fn deserialize(&self, raw: &str) -> CodecResult<Value> {
        Self::parse(raw)
    }

    fn compare(&self, a: &Value, b: &Value) -> Ordering {
        if let Some(ord) = compare_nulls(a, b) {
            return ord;
        }
        match (a.as_timestamp(), b.as_timestamp()) {
            (Some(x), Some(y)) => x.cmp(&y),
            _ => a.to_string().cmp(&b.to_string()),
        }
    }
}
