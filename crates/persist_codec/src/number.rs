//! Number datatype.

use crate::datatype::{compare_nulls, Converter};
use crate::error::{CodecError, CodecResult};
use crate::value::Value;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// A finite decimal number.
///
/// `precision` bounds the total digit count and `scale` the fractional
/// digits; values are rounded to `scale` on coercion. Serialization uses
/// the shortest decimal rendering that parses back to the same `f64`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NumberType {
    /// Total significant digits.
    #[serde(default)]
    pub precision: Option<u32>,
    /// Digits after the decimal point.
    #[serde(default)]
    pub scale: Option<u32>,
}

impl NumberType {
    /// Creates a number type with the given limits.
    #[must_use]
    pub fn new(precision: Option<u32>, scale: Option<u32>) -> Self {
        Self { precision, scale }
    }

    fn check(&self, n: f64) -> CodecResult<Value> {
        if !n.is_finite() {
            return Err(CodecError::invalid_number(format!("{n} is not finite")));
        }

        let n = match self.scale {
            Some(scale) => format!("{:.*}", scale as usize, n)
                .parse::<f64>()
                .map_err(|e| CodecError::invalid_number(e.to_string()))?,
            None => n,
        };

        if let Some(precision) = self.precision {
            let allowed = precision.saturating_sub(self.scale.unwrap_or(0)) as usize;
            let int_part = n.abs().trunc();
            let digits = if int_part == 0.0 {
                0
            } else {
                format!("{int_part:.0}").len()
            };
            if digits > allowed {
                return Err(CodecError::invalid_number(format!(
                    "{n} has {digits} integer digits, at most {allowed} allowed"
                )));
            }
        }

        Ok(Value::Number(n))
    }

    fn parse(&self, raw: &str) -> CodecResult<Value> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Ok(Value::Null);
        }
        let n = trimmed
            .parse::<f64>()
            .map_err(|_| CodecError::invalid_number(format!("'{raw}' is not numeric")))?;
        self.check(n)
    }
}

impl Converter for NumberType {
    fn name(&self) -> &'static str {
        "Number"
    }

    fn coerce(&self, value: Value) -> CodecResult<Value> {
        match value {
            Value::Null => Ok(Value::Null),
            Value::Number(n) => self.check(n),
            Value::Text(s) => self.parse(&s),
            other @ Value::Timestamp(_) => {
                Err(CodecError::type_mismatch("Number", other.to_string()))
            }
        }
    }

    fn serialize(&self, value: &Value) -> CodecResult<String> {
        match self.coerce(value.clone())? {
            Value::Number(n) => Ok(format!("{n}")),
            _ => Ok(String::new()),
        }
    }

    fn deserialize(&self, raw: &str) -> CodecResult<Value> {
        self.parse(raw)
    }

    fn compare(&self, a: &Value, b: &Value) -> Ordering {
        if let Some(ord) = compare_nulls(a, b) {
            return ord;
        }
        match (a.as_number(), b.as_number()) {
            (Some(x), Some(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
            _ => a.to_string().cmp(&b.to_string()),
        }
    }
}
