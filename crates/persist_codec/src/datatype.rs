//! The converter capability and the datatype catalogue.

use crate::error::{CodecError, CodecResult};
use crate::number::NumberType;
use crate::operator::{Operand, Operator};
use crate::text::TextType;
use crate::timestamp::TimestampType;
use crate::value::Value;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Marshalling and comparison rules for one datatype.
///
/// # Invariants
///
/// - `coerce` is the single gate into the datatype's domain; every other
///   method assumes (and re-checks where cheap) a coerced value
/// - `deserialize(serialize(v)) == v` for every coerced `v`
/// - `Value::Null` serializes to the empty string and compares below
///   every non-null value
pub trait Converter {
    /// Human-readable datatype name.
    fn name(&self) -> &'static str;

    /// Validates and normalizes a value into this datatype's domain.
    ///
    /// # Errors
    ///
    /// Returns an error if the value cannot be represented.
    fn coerce(&self, value: Value) -> CodecResult<Value>;

    /// Renders a value as its raw stored form.
    ///
    /// # Errors
    ///
    /// Returns an error if the value is outside the domain.
    fn serialize(&self, value: &Value) -> CodecResult<String>;

    /// Parses a raw stored form back into a value.
    ///
    /// # Errors
    ///
    /// Returns an error if `raw` is not a valid rendering.
    fn deserialize(&self, raw: &str) -> CodecResult<Value>;

    /// Orders two values of this datatype.
    fn compare(&self, a: &Value, b: &Value) -> Ordering;

    /// Evaluates `value <op> operand`.
    ///
    /// Comparison operators use [`Converter::compare`]; pattern operators
    /// run the regex over the serialized form.
    ///
    /// # Errors
    ///
    /// Returns an error if the operator and operand kinds disagree.
    fn matches(&self, value: &Value, op: Operator, operand: &Operand) -> CodecResult<bool> {
        match operand {
            Operand::Pattern(re) => {
                if !op.is_pattern() {
                    return Err(CodecError::invalid_operand(
                        op.symbol(),
                        "expects a value, got a pattern",
                    ));
                }
                let found = re.is_match(&self.serialize(value)?);
                Ok(if op == Operator::Matches { found } else { !found })
            }
            Operand::Value(other) => {
                if op.is_pattern() {
                    return Err(CodecError::invalid_operand(
                        op.symbol(),
                        "expects a pattern, got a value",
                    ));
                }
                Ok(op.holds(self.compare(value, other)))
            }
        }
    }
}

/// Orders nulls first; returns `None` when both values are non-null.
pub(crate) fn compare_nulls(a: &Value, b: &Value) -> Option<Ordering> {
    match (a.is_null(), b.is_null()) {
        (true, true) => Some(Ordering::Equal),
        (true, false) => Some(Ordering::Less),
        (false, true) => Some(Ordering::Greater),
        (false, false) => None,
    }
}

/// A datatype together with its constructor arguments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Datatype {
    /// Variable or fixed width text.
    Text(TextType),
    /// Decimal number with optional precision and scale.
    Number(NumberType),
    /// Second-or-finer calendar timestamp.
    Timestamp(TimestampType),
}

impl Datatype {
    /// Unbounded text.
    #[must_use]
    pub fn text() -> Self {
        Datatype::Text(TextType::default())
    }

    /// Text of at most `max_len` characters.
    #[must_use]
    pub fn varchar(max_len: usize) -> Self {
        Datatype::Text(TextType::bounded(max_len))
    }

    /// Fixed width text, space padded to `len` characters.
    #[must_use]
    pub fn char(len: usize) -> Self {
        Datatype::Text(TextType::fixed(len))
    }

    /// Unconstrained number.
    #[must_use]
    pub fn number() -> Self {
        Datatype::Number(NumberType::default())
    }

    /// Number with `precision` significant digits, `scale` of them fractional.
    #[must_use]
    pub fn decimal(precision: u32, scale: u32) -> Self {
        Datatype::Number(NumberType::new(Some(precision), Some(scale)))
    }

    /// Timestamp.
    #[must_use]
    pub fn timestamp() -> Self {
        Datatype::Timestamp(TimestampType)
    }

    /// Looks up a datatype by name and applies its constructor arguments.
    ///
    /// Names are case-insensitive: `VarChar`/`Text`/`String`, `Char`,
    /// `Number`/`Numeric`/`Decimal`, `Timestamp`/`DateTime`.
    ///
    /// # Errors
    ///
    /// Returns an error if the name is unknown or the arguments do not fit.
    pub fn from_name(name: &str, args: &[u32]) -> CodecResult<Self> {
        match name.to_ascii_lowercase().as_str() {
            "varchar" | "text" | "string" => match args {
                [] => Ok(Self::text()),
                [max] if *max > 0 => Ok(Self::varchar(*max as usize)),
                _ => Err(CodecError::invalid_arguments(
                    "Text",
                    "expected at most one positive maximum length",
                )),
            },
            "char" => match args {
                [len] if *len > 0 => Ok(Self::char(*len as usize)),
                _ => Err(CodecError::invalid_arguments(
                    "Char",
                    "expected exactly one positive length",
                )),
            },
            "number" | "numeric" | "decimal" => match args {
                [] => Ok(Self::number()),
                [precision] if *precision > 0 => {
                    Ok(Datatype::Number(NumberType::new(Some(*precision), None)))
                }
                [precision, scale] if *precision > 0 && scale <= precision => {
                    Ok(Self::decimal(*precision, *scale))
                }
                _ => Err(CodecError::invalid_arguments(
                    "Number",
                    "expected [precision] or [precision, scale] with scale <= precision",
                )),
            },
            "timestamp" | "datetime" => {
                if args.is_empty() {
                    Ok(Self::timestamp())
                } else {
                    Err(CodecError::invalid_arguments(
                        "Timestamp",
                        "takes no arguments",
                    ))
                }
            }
            _ => Err(CodecError::unknown_datatype(name)),
        }
    }

    /// The converter implementing this datatype.
    pub fn converter(&self) -> &dyn Converter {
        match self {
            Datatype::Text(t) => t,
            Datatype::Number(n) => n,
            Datatype::Timestamp(t) => t,
        }
    }
}

impl Converter for Datatype {
    fn name(&self) -> &'static str {
        self.converter().name()
    }

    fn coerce(&self, value: Value) -> CodecResult<Value> {
        self.converter().coerce(value)
    }

    fn serialize(&self, value: &Value) -> CodecResult<String> {
        self.converter().serialize(value)
    }

    fn deserialize(&self, raw: &str) -> CodecResult<Value> {
        self.converter().deserialize(raw)
    }

    fn compare(&self, a: &Value, b: &Value) -> Ordering {
        self.converter().compare(a, b)
    }

    fn matches(&self, value: &Value, op: Operator, operand: &Operand) -> CodecResult<bool> {
        self.converter().matches(value, op, operand)
    }
}
