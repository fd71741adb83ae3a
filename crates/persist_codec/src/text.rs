//! Text datatype.

use crate::datatype::{compare_nulls, Converter};
use crate::error::{CodecError, CodecResult};
use crate::value::Value;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Text with an optional length limit.
///
/// With `padded` set the text is fixed width: shorter values are filled
/// with trailing spaces up to `max_len`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextType {
    /// Maximum length in characters.
    #[serde(default)]
    pub max_len: Option<usize>,
    /// Pad to exactly `max_len` characters.
    #[serde(default)]
    pub padded: bool,
}

impl TextType {
    /// Text of at most `max_len` characters.
    #[must_use]
    pub fn bounded(max_len: usize) -> Self {
        Self {
            max_len: Some(max_len),
            padded: false,
        }
    }

    /// Text of exactly `len` characters.
    #[must_use]
    pub fn fixed(len: usize) -> Self {
        Self {
            max_len: Some(len),
            padded: true,
        }
    }

    fn fit(&self, mut text: String) -> CodecResult<Value> {
        if text.is_empty() {
            return Ok(Value::Null);
        }
        if let Some(max) = self.max_len {
            let len = text.chars().count();
            if len > max {
                return Err(CodecError::TooLong { len, max });
            }
            if self.padded {
                text.extend(std::iter::repeat(' ').take(max - len));
            }
        }
        Ok(Value::Text(text))
    }
}

impl Converter for TextType {
    fn name(&self) -> &'static str {
        if self.padded {
            "Char"
        } else {
            "Text"
        }
    }

    fn coerce(&self, value: Value) -> CodecResult<Value> {
        match value {
            Value::Null => Ok(Value::Null),
            Value::Text(s) => self.fit(s),
            other @ (Value::Number(_) | Value::Timestamp(_)) => {
                // Display quotes text only, so numbers and timestamps render bare.
                self.fit(other.to_string())
            }
        }
    }

    fn serialize(&self, value: &Value) -> CodecResult<String> {
        match self.coerce(value.clone())? {
            Value::Text(s) => Ok(s),
            _ => Ok(String::new()),
        }
    }

    fn deserialize(&self, raw: &str) -> CodecResult<Value> {
        self.fit(raw.to_string())
    }

    fn compare(&self, a: &Value, b: &Value) -> Ordering {
        if let Some(ord) = compare_nulls(a, b) {
            return ord;
        }
        match (a, b) {
            (Value::Text(x), Value::Text(y)) => x.cmp(y),
            _ => a.to_string().cmp(&b.to_string()),
        }
    }
}
