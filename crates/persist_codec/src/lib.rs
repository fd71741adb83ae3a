//! # Persist Codec
//!
//! Value model and datatype converters for persist.
//!
//! Every attribute of a schema carries a [`Datatype`]. The datatype's
//! [`Converter`] is the only code that knows how a value is rendered into
//! the delimited text the stores keep, how it is read back, and how two
//! values order against each other.
//!
//! ## Datatypes
//!
//! | Datatype | Stored form | Ordering |
//! |---|---|---|
//! | [`Datatype::text`], [`Datatype::varchar`], [`Datatype::char`] | the text itself | lexicographic |
//! | [`Datatype::number`], [`Datatype::decimal`] | shortest round-trip decimal | numeric |
//! | [`Datatype::timestamp`] | `YYYY-MM-DD HH:MM:SS[.fff]` | chronological |
//!
//! The empty value of every datatype is [`Value::Null`], stored as the
//! empty string.
//!
//! ## Usage
//!
//! ```
//! use persist_codec::{Converter, Datatype, Value};
//!
//! let price = Datatype::decimal(8, 2);
//! let v = price.coerce(Value::from("19.999")).unwrap();
//! assert_eq!(v, Value::Number(20.0));
//!
//! let raw = price.serialize(&v).unwrap();
//! assert_eq!(price.deserialize(&raw).unwrap(), v);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod datatype;
mod error;
mod number;
mod operator;
mod text;
mod timestamp;
mod value;

pub use datatype::{Converter, Datatype};
pub use error::{CodecError, CodecResult};
pub use number::NumberType;
pub use operator::{Operand, Operator};
pub use text::TextType;
pub use timestamp::{TimestampType, CANONICAL_FORMAT};
pub use value::Value;

pub use regex::Regex;
