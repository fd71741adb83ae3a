//! Property-based test generators using proptest.
//!
//! Generated text never contains a store delimiter or line terminator, so
//! every value produced here can be written to any store.

use chrono::NaiveDateTime;
use persist_core::{Datatype, Role, Value};
use proptest::prelude::*;

/// Latest instant a timestamp may hold: 9999-12-31 23:59:59.
const MAX_TIMESTAMP_SECS: i64 = 253_402_300_799;

/// Strategy for generating valid attribute names.
pub fn attribute_name_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-z][a-z0-9_]{0,15}").expect("Invalid regex")
}

/// Strategy for generating attribute roles.
pub fn role_strategy() -> impl Strategy<Value = Role> {
    prop_oneof![
        Just(Role::Identity),
        Just(Role::Persistent),
        Just(Role::Transient)
    ]
}

/// Strategy for generating datatypes with valid arguments.
pub fn datatype_strategy() -> impl Strategy<Value = Datatype> {
    prop_oneof![
        Just(Datatype::text()),
        (1usize..64).prop_map(Datatype::varchar),
        (1usize..16).prop_map(Datatype::char),
        Just(Datatype::number()),
        (1u32..15).prop_flat_map(|p| (Just(p), 0..=p)).prop_map(|(p, s)| Datatype::decimal(p, s)),
        Just(Datatype::timestamp()),
    ]
}

/// Strategy for non-empty, store-safe identity text.
pub fn identity_text_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[A-Za-z][A-Za-z0-9 .'-]{0,23}")
        .expect("Invalid regex")
        .prop_map(|s| s.trim_end().to_string())
}

/// Strategy for store-safe text of at most `max_len` characters.
pub fn text_strategy(max_len: usize) -> impl Strategy<Value = String> {
    prop::string::string_regex(&format!("[A-Za-z0-9 .,_@#()-]{{0,{max_len}}}"))
        .expect("Invalid regex")
}

/// Strategy for numbers representable at the given scale.
pub fn number_strategy(scale: u32) -> impl Strategy<Value = f64> {
    let factor = 10f64.powi(scale as i32);
    (-1_000_000_000i64..1_000_000_000).prop_map(move |n| n as f64 / factor)
}

/// Strategy for timestamps within years 0000 through 9999, whole
/// milliseconds.
pub fn timestamp_strategy() -> impl Strategy<Value = NaiveDateTime> {
    (-62_167_219_200i64..=MAX_TIMESTAMP_SECS, 0u32..1000).prop_map(|(secs, millis)| {
        chrono::DateTime::from_timestamp(secs, millis * 1_000_000)
            .expect("Timestamp in range")
            .naive_utc()
    })
}

/// Strategy for a value valid for `datatype`, possibly null.
pub fn value_strategy(datatype: &Datatype) -> BoxedStrategy<Value> {
    let present = match datatype {
        Datatype::Text(text) => match (text.max_len, text.padded) {
            (Some(len), false) => text_strategy(len).prop_map(Value::from).boxed(),
            (Some(len), true) => text_strategy(len)
                .prop_map(move |s| Value::from(format!("{s:<len$}")))
                .boxed(),
            (None, _) => text_strategy(64).prop_map(Value::from).boxed(),
        },
        Datatype::Number(number) => {
            let scale = number.scale.unwrap_or(4).min(6);
            let digits = number.precision.unwrap_or(15);
            number_strategy(scale)
                .prop_map(move |n| {
                    let limit = 10f64.powi(digits.saturating_sub(scale) as i32);
                    Value::Number(n % limit)
                })
                .boxed()
        }
        Datatype::Timestamp(_) => timestamp_strategy().prop_map(Value::Timestamp).boxed(),
    };
    prop_oneof![1 => Just(Value::Null), 6 => present].boxed()
}

/// A phone book entry: last name, first name, telephone number, age.
pub type Person = (String, String, String, f64);

/// Strategy for phone book entries.
pub fn person_strategy() -> impl Strategy<Value = Person> {
    (
        identity_text_strategy(),
        identity_text_strategy(),
        prop::string::string_regex("555-[0-9]{4}").expect("Invalid regex"),
        (0u32..120).prop_map(f64::from),
    )
}
