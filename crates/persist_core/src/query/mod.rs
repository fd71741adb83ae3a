//! Predicate queries over a store's records.
//!
//! A query is a [`Predicate`] plus an optional list of [`OrderBy`] keys.
//! The engine scans the store, keeps the records the predicate accepts,
//! sorts them with a stable sort and hands them out through a [`Cursor`].
//! Records that compare equal on every key keep the store's identity order.

mod cursor;
mod lexer;
mod order;
mod predicate;

pub use cursor::Cursor;
pub use order::{Direction, OrderBy};
pub use predicate::Predicate;

pub(crate) use order::SortKeys;
