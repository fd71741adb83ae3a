//! Query result cursor.

use crate::record::Record;
use std::collections::VecDeque;

/// Snapshot of the records a query matched, in delivery order.
///
/// Each entry keeps the stored identity tuple alongside the record so the
/// engine can remember it as the last known identity on delivery. Later
/// changes to the store do not affect an open cursor.
#[derive(Debug, Default)]
pub struct Cursor {
    entries: VecDeque<(Vec<String>, Record)>,
}

impl Cursor {
    pub(crate) fn new(entries: Vec<(Vec<String>, Record)>) -> Self {
        Self {
            entries: entries.into(),
        }
    }

    /// Number of records not yet delivered.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.entries.len()
    }

    /// Whether every record has been delivered.
    #[must_use]
    pub fn is_exhausted(&self) -> bool {
        self.entries.is_empty()
    }

    pub(crate) fn advance(&mut self) -> Option<(Vec<String>, Record)> {
        self.entries.pop_front()
    }
}
