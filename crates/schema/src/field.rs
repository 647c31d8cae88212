//! Interned field identifiers.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_RECORD_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identifier of one record schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RecordId(u64);

impl RecordId {
    pub(crate) fn next() -> Self {
        Self(NEXT_RECORD_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Raw numeric value, only meaningful within the current process.
    #[must_use]
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Opaque token for one field of one record type.
///
/// Identity is `(declaring record, position)`. The name is carried along for
/// rendering only, so identifiers of two unrelated records never compare
/// equal even when their names match. A sub-record inherits its parent's
/// identifiers unchanged.
#[derive(Clone)]
pub struct FieldId {
    record: RecordId,
    index: u32,
    name: Arc<str>,
    record_name: Arc<str>,
}

impl FieldId {
    pub(crate) fn new(record: RecordId, index: u32, name: Arc<str>, record_name: Arc<str>) -> Self {
        Self {
            record,
            index,
            name,
            record_name,
        }
    }

    /// Canonical field name, as used for input and output mappings.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The record that declared this field.
    #[must_use]
    pub fn record(&self) -> RecordId {
        self.record
    }

    /// Name of the record that declared this field.
    #[must_use]
    pub fn record_name(&self) -> &str {
        &self.record_name
    }

    /// Position of the field within its declaring record.
    #[must_use]
    pub fn index(&self) -> u32 {
        self.index
    }
}

impl PartialEq for FieldId {
    fn eq(&self, other: &Self) -> bool {
        self.record == other.record && self.index == other.index
    }
}

impl Eq for FieldId {}

impl Hash for FieldId {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.record.hash(state);
        self.index.hash(state);
    }
}

impl fmt::Debug for FieldId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.record_name, self.name)
    }
}

impl fmt::Display for FieldId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}
