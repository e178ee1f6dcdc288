//! Records paired with their version accessor.

use std::fmt;
use std::sync::Arc;

use crate::accessor::{FieldVersion, Record, SharedAccessor};

/// A raw record paired with the accessor that knows where its version lives.
#[derive(Clone)]
pub struct VersionedEvent {
    record: Record,
    accessor: SharedAccessor,
}

impl VersionedEvent {
    pub fn new(record: Record, accessor: SharedAccessor) -> Self {
        VersionedEvent { record, accessor }
    }

    /// Wrap a record using the top-level `version` field.
    pub fn with_default_accessor(record: Record) -> Self {
        VersionedEvent::new(record, Arc::new(FieldVersion::default()))
    }

    pub fn version(&self) -> String {
        self.accessor.version(&self.record)
    }

    /// Write the version through the bound accessor, mutating the record.
    pub fn set_version(&mut self, version: &str) {
        self.accessor.set_version(&mut self.record, version);
    }

    pub fn record(&self) -> &Record {
        &self.record
    }

    pub fn into_record(self) -> Record {
        self.record
    }

    pub fn accessor(&self) -> &SharedAccessor {
        &self.accessor
    }

    /// A new event over `record` that shares this event's accessor.
    pub(crate) fn rebind(&self, record: Record) -> Self {
        VersionedEvent::new(record, Arc::clone(&self.accessor))
    }
}

impl From<Record> for VersionedEvent {
    fn from(record: Record) -> Self {
        VersionedEvent::with_default_accessor(record)
    }
}

impl fmt::Debug for VersionedEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VersionedEvent")
            .field("version", &self.version())
            .field("record", &self.record)
            .finish()
    }
}
