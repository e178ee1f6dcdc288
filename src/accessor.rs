//! Where a record keeps its version, and how to read and write it.

use std::fmt;
use std::sync::Arc;

use serde_json::{Map, Value};

/// A raw event: a JSON object with no fixed schema.
pub type Record = Map<String, Value>;

/// Version reported for records that carry no version at all.
///
/// No registered step should use this string, which makes "unversioned" a
/// resting state rather than an error.
pub const MISSING_VERSION: &str = "None";

/// Strategy for reading and writing the version tag of a raw record.
///
/// Implementations must round-trip: after `set_version(r, v)`,
/// `version(r)` returns `v`.
pub trait VersionAccessor: Send + Sync {
    /// Read the version. Never fails; absent versions read as [`MISSING_VERSION`].
    fn version(&self, record: &Record) -> String;

    /// Write the version in place.
    fn set_version(&self, record: &mut Record, version: &str);
}

/// An accessor shared between an upgrader and every event it wraps.
pub type SharedAccessor = Arc<dyn VersionAccessor>;

/// Render a raw version value as the string the registry is keyed on.
///
/// Strings pass through, `null` and absent values become [`MISSING_VERSION`],
/// anything else is rendered as JSON text (`2` -> `"2"`).
pub fn render_version(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => MISSING_VERSION.to_string(),
        Some(Value::String(version)) => version.clone(),
        Some(other) => other.to_string(),
    }
}

/// The default accessor: a top-level field, `version` unless told otherwise.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FieldVersion {
    field: String,
}

impl FieldVersion {
    pub fn new(field: impl Into<String>) -> Self {
        FieldVersion {
            field: field.into(),
        }
    }

    pub fn field(&self) -> &str {
        &self.field
    }
}

impl Default for FieldVersion {
    fn default() -> Self {
        FieldVersion::new("version")
    }
}

impl VersionAccessor for FieldVersion {
    fn version(&self, record: &Record) -> String {
        render_version(record.get(&self.field))
    }

    fn set_version(&self, record: &mut Record, version: &str) {
        record.insert(self.field.clone(), Value::String(version.to_string()));
    }
}

/// A version nested inside header objects, e.g. `{"meta": {"version": "2"}}`.
///
/// Writing creates missing parents, and replaces parents that are not objects.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NestedVersion {
    parents: Vec<String>,
    field: String,
}

impl NestedVersion {
    pub fn new<I, S>(parents: I, field: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        NestedVersion {
            parents: parents.into_iter().map(Into::into).collect(),
            field: field.into(),
        }
    }
}

impl VersionAccessor for NestedVersion {
    fn version(&self, record: &Record) -> String {
        let mut current = record;
        for key in &self.parents {
            match current.get(key).and_then(Value::as_object) {
                Some(child) => current = child,
                None => return MISSING_VERSION.to_string(),
            }
        }
        render_version(current.get(&self.field))
    }

    fn set_version(&self, record: &mut Record, version: &str) {
        set_nested(record, &self.parents, &self.field, version);
    }
}

fn set_nested(map: &mut Record, parents: &[String], field: &str, version: &str) {
    let Some((key, rest)) = parents.split_first() else {
        map.insert(field.to_string(), Value::String(version.to_string()));
        return;
    };
    let slot = map
        .entry(key.clone())
        .or_insert_with(|| Value::Object(Map::new()));
    match slot {
        Value::Object(child) => set_nested(child, rest, field, version),
        other => {
            let mut child = Map::new();
            set_nested(&mut child, rest, field, version);
            *other = Value::Object(child);
        }
    }
}

/// An accessor made of two caller closures.
pub struct VersionFns<G, S> {
    get: G,
    set: S,
}

impl<G, S> VersionFns<G, S>
where
    G: Fn(&Record) -> String + Send + Sync,
    S: Fn(&mut Record, &str) + Send + Sync,
{
    pub fn new(get: G, set: S) -> Self {
        VersionFns { get, set }
    }
}

impl<G, S> VersionAccessor for VersionFns<G, S>
where
    G: Fn(&Record) -> String + Send + Sync,
    S: Fn(&mut Record, &str) + Send + Sync,
{
    fn version(&self, record: &Record) -> String {
        (self.get)(record)
    }

    fn set_version(&self, record: &mut Record, version: &str) {
        (self.set)(record, version)
    }
}

impl<G, S> fmt::Debug for VersionFns<G, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VersionFns").finish_non_exhaustive()
    }
}
