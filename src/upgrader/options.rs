use serde::{Deserialize, Serialize};

/// What to do when two steps claim the same source version.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicatePolicy {
    /// Fail the build with `UpgradeError::DuplicateStep`.
    #[default]
    Reject,
    /// Keep the step registered last.
    Replace,
}

/// Step bound used when none is configured.
pub const DEFAULT_MAX_STEPS: usize = 1024;

/// Settings for building an [`Upgrader`](super::Upgrader).
///
/// Every field has a default, so partial JSON such as `{"max_steps": 32}`
/// deserializes.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UpgraderOptions {
    /// Field read by the default accessor. Ignored when an accessor is injected.
    pub version_field: String,
    pub duplicates: DuplicatePolicy,
    /// Upper bound on steps applied in a single walk. `null` removes the bound.
    pub max_steps: Option<usize>,
    /// Fail a walk as soon as it returns to a version it already upgraded from.
    ///
    /// Off by default: a step without a declared target may route an event
    /// back through earlier versions and still finish.
    pub detect_cycles: bool,
}

impl Default for UpgraderOptions {
    fn default() -> Self {
        UpgraderOptions {
            version_field: "version".to_string(),
            duplicates: DuplicatePolicy::Reject,
            max_steps: Some(DEFAULT_MAX_STEPS),
            detect_cycles: false,
        }
    }
}

impl UpgraderOptions {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}
