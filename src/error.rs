//! Error types for building upgraders and walking events through them.

use std::error::Error;
use std::fmt;

/// Error currency for caller-supplied transforms and factories.
pub type BoxError = Box<dyn Error + Send + Sync>;

/// Errors raised while building an upgrader or walking an event through it.
#[derive(Debug)]
pub enum UpgradeError {
    /// An applied step left the version where it found it.
    Stalled { version: String },
    /// The walk stopped at `actual` but the caller asked for `target`.
    TargetNotReached { target: String, actual: String },
    /// A step declared `target` but the accessor reads back `actual`.
    TargetMismatch {
        version: String,
        target: String,
        actual: String,
    },
    /// Two steps were registered for the same source version.
    DuplicateStep { version: String },
    /// The walk came back to a version it had already upgraded from.
    Cycle { version: String, steps: usize },
    /// The configured step bound was hit before the walk settled.
    StepLimit { limit: usize, version: String },
    /// A transform failed while upgrading from `version`.
    Transform { version: String, source: BoxError },
    /// The terminal factory failed.
    Factory(BoxError),
}

impl UpgradeError {
    pub fn is_stalled(&self) -> bool {
        matches!(self, UpgradeError::Stalled { .. })
    }

    pub fn is_target_not_reached(&self) -> bool {
        matches!(self, UpgradeError::TargetNotReached { .. })
    }

    /// The version the event was at when the error was raised, if known.
    pub fn version(&self) -> Option<&str> {
        match self {
            UpgradeError::Stalled { version }
            | UpgradeError::DuplicateStep { version }
            | UpgradeError::Cycle { version, .. }
            | UpgradeError::StepLimit { version, .. }
            | UpgradeError::Transform { version, .. } => Some(version),
            UpgradeError::TargetNotReached { actual, .. }
            | UpgradeError::TargetMismatch { actual, .. } => Some(actual),
            UpgradeError::Factory(_) => None,
        }
    }
}

impl fmt::Display for UpgradeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UpgradeError::Stalled { version } => {
                write!(f, "upgrade did not change version number - {}", version)
            }
            UpgradeError::TargetNotReached { target, actual } => write!(
                f,
                "all upgrades done, target version {} doesn't match event version {}",
                target, actual
            ),
            UpgradeError::TargetMismatch {
                version,
                target,
                actual,
            } => write!(
                f,
                "upgrade from {} to {} left event at version {}",
                version, target, actual
            ),
            UpgradeError::DuplicateStep { version } => {
                write!(f, "more than one upgrade registered for version {}", version)
            }
            UpgradeError::Cycle { version, steps } => write!(
                f,
                "upgrade cycle detected: version {} reached again after {} steps",
                version, steps
            ),
            UpgradeError::StepLimit { limit, version } => write!(
                f,
                "upgrade exceeded {} steps (stopped at version {})",
                limit, version
            ),
            // Collaborator errors print exactly as the collaborator raised them.
            UpgradeError::Transform { source, .. } => write!(f, "{}", source),
            UpgradeError::Factory(source) => write!(f, "{}", source),
        }
    }
}

impl Error for UpgradeError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            UpgradeError::Transform { source, .. } => Some(source.as_ref()),
            UpgradeError::Factory(source) => Some(source.as_ref()),
            _ => None,
        }
    }
}
