//! Single version-gated upgrade steps and the helpers that declare them.

use std::fmt;

use tracing::{debug, trace};

use crate::accessor::Record;
use crate::error::{BoxError, UpgradeError};
use crate::event::VersionedEvent;

type Transform = dyn Fn(&mut Record) -> Result<Option<Record>, BoxError> + Send + Sync;

/// What a transform may hand back.
///
/// `()` and `None` keep the mutated copy; a `Record` replaces it outright.
/// `Result`s of any of these let a transform fail.
pub trait TransformOutput {
    fn into_replacement(self) -> Result<Option<Record>, BoxError>;
}

impl TransformOutput for () {
    fn into_replacement(self) -> Result<Option<Record>, BoxError> {
        Ok(None)
    }
}

impl TransformOutput for Record {
    fn into_replacement(self) -> Result<Option<Record>, BoxError> {
        Ok(Some(self))
    }
}

impl TransformOutput for Option<Record> {
    fn into_replacement(self) -> Result<Option<Record>, BoxError> {
        Ok(self)
    }
}

impl<T, E> TransformOutput for Result<T, E>
where
    T: TransformOutput,
    E: Into<BoxError>,
{
    fn into_replacement(self) -> Result<Option<Record>, BoxError> {
        self.map_err(Into::into)?.into_replacement()
    }
}

/// One transformation, gated to events currently at `source`.
///
/// Applying a step never touches the event it was given: the transform runs on
/// a deep copy. A step must move the version off `source`, either through its
/// declared `target` or by writing the version itself.
pub struct UpgradeStep {
    source: String,
    target: Option<String>,
    transform: Box<Transform>,
}

impl UpgradeStep {
    /// An empty `target` is the same as `None`.
    pub fn new<F, O>(source: impl Into<String>, target: Option<&str>, transform: F) -> Self
    where
        F: Fn(&mut Record) -> O + Send + Sync + 'static,
        O: TransformOutput + 'static,
    {
        UpgradeStep {
            source: source.into(),
            target: target.filter(|t| !t.is_empty()).map(str::to_string),
            transform: boxed(transform),
        }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn target(&self) -> Option<&str> {
        self.target.as_deref()
    }

    /// Whether the gate is open for `event`.
    pub fn matches(&self, event: &VersionedEvent) -> bool {
        event.version() == self.source
    }

    /// Apply the step to `event`.
    ///
    /// When the gate is closed the transform is not called and the result is
    /// an independent copy of `event`.
    pub fn apply(&self, event: &VersionedEvent) -> Result<VersionedEvent, UpgradeError> {
        if !self.matches(event) {
            trace!(source = %self.source, version = %event.version(), "upgrade gate closed");
            return Ok(event.clone());
        }

        let mut copy = event.record().clone();
        let replacement = (self.transform)(&mut copy).map_err(|source| UpgradeError::Transform {
            version: self.source.clone(),
            source,
        })?;

        let mut upgraded = event.rebind(replacement.unwrap_or(copy));
        if let Some(target) = &self.target {
            upgraded.set_version(target);
        }

        let version = upgraded.version();
        if version == self.source {
            return Err(UpgradeError::Stalled {
                version: self.source.clone(),
            });
        }
        if let Some(target) = &self.target {
            if version != *target {
                return Err(UpgradeError::TargetMismatch {
                    version: self.source.clone(),
                    target: target.clone(),
                    actual: version,
                });
            }
        }

        debug!(from = %self.source, to = %version, "applied upgrade");
        Ok(upgraded)
    }
}

fn boxed<F, O>(transform: F) -> Box<Transform>
where
    F: Fn(&mut Record) -> O + Send + Sync + 'static,
    O: TransformOutput + 'static,
{
    Box::new(move |record: &mut Record| transform(record).into_replacement())
}

impl fmt::Debug for UpgradeStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UpgradeStep")
            .field("source", &self.source)
            .field("target", &self.target)
            .finish_non_exhaustive()
    }
}

/// Declare a step from `source` to `target`; the transform only edits the body.
pub fn upgrade<F, O>(source: &str, target: &str, transform: F) -> UpgradeStep
where
    F: Fn(&mut Record) -> O + Send + Sync + 'static,
    O: TransformOutput + 'static,
{
    UpgradeStep::new(source, Some(target), transform)
}

/// Declare a step from `source` whose transform writes the new version itself.
pub fn upgrade_from<F, O>(source: &str, transform: F) -> UpgradeStep
where
    F: Fn(&mut Record) -> O + Send + Sync + 'static,
    O: TransformOutput + 'static,
{
    UpgradeStep::new(source, None, transform)
}

/// Build a `Vec<UpgradeStep>` from `source => target : transform` entries.
///
/// Use `_` as the target when the transform bumps the version itself.
///
/// ```ignore
/// let steps = event_upgrader::upgrades![
///     "0.1" => "0.2" : add_name,
///     "0.2" => _ : split_name,
/// ];
/// ```
#[macro_export]
macro_rules! upgrades {
    (@step $source:literal, _, $transform:expr) => {
        $crate::upgrade_from($source, $transform)
    };
    (@step $source:literal, $target:literal, $transform:expr) => {
        $crate::upgrade($source, $target, $transform)
    };
    ($($source:literal => $target:tt : $transform:expr),* $(,)?) => {
        vec![$($crate::upgrades!(@step $source, $target, $transform)),*]
    };
}
