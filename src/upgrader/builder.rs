use std::collections::HashMap;
use std::sync::Arc;

use crate::accessor::{FieldVersion, Record, SharedAccessor, VersionAccessor};
use crate::error::UpgradeError;
use crate::step::UpgradeStep;

use super::options::{DuplicatePolicy, UpgraderOptions};
use super::upgrader::Upgrader;

/// Collects steps, an accessor and options, then builds an [`Upgrader`].
#[derive(Default)]
pub struct UpgraderBuilder {
    steps: Vec<UpgradeStep>,
    accessor: Option<SharedAccessor>,
    options: UpgraderOptions,
}

impl UpgraderBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a step. Returns `self` for chaining.
    pub fn step(mut self, step: UpgradeStep) -> Self {
        self.steps.push(step);
        self
    }

    pub fn steps(mut self, steps: impl IntoIterator<Item = UpgradeStep>) -> Self {
        self.steps.extend(steps);
        self
    }

    /// Replace the default `version` field accessor.
    pub fn accessor<A>(self, accessor: A) -> Self
    where
        A: VersionAccessor + 'static,
    {
        self.shared_accessor(Arc::new(accessor))
    }

    pub fn shared_accessor(mut self, accessor: SharedAccessor) -> Self {
        self.accessor = Some(accessor);
        self
    }

    pub fn options(mut self, options: UpgraderOptions) -> Self {
        self.options = options;
        self
    }

    pub fn version_field(mut self, field: impl Into<String>) -> Self {
        self.options.version_field = field.into();
        self
    }

    pub fn duplicates(mut self, policy: DuplicatePolicy) -> Self {
        self.options.duplicates = policy;
        self
    }

    pub fn max_steps(mut self, limit: usize) -> Self {
        self.options.max_steps = Some(limit);
        self
    }

    /// Walk without a step bound.
    pub fn unbounded(mut self) -> Self {
        self.options.max_steps = None;
        self
    }

    /// Fail walks that return to a version they already upgraded from.
    pub fn detect_cycles(mut self, detect: bool) -> Self {
        self.options.detect_cycles = detect;
        self
    }

    /// Key every step by its source version.
    ///
    /// Fails on a repeated source version unless the policy is
    /// [`DuplicatePolicy::Replace`].
    pub fn build(self) -> Result<Upgrader, UpgradeError> {
        let mut steps: HashMap<String, UpgradeStep> = HashMap::with_capacity(self.steps.len());
        for step in self.steps {
            let source = step.source().to_string();
            if self.options.duplicates == DuplicatePolicy::Reject && steps.contains_key(&source) {
                return Err(UpgradeError::DuplicateStep { version: source });
            }
            steps.insert(source, step);
        }

        let accessor = match self.accessor {
            Some(accessor) => accessor,
            None => Arc::new(FieldVersion::new(self.options.version_field)),
        };

        Ok(Upgrader::from_parts(
            steps,
            accessor,
            self.options.max_steps,
            self.options.detect_cycles,
        ))
    }

    /// [`build`](UpgraderBuilder::build), then attach a terminal factory.
    pub fn build_with_factory<U, F>(self, factory: F) -> Result<Upgrader<U>, UpgradeError>
    where
        F: Fn(Record) -> U + Send + Sync + 'static,
        U: 'static,
    {
        Ok(self.build()?.factory(factory))
    }
}
