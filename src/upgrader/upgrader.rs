//! Upgrader: the multi-step driver.
//!
//! Walks one record from whatever version it carries to a requested target,
//! or until no registered step matches.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use tracing::debug;

use crate::accessor::{Record, SharedAccessor};
use crate::error::{BoxError, UpgradeError};
use crate::event::VersionedEvent;
use crate::step::UpgradeStep;
use crate::upgrade_set::UpgradeSet;

use super::builder::UpgraderBuilder;

type Factory<T> = dyn Fn(Record) -> Result<T, BoxError> + Send + Sync;

/// The versions one walk passed through, starting with the record's own.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct UpgradePath {
    versions: Vec<String>,
}

impl UpgradePath {
    pub fn versions(&self) -> &[String] {
        &self.versions
    }

    /// Number of steps applied.
    pub fn steps(&self) -> usize {
        self.versions.len().saturating_sub(1)
    }

    pub fn final_version(&self) -> Option<&str> {
        self.versions.last().map(String::as_str)
    }
}

/// A registry of steps keyed by source version, plus the accessor and
/// terminal factory used for every record it upgrades.
///
/// Read-only after construction; share it freely across threads.
pub struct Upgrader<T = Record> {
    steps: HashMap<String, UpgradeStep>,
    accessor: SharedAccessor,
    max_steps: Option<usize>,
    detect_cycles: bool,
    factory: Box<Factory<T>>,
}

impl Upgrader<Record> {
    /// Build with the default accessor and options.
    pub fn new(steps: impl IntoIterator<Item = UpgradeStep>) -> Result<Self, UpgradeError> {
        Self::builder().steps(steps).build()
    }

    pub fn builder() -> UpgraderBuilder {
        UpgraderBuilder::new()
    }

    /// Build from every step a set declares.
    pub fn from_set<S: UpgradeSet>() -> Result<Self, UpgradeError> {
        Self::new(S::upgrades())
    }

    pub(crate) fn from_parts(
        steps: HashMap<String, UpgradeStep>,
        accessor: SharedAccessor,
        max_steps: Option<usize>,
        detect_cycles: bool,
    ) -> Self {
        Upgrader {
            steps,
            accessor,
            max_steps,
            detect_cycles,
            factory: Box::new(Ok::<Record, BoxError>),
        }
    }

    /// Convert every fully upgraded record with `factory` in [`ingest`](Upgrader::ingest).
    pub fn factory<U, F>(self, factory: F) -> Upgrader<U>
    where
        F: Fn(Record) -> U + Send + Sync + 'static,
        U: 'static,
    {
        self.with_factory(Box::new(move |record| Ok(factory(record))))
    }

    /// Like [`factory`](Upgrader::factory), for factories that can fail.
    pub fn try_factory<U, E, F>(self, factory: F) -> Upgrader<U>
    where
        F: Fn(Record) -> Result<U, E> + Send + Sync + 'static,
        E: Into<BoxError> + 'static,
        U: 'static,
    {
        self.with_factory(Box::new(move |record| factory(record).map_err(Into::into)))
    }

    fn with_factory<U>(self, factory: Box<Factory<U>>) -> Upgrader<U> {
        Upgrader {
            steps: self.steps,
            accessor: self.accessor,
            max_steps: self.max_steps,
            detect_cycles: self.detect_cycles,
            factory,
        }
    }
}

impl<T> Upgrader<T> {
    /// Upgrade a copy of `record`; the caller's record is never modified.
    ///
    /// Without a target the walk stops at the first version with no step, and
    /// that is a success. With a target it stops on reaching the target and
    /// fails with [`UpgradeError::TargetNotReached`] if the walk ends elsewhere.
    pub fn upgrade(&self, record: &Record, target: Option<&str>) -> Result<Record, UpgradeError> {
        self.walk(record, target).map(|(record, _)| record)
    }

    /// Same as [`upgrade`](Upgrader::upgrade), also returning the versions visited.
    pub fn upgrade_traced(
        &self,
        record: &Record,
        target: Option<&str>,
    ) -> Result<(Record, UpgradePath), UpgradeError> {
        self.walk(record, target)
    }

    /// Upgrade, then hand the result to the factory.
    ///
    /// Factory errors come back as [`UpgradeError::Factory`] and print as the
    /// factory raised them.
    pub fn ingest(&self, record: &Record, target: Option<&str>) -> Result<T, UpgradeError> {
        let upgraded = self.upgrade(record, target)?;
        (self.factory)(upgraded).map_err(UpgradeError::Factory)
    }

    /// Ingest each record on its own; one failure does not stop the rest.
    pub fn ingest_all<'a, I>(&self, records: I, target: Option<&str>) -> Vec<Result<T, UpgradeError>>
    where
        I: IntoIterator<Item = &'a Record>,
    {
        records
            .into_iter()
            .map(|record| self.ingest(record, target))
            .collect()
    }

    /// The step registered for `version`, if any.
    pub fn step(&self, version: &str) -> Option<&UpgradeStep> {
        self.steps.get(version)
    }

    /// Registered source versions, sorted.
    pub fn versions(&self) -> Vec<&str> {
        let mut versions: Vec<&str> = self.steps.keys().map(String::as_str).collect();
        versions.sort_unstable();
        versions
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn accessor(&self) -> &SharedAccessor {
        &self.accessor
    }

    pub fn max_steps(&self) -> Option<usize> {
        self.max_steps
    }

    pub fn detects_cycles(&self) -> bool {
        self.detect_cycles
    }

    fn walk(
        &self,
        record: &Record,
        target: Option<&str>,
    ) -> Result<(Record, UpgradePath), UpgradeError> {
        let mut current = VersionedEvent::new(record.clone(), Arc::clone(&self.accessor));
        let mut version = current.version();
        let mut path = vec![version.clone()];
        let mut upgraded_from: HashSet<String> = HashSet::new();

        loop {
            if target == Some(version.as_str()) {
                break;
            }
            let Some(step) = self.steps.get(&version) else {
                break;
            };

            let applied = path.len() - 1;
            if self.detect_cycles && !upgraded_from.insert(version.clone()) {
                debug!(version = %version, steps = applied, "upgrade cycle detected");
                return Err(UpgradeError::Cycle {
                    version,
                    steps: applied,
                });
            }
            if let Some(limit) = self.max_steps {
                if applied >= limit {
                    debug!(version = %version, limit, "upgrade step limit reached");
                    return Err(UpgradeError::StepLimit { limit, version });
                }
            }

            current = step.apply(&current).map_err(|err| {
                debug!(version = %version, error = %err, "upgrade step failed");
                err
            })?;
            version = current.version();
            path.push(version.clone());
        }

        if let Some(target) = target {
            if version != target {
                debug!(requested = %target, version = %version, "upgrade target not reached");
                return Err(UpgradeError::TargetNotReached {
                    target: target.to_string(),
                    actual: version,
                });
            }
        }

        debug!(version = %version, steps = path.len() - 1, "upgrade finished");
        Ok((current.into_record(), UpgradePath { versions: path }))
    }
}

impl<T> fmt::Debug for Upgrader<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Upgrader")
            .field("versions", &self.versions())
            .field("max_steps", &self.max_steps)
            .field("detect_cycles", &self.detect_cycles)
            .finish_non_exhaustive()
    }
}

/// Upgrade a single record without keeping an upgrader around, then convert it.
///
/// Pass `|record| record` as the factory to get the upgraded record back.
pub fn ingest<U, F>(
    steps: impl IntoIterator<Item = UpgradeStep>,
    record: &Record,
    target: Option<&str>,
    factory: F,
) -> Result<U, UpgradeError>
where
    F: FnOnce(Record) -> U,
{
    let upgraded = Upgrader::new(steps)?.upgrade(record, target)?;
    Ok(factory(upgraded))
}
