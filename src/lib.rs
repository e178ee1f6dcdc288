//! Upgrade loosely-structured event records across schema versions.
//!
//! Each [`UpgradeStep`] is gated to one source version and runs on a deep copy
//! of the record. An [`Upgrader`] keys steps by source version and walks a
//! record forward until it reaches a requested target or no step matches.
//!
//! ```text
//!  record ──► VersionedEvent ──► step(v0) ──► step(v1) ──► ... ──► record'
//!                 │                                                  │
//!           VersionAccessor                                 factory (optional)
//! ```

mod accessor;
mod error;
mod event;
mod step;
mod upgrade_set;
mod upgrader;

pub use accessor::{
    render_version, FieldVersion, NestedVersion, Record, SharedAccessor, VersionAccessor,
    VersionFns, MISSING_VERSION,
};
pub use error::{BoxError, UpgradeError};
pub use event::VersionedEvent;
pub use step::{upgrade, upgrade_from, TransformOutput, UpgradeStep};
pub use upgrade_set::UpgradeSet;
pub use upgrader::{
    ingest, DuplicatePolicy, UpgradePath, Upgrader, UpgraderBuilder, UpgraderOptions,
    DEFAULT_MAX_STEPS,
};
