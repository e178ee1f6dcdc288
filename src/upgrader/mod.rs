//! The upgrade driver and its configuration.
//!
//! ```ignore
//! use event_upgrader::{upgrade, Upgrader};
//!
//! let upgrader = Upgrader::builder()
//!     .step(upgrade("0.1", "0.2", |r| { r.insert("name".into(), "first".into()); }))
//!     .step(upgrade("0.2", "0.3", |r| { r.insert("name".into(), "second".into()); }))
//!     .build()?
//!     .factory(|r| r["name"].to_string());
//!
//! let name = upgrader.ingest(&record, Some("0.3"))?;
//! ```

mod builder;
mod options;
mod upgrader;

pub use builder::UpgraderBuilder;
pub use options::{DuplicatePolicy, UpgraderOptions, DEFAULT_MAX_STEPS};
pub use upgrader::{ingest, UpgradePath, Upgrader};
