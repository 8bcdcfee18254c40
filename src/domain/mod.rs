//! Domain model - the records produced and consumed by an analysis

pub mod commit;
pub mod params;
pub mod source;

pub use commit::{Commit, GitInfo, Tag};
pub use params::ParameterSet;
pub use source::{VersionSource, VersionSourceKind};
