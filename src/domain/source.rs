use serde::{Deserialize, Serialize};
use std::fmt;

use super::{Commit, ParameterSet};

/// The kinds of commit that can act as a version source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VersionSourceKind {
    #[serde(rename = "tag", alias = "Tag")]
    Tag,
    #[serde(rename = "merge", alias = "Merge")]
    Merge,
}

impl fmt::Display for VersionSourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VersionSourceKind::Tag => write!(f, "Tag"),
            VersionSourceKind::Merge => write!(f, "Merge"),
        }
    }
}

/// The commit chosen as the baseline for versioning, with the parameters
/// captured out of its tag name or merge message.
#[derive(Debug, Clone, Serialize)]
pub struct VersionSource {
    pub commit: Commit,
    pub kind: VersionSourceKind,
    pub parameters: ParameterSet,
}

impl VersionSource {
    pub fn tag_name(&self) -> &str {
        self.commit.tag.as_ref().map(|t| t.name.as_str()).unwrap_or("")
    }

    pub fn tag_message(&self) -> &str {
        self.commit
            .tag
            .as_ref()
            .map(|t| t.message.as_str())
            .unwrap_or("")
    }
}
