use regex::Regex;
use std::collections::HashMap;
use tracing::{debug, warn};

use crate::config::{compile_pattern, TagMatchConfig};
use crate::domain::Tag;
use crate::error::Result;

/// A tag whose name matched the tag pattern, with its captured parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct TagCandidate {
    pub tag: Tag,
    /// Named groups with non-blank values, in pattern order
    pub captures: Vec<(String, String)>,
}

/// Matches repository tags against the configured tag pattern.
pub struct TagScanner {
    pattern: Regex,
    annotated_only: bool,
}

impl TagScanner {
    pub fn new(config: &TagMatchConfig) -> Result<Self> {
        Ok(TagScanner {
            pattern: compile_pattern("tag-match", &config.pattern)?,
            annotated_only: config.annotated_only,
        })
    }

    /// Index matching tags by the sha of the commit they point at.
    ///
    /// When several matching tags point at the same commit the last one
    /// enumerated is kept.
    pub fn scan(&self, tags: impl IntoIterator<Item = Tag>) -> HashMap<String, TagCandidate> {
        let mut candidates: HashMap<String, TagCandidate> = HashMap::new();

        for tag in tags {
            if self.annotated_only && !tag.annotated {
                debug!(tag = %tag.name, "Skipping lightweight tag");
                continue;
            }

            let Some(captures) = self.capture(&tag.name) else {
                continue;
            };

            debug!(tag = %tag.name, target = %tag.target, "Tag is a version source candidate");
            let target = tag.target.clone();
            if let Some(previous) = candidates.insert(target, TagCandidate { tag, captures }) {
                warn!(
                    tag = %previous.tag.name,
                    target = %previous.tag.target,
                    "Another matching tag points at the same commit; keeping the last one"
                );
            }
        }

        candidates
    }

    fn capture(&self, name: &str) -> Option<Vec<(String, String)>> {
        let caps = self.pattern.captures(name)?;

        Some(
            self.pattern
                .capture_names()
                .flatten()
                .filter_map(|group| {
                    let value = caps.name(group)?.as_str();
                    if value.trim().is_empty() {
                        None
                    } else {
                        Some((group.to_string(), value.to_string()))
                    }
                })
                .collect(),
        )
    }
}
