use indexmap::IndexMap;
use regex::Regex;

use crate::config::{compile_pattern, BranchRule, FALLBACK_RULE};
use crate::error::{FlexVersionError, Result};

/// Resolves branch names to configured branch rules.
///
/// Rules are tried in configuration order; rules with a blank regex never
/// match by name.
pub struct BranchMatcher<'a> {
    rules: &'a IndexMap<String, BranchRule>,
    patterns: Vec<(&'a str, Regex)>,
}

impl<'a> BranchMatcher<'a> {
    /// Compile the regex of every rule that has one
    pub fn new(rules: &'a IndexMap<String, BranchRule>) -> Result<Self> {
        let mut patterns = Vec::new();
        for (name, rule) in rules {
            if rule.regex.trim().is_empty() {
                continue;
            }
            let regex = compile_pattern(&format!("branch '{}'", name), &rule.regex)?;
            patterns.push((name.as_str(), regex));
        }

        Ok(BranchMatcher { rules, patterns })
    }

    /// The rule that governs `branch_name`, falling back to `*`.
    pub fn resolve(&self, branch_name: &str) -> Result<(&'a str, &'a BranchRule)> {
        if let Some(name) = self.classify(branch_name) {
            if let Some((name, rule)) = self.rules.get_key_value(name) {
                return Ok((name.as_str(), rule));
            }
        }

        self.rules
            .get_key_value(FALLBACK_RULE)
            .map(|(name, rule)| (name.as_str(), rule))
            .ok_or_else(|| {
                FlexVersionError::config(format!(
                    "Unable to find a branch definition for '{}' in the configuration. \
                     The required '{}' fallback definition was also not found.",
                    branch_name, FALLBACK_RULE
                ))
            })
    }

    /// The name of the first rule whose regex matches, without any fallback.
    pub fn classify(&self, branch_name: &str) -> Option<&'a str> {
        self.patterns
            .iter()
            .find(|(_, regex)| regex.is_match(branch_name))
            .map(|(name, _)| *name)
    }
}
