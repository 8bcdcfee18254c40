use indexmap::IndexMap;
use tracing::debug;

use crate::config::{BranchRule, FALLBACK_RULE};
use crate::domain::{Commit, ParameterSet};
use crate::error::{FlexVersionError, Result};

/// A parsed bump action: `=N`, `+N` or `-N`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BumpAction {
    /// Replace the value
    Set(i64),
    /// Add a signed amount to the current value (absent counts as zero)
    Add(i64),
}

impl BumpAction {
    pub fn parse(expression: &str) -> Result<Self> {
        let not_understood = || {
            FlexVersionError::config(format!(
                "The action '{}' was not understood. Should match '<[+-=]><number>'.",
                expression
            ))
        };

        let mut chars = expression.chars();
        let op = chars.next().ok_or_else(not_understood)?;
        let digits = chars.as_str();
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(not_understood());
        }

        let value: i64 = digits.parse().map_err(|_| {
            FlexVersionError::numeric(format!(
                "The value in action '{}' is too large",
                expression
            ))
        })?;

        match op {
            '=' => Ok(BumpAction::Set(value)),
            '+' => Ok(BumpAction::Add(value)),
            '-' => Ok(BumpAction::Add(-value)),
            _ => Err(not_understood()),
        }
    }

    /// Apply the action to one parameter.
    pub fn apply(&self, parameters: &mut ParameterSet, name: &str) -> Result<()> {
        let value = match *self {
            BumpAction::Set(value) => value,
            BumpAction::Add(delta) => {
                let current = parameters.get_int(name)?.unwrap_or(0);
                current.checked_add(delta).ok_or_else(|| {
                    FlexVersionError::numeric(format!(
                        "Bumping '{}' from {} by {} overflows",
                        name, current, delta
                    ))
                })?
            }
        };

        parameters.set(name, value.to_string());
        Ok(())
    }
}

/// Replays the commits on top of the version source, applying bump actions.
pub struct BumpEngine<'a> {
    rule: &'a BranchRule,
}

impl<'a> BumpEngine<'a> {
    pub fn new(rule: &'a BranchRule) -> Self {
        BumpEngine { rule }
    }

    /// Replay `commits` (newest first, version source last) oldest first.
    ///
    /// The version source itself never bumps. Returns the number of actions
    /// applied.
    pub fn replay(&self, commits: &[Commit], parameters: &mut ParameterSet) -> Result<usize> {
        let Some((_source, newer)) = commits.split_last() else {
            return Ok(0);
        };

        let mut applied = 0;
        for commit in newer.iter().rev() {
            let Some(actions) = self.actions_for(commit) else {
                continue;
            };

            for (name, expression) in actions {
                let action = BumpAction::parse(expression)?;
                action.apply(parameters, name)?;
                debug!(
                    sha = %commit.short_sha(),
                    parameter = %name,
                    action = %expression,
                    value = ?parameters.get(name),
                    "Applied bump action"
                );
                applied += 1;
            }
        }

        Ok(applied)
    }

    fn actions_for(&self, commit: &Commit) -> Option<&'a IndexMap<String, String>> {
        if commit.is_merge {
            commit
                .from_branch_rule
                .as_deref()
                .and_then(|from| self.rule.on_merge.get(from))
                .or_else(|| self.rule.on_merge.get(FALLBACK_RULE))
        } else if self.rule.on_commit.is_empty() {
            None
        } else {
            Some(&self.rule.on_commit)
        }
    }
}
