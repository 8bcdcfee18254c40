//! Output template rendering.
//!
//! Each configured output is parsed into a [`Node`] tree and evaluated
//! against an [`Environment`]. Outputs render in configuration order, so a
//! template can reference any output rendered before it as `<Name>`.

pub mod calc;
pub mod eval;
pub mod functions;
pub mod parser;

use indexmap::IndexMap;
use regex::Regex;
use tracing::debug;

use crate::config::{compile_pattern, OutputConfig};
use crate::error::{FlexVersionError, Result};

pub use eval::{Environment, Evaluator, Namespace};
pub use parser::{parse, Node};

/// Outputs whose name starts with this prefix are intermediate values.
pub const TEMPORARY_PREFIX: &str = "_";

struct CleanRule {
    select: Regex,
    invalid: Regex,
    replacement: String,
}

/// Renders a branch rule's ordered output templates.
pub struct OutputRenderer {
    strict: bool,
    keep_temporary: bool,
    clean: Vec<CleanRule>,
}

impl OutputRenderer {
    /// `keep_temporary` retains `_`-prefixed outputs in the result.
    pub fn new(settings: &OutputConfig, keep_temporary: bool) -> Result<Self> {
        let clean = settings
            .clean
            .iter()
            .map(|rule| -> Result<CleanRule> {
                Ok(CleanRule {
                    select: compile_pattern("output selector", &rule.select)?,
                    invalid: compile_pattern("invalid-character", &rule.invalid_pattern)?,
                    replacement: rule.replacement.clone(),
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(OutputRenderer {
            strict: settings.strict,
            keep_temporary,
            clean,
        })
    }

    /// Render every template in order, recording each result in
    /// `env.outputs` before the next one renders.
    pub fn render(
        &self,
        templates: &IndexMap<String, String>,
        env: &mut Environment,
    ) -> Result<IndexMap<String, String>> {
        env.outputs.clear();

        for (name, template) in templates {
            let nodes =
                parse(template).map_err(|message| FlexVersionError::template(name, template, message))?;
            let rendered = Evaluator::new(env, self.strict, name, template).render(&nodes)?;
            let value = self.clean(name, rendered);

            debug!(output = %name, value = %value, "Rendered output");
            env.outputs.insert(name.clone(), value);
        }

        Ok(env
            .outputs
            .iter()
            .filter(|(name, _)| self.keep_temporary || !name.starts_with(TEMPORARY_PREFIX))
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect())
    }

    fn clean(&self, name: &str, value: String) -> String {
        self.clean
            .iter()
            .filter(|rule| rule.select.is_match(name))
            .fold(value, |value, rule| {
                rule.invalid
                    .replace_all(&value, rule.replacement.as_str())
                    .into_owned()
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CleanOutputRule;

    fn templates(entries: &[(&str, &str)]) -> IndexMap<String, String> {
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn env() -> Environment {
        let mut env = Environment::default();
        env.parameters.insert("major".into(), "2".into());
        env.parameters.insert("minor".into(), "0".into());
        env.parameters.insert("patch".into(), "5".into());
        env.git_info.insert("ShortBranchName".into(), "Login_Page".into());
        env
    }

    #[test]
    fn test_plain_text_renders_unchanged() {
        let renderer = OutputRenderer::new(&OutputConfig::default(), false).unwrap();
        let text = "release (final), build 7 > 6";
        let out = renderer
            .render(&templates(&[("Plain", text)]), &mut env())
            .unwrap();
        assert_eq!(out["Plain"], text);
    }

    #[test]
    fn test_outputs_reference_earlier_outputs() {
        let renderer = OutputRenderer::new(&OutputConfig::default(), false).unwrap();
        let out = renderer
            .render(
                &templates(&[
                    ("_Core", "<Match:major>.<Match:minor>.<Match:patch>"),
                    ("SemVer", "<_Core>"),
                    ("Tag", "v<SemVer>"),
                ]),
                &mut env(),
            )
            .unwrap();

        assert_eq!(out.get("_Core"), None);
        assert_eq!(out["SemVer"], "2.0.5");
        assert_eq!(out["Tag"], "v2.0.5");
        assert_eq!(out.keys().collect::<Vec<_>>(), vec!["SemVer", "Tag"]);
    }

    #[test]
    fn test_keep_temporary_outputs() {
        let renderer = OutputRenderer::new(&OutputConfig::default(), true).unwrap();
        let out = renderer
            .render(&templates(&[("_Core", "<Match:major>")]), &mut env())
            .unwrap();
        assert_eq!(out["_Core"], "2");
    }

    #[test]
    fn test_forward_reference_is_an_error() {
        let renderer = OutputRenderer::new(&OutputConfig::default(), false).unwrap();
        let err = renderer
            .render(
                &templates(&[("Tag", "v<SemVer>"), ("SemVer", "<Match:major>")]),
                &mut env(),
            )
            .unwrap_err();
        assert!(matches!(err, FlexVersionError::Template { ref output, .. } if output == "Tag"));
    }

    #[test]
    fn test_parse_error_aborts_even_when_lenient() {
        let settings = OutputConfig {
            strict: false,
            ..OutputConfig::default()
        };
        let renderer = OutputRenderer::new(&settings, false).unwrap();
        let err = renderer
            .render(&templates(&[("Broken", "$If(true,a")]), &mut env())
            .unwrap_err();
        assert!(matches!(err, FlexVersionError::Template { .. }));
    }

    #[test]
    fn test_clean_rules_apply_to_selected_outputs() {
        let settings = OutputConfig {
            clean: vec![CleanOutputRule {
                select: "^Label$".to_string(),
                invalid_pattern: "[^0-9A-Za-z-]".to_string(),
                replacement: "-".to_string(),
            }],
            ..OutputConfig::default()
        };
        let renderer = OutputRenderer::new(&settings, false).unwrap();
        let out = renderer
            .render(
                &templates(&[
                    ("Label", "<GitInfo:ShortBranchName>"),
                    ("Raw", "<GitInfo:ShortBranchName>"),
                    ("Full", "1.0.0-<Label>"),
                ]),
                &mut env(),
            )
            .unwrap();

        assert_eq!(out["Label"], "Login-Page");
        assert_eq!(out["Raw"], "Login_Page");
        assert_eq!(out["Full"], "1.0.0-Login-Page");
    }
}
