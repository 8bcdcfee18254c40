use indexmap::IndexMap;
use std::fmt;
use tracing::warn;

use super::functions::{self, CallError};
use super::parser::Node;
use crate::error::{FlexVersionError, Result};

/// Variable namespaces addressable as `<namespace:key>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Namespace {
    Arg,
    GitInfo,
    Head,
    Match,
    VersionSource,
    Env,
}

impl Namespace {
    /// Case-insensitive lookup, including the `common` and `vs` aliases.
    pub fn parse(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "arg" => Some(Namespace::Arg),
            "gitinfo" | "common" => Some(Namespace::GitInfo),
            "head" => Some(Namespace::Head),
            "match" => Some(Namespace::Match),
            "versionsource" | "vs" => Some(Namespace::VersionSource),
            "env" => Some(Namespace::Env),
            _ => None,
        }
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Namespace::Arg => "Arg",
            Namespace::GitInfo => "GitInfo",
            Namespace::Head => "Head",
            Namespace::Match => "Match",
            Namespace::VersionSource => "VersionSource",
            Namespace::Env => "Env",
        };
        write!(f, "{}", name)
    }
}

/// Everything a template can read.
///
/// `outputs` grows as the render pass proceeds; every other namespace is
/// fixed before rendering starts. `Env` reads the process environment.
#[derive(Debug, Clone, Default)]
pub struct Environment {
    pub args: IndexMap<String, String>,
    pub git_info: IndexMap<String, String>,
    pub head: IndexMap<String, String>,
    pub parameters: IndexMap<String, String>,
    pub version_source: IndexMap<String, String>,
    pub outputs: IndexMap<String, String>,
}

impl Environment {
    /// Look a key up in one namespace.
    pub fn lookup_in(&self, namespace: Namespace, key: &str) -> Option<String> {
        let map = match namespace {
            Namespace::Env => return std::env::var(key).ok(),
            Namespace::Arg => &self.args,
            Namespace::GitInfo => &self.git_info,
            Namespace::Head => &self.head,
            Namespace::Match => &self.parameters,
            Namespace::VersionSource => &self.version_source,
        };
        find(map, key).map(str::to_string)
    }

    /// Resolve a variable reference; a bare key names an earlier output.
    pub fn lookup(&self, namespace: Option<&str>, key: &str) -> std::result::Result<String, String> {
        let Some(name) = namespace else {
            return find(&self.outputs, key).map(str::to_string).ok_or_else(|| {
                format!("'<{}>' does not name an output rendered before this one", key)
            });
        };

        let namespace = Namespace::parse(name)
            .ok_or_else(|| format!("'<{}:{}>' uses the unknown namespace '{}'", name, key, name))?;
        self.lookup_in(namespace, key)
            .ok_or_else(|| format!("'<{}:{}>' was not found in {}", name, key, namespace))
    }
}

/// Exact match first, then ASCII case-insensitive.
fn find<'m>(map: &'m IndexMap<String, String>, key: &str) -> Option<&'m str> {
    map.get(key)
        .or_else(|| {
            map.iter()
                .find(|(k, _)| k.eq_ignore_ascii_case(key))
                .map(|(_, v)| v)
        })
        .map(String::as_str)
}

/// Evaluates parsed templates for one output.
///
/// In strict mode any unresolvable variable or failing function aborts with
/// an error. Otherwise the failing piece renders as its source text (for
/// variables) or `Name(args)` (for functions) and a warning is logged.
pub struct Evaluator<'a> {
    env: &'a Environment,
    strict: bool,
    output: &'a str,
    template: &'a str,
}

impl<'a> Evaluator<'a> {
    pub fn new(env: &'a Environment, strict: bool, output: &'a str, template: &'a str) -> Self {
        Evaluator {
            env,
            strict,
            output,
            template,
        }
    }

    pub fn render(&self, nodes: &[Node]) -> Result<String> {
        let mut rendered = String::new();
        for node in nodes {
            rendered.push_str(&self.node(node)?);
        }
        Ok(rendered)
    }

    fn node(&self, node: &Node) -> Result<String> {
        match node {
            Node::Text(text) => Ok(text.clone()),
            Node::Variable { namespace, key } => {
                match self.env.lookup(namespace.as_deref(), key) {
                    Ok(value) => Ok(value),
                    Err(message) => self.degrade(node.to_string(), message),
                }
            }
            Node::Call { name, args } => {
                let values = args
                    .iter()
                    .map(|arg| self.render(arg))
                    .collect::<Result<Vec<_>>>()?;

                match functions::call(name, &values, self.env) {
                    Ok(value) => Ok(value),
                    Err(CallError::Numeric(message)) if self.strict => {
                        Err(FlexVersionError::numeric(format!(
                            "{} (output '{}', template '{}')",
                            message, self.output, self.template
                        )))
                    }
                    Err(err) => self.degrade(format!("{}({})", name, values.join(",")), err.to_string()),
                }
            }
        }
    }

    fn degrade(&self, placeholder: String, message: String) -> Result<String> {
        if self.strict {
            return Err(FlexVersionError::template(
                self.output,
                self.template,
                message,
            ));
        }

        warn!(
            output = %self.output,
            template = %self.template,
            placeholder = %placeholder,
            "{}",
            message
        );
        Ok(placeholder)
    }
}
