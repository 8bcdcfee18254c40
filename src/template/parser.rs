//! Recursive-descent parser for output templates.
//!
//! A template is plain text with two embedded forms:
//!
//! - `<namespace:key>` or `<key>` - a variable reference
//! - `$Name(arg, arg, ...)` - a function call whose arguments are templates
//!
//! A `<` that does not open a well-formed reference and a `$` that is not
//! followed by a name and `(` are plain text.

use std::fmt;

/// A parsed template fragment
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Text(String),
    Variable {
        namespace: Option<String>,
        key: String,
    },
    Call {
        name: String,
        args: Vec<Vec<Node>>,
    },
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Node::Text(text) => write!(f, "{}", text),
            Node::Variable {
                namespace: Some(ns),
                key,
            } => write!(f, "<{}:{}>", ns, key),
            Node::Variable {
                namespace: None,
                key,
            } => write!(f, "<{}>", key),
            Node::Call { name, args } => {
                write!(f, "${}(", name)?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ",")?;
                    }
                    for node in arg {
                        write!(f, "{}", node)?;
                    }
                }
                write!(f, ")")
            }
        }
    }
}

/// Parse a template into nodes.
pub fn parse(template: &str) -> Result<Vec<Node>, String> {
    let mut parser = Parser {
        chars: template.chars().collect(),
        pos: 0,
    };
    parser.sequence(Context::Top)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Context {
    Top,
    /// Inside a function argument: `,` and `)` terminate
    Argument,
    /// Inside plain parentheses within an argument: only `)` terminates
    Group,
}

struct Parser {
    chars: Vec<char>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn sequence(&mut self, context: Context) -> Result<Vec<Node>, String> {
        let mut nodes = Vec::new();

        loop {
            let Some(c) = self.peek() else {
                if context == Context::Top {
                    return Ok(nodes);
                }
                return Err("missing ')' before the end of the template".to_string());
            };

            match (context, c) {
                (Context::Argument, ',' | ')') | (Context::Group, ')') => return Ok(nodes),
                (_, '<') => match self.variable() {
                    Some(node) => nodes.push(node),
                    None => self.text(&mut nodes, c),
                },
                (_, '$') => match self.function()? {
                    Some(node) => nodes.push(node),
                    None => self.text(&mut nodes, c),
                },
                (Context::Argument | Context::Group, '(') => {
                    self.text(&mut nodes, '(');
                    for node in self.sequence(Context::Group)? {
                        push_node(&mut nodes, node);
                    }
                    // sequence(Group) only returns at ')'
                    self.text(&mut nodes, ')');
                }
                _ => self.text(&mut nodes, c),
            }
        }
    }

    /// Consume one character as text.
    fn text(&mut self, nodes: &mut Vec<Node>, c: char) {
        self.pos += 1;
        push_node(nodes, Node::Text(c.to_string()));
    }

    fn variable(&mut self) -> Option<Node> {
        let start = self.pos + 1;
        let mut end = start;
        while let Some(&c) = self.chars.get(end) {
            if c == '>' {
                break;
            }
            if c.is_whitespace() || matches!(c, '<' | '(' | ')' | ',' | '$') {
                return None;
            }
            end += 1;
        }
        if self.chars.get(end) != Some(&'>') || end == start {
            return None;
        }

        let inner: String = self.chars[start..end].iter().collect();
        let node = match inner.split_once(':') {
            Some((ns, key)) if !ns.is_empty() && !key.is_empty() => Node::Variable {
                namespace: Some(ns.to_string()),
                key: key.to_string(),
            },
            Some(_) => return None,
            None => Node::Variable {
                namespace: None,
                key: inner,
            },
        };

        self.pos = end + 1;
        Some(node)
    }

    fn function(&mut self) -> Result<Option<Node>, String> {
        let start = self.pos + 1;
        let mut end = start;
        while let Some(&c) = self.chars.get(end) {
            if c.is_ascii_alphanumeric() || c == '_' {
                end += 1;
            } else {
                break;
            }
        }
        let starts_with_letter = self
            .chars
            .get(start)
            .is_some_and(|c| c.is_ascii_alphabetic() || *c == '_');
        if !starts_with_letter || self.chars.get(end) != Some(&'(') {
            return Ok(None);
        }

        let name: String = self.chars[start..end].iter().collect();
        let open = self.pos;
        self.pos = end + 1;

        let mut args = Vec::new();
        if self.peek() == Some(')') {
            self.pos += 1;
            return Ok(Some(Node::Call { name, args }));
        }

        loop {
            let arg = self.sequence(Context::Argument).map_err(|_| {
                format!(
                    "function '${}' opened at position {} is missing its closing ')'",
                    name, open
                )
            })?;
            args.push(arg);

            match self.peek() {
                Some(',') => self.pos += 1,
                Some(')') => {
                    self.pos += 1;
                    return Ok(Some(Node::Call { name, args }));
                }
                _ => {
                    return Err(format!(
                        "function '${}' opened at position {} is missing its closing ')'",
                        name, open
                    ))
                }
            }
        }
    }
}

/// Append a node, merging adjacent text.
fn push_node(nodes: &mut Vec<Node>, node: Node) {
    if let Node::Text(text) = &node {
        if let Some(Node::Text(last)) = nodes.last_mut() {
            last.push_str(text);
            return;
        }
    }
    nodes.push(node);
}
