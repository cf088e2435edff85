//! Mustache node tree.

use std::fmt;

use crate::Location;

/// A parsed template: the top-level node sequence.
#[derive(Debug, Clone, Default)]
pub struct Template {
    nodes: Vec<Node>,
    location: Location,
}

impl Template {
    pub fn new(nodes: Vec<Node>, location: Location) -> Self {
        Self { nodes, location }
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn into_nodes(self) -> Vec<Node> {
        self.nodes
    }

    pub fn location(&self) -> Location {
        self.location
    }
}

impl From<Vec<Node>> for Template {
    fn from(nodes: Vec<Node>) -> Self {
        Self::new(nodes, Location::new(1, 1, 0))
    }
}

#[derive(Debug, Clone)]
pub enum Node {
    Text(TextNode),
    Variable(VariableNode),
    Section(SectionNode),
    Partial(PartialNode),
}

impl Node {
    pub fn text(content: impl Into<String>) -> Self {
        Node::Text(TextNode {
            content: content.into(),
            location: Location::default(),
        })
    }

    /// `{{key}}`
    pub fn escaped(key: impl Into<String>) -> Self {
        Node::Variable(VariableNode {
            key: key.into(),
            raw: false,
            location: Location::default(),
        })
    }

    /// `{{{key}}}`
    pub fn raw(key: impl Into<String>) -> Self {
        Node::Variable(VariableNode {
            key: key.into(),
            raw: true,
            location: Location::default(),
        })
    }

    /// `{{#key}}children{{/key}}`
    pub fn section(key: impl Into<String>, children: Vec<Node>) -> Self {
        Node::Section(SectionNode::new(key, false, children))
    }

    /// `{{^key}}children{{/key}}`
    pub fn inverted(key: impl Into<String>, children: Vec<Node>) -> Self {
        Node::Section(SectionNode::new(key, true, children))
    }

    /// `{{>key}}`
    pub fn partial(key: impl Into<String>) -> Self {
        Node::Partial(PartialNode {
            key: key.into(),
            indent: None,
            location: Location::default(),
        })
    }

    pub fn location(&self) -> Location {
        match self {
            Node::Text(n) => n.location,
            Node::Variable(n) => n.location,
            Node::Section(n) => n.location,
            Node::Partial(n) => n.location,
        }
    }
}

/// Literal text, emitted verbatim.
#[derive(Debug, Clone)]
pub struct TextNode {
    pub content: String,
    pub location: Location,
}

/// Interpolation: `{{key}}`, or `{{{key}}}` / `{{&key}}` when `raw`.
#[derive(Debug, Clone)]
pub struct VariableNode {
    pub key: String,
    pub raw: bool,
    pub location: Location,
}

/// Section block: `{{#key}} ... {{/key}}`, or `{{^key}} ... {{/key}}` when `inverted`.
#[derive(Debug, Clone)]
pub struct SectionNode {
    pub key: String,
    pub inverted: bool,
    pub children: Vec<Node>,
    /// Unparsed template text between the open and close tags, handed to lambdas.
    pub source: String,
    pub location: Location,
}

impl SectionNode {
    /// Build a section whose source text is regenerated from `children`.
    pub fn new(key: impl Into<String>, inverted: bool, children: Vec<Node>) -> Self {
        Self {
            key: key.into(),
            inverted,
            source: to_source(&children),
            children,
            location: Location::default(),
        }
    }
}

/// Partial reference: `{{>key}}`
#[derive(Debug, Clone)]
pub struct PartialNode {
    pub key: String,
    /// Whitespace in front of a standalone tag; `None` when the tag shares its line.
    pub indent: Option<String>,
    pub location: Location,
}

/// Write `nodes` back out as Mustache source with the default delimiters.
///
/// Comments and tag padding are not preserved.
pub fn to_source(nodes: &[Node]) -> String {
    let mut out = String::new();
    write_source(nodes, &mut out);
    out
}

fn write_source(nodes: &[Node], out: &mut String) {
    for node in nodes {
        match node {
            Node::Text(n) => out.push_str(&n.content),
            Node::Variable(n) if n.raw => {
                out.push_str("{{{");
                out.push_str(&n.key);
                out.push_str("}}}");
            }
            Node::Variable(n) => {
                out.push_str("{{");
                out.push_str(&n.key);
                out.push_str("}}");
            }
            Node::Section(n) => {
                out.push_str(if n.inverted { "{{^" } else { "{{#" });
                out.push_str(&n.key);
                out.push_str("}}");
                write_source(&n.children, out);
                out.push_str("{{/");
                out.push_str(&n.key);
                out.push_str("}}");
            }
            Node::Partial(n) => {
                if let Some(indent) = &n.indent {
                    out.push_str(indent);
                }
                out.push_str("{{>");
                out.push_str(&n.key);
                out.push_str("}}");
                if n.indent.is_some() {
                    out.push('\n');
                }
            }
        }
    }
}

/// Prefix every template line of `nodes` with `indent`.
///
/// Lines are counted in the template text only, so newlines inside
/// interpolated values are left alone. Standalone partials inside get the
/// combined indentation.
pub fn indent_lines(nodes: &[Node], indent: &str) -> Vec<Node> {
    let mut at_line_start = true;
    indent_nodes(nodes, indent, &mut at_line_start)
}

fn indent_nodes(nodes: &[Node], indent: &str, at_line_start: &mut bool) -> Vec<Node> {
    let mut out = Vec::with_capacity(nodes.len());
    for node in nodes {
        match node {
            Node::Text(n) => {
                let mut content = String::with_capacity(n.content.len() + indent.len());
                for line in n.content.split_inclusive('\n') {
                    if *at_line_start {
                        content.push_str(indent);
                    }
                    content.push_str(line);
                    *at_line_start = line.ends_with('\n');
                }
                out.push(Node::Text(TextNode {
                    content,
                    location: n.location,
                }));
            }
            Node::Section(n) => {
                let children = indent_nodes(&n.children, indent, at_line_start);
                out.push(Node::Section(SectionNode {
                    key: n.key.clone(),
                    inverted: n.inverted,
                    children,
                    source: n.source.clone(),
                    location: n.location,
                }));
            }
            Node::Partial(PartialNode {
                key,
                indent: Some(inner),
                location,
            }) => {
                out.push(Node::Partial(PartialNode {
                    key: key.clone(),
                    indent: Some(format!("{indent}{inner}")),
                    location: *location,
                }));
                *at_line_start = true;
            }
            _ => {
                if *at_line_start {
                    out.push(Node::text(indent));
                    *at_line_start = false;
                }
                out.push(node.clone());
            }
        }
    }
    out
}

// ============================================================================
// Diagnostic form
// ============================================================================

/// Displays a node sequence as `[node, node, ...]`.
pub struct Nodes<'a>(pub &'a [Node]);

impl fmt::Display for Nodes<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[")?;
        for (i, node) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{node}")?;
        }
        f.write_str("]")
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Node::Text(n) => write!(f, "[T : {}]", n.content),
            Node::Variable(n) if n.raw => write!(f, "[E : {}]", n.key),
            Node::Variable(n) => write!(f, "[V : {}]", n.key),
            Node::Section(n) => {
                let tag = if n.inverted { "I" } else { "S" };
                write!(f, "[{tag} : {}, {}]", n.key, Nodes(&n.children))
            }
            Node::Partial(n) => write!(f, "[P : {}]", n.key),
        }
    }
}

impl fmt::Display for Template {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&Nodes(&self.nodes), f)
    }
}
