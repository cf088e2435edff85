//! Renderer for evaluating a hige node tree against a [`Context`].
//!
//! Whitespace control already happened in the token processor, so the
//! renderer only decides what each node contributes to the output.

use std::collections::HashMap;

use hige_ast::{Node, PartialNode, PartialLoader, SectionNode};
use tracing::{debug, trace};

use crate::context::{Context, ContextId, Lambda, ResolvedSection, Section};
use crate::error::{HigeError, Result};
use crate::html_escape;

/// Nesting limit shared by partial expansion and lambda re-rendering.
pub const DEFAULT_MAX_DEPTH: usize = 64;

/// Scope a node sequence is rendered against.
///
/// A `value` section does not live in the context tree as a scope of its own;
/// entering it pushes its map as plain variables on top of the current frame.
enum Frame<'s> {
    Context(ContextId),
    Pushed {
        variables: &'s HashMap<String, String>,
        parent: &'s Frame<'s>,
    },
}

impl Frame<'_> {
    /// The context scope that sections are resolved from.
    fn base(&self) -> ContextId {
        match self {
            Frame::Context(id) => *id,
            Frame::Pushed { parent, .. } => parent.base(),
        }
    }

    fn fetch<'c>(&'c self, context: &'c Context, key: &str) -> Option<&'c str> {
        match self {
            Frame::Context(id) => context.fetch(*id, key),
            Frame::Pushed { variables, parent } => variables
                .get(key)
                .map(String::as_str)
                .or_else(|| parent.fetch(context, key)),
        }
    }
}

/// Renderer for evaluating hige nodes
pub struct Renderer<'a> {
    partials: Option<&'a mut dyn PartialLoader>,
    max_depth: usize,
    depth: usize,
}

impl<'a> Renderer<'a> {
    /// Create a renderer. Without a loader every `{{>name}}` renders as nothing.
    pub fn new(partials: Option<&'a mut dyn PartialLoader>) -> Self {
        Self {
            partials,
            max_depth: DEFAULT_MAX_DEPTH,
            depth: 0,
        }
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Render `nodes` against the root scope of `context`.
    pub fn render(&mut self, nodes: &[Node], context: &Context) -> Result<String> {
        self.render_scope(nodes, context, context.root())
    }

    /// Render `nodes` against an arbitrary scope of `context`.
    pub fn render_scope(&mut self, nodes: &[Node], context: &Context, id: ContextId) -> Result<String> {
        let mut output = String::new();
        self.render_nodes(nodes, context, &Frame::Context(id), &mut output)?;
        Ok(output)
    }

    fn render_nodes(
        &mut self,
        nodes: &[Node],
        context: &Context,
        frame: &Frame<'_>,
        out: &mut String,
    ) -> Result<()> {
        for node in nodes {
            match node {
                Node::Text(n) => out.push_str(&n.content),
                Node::Variable(n) => {
                    if let Some(value) = lookup(context, frame, &n.key) {
                        if n.raw {
                            out.push_str(value);
                        } else {
                            out.push_str(&html_escape::escape(value));
                        }
                    }
                }
                Node::Section(n) => self.render_section(n, context, frame, out)?,
                Node::Partial(n) => self.render_partial(n, context, frame, out)?,
            }
        }
        Ok(())
    }

    fn render_section(
        &mut self,
        node: &SectionNode,
        context: &Context,
        frame: &Frame<'_>,
        out: &mut String,
    ) -> Result<()> {
        let resolved = context.resolve_section(frame.base(), &node.key);

        match resolved {
            ResolvedSection::Value(map) => {
                trace!(section = %node.key, kind = "value", "resolved section");
                if node.inverted {
                    if map.is_empty() {
                        self.render_nodes(&node.children, context, frame, out)?;
                    }
                } else if !map.is_empty() {
                    let pushed = Frame::Pushed {
                        variables: map,
                        parent: frame,
                    };
                    self.render_nodes(&node.children, context, &pushed, out)?;
                }
            }
            ResolvedSection::Func(f) if !node.inverted => {
                trace!(section = %node.key, kind = "func", "resolved section");
                self.render_lambda(node, f, context, frame, out)?;
            }
            ResolvedSection::List(children) => {
                trace!(section = %node.key, kind = "list", len = children.len(), "resolved section");
                if node.inverted {
                    if children.is_empty() {
                        self.render_nodes(&node.children, context, frame, out)?;
                    }
                } else {
                    for &child in children {
                        self.render_nodes(&node.children, context, &Frame::Context(child), out)?;
                    }
                }
            }
            ResolvedSection::Func(_) | ResolvedSection::Plain => {
                trace!(section = %node.key, kind = "plain", "resolved section");
                let truthy = lookup(context, frame, &node.key).is_some_and(|v| !v.is_empty());
                if truthy != node.inverted {
                    self.render_nodes(&node.children, context, frame, out)?;
                }
            }
        }
        Ok(())
    }

    /// Feed the raw section body to the lambda and render what it returns.
    fn render_lambda(
        &mut self,
        node: &SectionNode,
        f: &Lambda,
        context: &Context,
        frame: &Frame<'_>,
        out: &mut String,
    ) -> Result<()> {
        debug!(section = %node.key, "invoking lambda");
        let fragment = (**f)(&node.source);
        let template = hige_ast::parse(&fragment)?;

        self.descend(&node.key, |renderer| {
            renderer.render_nodes(template.nodes(), context, frame, out)
        })
    }

    /// Splice a partial in place; it sees the same scope as the tag.
    /// A standalone tag indents every line of the partial.
    fn render_partial(
        &mut self,
        node: &PartialNode,
        context: &Context,
        frame: &Frame<'_>,
        out: &mut String,
    ) -> Result<()> {
        let Some(loader) = self.partials.as_mut() else {
            debug!(partial = %node.key, "no partial loader configured");
            return Ok(());
        };
        let Some(template) = loader.load(&node.key).map_err(HigeError::Loader)? else {
            debug!(partial = %node.key, "partial not found");
            return Ok(());
        };

        let indented;
        let nodes = match node.indent.as_deref() {
            Some(indent) if !indent.is_empty() => {
                indented = hige_ast::indent_lines(template.nodes(), indent);
                indented.as_slice()
            }
            _ => template.nodes(),
        };

        self.descend(&node.key, |renderer| {
            renderer.render_nodes(nodes, context, frame, out)
        })
    }

    fn descend<F>(&mut self, name: &str, f: F) -> Result<()>
    where
        F: FnOnce(&mut Self) -> Result<()>,
    {
        if self.depth >= self.max_depth {
            debug!(tag = %name, limit = self.max_depth, "recursion limit exceeded");
            return Err(HigeError::RecursionLimitExceeded {
                name: name.to_string(),
                limit: self.max_depth,
            });
        }

        self.depth += 1;
        let result = f(self);
        self.depth -= 1;
        result
    }
}

/// Plain variable visible from `frame`, falling back to a dotted path.
fn lookup<'c>(context: &'c Context, frame: &'c Frame<'_>, key: &str) -> Option<&'c str> {
    frame
        .fetch(context, key)
        .or_else(|| lookup_dotted(context, frame.base(), key))
}

/// Where one segment of a dotted name landed.
enum Dotted<'c> {
    Map(&'c HashMap<String, String>),
    Scope(ContextId),
}

/// Resolve `a.b.c` one segment at a time.
///
/// The head is looked up through the scope chain; later segments only look
/// inside what the previous one reached. A segment steps through a `value`
/// section or a list holding exactly one child scope, which is how nested
/// JSON objects are bound.
fn lookup_dotted<'c>(context: &'c Context, base: ContextId, key: &str) -> Option<&'c str> {
    let mut segments = key.split('.');
    let head = segments.next()?;
    let last = segments.next_back()?;
    if head.is_empty() || last.is_empty() {
        return None;
    }

    let mut current = match context.fetch_value(base, head) {
        Some(map) => Dotted::Map(map),
        None => match context.fetch_list(base, head)? {
            [only] => Dotted::Scope(*only),
            _ => return None,
        },
    };
    for segment in segments {
        let Dotted::Scope(id) = current else {
            return None;
        };
        current = match context.section(id, segment)? {
            Section::Value(map) => Dotted::Map(map),
            Section::List(children) if children.len() == 1 => Dotted::Scope(children[0]),
            _ => return None,
        };
    }

    match current {
        Dotted::Map(map) => map.get(last).map(String::as_str),
        Dotted::Scope(id) => context.get(id, last).ok(),
    }
}
