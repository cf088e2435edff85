//! Hige - a logic-less Mustache renderer over a scoped context tree
//!
//! Data lives in a [`Context`]: a tree of scopes holding plain variables and
//! sections (nested maps, lambdas, or lists of child scopes). Templates are
//! parsed into [`Node`] trees by `hige-ast` and evaluated by the [`Renderer`].
//!
//! # Example
//!
//! ```rust
//! use serde_json::json;
//!
//! let result = hige::render(
//!     "{{#items}}<{{name}}>{{/items}}",
//!     json!({"items": [{"name": "tea"}, {"name": "coffee"}]}),
//! ).unwrap();
//!
//! assert_eq!(result, "<tea><coffee>");
//! ```
//!
//! Building the context by hand:
//!
//! ```rust
//! use hige::{Context, Hige};
//!
//! let mut context = Context::new();
//! let root = context.root();
//! context.set(root, "name", "Red Bull").unwrap();
//! context.set_lambda(root, "bold", |text| format!("<b>{text}</b>"));
//!
//! let tmpl = Hige::parse("{{#bold}}{{name}}{{/bold}}").unwrap();
//! assert_eq!(tmpl.render(&context).unwrap(), "<b>Red Bull</b>");
//! ```

// Public modules
pub mod context;
pub mod error;
pub mod html_escape;
pub mod renderer;
pub mod template_loader;
pub mod value;

pub use context::{Binding, Context, ContextId, Lambda, Section, SectionKind};
pub use error::{HigeError, Result};
pub use hige_ast::{LoaderError, Location, Node, ParseError, PartialLoader, Template};
pub use renderer::{Renderer, DEFAULT_MAX_DEPTH};
pub use template_loader::TemplateLoader;
pub use value::IMPLICIT_ITERATOR;

use std::path::{Path, PathBuf};

/// Main template struct for parsing once and rendering multiple times
pub struct Hige {
    template: Template,
    partial_root: Option<PathBuf>,
    max_depth: usize,
}

impl Hige {
    /// Parse a template source string
    ///
    /// # Example
    ///
    /// ```rust
    /// use serde_json::json;
    ///
    /// let tmpl = hige::Hige::parse("Hello, {{name}}!").unwrap();
    /// let result = tmpl.render_json(json!({"name": "Alice"})).unwrap();
    /// assert_eq!(result, "Hello, Alice!");
    /// ```
    pub fn parse(source: &str) -> Result<Self> {
        Ok(Self {
            template: hige_ast::parse(source)?,
            partial_root: None,
            max_depth: DEFAULT_MAX_DEPTH,
        })
    }

    /// Parse a template whose `{{>name}}` tags load `<partial_root>/name.mustache`
    ///
    /// # Example
    ///
    /// ```rust,ignore
    /// let tmpl = hige::Hige::parse_with_partials("{{>header}}", "templates/partials").unwrap();
    /// ```
    pub fn parse_with_partials(source: &str, partial_root: impl AsRef<Path>) -> Result<Self> {
        let mut hige = Self::parse(source)?;
        hige.partial_root = Some(partial_root.as_ref().to_path_buf());
        Ok(hige)
    }

    /// Limit the nesting of partials and lambda output
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Render the template against the root of `context`
    pub fn render(&self, context: &Context) -> Result<String> {
        let mut loader = self
            .partial_root
            .as_ref()
            .map(TemplateLoader::new)
            .transpose()?;
        let partials = loader.as_mut().map(|l| l as &mut dyn PartialLoader);
        Renderer::new(partials)
            .with_max_depth(self.max_depth)
            .render(self.template.nodes(), context)
    }

    /// Render with a caller-supplied partial loader instead of the partial root
    pub fn render_with(&self, context: &Context, partials: &mut dyn PartialLoader) -> Result<String> {
        Renderer::new(Some(partials))
            .with_max_depth(self.max_depth)
            .render(self.template.nodes(), context)
    }

    /// Render the template with the given JSON data
    pub fn render_json(&self, data: serde_json::Value) -> Result<String> {
        let context = Context::from_json(data)?;
        self.render(&context)
    }

    /// Get a reference to the parsed template
    pub fn template(&self) -> &Template {
        &self.template
    }
}

/// Convenience function: parse and render in one call
///
/// # Example
///
/// ```rust
/// use serde_json::json;
///
/// let result = hige::render("Hello, {{name}}!", json!({"name": "World"})).unwrap();
/// assert_eq!(result, "Hello, World!");
/// ```
pub fn render(source: &str, data: serde_json::Value) -> Result<String> {
    Hige::parse(source)?.render_json(data)
}

/// Convenience function: parse and render with partials loaded from a directory
pub fn render_with_partials(
    source: &str,
    data: serde_json::Value,
    partial_root: impl AsRef<Path>,
) -> Result<String> {
    Hige::parse_with_partials(source, partial_root)?.render_json(data)
}

/// Render an already built node sequence against the root of `context`
///
/// # Example
///
/// ```rust
/// use hige::{Context, Node};
///
/// let mut context = Context::new();
/// let root = context.root();
/// context.set_variable(root, "price", "275");
///
/// let nodes = [Node::text("Price: "), Node::raw("price")];
/// assert_eq!(hige::render_nodes(&nodes, &context, None).unwrap(), "Price: 275");
/// ```
pub fn render_nodes(
    nodes: &[Node],
    context: &Context,
    partials: Option<&mut dyn PartialLoader>,
) -> Result<String> {
    Renderer::new(partials).render(nodes, context)
}
