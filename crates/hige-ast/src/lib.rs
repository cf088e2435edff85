//! Mustache syntax for hige: the node tree, its parser, and the partial loader seam.
//!
//! ```rust
//! let template = hige_ast::parse("Hello, {{name}}!").unwrap();
//! assert_eq!(template.to_string(), "[[T : Hello, ], [V : name], [T : !]]");
//! ```

use std::collections::HashMap;
use std::error::Error;
use std::sync::Arc;

use thiserror::Error;

pub mod ast;
mod lexer;
mod parser;
mod token;
mod token_processor;

pub use ast::{indent_lines, to_source, Node, Nodes, PartialNode, SectionNode, Template, TextNode, VariableNode};
pub use lexer::{DEFAULT_CLOSE, DEFAULT_OPEN};
pub use parser::MAX_NESTING;

// ============================================================================
// Location
// ============================================================================

/// Location in source code (1-indexed).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Location {
    pub line: usize,
    pub column: usize,
    pub byte_offset: usize,
}

impl Location {
    pub fn new(line: usize, column: usize, byte_offset: usize) -> Self {
        Self {
            line,
            column,
            byte_offset,
        }
    }
}

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("unclosed tag at line {line}, column {column}")]
    UnclosedTag { line: usize, column: usize },

    #[error("empty tag name at line {line}, column {column}")]
    EmptyTagName { line: usize, column: usize },

    #[error("invalid delimiters '{content}' at line {line}, column {column}")]
    InvalidDelimiters {
        content: String,
        line: usize,
        column: usize,
    },

    #[error("unclosed section '{name}' opened at line {line}, column {column}")]
    UnclosedSection {
        name: String,
        line: usize,
        column: usize,
    },

    #[error("section '{expected}' closed by '{found}' at line {line}, column {column}")]
    MismatchedClose {
        expected: String,
        found: String,
        line: usize,
        column: usize,
    },

    #[error("close tag '{name}' without open section at line {line}, column {column}")]
    UnexpectedClose {
        name: String,
        line: usize,
        column: usize,
    },

    #[error("sections nested deeper than {limit} at line {line}, column {column}")]
    NestingTooDeep {
        limit: usize,
        line: usize,
        column: usize,
    },

    #[error("{message} at line {line}, column {column}")]
    UnexpectedToken {
        message: String,
        line: usize,
        column: usize,
    },
}

// ============================================================================
// Parsing
// ============================================================================

/// Parse a template source string into a node tree.
pub fn parse(source: &str) -> Result<Template, ParseError> {
    let tokens = lexer::tokenize(source)?;
    let tokens = token_processor::process(tokens);
    parser::parse(tokens, source)
}

// ============================================================================
// Partial Loader
// ============================================================================

/// Error type for partial loading operations.
pub type LoaderError = Box<dyn Error + Send + Sync>;

/// Trait for resolving `{{>name}}` references.
///
/// `Ok(None)` means the partial does not exist and renders as nothing;
/// `Err` aborts the render. Templates are shared, so a loader that keeps
/// them around hands out the same tree on every call.
pub trait PartialLoader {
    /// Load a partial by the name written in the tag.
    fn load(&mut self, name: &str) -> Result<Option<Arc<Template>>, LoaderError>;
}

/// An in-memory registry of named partials.
impl PartialLoader for HashMap<String, Arc<Template>> {
    fn load(&mut self, name: &str) -> Result<Option<Arc<Template>>, LoaderError> {
        Ok(self.get(name).map(Arc::clone))
    }
}

// ============================================================================
// Tests
// ============================================================================
