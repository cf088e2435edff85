//! Token types for the Mustache lexer.

use std::ops::Range;

use crate::Location;

/// Token types produced by the lexer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenType {
    /// Raw text between tags.
    Text,
    /// `{{name}}` - HTML-escaped interpolation
    Variable,
    /// `{{{name}}}` or `{{&name}}` - raw interpolation
    Unescaped,
    /// `{{#name}}`
    SectionOpen,
    /// `{{^name}}`
    InvertedOpen,
    /// `{{/name}}`
    SectionClose,
    /// `{{>name}}`
    Partial,
    /// `{{! ... }}`
    Comment,
    /// `{{=<% %>=}}`
    Delimiters,
}

impl TokenType {
    /// Tags that may stand alone on a line and take that line with them.
    pub fn can_stand_alone(self) -> bool {
        matches!(
            self,
            TokenType::SectionOpen
                | TokenType::InvertedOpen
                | TokenType::SectionClose
                | TokenType::Partial
                | TokenType::Comment
                | TokenType::Delimiters
        )
    }

    /// Tags that produce no node of their own.
    pub fn is_silent(self) -> bool {
        matches!(self, TokenType::Comment | TokenType::Delimiters)
    }
}

/// A token with its type, value, location and byte span in the source.
///
/// For text tokens `value` is the text itself; for tags it is the trimmed tag
/// name. `span` always covers the full token including delimiters.
/// `indent` is set by the token processor on standalone partial tags, even
/// when it is empty.
#[derive(Debug, Clone)]
pub struct Token {
    pub token_type: TokenType,
    pub value: String,
    pub location: Location,
    pub span: Range<usize>,
    pub indent: Option<String>,
}

impl Token {
    pub fn new(
        token_type: TokenType,
        value: impl Into<String>,
        location: Location,
        span: Range<usize>,
    ) -> Self {
        Self {
            token_type,
            value: value.into(),
            location,
            span,
            indent: None,
        }
    }
}
