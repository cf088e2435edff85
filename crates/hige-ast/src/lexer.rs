//! Hand-written lexer for Mustache templates.
//!
//! Two-mode scan:
//! - Text mode: accumulates raw text until the current open delimiter
//! - Tag mode: reads a single tag up to its close delimiter
//!
//! A set-delimiter tag (`{{=<% %>=}}`) swaps the delimiters for the rest of the source.

use crate::token::{Token, TokenType};
use crate::{Location, ParseError};

pub const DEFAULT_OPEN: &str = "{{";
pub const DEFAULT_CLOSE: &str = "}}";

/// Tokenize a source string into a sequence of tokens.
pub fn tokenize(source: &str) -> Result<Vec<Token>, ParseError> {
    let mut lexer = Lexer::new(source);
    lexer.tokenize()
}

struct Lexer<'a> {
    source: &'a str,
    pos: usize,
    line: usize,
    col: usize,
    open: String,
    close: String,
}

impl<'a> Lexer<'a> {
    fn new(source: &'a str) -> Self {
        Self {
            source,
            pos: 0,
            line: 1,
            col: 1,
            open: DEFAULT_OPEN.to_string(),
            close: DEFAULT_CLOSE.to_string(),
        }
    }

    fn tokenize(&mut self) -> Result<Vec<Token>, ParseError> {
        let mut tokens = Vec::new();

        while self.pos < self.source.len() {
            if self.looking_at(&self.open) {
                self.tokenize_tag(&mut tokens)?;
            } else {
                self.tokenize_text(&mut tokens);
            }
        }

        Ok(tokens)
    }

    /// Text mode: everything up to the next open delimiter, or the end of input.
    fn tokenize_text(&mut self, tokens: &mut Vec<Token>) {
        let source = self.source;
        let start = self.pos;
        let loc = self.location();

        let rest = &source[start..];
        let len = rest.find(self.open.as_str()).unwrap_or(rest.len());
        self.advance(len);

        tokens.push(Token::new(
            TokenType::Text,
            &source[start..self.pos],
            loc,
            start..self.pos,
        ));
    }

    /// Tag mode: sigil, content, close delimiter.
    fn tokenize_tag(&mut self, tokens: &mut Vec<Token>) -> Result<(), ParseError> {
        let source = self.source;
        let start = self.pos;
        let loc = self.location();
        self.advance(self.open.len());

        let (token_type, closing) = match source[self.pos..].chars().next() {
            Some('{') => (TokenType::Unescaped, ["}", self.close.as_str()].concat()),
            Some('&') => (TokenType::Unescaped, self.close.clone()),
            Some('#') => (TokenType::SectionOpen, self.close.clone()),
            Some('^') => (TokenType::InvertedOpen, self.close.clone()),
            Some('/') => (TokenType::SectionClose, self.close.clone()),
            Some('>') => (TokenType::Partial, self.close.clone()),
            Some('!') => (TokenType::Comment, self.close.clone()),
            Some('=') => (TokenType::Delimiters, ["=", self.close.as_str()].concat()),
            _ => (TokenType::Variable, self.close.clone()),
        };
        if token_type != TokenType::Variable {
            self.advance(1);
        }

        let content_start = self.pos;
        let Some(offset) = source[content_start..].find(closing.as_str()) else {
            return Err(ParseError::UnclosedTag {
                line: loc.line,
                column: loc.column,
            });
        };
        let content = &source[content_start..content_start + offset];
        self.advance(offset + closing.len());
        let span = start..self.pos;

        match token_type {
            TokenType::Comment => {
                tokens.push(Token::new(token_type, content, loc, span));
            }
            TokenType::Delimiters => {
                self.set_delimiters(content, loc)?;
                tokens.push(Token::new(token_type, content.trim(), loc, span));
            }
            _ => {
                let name = content.trim();
                if name.is_empty() {
                    return Err(ParseError::EmptyTagName {
                        line: loc.line,
                        column: loc.column,
                    });
                }
                tokens.push(Token::new(token_type, name, loc, span));
            }
        }

        Ok(())
    }

    /// Apply `<open> <close>` from a set-delimiter tag.
    fn set_delimiters(&mut self, content: &str, loc: Location) -> Result<(), ParseError> {
        let mut parts = content.split_whitespace();
        match (parts.next(), parts.next(), parts.next()) {
            (Some(open), Some(close), None) if !open.contains('=') && !close.contains('=') => {
                self.open = open.to_string();
                self.close = close.to_string();
                Ok(())
            }
            _ => Err(ParseError::InvalidDelimiters {
                content: content.trim().to_string(),
                line: loc.line,
                column: loc.column,
            }),
        }
    }

    fn location(&self) -> Location {
        Location::new(self.line, self.col, self.pos)
    }

    /// Check if the source at current position starts with the given pattern.
    fn looking_at(&self, pattern: &str) -> bool {
        self.source[self.pos..].starts_with(pattern)
    }

    /// Advance position by n bytes, updating line/column tracking.
    fn advance(&mut self, n: usize) {
        let end = (self.pos + n).min(self.source.len());
        for ch in self.source[self.pos..end].chars() {
            if ch == '\n' {
                self.line += 1;
                self.col = 1;
            } else {
                self.col += 1;
            }
        }
        self.pos = end;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn types(tokens: &[Token]) -> Vec<TokenType> {
        tokens.iter().map(|t| t.token_type).collect()
    }

    #[test]
    fn test_plain_text() {
        let tokens = tokenize("Hello, world!").unwrap();
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].token_type, TokenType::Text);
        assert_eq!(tokens[0].value, "Hello, world!");
        assert_eq!(tokens[0].span, 0..13);
    }

    #[test]
    fn test_variable_kinds() {
        let tokens = tokenize("{{ a }}{{{b}}}{{& c }}").unwrap();
        assert_eq!(
            types(&tokens),
            vec![
                TokenType::Variable,
                TokenType::Unescaped,
                TokenType::Unescaped
            ]
        );
        let names: Vec<&str> = tokens.iter().map(|t| t.value.as_str()).collect();
        assert_eq!(names, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_section_tags() {
        let tokens = tokenize("{{#list}}{{^empty}}{{/empty}}{{/list}}{{>item}}").unwrap();
        assert_eq!(
            types(&tokens),
            vec![
                TokenType::SectionOpen,
                TokenType::InvertedOpen,
                TokenType::SectionClose,
                TokenType::SectionClose,
                TokenType::Partial,
            ]
        );
    }

    #[test]
    fn test_tag_span_and_location() {
        let tokens = tokenize("ab\n  {{name}}").unwrap();
        let tag = &tokens[1];
        assert_eq!(tag.span, 5..13);
        assert_eq!(tag.location.line, 2);
        assert_eq!(tag.location.column, 3);
    }

    #[test]
    fn test_comment_keeps_raw_content() {
        let tokens = tokenize("{{! a {{ comment }}").unwrap();
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].token_type, TokenType::Comment);
        assert_eq!(tokens[0].value, " a {{ comment ");
    }

    #[test]
    fn test_set_delimiters() {
        let tokens = tokenize("{{=<% %>=}}<% name %>{{literal}}").unwrap();
        assert_eq!(
            types(&tokens),
            vec![TokenType::Delimiters, TokenType::Variable, TokenType::Text]
        );
        assert_eq!(tokens[1].value, "name");
        assert_eq!(tokens[2].value, "{{literal}}");
    }

    #[test]
    fn test_invalid_delimiters() {
        let result = tokenize("{{=<%=}}");
        assert!(matches!(result, Err(ParseError::InvalidDelimiters { .. })));
    }

    #[test]
    fn test_unclosed_tag() {
        let result = tokenize("text {{name");
        assert!(matches!(
            result,
            Err(ParseError::UnclosedTag { line: 1, column: 6 })
        ));
    }

    #[test]
    fn test_empty_tag_name() {
        let result = tokenize("{{#  }}");
        assert!(matches!(result, Err(ParseError::EmptyTagName { .. })));
    }

    #[test]
    fn test_multibyte_text() {
        let tokens = tokenize("夏空 {{name}}").unwrap();
        assert_eq!(tokens[0].value, "夏空 ");
        assert_eq!(tokens[1].location.column, 4);
    }
}
