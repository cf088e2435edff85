//! Recursive descent parser for Mustache templates.
//!
//! Consumes a processed token stream (after the token processor) and
//! produces the node tree. The original source is kept at hand so each
//! section can record the raw text between its tags.

use crate::ast::{Node, PartialNode, SectionNode, Template, TextNode, VariableNode};
use crate::token::{Token, TokenType};
use crate::{Location, ParseError};

/// Deepest section nesting the parser accepts.
pub const MAX_NESTING: usize = 128;

/// Parse a processed token stream into a Template.
pub fn parse(tokens: Vec<Token>, source: &str) -> Result<Template, ParseError> {
    let mut parser = Parser::new(tokens, source);
    parser.parse()
}

struct Parser<'a> {
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
    source: &'a str,
}

impl<'a> Parser<'a> {
    fn new(tokens: Vec<Token>, source: &'a str) -> Self {
        Self {
            tokens,
            pos: 0,
            depth: 0,
            source,
        }
    }

    fn parse(&mut self) -> Result<Template, ParseError> {
        let nodes = self.parse_nodes()?;
        if let Some(token) = self.current_token() {
            return Err(ParseError::UnexpectedClose {
                name: token.value.clone(),
                line: token.location.line,
                column: token.location.column,
            });
        }
        Ok(Template::new(nodes, Location::new(1, 1, 0)))
    }

    /// Parse nodes up to the next section close or the end of input.
    fn parse_nodes(&mut self) -> Result<Vec<Node>, ParseError> {
        let mut nodes = Vec::new();
        while let Some(token_type) = self.current_type() {
            if token_type == TokenType::SectionClose {
                break;
            }
            nodes.push(self.parse_node()?);
        }
        Ok(nodes)
    }

    fn parse_node(&mut self) -> Result<Node, ParseError> {
        if matches!(
            self.current_type(),
            Some(TokenType::SectionOpen | TokenType::InvertedOpen)
        ) {
            return self.parse_section();
        }

        let Token {
            token_type,
            value,
            location,
            indent,
            ..
        } = self.advance();

        Ok(match token_type {
            TokenType::Text => Node::Text(TextNode {
                content: value,
                location,
            }),
            TokenType::Variable => Node::Variable(VariableNode {
                key: value,
                raw: false,
                location,
            }),
            TokenType::Unescaped => Node::Variable(VariableNode {
                key: value,
                raw: true,
                location,
            }),
            TokenType::Partial => Node::Partial(PartialNode {
                key: value,
                indent,
                location,
            }),
            other => {
                return Err(ParseError::UnexpectedToken {
                    message: format!("Unexpected {other:?} '{value}'"),
                    line: location.line,
                    column: location.column,
                })
            }
        })
    }

    fn parse_section(&mut self) -> Result<Node, ParseError> {
        let open = self.advance();
        if self.depth == MAX_NESTING {
            return Err(ParseError::NestingTooDeep {
                limit: MAX_NESTING,
                line: open.location.line,
                column: open.location.column,
            });
        }
        self.depth += 1;
        let children = self.parse_nodes()?;
        self.depth -= 1;

        let Some(close) = self.current_token().cloned() else {
            return Err(ParseError::UnclosedSection {
                name: open.value,
                line: open.location.line,
                column: open.location.column,
            });
        };
        if close.value != open.value {
            return Err(ParseError::MismatchedClose {
                expected: open.value,
                found: close.value,
                line: close.location.line,
                column: close.location.column,
            });
        }
        self.pos += 1;

        Ok(Node::Section(SectionNode {
            key: open.value,
            inverted: open.token_type == TokenType::InvertedOpen,
            children,
            source: self.source[open.span.end..close.span.start].to_string(),
            location: open.location,
        }))
    }

    // ========================================================================
    // Helpers
    // ========================================================================

    fn current_token(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn current_type(&self) -> Option<TokenType> {
        self.current_token().map(|t| t.token_type)
    }

    /// Take the current token. Callers check `current_type` first.
    fn advance(&mut self) -> Token {
        let token = self.tokens[self.pos].clone();
        self.pos += 1;
        token
    }
}

#[cfg(test)]
mod tests {
    use super::MAX_NESTING;
    use crate::ast::Node;
    use crate::{parse, ParseError};

    #[test]
    fn test_parse_variables() {
        let tmpl = parse("Hi {{name}}, {{{html}}} {{&amp}}").unwrap();
        assert_eq!(
            tmpl.to_string(),
            "[[T : Hi ], [V : name], [T : , ], [E : html], [T :  ], [E : amp]]"
        );
    }

    #[test]
    fn test_parse_nested_sections() {
        let tmpl = parse("{{#list}}{{^empty}}{{item}}{{/empty}}{{/list}}").unwrap();
        assert_eq!(
            tmpl.to_string(),
            "[[S : list, [[I : empty, [[V : item]]]]]]"
        );
    }

    #[test]
    fn test_section_keeps_raw_source() {
        let tmpl = parse("{{#wrap}}Hi {{ name }}!{{! c }}{{/wrap}}").unwrap();
        match &tmpl.nodes()[0] {
            Node::Section(section) => assert_eq!(section.source, "Hi {{ name }}!{{! c }}"),
            _ => panic!("expected section node"),
        }
    }

    #[test]
    fn test_section_source_with_custom_delimiters() {
        let tmpl = parse("{{=<% %>=}}<%#wrap%>{{x}}<%/wrap%>").unwrap();
        match &tmpl.nodes()[0] {
            Node::Section(section) => assert_eq!(section.source, "{{x}}"),
            _ => panic!("expected section node"),
        }
    }

    #[test]
    fn test_partial() {
        let tmpl = parse("{{> item }}").unwrap();
        assert_eq!(tmpl.to_string(), "[[P : item]]");
    }

    #[test]
    fn test_standalone_partial_indent() {
        let tmpl = parse("a\n  {{>p}}\n{{>q}}").unwrap();
        let indents: Vec<_> = tmpl
            .nodes()
            .iter()
            .filter_map(|node| match node {
                Node::Partial(p) => Some(p.indent.clone()),
                _ => None,
            })
            .collect();
        assert_eq!(indents, vec![Some("  ".to_string()), Some(String::new())]);

        let tmpl = parse("a {{>p}}\n").unwrap();
        assert!(matches!(&tmpl.nodes()[1], Node::Partial(p) if p.indent.is_none()));
    }

    #[test]
    fn test_nesting_limit() {
        let nested = |depth: usize| "{{#a}}".repeat(depth) + &"{{/a}}".repeat(depth);

        assert!(parse(&nested(MAX_NESTING)).is_ok());
        let result = parse(&nested(MAX_NESTING + 1));
        assert!(matches!(
            result,
            Err(ParseError::NestingTooDeep { limit: MAX_NESTING, line: 1, .. })
        ));
    }

    #[test]
    fn test_deep_nesting_fails_without_overflow() {
        let source = "{{#a}}".repeat(20_000) + &"{{/a}}".repeat(20_000);
        assert!(matches!(
            parse(&source),
            Err(ParseError::NestingTooDeep { .. })
        ));
    }

    #[test]
    fn test_unclosed_section_error() {
        let result = parse("{{#open}}body");
        assert!(matches!(
            result,
            Err(ParseError::UnclosedSection { ref name, .. }) if name == "open"
        ));
    }

    #[test]
    fn test_mismatched_close_error() {
        let result = parse("{{#a}}{{/b}}");
        assert!(matches!(
            result,
            Err(ParseError::MismatchedClose { ref expected, ref found, .. })
                if expected == "a" && found == "b"
        ));
    }

    #[test]
    fn test_stray_close_error() {
        let result = parse("text{{/a}}");
        assert!(matches!(
            result,
            Err(ParseError::UnexpectedClose { line: 1, column: 5, .. })
        ));
    }
}
