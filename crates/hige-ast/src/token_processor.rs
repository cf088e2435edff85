//! Token processor for standalone lines and silent tags.
//!
//! - A standalone tag (alone on its line apart from spaces/tabs) removes its
//!   indentation and line ending from the neighbouring text tokens
//! - A standalone partial keeps the removed indentation, to be applied to
//!   every line of the partial
//! - Comment and set-delimiter tokens are dropped once standalone lines are settled

use crate::token::{Token, TokenType};

/// Process tokens: strip standalone lines and drop silent tags.
pub fn process(tokens: Vec<Token>) -> Vec<Token> {
    // Decide on the untouched stream; trimming one tag's line must not change
    // whether its neighbour counts as standalone.
    let mut trim_start = vec![0; tokens.len()];
    let mut trim_end = vec![0; tokens.len()];
    let mut indents: Vec<Option<String>> = vec![None; tokens.len()];
    for index in 0..tokens.len() {
        if !is_standalone(&tokens, index) {
            continue;
        }
        let mut indent = String::new();
        if let Some(prev) = index.checked_sub(1) {
            let text = &tokens[prev].value;
            trim_end[prev] = trailing_indent(text);
            indent.push_str(&text[text.len() - trim_end[prev]..]);
        }
        if tokens[index].token_type == TokenType::Partial {
            indents[index] = Some(indent);
        }
        if let Some(next) = tokens.get(index + 1) {
            trim_start[index + 1] = leading_line_end(&next.value);
        }
    }

    tokens
        .into_iter()
        .zip(indents)
        .enumerate()
        .filter_map(|(index, (mut token, indent))| match token.token_type {
            TokenType::Text => {
                let start = trim_start[index];
                let end = token.value.len() - trim_end[index];
                token.value = if start < end {
                    token.value[start..end].to_string()
                } else {
                    String::new()
                };
                (!token.value.is_empty()).then_some(token)
            }
            t if t.is_silent() => None,
            _ => {
                token.indent = indent;
                Some(token)
            }
        })
        .collect()
}

fn is_standalone(tokens: &[Token], index: usize) -> bool {
    if !tokens[index].token_type.can_stand_alone() {
        return false;
    }

    let starts_line = match index.checked_sub(1).map(|prev| &tokens[prev]) {
        None => true,
        Some(prev) if prev.token_type == TokenType::Text => match prev.value.rfind('\n') {
            Some(newline) => is_blank(&prev.value[newline + 1..]),
            None => index == 1 && is_blank(&prev.value),
        },
        Some(_) => false,
    };
    if !starts_line {
        return false;
    }

    match tokens.get(index + 1) {
        None => true,
        Some(next) if next.token_type == TokenType::Text => {
            let rest = next.value.trim_start_matches(is_blank_char);
            (rest.is_empty() && index + 2 == tokens.len())
                || rest.starts_with('\n')
                || rest.starts_with("\r\n")
        }
        Some(_) => false,
    }
}

/// Length of the spaces/tabs run at the end of `text`.
fn trailing_indent(text: &str) -> usize {
    text.len() - text.trim_end_matches(is_blank_char).len()
}

/// Length of leading spaces/tabs plus one optional line ending.
fn leading_line_end(text: &str) -> usize {
    let indent = text.len() - text.trim_start_matches(is_blank_char).len();
    let rest = &text[indent..];
    if rest.starts_with("\r\n") {
        indent + 2
    } else if rest.starts_with('\n') {
        indent + 1
    } else {
        indent
    }
}

fn is_blank(text: &str) -> bool {
    text.chars().all(is_blank_char)
}

fn is_blank_char(c: char) -> bool {
    c == ' ' || c == '\t'
}
