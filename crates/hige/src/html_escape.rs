/// Escape HTML special characters: & < > "
pub fn escape(input: &str) -> String {
    let mut output = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => output.push_str("&amp;"),
            '<' => output.push_str("&lt;"),
            '>' => output.push_str("&gt;"),
            '"' => output.push_str("&quot;"),
            _ => output.push(c),
        }
    }
    output
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_ampersand() {
        assert_eq!(escape("a & b"), "a &amp; b");
    }

    #[test]
    fn test_escape_angle_brackets() {
        assert_eq!(escape("<b>"), "&lt;b&gt;");
    }

    #[test]
    fn test_escape_double_quote() {
        assert_eq!(escape("a \"b\" c"), "a &quot;b&quot; c");
    }

    #[test]
    fn test_single_quote_is_kept() {
        assert_eq!(escape("it's"), "it's");
    }

    #[test]
    fn test_escape_is_not_idempotent() {
        assert_eq!(escape("&amp;"), "&amp;amp;");
    }

    #[test]
    fn test_no_escape_needed() {
        assert_eq!(escape("Hello, world!"), "Hello, world!");
    }
}
