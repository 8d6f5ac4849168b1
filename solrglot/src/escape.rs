//! Term and phrase escaping for the Lucene query grammar

/// Makes user input safe to embed in a query string.
///
/// `escape_term` output must be safe unquoted, `escape_phrase` output must
/// be a complete quoted phrase.
pub trait QueryEscaper: Send + Sync {
    fn escape_term(&self, input: &str) -> String;
    fn escape_phrase(&self, input: &str) -> String;
}

/// Escaping rules of the Solarium query helper
#[derive(Debug, Clone, Copy, Default)]
pub struct SolrEscaper;

/// Single characters with a meaning in the standard query parser; any
/// whitespace is escaped as well
const SPECIAL_CHARS: &[char] = &[
    '+', '-', '!', '(', ')', '{', '}', '[', ']', '^', '"', '~', '*', '?', ':', '/', '\\',
];

impl QueryEscaper for SolrEscaper {
    fn escape_term(&self, input: &str) -> String {
        let mut escaped = String::with_capacity(input.len() + 8);
        let mut chars = input.chars().peekable();

        while let Some(c) = chars.next() {
            // `&&` and `||` are operators as a pair only
            if (c == '&' || c == '|') && chars.peek() == Some(&c) {
                chars.next();
                escaped.push('\\');
                escaped.push(c);
                escaped.push(c);
            } else if c.is_whitespace() || SPECIAL_CHARS.contains(&c) {
                escaped.push('\\');
                escaped.push(c);
            } else {
                escaped.push(c);
            }
        }

        escaped
    }

    fn escape_phrase(&self, input: &str) -> String {
        let mut escaped = String::with_capacity(input.len() + 2);
        escaped.push('"');
        for c in input.chars() {
            if c == '"' || c == '\\' {
                escaped.push('\\');
            }
            escaped.push(c);
        }
        escaped.push('"');
        escaped
    }
}

impl<T: QueryEscaper + ?Sized> QueryEscaper for &T {
    fn escape_term(&self, input: &str) -> String {
        (**self).escape_term(input)
    }

    fn escape_phrase(&self, input: &str) -> String {
        (**self).escape_phrase(input)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_term_plain() {
        assert_eq!(SolrEscaper.escape_term("foo"), "foo");
    }

    #[test]
    fn test_escape_term_specials() {
        assert_eq!(SolrEscaper.escape_term("a:b"), "a\\:b");
        assert_eq!(SolrEscaper.escape_term("e-mail"), "e\\-mail");
        assert_eq!(SolrEscaper.escape_term("(x)"), "\\(x\\)");
        assert_eq!(SolrEscaper.escape_term("a b"), "a\\ b");
        assert_eq!(SolrEscaper.escape_term("a\tb"), "a\\\tb");
        assert_eq!(SolrEscaper.escape_term("a\nb"), "a\\\nb");
        assert_eq!(SolrEscaper.escape_term("a\u{a0}b"), "a\\\u{a0}b");
        assert_eq!(SolrEscaper.escape_term("c:\\"), "c\\:\\\\");
    }

    #[test]
    fn test_escape_term_operator_pairs() {
        assert_eq!(SolrEscaper.escape_term("a&&b"), "a\\&&b");
        assert_eq!(SolrEscaper.escape_term("a||b"), "a\\||b");
        assert_eq!(SolrEscaper.escape_term("a&b|c"), "a&b|c");
    }

    #[test]
    fn test_escape_phrase() {
        assert_eq!(SolrEscaper.escape_phrase("foo bar"), "\"foo bar\"");
        assert_eq!(
            SolrEscaper.escape_phrase("say \"hi\\\""),
            "\"say \\\"hi\\\\\\\"\""
        );
    }
}
