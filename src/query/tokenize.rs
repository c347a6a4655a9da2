//! Whitespace tokenizer with double-quoted phrases.

/// Operator words, recognised case-insensitively and only when unquoted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Keyword {
    And,
    Or,
    Not,
}

/// One whitespace-delimited term, quotes still in place
#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) struct Token {
    raw: String,
}

impl Token {
    pub(super) fn keyword(&self) -> Option<Keyword> {
        if self.raw.eq_ignore_ascii_case("and") {
            Some(Keyword::And)
        } else if self.raw.eq_ignore_ascii_case("or") {
            Some(Keyword::Or)
        } else if self.raw.eq_ignore_ascii_case("not") {
            Some(Keyword::Not)
        } else {
            None
        }
    }

    /// Term text without quote characters
    pub(super) fn text(&self) -> String {
        strip_quotes(&self.raw)
    }

    /// `(name, value, exact)` for a `name:value` term
    ///
    /// The colon must come before any quote, so `"a:b"` stays a phrase. A quoted
    /// value (`name:"v"`) asks for an exact match.
    pub(super) fn field_parts(&self) -> Option<(String, String, bool)> {
        let colon = self.raw.find(':')?;
        if colon == 0 || self.raw[..colon].contains('"') {
            return None;
        }
        let value = &self.raw[colon + 1..];
        Some((
            self.raw[..colon].to_string(),
            strip_quotes(value),
            value.starts_with('"'),
        ))
    }
}

fn strip_quotes(text: &str) -> String {
    text.chars().filter(|c| *c != '"').collect()
}

/// Split on whitespace outside double quotes
///
/// An unterminated quote runs to the end of the input.
pub(super) fn tokenize(input: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;

    for c in input.chars() {
        if c == '"' {
            in_quotes = !in_quotes;
            current.push(c);
        } else if c.is_whitespace() && !in_quotes {
            if !current.is_empty() {
                tokens.push(Token {
                    raw: std::mem::take(&mut current),
                });
            }
        } else {
            current.push(c);
        }
    }

    if !current.is_empty() {
        tokens.push(Token { raw: current });
    }

    // `""` and the like carry no text
    tokens.retain(|token| !token.text().is_empty() || token.field_parts().is_some());
    tokens
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raws(input: &str) -> Vec<String> {
        tokenize(input).into_iter().map(|t| t.raw).collect()
    }

    #[test]
    fn test_splits_on_whitespace() {
        assert_eq!(raws("  a  b\tc\n"), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_quoted_phrase_is_one_token() {
        assert_eq!(
            raws(r#"x "hello big world" y"#),
            vec!["x", r#""hello big world""#, "y"]
        );
        assert_eq!(raws(r#"msg:"a b""#), vec![r#"msg:"a b""#]);
    }

    #[test]
    fn test_unbalanced_quote_runs_to_end() {
        let tokens = tokenize(r#"ok "never closed here"#);
        assert_eq!(tokens.len(), 2);
        assert_eq!(tokens[1].text(), "never closed here");
    }

    #[test]
    fn test_empty_quotes_are_dropped() {
        assert_eq!(raws(r#"a "" b"#), vec!["a", "b"]);
    }

    #[test]
    fn test_field_parts() {
        let token = |raw: &str| Token { raw: raw.to_string() };

        assert_eq!(
            token("level:warn").field_parts(),
            Some(("level".into(), "warn".into(), false))
        );
        assert_eq!(
            token(r#"level:"WARN""#).field_parts(),
            Some(("level".into(), "WARN".into(), true))
        );
        assert_eq!(
            token("url:http://x").field_parts(),
            Some(("url".into(), "http://x".into(), false))
        );
        assert_eq!(token(":x").field_parts(), None);
        assert_eq!(token(r#""a:b""#).field_parts(), None);
    }

    #[test]
    fn test_keywords_are_case_insensitive() {
        let token = |raw: &str| Token { raw: raw.to_string() };
        assert_eq!(token("or").keyword(), Some(Keyword::Or));
        assert_eq!(token("And").keyword(), Some(Keyword::And));
        assert_eq!(token("NOT").keyword(), Some(Keyword::Not));
        assert_eq!(token(r#""OR""#).keyword(), None);
        assert_eq!(token("nothing").keyword(), None);
    }
}
