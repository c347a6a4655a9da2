//! A small boolean query language over log entries.
//!
//! ```text
//! error                      free text, case-insensitive substring of the raw line
//! "connection reset"         quoted phrase, spaces preserved
//! level:warn                 field substring match
//! level:"WARN"               field exact (case-insensitive) match
//! status:>500  timestamp:<2024-02-01
//!                            strict numeric or date-time comparison
//! a b  /  a AND b            both
//! a OR b                     either; OR binds loosest
//! NOT a                      negation of the next term
//! ```
//!
//! There is no grouping syntax: `a b OR c` means `(a AND b) OR c`. Parsing never fails;
//! odd input (unbalanced quotes, a trailing `NOT`) is read on a best-effort basis.

mod eval;
mod tokenize;

use crate::entry::LogEntry;
use tokenize::{tokenize, Keyword, Token};

pub(crate) use eval::contains_ignore_case;

/// Parsed query tree, immutable once built
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Query {
    /// Case-insensitive substring of the raw line; empty text matches everything
    FullText(String),
    /// Attribute match; see [`Query::is_match`] for name resolution
    Field {
        name: String,
        value: String,
        exact: bool,
    },
    And(Vec<Query>),
    Or(Vec<Query>),
    Not(Box<Query>),
}

impl Query {
    /// The trivially-true query
    pub fn match_all() -> Self {
        Query::FullText(String::new())
    }

    /// Parse query text
    ///
    /// Terms are partitioned into groups at every `OR`; the terms inside a group are
    /// ANDed. A one-term group collapses to the term, and a single group is returned
    /// without an `Or` wrapper. Blank input yields [`Query::match_all`].
    pub fn parse(text: &str) -> Self {
        let tokens = tokenize(text);
        let mut groups: Vec<Vec<Query>> = vec![Vec::new()];
        let mut i = 0;

        while i < tokens.len() {
            let token = &tokens[i];
            match token.keyword() {
                Some(Keyword::Or) => groups.push(Vec::new()),
                Some(Keyword::And) => {}
                Some(Keyword::Not) if i + 1 < tokens.len() => {
                    i += 1;
                    push_term(&mut groups, Query::Not(Box::new(term(&tokens[i]))));
                }
                _ => push_term(&mut groups, term(token)),
            }
            i += 1;
        }

        let mut alternatives: Vec<Query> = groups
            .into_iter()
            .filter(|group| !group.is_empty())
            .map(|mut group| {
                if group.len() == 1 {
                    group.remove(0)
                } else {
                    Query::And(group)
                }
            })
            .collect();

        match alternatives.len() {
            0 => Query::match_all(),
            1 => alternatives.remove(0),
            _ => Query::Or(alternatives),
        }
    }

    /// Evaluate against an entry
    ///
    /// Field names resolve case-insensitively to `level`, `message` and `timestamp`
    /// (RFC 3339 UTC); any other name is looked up verbatim in the flattened fields.
    /// A missing attribute never matches.
    pub fn is_match(&self, entry: &LogEntry) -> bool {
        eval::matches(self, entry)
    }

    /// The text of a bare free-text query, the only shape the search index can answer
    pub fn as_full_text(&self) -> Option<&str> {
        match self {
            Query::FullText(text) => Some(text),
            _ => None,
        }
    }

    /// True for the trivially-true query
    pub fn is_match_all(&self) -> bool {
        matches!(self, Query::FullText(text) if text.is_empty())
    }
}

impl Default for Query {
    fn default() -> Self {
        Self::match_all()
    }
}

fn push_term(groups: &mut [Vec<Query>], query: Query) {
    if let Some(group) = groups.last_mut() {
        group.push(query);
    }
}

/// Build a leaf from a token, ignoring any keyword meaning
fn term(token: &Token) -> Query {
    match token.field_parts() {
        Some((name, value, exact)) => Query::Field { name, value, exact },
        None => Query::FullText(token.text()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(s: &str) -> Query {
        Query::FullText(s.to_string())
    }

    fn field(name: &str, value: &str) -> Query {
        Query::Field {
            name: name.to_string(),
            value: value.to_string(),
            exact: false,
        }
    }

    fn entry(level: &str, message: &str) -> LogEntry {
        LogEntry {
            raw_content: message.to_string(),
            level: Some(level.to_string()),
            message: Some(message.to_string()),
            ..LogEntry::default()
        }
    }

    #[test]
    fn test_blank_query_matches_all() {
        assert_eq!(Query::parse(""), Query::match_all());
        assert_eq!(Query::parse("   \t "), Query::match_all());
        assert!(Query::parse("").is_match_all());
    }

    #[test]
    fn test_single_terms() {
        assert_eq!(Query::parse("error"), text("error"));
        assert_eq!(Query::parse("level:ERROR"), field("level", "ERROR"));
        assert_eq!(Query::parse("\"connection reset\""), text("connection reset"));
    }

    #[test]
    fn test_adjacent_terms_are_and() {
        assert_eq!(
            Query::parse("level:Warn database"),
            Query::And(vec![field("level", "Warn"), text("database")])
        );
        assert_eq!(Query::parse("a AND b"), Query::parse("a b"));
        assert_eq!(Query::parse("a and b"), Query::parse("a b"));
    }

    #[test]
    fn test_or_binds_loosest() {
        assert_eq!(
            Query::parse("level:Error OR level:Warn database"),
            Query::Or(vec![
                field("level", "Error"),
                Query::And(vec![field("level", "Warn"), text("database")]),
            ])
        );
    }

    #[test]
    fn test_not_negates_next_term_only() {
        assert_eq!(
            Query::parse("level:Error NOT database OR level:Info"),
            Query::Or(vec![
                Query::And(vec![
                    field("level", "Error"),
                    Query::Not(Box::new(text("database"))),
                ]),
                field("level", "Info"),
            ])
        );
    }

    #[test]
    fn test_dangling_keywords() {
        assert_eq!(Query::parse("error NOT"), Query::And(vec![text("error"), text("NOT")]));
        assert_eq!(Query::parse("OR error OR"), text("error"));
        assert_eq!(Query::parse("AND"), Query::match_all());
    }

    #[test]
    fn test_quoted_keyword_is_text() {
        assert_eq!(
            Query::parse("\"or\" \"NOT\""),
            Query::And(vec![text("or"), text("NOT")])
        );
    }

    #[test]
    fn test_precedence_semantics() {
        let query = Query::parse("level:Error OR level:Warn database");
        assert!(query.is_match(&entry("Error", "anything")));
        assert!(query.is_match(&entry("Warn", "database timeout")));
        assert!(!query.is_match(&entry("Warn", "network error")));
    }

    #[test]
    fn test_not_or_semantics() {
        let query = Query::parse("level:Error NOT database OR level:Info");
        assert!(query.is_match(&entry("Error", "something")));
        assert!(!query.is_match(&entry("Error", "database error")));
        assert!(query.is_match(&entry("Info", "database error")));
    }

    #[test]
    fn test_as_full_text() {
        assert_eq!(Query::parse("Error").as_full_text(), Some("Error"));
        assert_eq!(Query::parse("level:x").as_full_text(), None);
        assert_eq!(Query::parse("a b").as_full_text(), None);
    }
}
