//! Query evaluation against a single entry.

use crate::entry::LogEntry;
use crate::parser::parse_timestamp;
use crate::query::Query;
use std::borrow::Cow;
use std::cmp::Ordering;

pub(super) fn matches(query: &Query, entry: &LogEntry) -> bool {
    match query {
        Query::FullText(text) => contains_ignore_case(&entry.raw_content, text),
        Query::Field { name, value, exact } => match attribute(entry, name) {
            Some(actual) => field_matches(&actual, value, *exact),
            None => false,
        },
        Query::And(children) => children.iter().all(|child| matches(child, entry)),
        Query::Or(children) => children.iter().any(|child| matches(child, entry)),
        Query::Not(child) => !matches(child, entry),
    }
}

fn attribute<'a>(entry: &'a LogEntry, name: &str) -> Option<Cow<'a, str>> {
    if name.eq_ignore_ascii_case("level") {
        entry.level.as_deref().map(Cow::Borrowed)
    } else if name.eq_ignore_ascii_case("message") {
        entry.message.as_deref().map(Cow::Borrowed)
    } else if name.eq_ignore_ascii_case("timestamp") {
        entry.timestamp_string().map(Cow::Owned)
    } else {
        entry.field(name).map(Cow::Borrowed)
    }
}

fn field_matches(actual: &str, value: &str, exact: bool) -> bool {
    if let Some(rest) = value.strip_prefix('>') {
        return compare(actual, rest, Ordering::Greater);
    }
    if let Some(rest) = value.strip_prefix('<') {
        return compare(actual, rest, Ordering::Less);
    }
    if exact {
        return equals_ignore_case(actual, value);
    }
    contains_ignore_case(actual, value)
}

/// Strict comparison against the operand after `>`/`<`
///
/// Any further operator characters are stripped, so `>=` compares like `>`. Both sides
/// are tried as date-times first, then as numbers; anything else is no match.
fn compare(actual: &str, rest: &str, wanted: Ordering) -> bool {
    let operand = rest.trim_start_matches(['>', '<', '=']).trim();

    let ordering = match (parse_timestamp(actual), parse_timestamp(operand)) {
        (Some(a), Some(b)) => Some(a.cmp(&b)),
        _ => match (actual.trim().parse::<f64>(), operand.parse::<f64>()) {
            (Ok(a), Ok(b)) => a.partial_cmp(&b),
            _ => None,
        },
    };

    ordering == Some(wanted)
}

/// Case-insensitive substring test; an empty needle always matches
pub(crate) fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    if needle.is_empty() {
        return true;
    }
    if needle.is_ascii() {
        let needle = needle.as_bytes();
        return haystack
            .as_bytes()
            .windows(needle.len())
            .any(|window| window.eq_ignore_ascii_case(needle));
    }
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

fn equals_ignore_case(a: &str, b: &str) -> bool {
    if a.is_ascii() && b.is_ascii() {
        a.eq_ignore_ascii_case(b)
    } else {
        a.to_lowercase() == b.to_lowercase()
    }
}
