//! Query-string grammar.
//!
//! A query is a list of `/`-separated segments. Each segment is either
//! `property<op>value` or a bare positional literal:
//!
//! ```
//! use portico_query::{parse_query, Condition, Operator};
//!
//! let conditions: Vec<_> = parse_query("/1/b=42/c>=3/").collect();
//! assert_eq!(
//!     conditions,
//!     vec![
//!         Condition::literal("1"),
//!         Condition::new("b", Operator::Eq, "42"),
//!         Condition::new("c", Operator::Ge, "3"),
//!     ]
//! );
//! ```

use crate::types::{Condition, Operator};

/// Operators in lookup priority order.
///
/// The first operator whose text occurs anywhere in a segment wins, so an
/// operator must come before every shorter operator it contains.
pub const OPERATORS: [Operator; 8] = [
    Operator::NotMatches,
    Operator::Ne,
    Operator::Matches,
    Operator::Le,
    Operator::Ge,
    Operator::Eq,
    Operator::Lt,
    Operator::Gt,
];

/// Parse a query string into its conditions, left to right.
///
/// Empty segments are skipped. Segments are not validated: `=x` gives a
/// condition with an empty property name and it is up to the backend to
/// reject it.
pub fn parse_query(text: &str) -> Conditions<'_> {
    Conditions {
        segments: text.split('/'),
    }
}

/// Parse a single non-empty segment
pub fn parse_segment(segment: &str) -> Condition {
    OPERATORS
        .iter()
        .find_map(|op| {
            segment
                .split_once(op.as_str())
                .map(|(property, value)| Condition::new(property, *op, value))
        })
        .unwrap_or_else(|| Condition::literal(segment))
}

/// Lazy iterator over the conditions of a query string.
///
/// A clone continues from the same position; call [`parse_query`] again
/// to start over.
#[derive(Debug, Clone)]
pub struct Conditions<'a> {
    segments: std::str::Split<'a, char>,
}

impl Iterator for Conditions<'_> {
    type Item = Condition;

    fn next(&mut self) -> Option<Condition> {
        self.segments
            .by_ref()
            .find(|segment| !segment.is_empty())
            .map(parse_segment)
    }
}

impl std::iter::FusedIterator for Conditions<'_> {}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(text: &str) -> Vec<Condition> {
        parse_query(text).collect()
    }

    #[test]
    fn test_parse_example() {
        assert_eq!(
            parse("/1/b=42/c>=3/"),
            vec![
                Condition::literal("1"),
                Condition::new("b", Operator::Eq, "42"),
                Condition::new("c", Operator::Ge, "3"),
            ]
        );
    }

    #[test]
    fn test_empty_segments_are_skipped() {
        assert!(parse("").is_empty());
        assert!(parse("///").is_empty());
        assert_eq!(
            parse("a//b=1///c"),
            vec![
                Condition::literal("a"),
                Condition::new("b", Operator::Eq, "1"),
                Condition::literal("c"),
            ]
        );
    }

    #[test]
    fn test_one_condition_per_segment_in_order() {
        let segments = ["x", "y<2", "z!=q", "w~=^a", "v"];
        for (prefix, suffix) in [("", ""), ("/", ""), ("", "/"), ("//", "//")] {
            let text = format!("{}{}{}", prefix, segments.join("/"), suffix);
            let conditions = parse(&text);
            assert_eq!(conditions.len(), segments.len());
            for (condition, segment) in conditions.iter().zip(segments) {
                assert_eq!(condition.to_string(), segment);
            }
        }
    }

    #[test]
    fn test_literal_fallback() {
        assert_eq!(parse_segment("hello"), Condition::literal("hello"));
        assert_eq!(parse_segment("a-b.c"), Condition::literal("a-b.c"));
    }

    #[test]
    fn test_operator_precedence() {
        let cases = [
            ("a<=3", "a", Operator::Le, "3"),
            ("a>=3", "a", Operator::Ge, "3"),
            ("a!=3", "a", Operator::Ne, "3"),
            ("a~=3", "a", Operator::Matches, "3"),
            ("a~!=3", "a", Operator::NotMatches, "3"),
            ("a<3", "a", Operator::Lt, "3"),
            ("a>3", "a", Operator::Gt, "3"),
            ("a=3", "a", Operator::Eq, "3"),
            // Higher priority operator wins even when it appears later
            ("a=b<=c", "a=b", Operator::Le, "c"),
            ("a<b=c", "a<b", Operator::Eq, "c"),
            ("a=!=b", "a=", Operator::Ne, "b"),
            ("a>b<c", "a>b", Operator::Lt, "c"),
            // Split happens at the first occurrence of the winning operator
            ("a=b=c", "a", Operator::Eq, "b=c"),
        ];

        for (segment, property, operator, value) in cases {
            assert_eq!(
                parse_segment(segment),
                Condition::new(property, operator, value),
                "segment {}",
                segment
            );
        }
    }

    #[test]
    fn test_permissive_segments() {
        assert_eq!(parse_segment("=x"), Condition::new("", Operator::Eq, "x"));
        assert_eq!(parse_segment("x="), Condition::new("x", Operator::Eq, ""));
    }

    #[test]
    fn test_operator_table_ordering() {
        // No operator may be preceded by a shorter one it contains
        for (i, op) in OPERATORS.iter().enumerate() {
            for earlier in &OPERATORS[..i] {
                assert!(
                    !op.as_str().contains(earlier.as_str()),
                    "{} is shadowed by {}",
                    op,
                    earlier
                );
            }
        }
    }

    #[test]
    fn test_parse_is_restartable() {
        let text = "/a=1/b/";
        let first: Vec<_> = parse_query(text).collect();
        let second: Vec<_> = parse_query(text).collect();
        assert_eq!(first, second);
    }
}
