//! Strict-matching policy for plain queries.
//!
//! Queries with no structured syntax get their match requirements tuned
//! by shape: short queries demand every word, longer ones relax the
//! requirement so one off-topic word does not empty the result page, and
//! conversational questions ("why does firefox...") relax it further and
//! drop phrase matching, since question words rarely appear in articles
//! verbatim.
//!
//! The thresholds below are a contract with relevance tests; adjust them
//! together with the fixtures, not in isolation.

use onebox_protocol::{MinimumShouldMatch, Query, TextOperator, TextQuery};

/// Words that open a conversational question.
const CONVERSATIONAL_STARTERS: [&str; 11] = [
    "how", "why", "what", "when", "where", "who", "which", "can", "could", "should", "would",
];

/// Reports whether a query reads as a conversational question.
///
/// Only the first whitespace-separated word is inspected, ASCII
/// case-insensitively.
pub fn is_conversational(query: &str) -> bool {
    query
        .split_whitespace()
        .next()
        .is_some_and(|first| {
            CONVERSATIONAL_STARTERS
                .iter()
                .any(|starter| first.eq_ignore_ascii_case(starter))
        })
}

/// Builds the policy-tuned full-text query for a plain query string.
///
/// `token_count` is the number of whitespace-separated words; callers
/// handle the single-token case with an ordinary compile. The table:
///
/// | tokens | requirement | phrases |
/// |--------|-------------|---------|
/// | 2      | all (AND)   | on      |
/// | 3      | ≥66%        | on      |
/// | 4      | ≥50%        | on      |
/// | ≥5, conversational | ≥30% | off |
/// | ≥5     | ≥40%        | on      |
pub fn policy_text_query(query: &str, fields: &[String], token_count: usize) -> Query {
    let (default_operator, minimum_should_match, phrase) = match token_count {
        0 | 1 | 2 => (TextOperator::And, None, true),
        3 => (
            TextOperator::Or,
            Some(MinimumShouldMatch::Percent(66)),
            true,
        ),
        4 => (
            TextOperator::Or,
            Some(MinimumShouldMatch::Percent(50)),
            true,
        ),
        _ if is_conversational(query) => (
            TextOperator::Or,
            Some(MinimumShouldMatch::Percent(30)),
            false,
        ),
        _ => (
            TextOperator::Or,
            Some(MinimumShouldMatch::Percent(40)),
            true,
        ),
    };

    Query::Text(TextQuery {
        query: query.to_string(),
        fields: fields.to_vec(),
        default_operator,
        minimum_should_match,
        phrase,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields() -> Vec<String> {
        vec!["title^4".into(), "content".into()]
    }

    fn policy(query: &str) -> TextQuery {
        let token_count = query.split_whitespace().count();
        match policy_text_query(query, &fields(), token_count) {
            Query::Text(text) => text,
            other => panic!("expected a text query, got {other:?}"),
        }
    }

    #[test]
    fn two_terms_require_everything() {
        let text = policy("foo bar");
        assert_eq!(text.default_operator, TextOperator::And);
        assert_eq!(text.minimum_should_match, None);
        assert!(text.phrase);
    }

    #[test]
    fn three_terms_require_two_thirds() {
        let text = policy("foo bar baz");
        assert_eq!(text.default_operator, TextOperator::Or);
        assert_eq!(
            text.minimum_should_match,
            Some(MinimumShouldMatch::Percent(66))
        );
        assert!(text.phrase);
    }

    #[test]
    fn four_terms_require_half() {
        let text = policy("foo bar baz qux");
        assert_eq!(
            text.minimum_should_match,
            Some(MinimumShouldMatch::Percent(50))
        );
        assert!(text.phrase);
    }

    #[test]
    fn five_terms_require_forty_percent() {
        let text = policy("foo bar baz qux quux");
        assert_eq!(
            text.minimum_should_match,
            Some(MinimumShouldMatch::Percent(40))
        );
        assert!(text.phrase);
    }

    #[test]
    fn conversational_five_terms_relax_to_thirty_percent() {
        let text = policy("why does my browser crash");
        assert_eq!(
            text.minimum_should_match,
            Some(MinimumShouldMatch::Percent(30))
        );
        assert!(!text.phrase);
    }

    #[test]
    fn conversational_detection_is_first_word_only() {
        assert!(is_conversational("why does my browser crash"));
        assert!(is_conversational("HOW do i clear cookies now"));
        assert!(is_conversational("  which addon is slowing things down"));
        // "how" later in the query does not count.
        assert!(!is_conversational("firefox crashed how to recover it"));
        assert!(!is_conversational(""));
    }

    #[test]
    fn conversational_needs_five_terms() {
        // Four words starting with "why" still use the four-term row.
        let text = policy("why does firefox crash");
        assert_eq!(
            text.minimum_should_match,
            Some(MinimumShouldMatch::Percent(50))
        );
        assert!(text.phrase);
    }
}
