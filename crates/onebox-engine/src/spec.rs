//! Search specifications.
//!
//! A [`SearchSpecification`] declares everything search needs to know
//! about one document type: which index to hit, which fields to search
//! and highlight, the filters every request carries, how the query
//! language's field names map onto the index, and how a raw hit becomes
//! a display-ready result. Specifications are immutable and safe to
//! share across concurrent requests.

use onebox_protocol::{BoolQuery, Hit, HighlightField, Query};
use onebox_query::{QueryNode, parse};
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::{
    compile::compile, context::CompilerContext, error::SearchError, strict::policy_text_query,
    tuning::SearchTuning,
};

/// One request's query input, handed to specifications when building
/// their filter.
#[derive(Debug, Clone, Copy)]
pub struct QueryIntent<'a> {
    /// Raw query text from the search box.
    pub text: &'a str,
    /// Whether the parser should be attempted at all. Cleared by the
    /// engine after a backend rejection, turning the text into one
    /// literal term.
    pub parse: bool,
    /// Tunables in effect for this request.
    pub tuning: &'a SearchTuning,
}

impl QueryIntent<'_> {
    /// Builds the scored query for this input, or None for a blank box.
    ///
    /// Parse failures fall back to the entire original string as a
    /// single literal term; the parser is never re-run on a modified
    /// string. Plain word-bag queries go through the strict-matching
    /// policy when it is enabled; structured ("advanced") queries
    /// compile as written.
    pub fn scored_query(&self, ctx: &CompilerContext) -> Option<Query> {
        let trimmed = self.text.trim();
        if trimmed.is_empty() {
            return None;
        }

        let node = if self.parse {
            match parse(trimmed) {
                Ok(Some(node)) => node,
                Ok(None) => return None,
                Err(err) => {
                    debug!(query = trimmed, error = %err, "query failed to parse, using literal text");
                    QueryNode::term(trimmed)
                }
            }
        } else {
            QueryNode::term(trimmed)
        };

        let token_count = trimmed.split_whitespace().count();
        if !self.tuning.strict_relevance || node.is_advanced() || token_count <= 1 {
            Some(compile(&node, ctx))
        } else {
            Some(policy_text_query(trimmed, &ctx.fields, token_count))
        }
    }
}

/// A display-ready search result.
///
/// The document-type-specific projection of one hit; everything the
/// rendering layer needs without reaching back into raw backend records.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultRecord {
    /// Document type tag (`wiki`, `question`, ...).
    pub doc_type: String,
    /// Document id.
    pub id: String,
    /// Display title.
    pub title: String,
    /// Link target.
    pub url: String,
    /// Highlighted excerpts, best field first.
    pub excerpts: Vec<String>,
    /// Relevance score the hit carried.
    pub score: f32,
    /// Type-specific extras (votes, product tags, ...).
    #[serde(skip_serializing_if = "serde_json::Map::is_empty")]
    pub extra: serde_json::Map<String, Value>,
}

impl ResultRecord {
    /// Creates a record with empty display fields.
    pub fn new(doc_type: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            doc_type: doc_type.into(),
            id: id.into(),
            title: String::new(),
            url: String::new(),
            excerpts: Vec::new(),
            score: 0.0,
            extra: serde_json::Map::new(),
        }
    }

    /// Sets the display title.
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    /// Sets the link target.
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    /// Sets the excerpts.
    pub fn with_excerpts(mut self, excerpts: Vec<String>) -> Self {
        self.excerpts = excerpts;
        self
    }

    /// Sets the score.
    pub fn with_score(mut self, score: f32) -> Self {
        self.score = score;
        self
    }

    /// Adds a type-specific extra.
    pub fn with_extra(mut self, key: impl Into<String>, value: Value) -> Self {
        self.extra.insert(key.into(), value);
        self
    }
}

/// Picks a hit's excerpts following the declared highlight field order,
/// falling back to the raw text of `fallback_field` when the backend
/// returned no fragments.
pub fn excerpts_for(hit: &Hit, fields: &[HighlightField], fallback_field: &str) -> Vec<String> {
    for field in fields {
        if let Some(fragments) = hit.highlight.get(&field.field) {
            if !fragments.is_empty() {
                return fragments.clone();
            }
        }
    }

    hit.source_text(fallback_field)
        .map(|text| vec![text])
        .unwrap_or_default()
}

/// Declares how one document type is searched.
///
/// Implementations are plain value objects created once per logical
/// search type; the engine never mutates them, so one instance can serve
/// any number of concurrent requests.
pub trait SearchSpecification {
    /// Logical index identifier (federated searches comma-join these).
    fn index(&self) -> String;

    /// Searchable fields with boosts encoded as `name^boost`.
    fn fields(&self) -> Vec<String>;

    /// Fields to request highlight fragments for.
    fn highlight_fields(&self) -> Vec<HighlightField>;

    /// Always-applied constraints: locale existence, product scoping,
    /// archival status and the like.
    fn base_filters(&self) -> Vec<Query>;

    /// Compiler configuration for the query language's field names.
    fn compiler_context(&self) -> CompilerContext;

    /// Fields carrying semantic (embedding) representations. Non-empty
    /// enables the fused retrieval path.
    fn semantic_fields(&self) -> Vec<String> {
        Vec::new()
    }

    /// Projects a raw hit into a display-ready result.
    fn make_result(&self, hit: &Hit) -> Result<ResultRecord, SearchError>;

    /// Builds the complete filtered query for one request: the base
    /// filters AND the scored query for the box text.
    fn filter(&self, intent: &QueryIntent<'_>) -> Query {
        let mut bool_query = BoolQuery::new().filters(self.base_filters());
        if let Some(scored) = intent.scored_query(&self.compiler_context()) {
            bool_query = bool_query.must(scored);
        }
        bool_query.build()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use onebox_protocol::{MinimumShouldMatch, TextOperator};
    use serde_json::json;

    use super::*;

    fn intent<'a>(text: &'a str, tuning: &'a SearchTuning) -> QueryIntent<'a> {
        QueryIntent {
            text,
            parse: true,
            tuning,
        }
    }

    fn ctx() -> CompilerContext {
        CompilerContext::new(vec!["title^4".into(), "content".into()])
    }

    #[test]
    fn blank_input_builds_no_scored_query() {
        let tuning = SearchTuning::default();
        assert_eq!(intent("", &tuning).scored_query(&ctx()), None);
        assert_eq!(intent("   ", &tuning).scored_query(&ctx()), None);
    }

    #[test]
    fn plain_queries_go_through_the_policy() {
        let tuning = SearchTuning::default();
        let Some(Query::Text(text)) = intent("foo bar baz", &tuning).scored_query(&ctx())
        else {
            panic!("expected a text query");
        };
        assert_eq!(
            text.minimum_should_match,
            Some(MinimumShouldMatch::Percent(66))
        );
    }

    #[test]
    fn advanced_queries_skip_the_policy() {
        let tuning = SearchTuning::default();
        let Some(Query::Bool(_)) = intent("foo OR bar", &tuning).scored_query(&ctx()) else {
            panic!("expected the compiled boolean query");
        };

        // A quoted phrase counts as advanced even without operators.
        let Some(Query::Text(text)) =
            intent("\"foo bar\" baz", &tuning).scored_query(&ctx())
        else {
            panic!("expected a text query");
        };
        // Compiled as written: AND of everything, no loosened threshold.
        assert_eq!(text.default_operator, TextOperator::And);
        assert_eq!(text.minimum_should_match, None);
    }

    #[test]
    fn strict_relevance_off_compiles_as_written() {
        let tuning = SearchTuning::default().with_strict_relevance(false);
        let Some(Query::Text(text)) = intent("foo bar baz", &tuning).scored_query(&ctx())
        else {
            panic!("expected a text query");
        };
        assert_eq!(text.minimum_should_match, None);
        assert_eq!(text.default_operator, TextOperator::And);
    }

    #[test]
    fn unparseable_input_falls_back_to_literal_text() {
        let tuning = SearchTuning::default();
        for broken in ["(((", "foo AND", "NOT", "a OR (b"] {
            let query = intent(broken, &tuning).scored_query(&ctx());
            assert!(query.is_some(), "input: {broken}");
        }
    }

    #[test]
    fn parse_disabled_treats_syntax_as_text() {
        let tuning = SearchTuning::default();
        let no_parse = QueryIntent {
            text: "foo OR bar",
            parse: false,
            tuning: &tuning,
        };
        // Three whitespace tokens of literal text, not a boolean query;
        // the policy's three-token row applies.
        let Some(Query::Text(text)) = no_parse.scored_query(&ctx()) else {
            panic!("expected a text query");
        };
        assert_eq!(text.query, "foo OR bar");
        assert_eq!(
            text.minimum_should_match,
            Some(MinimumShouldMatch::Percent(66))
        );
    }

    #[test]
    fn excerpts_prefer_highlight_order_then_fallback() {
        let mut highlight = BTreeMap::new();
        highlight.insert(
            "content".to_string(),
            vec!["the <em>crash</em> reporter".to_string()],
        );
        let hit = Hit {
            id: "1".into(),
            index: "wiki_document".into(),
            score: 1.0,
            source: json!({"summary": "Plain summary text."}),
            highlight,
        };

        let fields = vec![
            HighlightField::new("summary"),
            HighlightField::new("content"),
        ];
        assert_eq!(
            excerpts_for(&hit, &fields, "summary"),
            vec!["the <em>crash</em> reporter".to_string()]
        );

        let no_fragments = Hit {
            highlight: BTreeMap::new(),
            ..hit
        };
        assert_eq!(
            excerpts_for(&no_fragments, &fields, "summary"),
            vec!["Plain summary text.".to_string()]
        );
    }
}
