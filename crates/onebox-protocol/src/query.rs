//! Backend-neutral query expressions.
//!
//! The compiler emits these structures; a concrete backend serializes
//! them to whatever its wire format expects. The enum is deliberately
//! small: just the boolean-query vocabulary the search front end needs.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer, de};

/// Comparison key for range filters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompareOp {
    /// Strictly less than.
    Lt,
    /// Less than or equal.
    Lte,
    /// Strictly greater than.
    Gt,
    /// Greater than or equal.
    Gte,
}

/// Default operator joining the words of a full-text query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextOperator {
    /// Every word must match.
    And,
    /// Enough words must match to satisfy `minimum_should_match`.
    Or,
}

/// Minimum-should-match requirement: an absolute clause count or a
/// percentage of the optional clauses.
///
/// Serialized the way backends spell it: `"2"` or `"66%"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MinimumShouldMatch {
    /// At least this many clauses must match.
    Count(u32),
    /// At least this percentage of clauses must match.
    Percent(u8),
}

impl MinimumShouldMatch {
    /// Number of matching clauses required out of `clause_count`.
    ///
    /// Percentages require the next whole clause: "at least 66%" of
    /// three clauses means two of them.
    pub fn required(self, clause_count: usize) -> usize {
        match self {
            Self::Count(n) => (n as usize).min(clause_count),
            Self::Percent(p) => {
                (clause_count * usize::from(p)).div_ceil(100).min(clause_count)
            }
        }
    }
}

impl fmt::Display for MinimumShouldMatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Count(n) => write!(f, "{n}"),
            Self::Percent(p) => write!(f, "{p}%"),
        }
    }
}

impl Serialize for MinimumShouldMatch {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for MinimumShouldMatch {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        if let Some(percent) = raw.strip_suffix('%') {
            let value: u8 = percent
                .parse()
                .map_err(|_| de::Error::custom(format!("invalid percentage: {raw}")))?;
            Ok(Self::Percent(value))
        } else {
            let value: u32 = raw
                .parse()
                .map_err(|_| de::Error::custom(format!("invalid clause count: {raw}")))?;
            Ok(Self::Count(value))
        }
    }
}

/// A full-text query over one or more boosted fields.
///
/// Quoted spans inside `query` match as phrases when the `phrase` flag
/// is set; with the flag off, quotes are treated as ordinary characters
/// stripped by analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextQuery {
    /// Query text, quoting preserved.
    pub query: String,
    /// Field names to search, boosts encoded as `name^boost`.
    pub fields: Vec<String>,
    /// Operator joining the query's words.
    pub default_operator: TextOperator,
    /// Optional minimum-should-match requirement (meaningful with
    /// [`TextOperator::Or`]).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub minimum_should_match: Option<MinimumShouldMatch>,
    /// Whether quoted spans match as phrases.
    pub phrase: bool,
}

/// A boolean combination of sub-queries.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct BoolQuery {
    /// Clauses that must all match and contribute to the score.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub must: Vec<Query>,
    /// Clauses that must not match.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub must_not: Vec<Query>,
    /// Optional clauses; `minimum_should_match` controls how many are
    /// required.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub should: Vec<Query>,
    /// Clauses that must all match without contributing to the score.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub filter: Vec<Query>,
    /// How many `should` clauses are required. Defaults to one when the
    /// query has only `should` clauses, zero otherwise.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub minimum_should_match: Option<u32>,
}

impl BoolQuery {
    /// Creates an empty boolean query.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a scoring clause that must match.
    pub fn must(mut self, query: Query) -> Self {
        self.must.push(query);
        self
    }

    /// Adds a clause that must not match.
    pub fn must_not(mut self, query: Query) -> Self {
        self.must_not.push(query);
        self
    }

    /// Adds an optional clause.
    pub fn should(mut self, query: Query) -> Self {
        self.should.push(query);
        self
    }

    /// Adds a non-scoring clause that must match.
    pub fn filter(mut self, query: Query) -> Self {
        self.filter.push(query);
        self
    }

    /// Extends the non-scoring filter clauses.
    pub fn filters(mut self, queries: impl IntoIterator<Item = Query>) -> Self {
        self.filter.extend(queries);
        self
    }

    /// Sets the number of required `should` clauses.
    pub fn minimum_should_match(mut self, count: u32) -> Self {
        self.minimum_should_match = Some(count);
        self
    }

    /// Wraps this combination as a [`Query`].
    pub fn build(self) -> Query {
        Query::Bool(Box::new(self))
    }
}

/// A backend-neutral boolean query expression.
///
/// Serializes externally tagged (`{"term": {...}}`, `{"bool": {...}}`),
/// which is close enough to most engines' JSON DSLs that a backend can
/// translate mechanically.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Query {
    /// Matches every document.
    MatchAll,

    /// Matches no document. Used to fail closed on unauthorized fields.
    MatchNone,

    /// Exact value match on a single field.
    Term {
        /// Field name.
        field: String,
        /// Value that must match exactly.
        value: String,
    },

    /// Membership match: the field's value must be one of a set.
    Terms {
        /// Field name.
        field: String,
        /// Allowed values.
        values: Vec<String>,
    },

    /// Document-id restriction.
    Ids {
        /// Allowed document ids.
        values: Vec<String>,
    },

    /// Comparison filter on a single field.
    Range {
        /// Field name.
        field: String,
        /// Comparison key.
        op: CompareOp,
        /// Raw comparison value; numeric when both sides parse as
        /// numbers, lexicographic otherwise.
        value: String,
    },

    /// Full-text match over boosted fields.
    Text(TextQuery),

    /// Similarity match against a non-lexical representation of one
    /// field. Scoring is an external capability supplied by the backend.
    Semantic {
        /// Field name.
        field: String,
        /// Whole query text to embed and compare.
        query: String,
    },

    /// Boolean combination.
    Bool(Box<BoolQuery>),
}

impl Query {
    /// Shorthand for a [`Query::Term`].
    pub fn term(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self::Term {
            field: field.into(),
            value: value.into(),
        }
    }

    /// Shorthand for a [`Query::Terms`].
    pub fn terms(field: impl Into<String>, values: Vec<String>) -> Self {
        Self::Terms {
            field: field.into(),
            values,
        }
    }

    /// Shorthand for a [`Query::Range`].
    pub fn range(field: impl Into<String>, op: CompareOp, value: impl Into<String>) -> Self {
        Self::Range {
            field: field.into(),
            op,
            value: value.into(),
        }
    }

    /// Shorthand for a [`Query::Semantic`].
    pub fn semantic(field: impl Into<String>, query: impl Into<String>) -> Self {
        Self::Semantic {
            field: field.into(),
            query: query.into(),
        }
    }
}

/// Encodes a field name with its boost weight (`title^4`).
///
/// A weight of 1.0 is the neutral boost and is left unencoded.
pub fn boosted(field: &str, boost: f32) -> String {
    if (boost - 1.0).abs() < f32::EPSILON {
        field.to_string()
    } else {
        format!("{field}^{boost}")
    }
}

/// Splits a `name^boost` encoded field back into name and weight.
pub fn split_boost(field: &str) -> (&str, f32) {
    match field.rsplit_once('^') {
        Some((name, boost)) => match boost.parse::<f32>() {
            Ok(weight) => (name, weight),
            Err(_) => (field, 1.0),
        },
        None => (field, 1.0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimum_should_match_required_counts() {
        assert_eq!(MinimumShouldMatch::Count(2).required(4), 2);
        assert_eq!(MinimumShouldMatch::Count(9).required(4), 4);
        // Percentages round up to the next whole clause.
        assert_eq!(MinimumShouldMatch::Percent(66).required(3), 2);
        assert_eq!(MinimumShouldMatch::Percent(50).required(4), 2);
        assert_eq!(MinimumShouldMatch::Percent(30).required(5), 2);
        assert_eq!(MinimumShouldMatch::Percent(40).required(5), 2);
        assert_eq!(MinimumShouldMatch::Percent(100).required(2), 2);
    }

    #[test]
    fn minimum_should_match_serializes_as_backend_string() {
        let count = serde_json::to_string(&MinimumShouldMatch::Count(2)).unwrap();
        assert_eq!(count, "\"2\"");
        let percent = serde_json::to_string(&MinimumShouldMatch::Percent(66)).unwrap();
        assert_eq!(percent, "\"66%\"");

        let parsed: MinimumShouldMatch = serde_json::from_str("\"40%\"").unwrap();
        assert_eq!(parsed, MinimumShouldMatch::Percent(40));
    }

    #[test]
    fn bool_builder_collects_clauses() {
        let query = BoolQuery::new()
            .must(Query::term("a", "1"))
            .must_not(Query::term("b", "2"))
            .should(Query::term("c", "3"))
            .filter(Query::MatchAll)
            .minimum_should_match(1)
            .build();

        let Query::Bool(b) = query else {
            panic!("expected a bool query");
        };
        assert_eq!(b.must.len(), 1);
        assert_eq!(b.must_not.len(), 1);
        assert_eq!(b.should.len(), 1);
        assert_eq!(b.filter.len(), 1);
        assert_eq!(b.minimum_should_match, Some(1));
    }

    #[test]
    fn query_serializes_externally_tagged() {
        let query = Query::terms("category_id", vec!["7".into()]);
        let json = serde_json::to_value(&query).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"terms": {"field": "category_id", "values": ["7"]}})
        );

        let range = Query::range("clicks", CompareOp::Gte, "100");
        let json = serde_json::to_value(&range).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"range": {"field": "clicks", "op": "gte", "value": "100"}})
        );
    }

    #[test]
    fn bool_serialization_skips_empty_lists() {
        let query = BoolQuery::new().must(Query::MatchAll).build();
        let json = serde_json::to_value(&query).unwrap();
        assert_eq!(json, serde_json::json!({"bool": {"must": ["match_all"]}}));
    }

    #[test]
    fn boost_encoding_round_trips() {
        assert_eq!(boosted("title", 4.0), "title^4");
        assert_eq!(boosted("content", 1.0), "content");
        assert_eq!(split_boost("title^4"), ("title", 4.0));
        assert_eq!(split_boost("content"), ("content", 1.0));
        assert_eq!(split_boost("odd^field^2.5"), ("odd^field", 2.5));
    }
}
