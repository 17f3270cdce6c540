//! Search request records.
//!
//! A [`SearchRequest`] is the complete unit of work handed to a
//! [`crate::SearchBackend`]: which index to hit, the query or fused
//! retriever to run, the result window, and highlighting instructions.

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::query::Query;

/// Per-field highlighting instructions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HighlightField {
    /// Field to generate fragments for.
    pub field: String,
    /// Maximum fragment length in characters, backend default when None.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fragment_size: Option<usize>,
    /// Number of fragments to return, backend default when None.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub number_of_fragments: Option<usize>,
}

impl HighlightField {
    /// Creates highlighting instructions for a field with backend
    /// defaults.
    pub fn new(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            fragment_size: None,
            number_of_fragments: None,
        }
    }

    /// Sets the maximum fragment length.
    pub fn with_fragment_size(mut self, size: usize) -> Self {
        self.fragment_size = Some(size);
        self
    }

    /// Sets the number of fragments.
    pub fn with_number_of_fragments(mut self, count: usize) -> Self {
        self.number_of_fragments = Some(count);
        self
    }
}

/// One ranking source inside a request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Retriever {
    /// An ordinary ranked query.
    Standard(Query),

    /// Reciprocal rank fusion over independent retrievers.
    Rrf {
        /// Retrievers to rank independently and fuse.
        retrievers: Vec<Retriever>,
        /// How many candidates each retriever contributes.
        rank_window_size: usize,
        /// The fusion constant in `1 / (rank_constant + rank)`.
        rank_constant: f32,
    },
}

/// A complete search request for one execution window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchRequest {
    /// Index identifier; multiple indexes are comma-joined.
    pub index: String,
    /// Plain ranked query. Ignored when `retriever` is set.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query: Option<Query>,
    /// Fused retriever request, replacing `query` when present.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retriever: Option<Retriever>,
    /// Fields to highlight on returned hits.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub highlight: Vec<HighlightField>,
    /// Zero-based offset of the first hit to return.
    pub from: usize,
    /// Number of hits to return.
    pub size: usize,
    /// Hits scoring below this are dropped by the backend.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_score: Option<f32>,
}

impl SearchRequest {
    /// Creates a request against an index with an empty window.
    pub fn new(index: impl Into<String>) -> Self {
        Self {
            index: index.into(),
            query: None,
            retriever: None,
            highlight: Vec::new(),
            from: 0,
            size: 10,
            min_score: None,
        }
    }

    /// Sets the ranked query.
    pub fn with_query(mut self, query: Query) -> Self {
        self.query = Some(query);
        self
    }

    /// Sets the fused retriever.
    pub fn with_retriever(mut self, retriever: Retriever) -> Self {
        self.retriever = Some(retriever);
        self
    }

    /// Sets the highlight instructions.
    pub fn with_highlight(mut self, fields: Vec<HighlightField>) -> Self {
        self.highlight = fields;
        self
    }

    /// Sets the result window.
    pub fn with_window(mut self, from: usize, size: usize) -> Self {
        self.from = from;
        self.size = size;
        self
    }

    /// Sets the minimum score cutoff.
    pub fn with_min_score(mut self, min_score: f32) -> Self {
        self.min_score = Some(min_score);
        self
    }

    /// Renders the JSON body an HTTP backend would POST.
    ///
    /// The shape mirrors the request record: `query` or `retriever`,
    /// then `highlight`, `from`, `size` and `min_score` when set.
    pub fn body(&self) -> Value {
        let mut map = serde_json::Map::new();

        if let Some(retriever) = &self.retriever {
            map.insert("retriever".into(), json!(retriever));
        } else if let Some(query) = &self.query {
            map.insert("query".into(), json!(query));
        }
        if !self.highlight.is_empty() {
            map.insert("highlight".into(), json!({ "fields": self.highlight }));
        }
        map.insert("from".into(), json!(self.from));
        map.insert("size".into(), json!(self.size));
        if let Some(min_score) = self.min_score {
            map.insert("min_score".into(), json!(min_score));
        }

        Value::Object(map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn body_renders_plain_query() {
        let request = SearchRequest::new("wiki_document")
            .with_query(Query::term("locale", "en-US"))
            .with_highlight(vec![HighlightField::new("content").with_fragment_size(160)])
            .with_window(20, 10);

        let body = request.body();
        assert_eq!(body["from"], 20);
        assert_eq!(body["size"], 10);
        assert_eq!(body["query"]["term"]["field"], "locale");
        assert_eq!(body["highlight"]["fields"][0]["field"], "content");
        assert_eq!(body["highlight"]["fields"][0]["fragment_size"], 160);
        assert!(body.get("retriever").is_none());
        assert!(body.get("min_score").is_none());
    }

    #[test]
    fn body_prefers_retriever_over_query() {
        let request = SearchRequest::new("wiki_document")
            .with_query(Query::MatchAll)
            .with_retriever(Retriever::Rrf {
                retrievers: vec![
                    Retriever::Standard(Query::MatchAll),
                    Retriever::Standard(Query::semantic("embedding", "crash")),
                ],
                rank_window_size: 100,
                rank_constant: 60.0,
            });

        let body = request.body();
        assert!(body.get("query").is_none());
        assert_eq!(body["retriever"]["rrf"]["rank_window_size"], 100);
        assert_eq!(
            body["retriever"]["rrf"]["retrievers"][1]["standard"]["semantic"]["field"],
            "embedding"
        );
    }
}
