//! Search response records.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A raw backend record for one matching document.
///
/// Hits never outlive the request that produced them; display-ready
/// projections are built by the retrieval engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hit {
    /// Document id.
    pub id: String,
    /// Concrete index the hit came from (may carry a backend-generated
    /// suffix on top of the logical index name).
    pub index: String,
    /// Relevance score assigned by the backend.
    pub score: f32,
    /// Stored source fields.
    pub source: Value,
    /// Highlight fragments per field, when requested.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub highlight: BTreeMap<String, Vec<String>>,
}

impl Hit {
    /// Returns a source field as text, if present.
    ///
    /// Looks the field up as a literal key first so names containing
    /// dots (`document_title.en-US`) resolve; string-array values are
    /// joined with spaces.
    pub fn source_text(&self, field: &str) -> Option<String> {
        let value = lookup(&self.source, field)?;
        match value {
            Value::String(s) => Some(s.clone()),
            Value::Array(items) => {
                let parts: Vec<&str> = items.iter().filter_map(Value::as_str).collect();
                if parts.is_empty() {
                    None
                } else {
                    Some(parts.join(" "))
                }
            }
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            Value::Null | Value::Object(_) => None,
        }
    }
}

/// Looks up a field in a source document.
///
/// Tries the literal key at the top level, then dot-path traversal for
/// genuinely nested sources.
pub(crate) fn lookup<'a>(source: &'a Value, field: &str) -> Option<&'a Value> {
    if let Some(direct) = source.get(field) {
        return Some(direct);
    }

    let mut current = source;
    for segment in field.split('.') {
        current = current.get(segment)?;
    }
    Some(current)
}

/// The backend's answer to one [`crate::SearchRequest`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    /// Hits inside the requested window, ranked best-first.
    pub hits: Vec<Hit>,
    /// Total number of matching documents, independent of the window.
    pub total: u64,
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn hit(source: Value) -> Hit {
        Hit {
            id: "1".into(),
            index: "wiki_document".into(),
            score: 1.0,
            source,
            highlight: BTreeMap::new(),
        }
    }

    #[test]
    fn source_text_resolves_dotted_literal_keys() {
        let h = hit(json!({"document_title.en-US": "Private browsing"}));
        assert_eq!(
            h.source_text("document_title.en-US").as_deref(),
            Some("Private browsing")
        );
    }

    #[test]
    fn source_text_falls_back_to_nested_paths() {
        let h = hit(json!({"document": {"title": "Private browsing"}}));
        assert_eq!(
            h.source_text("document.title").as_deref(),
            Some("Private browsing")
        );
    }

    #[test]
    fn source_text_joins_string_arrays() {
        let h = hit(json!({"tags": ["sync", "mobile"]}));
        assert_eq!(h.source_text("tags").as_deref(), Some("sync mobile"));
    }

    #[test]
    fn source_text_missing_field() {
        let h = hit(json!({"title": "x"}));
        assert_eq!(h.source_text("missing"), None);
    }
}
