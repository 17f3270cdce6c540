//! In-memory reference backend.
//!
//! Executes the backend-neutral IR against documents held in memory.
//! Useful for unit and integration tests that need full search behavior
//! without a running engine, and as the reference semantics for what a
//! concrete backend adapter should do with each query node.
//!
//! Scoring is intentionally simple (boost-weighted term coverage, not
//! BM25); relative ordering is what tests rely on, not absolute values.

use std::{
    cmp::Ordering,
    collections::{BTreeMap, HashMap, HashSet},
};

use serde_json::Value;

use crate::{
    backend::{BackendError, SearchBackend},
    query::{BoolQuery, CompareOp, Query, TextOperator, TextQuery, split_boost},
    request::{HighlightField, Retriever, SearchRequest},
    response::{Hit, Response, lookup},
    rrf,
};

/// Opening tag for highlight fragments.
const HIGHLIGHT_OPEN: &str = "<em>";
/// Closing tag for highlight fragments.
const HIGHLIGHT_CLOSE: &str = "</em>";

/// External similarity-scoring capability for semantic queries.
///
/// The front end never builds embeddings itself; a backend either has
/// its own semantic machinery or is handed one of these.
pub trait SemanticScorer {
    /// Scores the similarity of a document field's text against the
    /// whole query text. Zero or less means "no match".
    fn score(&self, text: &str, query: &str) -> f32;
}

/// Token-overlap scorer: the fraction of query words present in the
/// text. A crude stand-in for an embedding model, good enough to give
/// semantic retrieval distinct behavior in tests.
#[derive(Debug, Default)]
pub struct OverlapScorer;

impl SemanticScorer for OverlapScorer {
    fn score(&self, text: &str, query: &str) -> f32 {
        let doc_words: HashSet<String> = words_of(text).collect();
        let query_words: Vec<String> = words_of(query).collect();
        if query_words.is_empty() {
            return 0.0;
        }
        let present = query_words
            .iter()
            .filter(|w| doc_words.contains(*w))
            .count();
        present as f32 / query_words.len() as f32
    }
}

/// A document stored in a memory index.
#[derive(Debug, Clone)]
struct StoredDoc {
    /// Document id.
    id: String,
    /// Source fields.
    source: Value,
}

/// In-memory search backend over named indexes of JSON documents.
#[derive(Default)]
pub struct MemoryBackend {
    /// Stored documents per concrete index name.
    indexes: BTreeMap<String, Vec<StoredDoc>>,
    /// Semantic scoring capability; semantic queries match nothing
    /// without one.
    scorer: Option<Box<dyn SemanticScorer>>,
}

impl MemoryBackend {
    /// Creates an empty backend with no semantic capability.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty backend with a semantic scorer.
    pub fn with_scorer(scorer: Box<dyn SemanticScorer>) -> Self {
        Self {
            indexes: BTreeMap::new(),
            scorer: Some(scorer),
        }
    }

    /// Adds a document to an index, creating the index on first use.
    pub fn add_document(&mut self, index: &str, id: &str, source: Value) {
        self.indexes
            .entry(index.to_string())
            .or_default()
            .push(StoredDoc {
                id: id.to_string(),
                source,
            });
    }

    /// Selects the stored documents visible to a request.
    ///
    /// The request's comma-joined index names are logical names; stored
    /// indexes match on equality or on a `name_suffix` extension (the
    /// way deployments stamp indexes with creation timestamps).
    fn select<'a>(&'a self, index: &str) -> Vec<(&'a str, &'a StoredDoc)> {
        let requested: Vec<&str> = index.split(',').map(str::trim).collect();

        let mut docs = Vec::new();
        for (name, stored) in &self.indexes {
            let visible = requested
                .iter()
                .any(|req| name.as_str() == *req || name.starts_with(&format!("{req}_")));
            if visible {
                for doc in stored {
                    docs.push((name.as_str(), doc));
                }
            }
        }
        docs
    }

    /// Ranks documents under a plain query, best-first.
    fn rank<'a>(
        &self,
        query: &Query,
        docs: &[(&'a str, &'a StoredDoc)],
    ) -> Vec<(&'a str, &'a StoredDoc, f32)> {
        let mut ranked: Vec<(&str, &StoredDoc, f32)> = docs
            .iter()
            .filter_map(|&(index, doc)| {
                self.evaluate(query, doc).map(|score| (index, doc, score))
            })
            .collect();

        ranked.sort_by(|a, b| {
            b.2.partial_cmp(&a.2)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.1.id.cmp(&b.1.id))
        });
        ranked
    }

    /// Ranks documents under a retriever, fusing where asked to.
    fn rank_retriever<'a>(
        &self,
        retriever: &Retriever,
        docs: &[(&'a str, &'a StoredDoc)],
    ) -> Vec<(&'a str, &'a StoredDoc, f32)> {
        match retriever {
            Retriever::Standard(query) => self.rank(query, docs),
            Retriever::Rrf {
                retrievers,
                rank_window_size,
                rank_constant,
            } => {
                let rankings: Vec<Vec<String>> = retrievers
                    .iter()
                    .map(|r| {
                        self.rank_retriever(r, docs)
                            .into_iter()
                            .take(*rank_window_size)
                            .map(|(_, doc, _)| doc.id.clone())
                            .collect()
                    })
                    .collect();

                let by_id: HashMap<&str, (&str, &StoredDoc)> = docs
                    .iter()
                    .map(|&(index, doc)| (doc.id.as_str(), (index, doc)))
                    .collect();

                rrf::fuse(&rankings, *rank_constant)
                    .into_iter()
                    .filter_map(|(id, score)| {
                        by_id
                            .get(id.as_str())
                            .map(|&(index, doc)| (index, doc, score))
                    })
                    .collect()
            }
        }
    }

    /// Evaluates a query against one document.
    ///
    /// `None` means "does not match"; `Some(score)` carries the
    /// accumulated relevance contribution.
    fn evaluate(&self, query: &Query, doc: &StoredDoc) -> Option<f32> {
        match query {
            Query::MatchAll => Some(1.0),
            Query::MatchNone => None,
            Query::Term { field, value } => {
                field_strings(&doc.source, field)
                    .iter()
                    .any(|v| v == value)
                    .then_some(1.0)
            }
            Query::Terms { field, values } => {
                field_strings(&doc.source, field)
                    .iter()
                    .any(|v| values.contains(v))
                    .then_some(1.0)
            }
            Query::Ids { values } => values.contains(&doc.id).then_some(1.0),
            Query::Range { field, op, value } => {
                field_strings(&doc.source, field)
                    .iter()
                    .any(|v| compare(v, *op, value))
                    .then_some(1.0)
            }
            Query::Text(text) => evaluate_text(text, &doc.source),
            Query::Semantic { field, query } => {
                let scorer = self.scorer.as_ref()?;
                let text = field_strings(&doc.source, field).join(" ");
                let score = scorer.score(&text, query);
                (score > 0.0).then_some(score)
            }
            Query::Bool(bool_query) => self.evaluate_bool(bool_query, doc),
        }
    }

    /// Evaluates a boolean combination against one document.
    fn evaluate_bool(&self, query: &BoolQuery, doc: &StoredDoc) -> Option<f32> {
        let mut score = 0.0;

        for clause in &query.must {
            score += self.evaluate(clause, doc)?;
        }
        for clause in &query.filter {
            self.evaluate(clause, doc)?;
        }
        for clause in &query.must_not {
            if self.evaluate(clause, doc).is_some() {
                return None;
            }
        }

        if !query.should.is_empty() {
            let mut matched = 0usize;
            for clause in &query.should {
                if let Some(s) = self.evaluate(clause, doc) {
                    matched += 1;
                    score += s;
                }
            }
            // With no required clauses, at least one should-clause has
            // to match even when no explicit minimum was set.
            let default_required =
                usize::from(query.must.is_empty() && query.filter.is_empty());
            let required = query
                .minimum_should_match
                .map_or(default_required, |m| m as usize);
            if matched < required {
                return None;
            }
        }

        Some(score)
    }
}

impl SearchBackend for MemoryBackend {
    fn execute(&self, request: &SearchRequest) -> Result<Response, BackendError> {
        let docs = self.select(&request.index);

        let mut ranked = if let Some(retriever) = &request.retriever {
            self.rank_retriever(retriever, &docs)
        } else {
            let query = request.query.clone().unwrap_or(Query::MatchAll);
            self.rank(&query, &docs)
        };

        if let Some(min_score) = request.min_score {
            ranked.retain(|(_, _, score)| *score >= min_score);
        }

        let total = ranked.len() as u64;

        let terms = match &request.retriever {
            Some(retriever) => retriever_terms(retriever),
            None => request.query.as_ref().map_or_else(Vec::new, query_terms),
        };

        let hits = ranked
            .into_iter()
            .skip(request.from)
            .take(request.size)
            .map(|(index, doc, score)| Hit {
                id: doc.id.clone(),
                index: index.to_string(),
                score,
                source: doc.source.clone(),
                highlight: highlight_doc(&doc.source, &request.highlight, &terms),
            })
            .collect();

        Ok(Response { hits, total })
    }
}

/// One matchable unit of a full-text query.
#[derive(Debug, PartialEq)]
enum TextUnit {
    /// A single word.
    Word(String),
    /// A quoted phrase that must appear as a contiguous sequence.
    Phrase(String),
}

/// Splits full-text query text into words and (when enabled) phrases.
///
/// Words are normalized the way document text is tokenized, so
/// punctuation glued to a word (`private)`) does not defeat matching.
fn text_units(query: &str, phrase_enabled: bool) -> Vec<TextUnit> {
    let mut units = Vec::new();
    let mut word = String::new();
    let mut chars = query.chars();

    let flush = |word: &mut String, units: &mut Vec<TextUnit>| {
        for token in words_of(word) {
            units.push(TextUnit::Word(token));
        }
        word.clear();
    };

    while let Some(ch) = chars.next() {
        if ch == '"' {
            flush(&mut word, &mut units);
            let mut content = String::new();
            let mut closed = false;
            for inner in chars.by_ref() {
                if inner == '"' {
                    closed = true;
                    break;
                }
                content.push(inner);
            }
            if phrase_enabled && closed && !content.trim().is_empty() {
                units.push(TextUnit::Phrase(content.trim().to_lowercase()));
            } else {
                // Phrase matching off (or quote unterminated): the words
                // count individually.
                for token in words_of(&content) {
                    units.push(TextUnit::Word(token));
                }
            }
        } else if ch.is_whitespace() {
            flush(&mut word, &mut units);
        } else {
            word.push(ch);
        }
    }
    flush(&mut word, &mut units);

    units
}

/// Evaluates a full-text query against a document source.
fn evaluate_text(text: &TextQuery, source: &Value) -> Option<f32> {
    let units = text_units(&text.query, text.phrase);
    if units.is_empty() {
        return None;
    }

    let required = match text.default_operator {
        TextOperator::And => units.len(),
        TextOperator::Or => text
            .minimum_should_match
            .map_or(1, |m| m.required(units.len()))
            .max(1),
    };

    let mut matched_anywhere = vec![false; units.len()];
    let mut score = 0.0;

    for field in &text.fields {
        let (name, boost) = split_boost(field);
        let field_text = field_strings(source, name).join(" ");
        if field_text.is_empty() {
            continue;
        }
        let tokens: HashSet<String> = words_of(&field_text).collect();
        let lowered = field_text.to_lowercase();

        let mut matched_here = 0usize;
        for (i, unit) in units.iter().enumerate() {
            let hit = match unit {
                TextUnit::Word(w) => tokens.contains(w),
                TextUnit::Phrase(p) => lowered.contains(p.as_str()),
            };
            if hit {
                matched_here += 1;
                matched_anywhere[i] = true;
            }
        }
        if matched_here > 0 {
            score += boost * matched_here as f32 / units.len() as f32;
        }
    }

    let satisfied = matched_anywhere.iter().filter(|m| **m).count();
    (satisfied >= required).then_some(score)
}

/// Compares a document value against a query value.
///
/// Numeric when both sides parse as numbers, lexicographic otherwise
/// (which orders ISO dates correctly).
fn compare(doc_value: &str, op: CompareOp, query_value: &str) -> bool {
    let ordering = match (doc_value.parse::<f64>(), query_value.parse::<f64>()) {
        (Ok(doc_num), Ok(query_num)) => doc_num.partial_cmp(&query_num),
        _ => Some(doc_value.cmp(query_value)),
    };
    let Some(ordering) = ordering else {
        return false;
    };

    match op {
        CompareOp::Lt => ordering == Ordering::Less,
        CompareOp::Lte => ordering != Ordering::Greater,
        CompareOp::Gt => ordering == Ordering::Greater,
        CompareOp::Gte => ordering != Ordering::Less,
    }
}

/// Extracts a field's values as strings.
fn field_strings(source: &Value, field: &str) -> Vec<String> {
    let Some(value) = lookup(source, field) else {
        return Vec::new();
    };
    match value {
        Value::String(s) => vec![s.clone()],
        Value::Number(n) => vec![n.to_string()],
        Value::Bool(b) => vec![b.to_string()],
        Value::Array(items) => items
            .iter()
            .flat_map(|item| match item {
                Value::String(s) => Some(s.clone()),
                Value::Number(n) => Some(n.to_string()),
                _ => None,
            })
            .collect(),
        Value::Null | Value::Object(_) => Vec::new(),
    }
}

/// Lowercased alphanumeric words of a text.
fn words_of(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(str::to_lowercase)
}

/// Collects the highlightable words of a query (full-text nodes only).
fn query_terms(query: &Query) -> Vec<String> {
    match query {
        Query::Text(text) => text_units(&text.query, text.phrase)
            .into_iter()
            .flat_map(|unit| match unit {
                TextUnit::Word(w) => vec![w],
                TextUnit::Phrase(p) => words_of(&p).collect(),
            })
            .collect(),
        Query::Bool(bool_query) => bool_query
            .must
            .iter()
            .chain(&bool_query.should)
            .chain(&bool_query.filter)
            .flat_map(query_terms)
            .collect(),
        _ => Vec::new(),
    }
}

/// Collects highlightable words across a retriever tree.
fn retriever_terms(retriever: &Retriever) -> Vec<String> {
    match retriever {
        Retriever::Standard(query) => query_terms(query),
        Retriever::Rrf { retrievers, .. } => {
            retrievers.iter().flat_map(retriever_terms).collect()
        }
    }
}

/// Builds highlight fragments for one document.
fn highlight_doc(
    source: &Value,
    fields: &[HighlightField],
    terms: &[String],
) -> BTreeMap<String, Vec<String>> {
    let mut highlight = BTreeMap::new();
    if terms.is_empty() {
        return highlight;
    }

    for field in fields {
        let text = field_strings(source, &field.field).join(" ");
        if text.is_empty() {
            continue;
        }
        if let Some(fragment) = highlight_fragment(&text, terms, field.fragment_size) {
            highlight.insert(field.field.clone(), vec![fragment]);
        }
    }
    highlight
}

/// Wraps matching words of `text` in highlight tags.
///
/// Returns None when no term occurs. With a fragment size, the fragment
/// is the window of that many characters starting at the first match.
fn highlight_fragment(
    text: &str,
    terms: &[String],
    fragment_size: Option<usize>,
) -> Option<String> {
    let spans = word_spans(text);
    let matches: Vec<&(usize, usize)> = spans
        .iter()
        .filter(|(start, end)| {
            let word = text[*start..*end].to_lowercase();
            terms.contains(&word)
        })
        .collect();

    let first = matches.first()?;
    let window_start = first.0;
    let window_end = match fragment_size {
        Some(size) => {
            let mut end = (window_start + size).min(text.len());
            while !text.is_char_boundary(end) {
                end += 1;
            }
            end
        }
        None => text.len(),
    };

    let mut fragment = String::new();
    let mut cursor = window_start;
    for &&(start, end) in &matches {
        if start < window_start || end > window_end {
            continue;
        }
        fragment.push_str(&text[cursor..start]);
        fragment.push_str(HIGHLIGHT_OPEN);
        fragment.push_str(&text[start..end]);
        fragment.push_str(HIGHLIGHT_CLOSE);
        cursor = end;
    }
    fragment.push_str(&text[cursor..window_end]);

    Some(fragment)
}

/// Byte spans of the alphanumeric words in a text.
fn word_spans(text: &str) -> Vec<(usize, usize)> {
    let mut spans = Vec::new();
    let mut start: Option<usize> = None;

    for (i, ch) in text.char_indices() {
        if ch.is_alphanumeric() {
            if start.is_none() {
                start = Some(i);
            }
        } else if let Some(s) = start.take() {
            spans.push((s, i));
        }
    }
    if let Some(s) = start {
        spans.push((s, text.len()));
    }
    spans
}
