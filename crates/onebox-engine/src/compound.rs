//! Federated search across document types.
//!
//! [`CompoundSearch`] unions several specifications, say articles and
//! forum questions, into one result stream: one backend query over all
//! child indexes, with each hit routed back to the child that knows how
//! to shape it.

use onebox_protocol::{BoolQuery, Hit, HighlightField, Query};

use crate::{
    context::CompilerContext,
    error::SearchError,
    spec::{QueryIntent, ResultRecord, SearchSpecification},
};

/// A specification federating any number of child specifications.
#[derive(Default)]
pub struct CompoundSearch {
    /// Registered child searches.
    children: Vec<Box<dyn SearchSpecification>>,
}

impl CompoundSearch {
    /// Creates an empty federated search.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a child search.
    pub fn add(&mut self, child: Box<dyn SearchSpecification>) -> &mut Self {
        self.children.push(child);
        self
    }

    /// Finds the child responsible for a hit's index.
    fn route(&self, hit_index: &str) -> Option<&dyn SearchSpecification> {
        self.children
            .iter()
            .map(Box::as_ref)
            .find(|child| {
                child
                    .index()
                    .split(',')
                    .any(|declared| index_matches(declared.trim(), hit_index))
            })
    }
}

/// Whether a concrete hit index belongs to a declared logical index.
///
/// Deployments stamp indexes with creation timestamps, so
/// `wiki_document_20240101000000` still belongs to `wiki_document`: one
/// trailing all-digit segment is ignored when comparing base names.
fn index_matches(declared: &str, hit_index: &str) -> bool {
    hit_index == declared || base_name(hit_index) == declared
}

/// Strips one trailing all-digit segment from an index name.
fn base_name(index: &str) -> &str {
    match index.rsplit_once('_') {
        Some((base, suffix))
            if !suffix.is_empty() && suffix.chars().all(|c| c.is_ascii_digit()) =>
        {
            base
        }
        _ => index,
    }
}

impl SearchSpecification for CompoundSearch {
    fn index(&self) -> String {
        self.children
            .iter()
            .map(|child| child.index())
            .collect::<Vec<_>>()
            .join(",")
    }

    fn fields(&self) -> Vec<String> {
        let mut fields = Vec::new();
        for child in &self.children {
            for field in child.fields() {
                if !fields.contains(&field) {
                    fields.push(field);
                }
            }
        }
        fields
    }

    fn highlight_fields(&self) -> Vec<HighlightField> {
        let mut fields: Vec<HighlightField> = Vec::new();
        for child in &self.children {
            for field in child.highlight_fields() {
                if !fields.iter().any(|existing| existing.field == field.field) {
                    fields.push(field);
                }
            }
        }
        fields
    }

    fn base_filters(&self) -> Vec<Query> {
        if self.children.is_empty() {
            return Vec::new();
        }
        // Any child's base constraints may admit a hit; each child's own
        // set still applies conjunctively within its branch.
        let union = self
            .children
            .iter()
            .fold(BoolQuery::new(), |bool_query, child| {
                bool_query.should(BoolQuery::new().filters(child.base_filters()).build())
            })
            .minimum_should_match(1)
            .build();
        vec![union]
    }

    fn compiler_context(&self) -> CompilerContext {
        self.children
            .iter()
            .fold(CompilerContext::default(), |merged, child| {
                merged.merge(child.compiler_context())
            })
    }

    fn semantic_fields(&self) -> Vec<String> {
        let mut fields = Vec::new();
        for child in &self.children {
            for field in child.semantic_fields() {
                if !fields.contains(&field) {
                    fields.push(field);
                }
            }
        }
        fields
    }

    fn make_result(&self, hit: &Hit) -> Result<ResultRecord, SearchError> {
        match self.route(&hit.index) {
            Some(child) => child.make_result(hit),
            None => Err(SearchError::UnroutableHit {
                index: hit.index.clone(),
            }),
        }
    }

    fn filter(&self, intent: &QueryIntent<'_>) -> Query {
        self.children
            .iter()
            .fold(BoolQuery::new(), |bool_query, child| {
                bool_query.should(child.filter(intent))
            })
            .minimum_should_match(1)
            .build()
    }
}
