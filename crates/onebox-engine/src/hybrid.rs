//! Fused (hybrid) retrieval.
//!
//! When a specification declares semantic fields, two retrievers are
//! built from the same box text and base filters: the policy-tuned
//! lexical query, and an OR of per-field semantic similarity queries.
//! Semantic retrieval is always whole-query similarity; boolean, range
//! and field operators never reach it. The backend fuses both rankings
//! with reciprocal rank fusion; a confirmation query then checks which
//! fused candidates actually contain the query text, so pure-semantic
//! drift cannot surface textually irrelevant results.

use std::collections::HashMap;

use onebox_protocol::{
    BackendError, BoolQuery, Hit, Query, Retriever, SearchBackend, SearchRequest,
};
use tracing::warn;

use crate::{
    engine::Window,
    spec::{QueryIntent, SearchSpecification},
};

/// Executes one window on the fused path.
///
/// Issues the fused request and, when text-match confirmation is on, a
/// second request restricted to the fused candidate ids. Returns the
/// surviving hits and their count. The fused total is local to this
/// window, not a global matching count.
pub(crate) fn execute_fused(
    spec: &dyn SearchSpecification,
    backend: &dyn SearchBackend,
    intent: &QueryIntent<'_>,
    key: &Window,
) -> Result<(Vec<Hit>, u64), BackendError> {
    let tuning = intent.tuning;
    let (from, size) = key.bounds();

    let mut fused_request = SearchRequest::new(spec.index())
        .with_retriever(Retriever::Rrf {
            retrievers: vec![
                Retriever::Standard(spec.filter(intent)),
                Retriever::Standard(semantic_query(spec, intent.text)),
            ],
            rank_window_size: tuning.rank_window_size,
            rank_constant: tuning.rank_constant,
        })
        .with_window(from, size)
        .with_min_score(tuning.min_fused_score);

    if !tuning.require_text_match {
        // No confirmation pass will run, so fragments have to come from
        // the fused request itself.
        fused_request = fused_request.with_highlight(spec.highlight_fields());
    }

    let fused = backend.execute(&fused_request)?;

    // The cutoff is also applied here in case the backend ignored
    // min_score; fused scores are tiny, so this threshold is far below
    // anything a lexical score floor would use.
    let candidates: Vec<Hit> = fused
        .hits
        .into_iter()
        .filter(|hit| hit.score >= tuning.min_fused_score)
        .collect();

    if !tuning.require_text_match || candidates.is_empty() {
        let total = candidates.len() as u64;
        return Ok((candidates, total));
    }

    let Some(confirm) = intent.scored_query(&spec.compiler_context()) else {
        // Blank box: there is no text to confirm against.
        let total = candidates.len() as u64;
        return Ok((candidates, total));
    };

    confirm_candidates(spec, backend, candidates, confirm)
}

/// Runs the text-match confirmation pass over fused candidates.
///
/// Candidates absent from the confirmation response are dropped even
/// when fusion ranked them first; survivors take their highlight
/// fragments from the confirmation response.
fn confirm_candidates(
    spec: &dyn SearchSpecification,
    backend: &dyn SearchBackend,
    candidates: Vec<Hit>,
    confirm: Query,
) -> Result<(Vec<Hit>, u64), BackendError> {
    let candidate_ids: Vec<String> = candidates.iter().map(|hit| hit.id.clone()).collect();

    let request = SearchRequest::new(spec.index())
        .with_query(
            BoolQuery::new()
                .must(confirm)
                .filter(Query::Ids {
                    values: candidate_ids.clone(),
                })
                .build(),
        )
        .with_highlight(spec.highlight_fields())
        .with_window(0, candidate_ids.len());

    let confirmed = backend.execute(&request)?;
    let confirmed_by_id: HashMap<String, Hit> = confirmed
        .hits
        .into_iter()
        .map(|hit| (hit.id.clone(), hit))
        .collect();

    let before = candidates.len();
    let surviving: Vec<Hit> = candidates
        .into_iter()
        .filter_map(|mut hit| {
            let confirmed_hit = confirmed_by_id.get(&hit.id)?;
            hit.highlight = confirmed_hit.highlight.clone();
            Some(hit)
        })
        .collect();

    if surviving.len() < before {
        warn!(
            dropped = before - surviving.len(),
            kept = surviving.len(),
            "fused candidates failed text-match confirmation"
        );
    }

    let total = surviving.len() as u64;
    Ok((surviving, total))
}

/// The semantic retriever: an OR of per-field similarity queries over
/// the whole box text, under the same base filters as the lexical side.
fn semantic_query(spec: &dyn SearchSpecification, text: &str) -> Query {
    let similarity = spec
        .semantic_fields()
        .into_iter()
        .fold(BoolQuery::new(), |bool_query, field| {
            bool_query.should(Query::semantic(field, text))
        })
        .minimum_should_match(1)
        .build();

    BoolQuery::new()
        .filters(spec.base_filters())
        .must(similarity)
        .build()
}
