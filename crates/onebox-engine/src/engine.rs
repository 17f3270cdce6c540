//! Retrieval engine.
//!
//! [`SearchRunner`] executes one specification for one user request. It
//! owns the per-request execution state (the raw query text, whether
//! parsing is still enabled, the last executed window, hits, total and
//! projected results) while the specification and backend it borrows
//! stay immutable and shareable.

use onebox_protocol::{BackendError, Hit, SearchBackend, SearchRequest};
use tracing::{debug, error};

use crate::{
    error::SearchError,
    hybrid,
    spec::{QueryIntent, ResultRecord, SearchSpecification},
    tuning::SearchTuning,
};

/// One execution window: a single record or a half-open page span.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Window {
    /// The single record at a zero-based offset.
    One(usize),
    /// The half-open span `[start, end)`.
    Span(std::ops::Range<usize>),
}

impl Window {
    /// Returns the window as a backend `(from, size)` pair.
    pub fn bounds(&self) -> (usize, usize) {
        match self {
            Self::One(index) => (*index, 1),
            Self::Span(range) => (range.start, range.end.saturating_sub(range.start)),
        }
    }
}

/// Per-request search execution.
///
/// Reusable across windows: running the same window twice is a no-op,
/// running a different one re-executes. The only internal retry is the
/// parse-fallback: if the backend rejects the compiled query as
/// malformed, parsing is disabled and the request is re-sent exactly
/// once with the query as literal text. Both recoveries are invisible to
/// the caller: they produce a normal result set.
pub struct SearchRunner<'a> {
    /// Specification being executed.
    spec: &'a dyn SearchSpecification,
    /// Backend to execute against.
    backend: &'a dyn SearchBackend,
    /// Tunables in effect for this request.
    tuning: SearchTuning,
    /// Raw query text from the search box.
    query: String,
    /// Whether the parser is still attempted. Flipped off at most once.
    parse_enabled: bool,
    /// Window of the last successful execution.
    last_key: Option<Window>,
    /// Raw hits of the last execution.
    hits: Vec<Hit>,
    /// Total matching count (page-local for fused execution).
    total: u64,
    /// Display-ready projections of `hits`.
    results: Vec<ResultRecord>,
}

impl<'a> SearchRunner<'a> {
    /// Creates a runner for one request with default tuning.
    pub fn new(
        spec: &'a dyn SearchSpecification,
        backend: &'a dyn SearchBackend,
        query: impl Into<String>,
    ) -> Self {
        Self {
            spec,
            backend,
            tuning: SearchTuning::default(),
            query: query.into(),
            parse_enabled: true,
            last_key: None,
            hits: Vec::new(),
            total: 0,
            results: Vec::new(),
        }
    }

    /// Replaces the tuning for this request.
    pub fn with_tuning(mut self, tuning: SearchTuning) -> Self {
        self.tuning = tuning;
        self
    }

    /// Executes the given window.
    ///
    /// Re-running the window that already executed is a no-op; a new
    /// window re-executes. On a backend rejection of the compiled query
    /// the engine disables parsing and retries exactly once; any further
    /// failure is fatal for the request.
    pub fn run(&mut self, key: Window) -> Result<&mut Self, SearchError> {
        if self.last_key.as_ref() == Some(&key) {
            return Ok(self);
        }

        let (hits, total) = match self.execute(&key) {
            Ok(outcome) => outcome,
            Err(BackendError::Request { message }) if self.parse_enabled => {
                debug!(
                    query = %self.query,
                    reason = %message,
                    "backend rejected compiled query, retrying with parsing disabled"
                );
                self.parse_enabled = false;
                self.execute(&key).map_err(SearchError::unavailable)?
            }
            Err(err) => return Err(SearchError::unavailable(err)),
        };

        self.hits = hits;
        self.total = total;
        self.last_key = Some(key);
        self.project();

        Ok(self)
    }

    /// Runs the window against the backend, plain or fused.
    fn execute(&self, key: &Window) -> Result<(Vec<Hit>, u64), BackendError> {
        let intent = QueryIntent {
            text: &self.query,
            parse: self.parse_enabled,
            tuning: &self.tuning,
        };

        if self.is_hybrid() {
            return hybrid::execute_fused(self.spec, self.backend, &intent, key);
        }

        let (from, size) = key.bounds();
        let request = SearchRequest::new(self.spec.index())
            .with_query(self.spec.filter(&intent))
            .with_highlight(self.spec.highlight_fields())
            .with_window(from, size);

        let response = self.backend.execute(&request)?;
        Ok((response.hits, response.total))
    }

    /// Whether this request takes the fused retrieval path.
    fn is_hybrid(&self) -> bool {
        self.tuning.hybrid && !self.spec.semantic_fields().is_empty()
    }

    /// Projects raw hits into display results.
    ///
    /// A hit the specification cannot shape (an unroutable federated
    /// hit) is a configuration error: logged loud and dropped, never
    /// silently mis-rendered.
    fn project(&mut self) {
        self.results = self
            .hits
            .iter()
            .filter_map(|hit| match self.spec.make_result(hit) {
                Ok(result) => Some(result),
                Err(err) => {
                    error!(hit_id = %hit.id, hit_index = %hit.index, error = %err, "dropping unshapeable hit");
                    None
                }
            })
            .collect();
    }

    /// Raw query text this runner executes.
    pub fn query(&self) -> &str {
        &self.query
    }

    /// Whether the parser is still enabled for this request.
    pub fn parse_enabled(&self) -> bool {
        self.parse_enabled
    }

    /// Raw hits of the last executed window.
    pub fn hits(&self) -> &[Hit] {
        &self.hits
    }

    /// Total matching count reported by the last execution.
    ///
    /// For plain execution this is the backend's total across all pages;
    /// for fused execution it is the count of hits that survived
    /// post-fusion filtering in this window.
    pub fn total(&self) -> u64 {
        self.total
    }

    /// Display-ready results of the last executed window.
    pub fn results(&self) -> &[ResultRecord] {
        &self.results
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn window_bounds() {
        assert_eq!(Window::One(7).bounds(), (7, 1));
        assert_eq!(Window::Span(20..30).bounds(), (20, 10));
        assert_eq!(Window::Span(5..5).bounds(), (5, 0));
    }
}
