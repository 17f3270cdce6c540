//! Pagination adapter.
//!
//! Bridges the engine's window execution to a conventional page-number
//! API. The backend only reports the true total once a window executes,
//! so page count and last-page detection are derived after the fact, not
//! estimated beforehand.

use crate::{
    engine::{SearchRunner, Window},
    error::SearchError,
    spec::ResultRecord,
};

/// One executed page of results.
#[derive(Debug, Clone)]
pub struct Page {
    /// 1-based page number.
    pub number: usize,
    /// Requested page size.
    pub per_page: usize,
    /// Results inside this page.
    pub results: Vec<ResultRecord>,
    /// Total matching count reported by the execution.
    pub total: u64,
}

impl Page {
    /// Number of pages the total fills.
    pub fn total_pages(&self) -> usize {
        if self.per_page == 0 {
            return 0;
        }
        (self.total as usize).div_ceil(self.per_page)
    }

    /// Whether this is the last page (or past it).
    pub fn is_last(&self) -> bool {
        self.number >= self.total_pages()
    }

    /// Whether a further page exists.
    pub fn has_next(&self) -> bool {
        !self.is_last()
    }
}

/// Executes the window for a 1-based page number and wraps the outcome.
///
/// Page numbers below one are clamped to the first page. A page beyond
/// the true total executes normally and comes back with zero results
/// rather than an error.
pub fn paginate(
    runner: &mut SearchRunner<'_>,
    page: usize,
    per_page: usize,
) -> Result<Page, SearchError> {
    let number = page.max(1);
    let bottom = (number - 1) * per_page;
    let top = bottom + per_page;

    runner.run(Window::Span(bottom..top))?;

    Ok(Page {
        number,
        per_page,
        results: runner.results().to_vec(),
        total: runner.total(),
    })
}
