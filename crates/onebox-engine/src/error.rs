//! Error types for the retrieval engine.

use onebox_protocol::BackendError;
use thiserror::Error;

/// Errors the engine surfaces to callers.
///
/// The recoverable conditions (a query that fails to parse, a first
/// backend rejection) never appear here: the former falls back to a
/// literal term and the latter is retried once with parsing disabled.
/// What remains is fatal for the request, and its Display is already
/// phrased for end users; the underlying cause stays on the source chain
/// for logs.
#[derive(Debug, Error)]
pub enum SearchError {
    /// The backend failed and the engine exhausted its recovery options.
    #[error("search is temporarily unavailable")]
    Unavailable {
        /// The backend failure that exhausted recovery.
        #[source]
        source: BackendError,
    },

    /// A federated hit could not be attributed to any registered child
    /// search. This is a configuration error (mismatched index naming),
    /// not a user error.
    #[error("hit from index {index:?} matches no registered search")]
    UnroutableHit {
        /// Index name the hit reported.
        index: String,
    },
}

impl SearchError {
    /// Wraps a backend failure as fatal.
    pub fn unavailable(source: BackendError) -> Self {
        Self::Unavailable { source }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unavailable_display_is_user_safe() {
        let err = SearchError::unavailable(BackendError::connection("dns lookup failed"));
        // The user-facing message never leaks backend details.
        assert_eq!(err.to_string(), "search is temporarily unavailable");
    }
}
