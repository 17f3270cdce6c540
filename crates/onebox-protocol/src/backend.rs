//! The search backend boundary.

use thiserror::Error;

use crate::{request::SearchRequest, response::Response};

/// Errors a backend can report for one request.
///
/// The distinction matters to callers: a [`BackendError::Request`] means
/// the compiled query itself was rejected and a literal-text retry may
/// succeed, while a [`BackendError::Connection`] is an infrastructure
/// failure no retry of ours will fix.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BackendError {
    /// The backend rejected the request as structurally invalid.
    #[error("backend rejected the query: {message}")]
    Request {
        /// Backend-reported reason.
        message: String,
    },

    /// The backend could not be reached or the connection failed.
    #[error("backend connection failed: {message}")]
    Connection {
        /// Backend-reported reason.
        message: String,
    },
}

impl BackendError {
    /// Creates a request-rejected error.
    pub fn request(message: impl Into<String>) -> Self {
        Self::Request {
            message: message.into(),
        }
    }

    /// Creates a connection error.
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
        }
    }
}

/// A concrete search engine the front end can execute requests against.
///
/// Implementations serialize the backend-neutral request into their own
/// wire format. Calls are blocking; timeout management and connection
/// pooling are the implementation's concern, and no retries happen at
/// this layer.
pub trait SearchBackend {
    /// Executes one request and returns the hits for its window.
    fn execute(&self, request: &SearchRequest) -> Result<Response, BackendError>;
}
