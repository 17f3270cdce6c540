//! Error type for query parsing.

use thiserror::Error;

/// Parse error with optional token position.
///
/// Raised only by the parser; tokenization itself is total. Callers are
/// expected to catch this and fall back to a single literal term holding
/// the whole original query; a `ParseError` must never surface to end
/// users.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// The token stream is not a valid expression.
    #[error("query syntax error: {message}")]
    Syntax {
        /// Error message.
        message: String,
        /// Index of the offending token, if known.
        token_index: Option<usize>,
    },
}

impl ParseError {
    /// Creates a syntax error.
    pub fn syntax(message: impl Into<String>, token_index: Option<usize>) -> Self {
        Self::Syntax {
            message: message.into(),
            token_index,
        }
    }

    /// Returns the error message without position information.
    pub fn message(&self) -> &str {
        match self {
            Self::Syntax { message, .. } => message,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_message() {
        let err = ParseError::syntax("expected closing parenthesis", Some(3));
        assert_eq!(
            err.to_string(),
            "query syntax error: expected closing parenthesis"
        );
        assert_eq!(err.message(), "expected closing parenthesis");
    }
}
