//! Query parser.
//!
//! Parses a token stream into a query AST using recursive descent.
//!
//! # Grammar
//!
//! ```text
//! query      → adjacency
//! adjacency  → or_expr+
//! or_expr    → and_expr ("OR" and_expr)*
//! and_expr   → unary ("AND" unary)*
//! unary      → "NOT" unary | primary
//! primary    → TERM | PHRASE | field | exact | range | "(" adjacency ")"
//! field      → FIELD_PREFIX (TERM | PHRASE | "(" adjacency ")")
//! exact      → EXACT_PREFIX (TERM | PHRASE)
//! range      → RANGE_PREFIX (TERM | PHRASE)
//! ```
//!
//! # Precedence (highest to lowest)
//!
//! 1. Grouping: `(...)`
//! 2. Operator prefixes: `field:` / `exact:` / `range:`
//! 3. Negation: `NOT`
//! 4. AND (explicit keyword)
//! 5. OR (explicit keyword)
//! 6. Adjacency (implicit, between space-separated expressions)
//!
//! Parsing is total over this grammar: any input either yields a tree or
//! a [`ParseError`]. Callers never retry with a modified string; on
//! error they substitute a single literal term holding the whole
//! original query.

use std::mem;

use crate::{
    ast::QueryNode,
    error::ParseError,
    lexer::{Token, tokenize},
};

/// Recursive descent parser for query expressions.
struct Parser {
    /// Token stream to parse.
    tokens: Vec<Token>,
    /// Current position in token stream.
    position: usize,
}

impl Parser {
    /// Creates a new parser from a token stream.
    fn new(tokens: Vec<Token>) -> Self {
        Self {
            tokens,
            position: 0,
        }
    }

    /// Parses the token stream into a query expression.
    fn parse(mut self) -> Result<Option<QueryNode>, ParseError> {
        if self.tokens.is_empty() {
            return Ok(None);
        }

        let node = self.parse_adjacency()?;

        if self.position < self.tokens.len() {
            return Err(self.error_here(format!(
                "unexpected token: {:?}",
                self.tokens[self.position]
            )));
        }

        Ok(Some(node))
    }

    /// Parses: adjacency → or_expr+
    fn parse_adjacency(&mut self) -> Result<QueryNode, ParseError> {
        let mut nodes = vec![self.parse_or_expr()?];

        while self.can_start_expr() {
            nodes.push(self.parse_or_expr()?);
        }

        Ok(QueryNode::adjacency(nodes))
    }

    /// Parses: or_expr → and_expr ("OR" and_expr)*
    fn parse_or_expr(&mut self) -> Result<QueryNode, ParseError> {
        let mut left = self.parse_and_expr()?;

        while self.check(&Token::Or) {
            self.advance(); // consume OR
            let right = self.parse_and_expr()?;
            left = QueryNode::or(vec![left, right]);
        }

        Ok(left)
    }

    /// Parses: and_expr → unary ("AND" unary)*
    fn parse_and_expr(&mut self) -> Result<QueryNode, ParseError> {
        let mut left = self.parse_unary()?;

        while self.check(&Token::And) {
            self.advance(); // consume AND
            let right = self.parse_unary()?;
            left = QueryNode::and(vec![left, right]);
        }

        Ok(left)
    }

    /// Checks if the current token can start an expression.
    fn can_start_expr(&self) -> bool {
        matches!(
            self.peek(),
            Some(
                Token::Term(_)
                    | Token::Phrase(_)
                    | Token::Not
                    | Token::LParen
                    | Token::FieldPrefix { .. }
                    | Token::ExactPrefix { .. }
                    | Token::RangePrefix { .. }
            )
        )
    }

    /// Parses: unary → "NOT" unary | primary
    fn parse_unary(&mut self) -> Result<QueryNode, ParseError> {
        if self.check(&Token::Not) {
            self.advance(); // consume NOT
            self.reject_folded_quote("NOT")?;
            let node = self.parse_unary()?;
            return Ok(QueryNode::Not(Box::new(node)));
        }

        self.parse_primary()
    }

    /// Parses: primary → TERM | PHRASE | field | exact | range | group
    fn parse_primary(&mut self) -> Result<QueryNode, ParseError> {
        match self.peek().cloned() {
            Some(Token::Term(text)) => {
                self.advance();
                Ok(QueryNode::Term(text))
            }

            Some(Token::Phrase(content)) => {
                self.advance();
                Ok(QueryNode::Term(quoted(&content)))
            }

            Some(Token::FieldPrefix { field, value }) => {
                self.advance();
                self.parse_field_scope(field, value)
            }

            Some(Token::ExactPrefix { field, value }) => {
                self.advance();
                let value = self.operator_value("exact", value)?;
                Ok(QueryNode::Exact { field, value })
            }

            Some(Token::RangePrefix { field, op, value }) => {
                self.advance();
                let value = self.operator_value("range", value)?;
                Ok(QueryNode::Range { field, op, value })
            }

            Some(Token::LParen) => self.parse_group(),

            Some(Token::RParen) => Err(self.error_here("unexpected closing parenthesis")),

            Some(Token::Or) => {
                Err(self.error_here("unexpected OR (needs an expression before it)"))
            }

            Some(Token::And) => {
                Err(self.error_here("unexpected AND (needs an expression before it)"))
            }

            // parse_unary consumes NOT before this is reachable
            Some(Token::Not) => Err(self.error_here("unexpected NOT")),

            None => Err(ParseError::syntax("unexpected end of query", None)),
        }
    }

    /// Parses the value of a field scope.
    fn parse_field_scope(
        &mut self,
        field: String,
        inline: Option<String>,
    ) -> Result<QueryNode, ParseError> {
        let node = if let Some(value) = inline {
            QueryNode::Term(value)
        } else {
            match self.peek().cloned() {
                // A folded unterminated quote is accepted here: field
                // scoping is not one of the balanced-value contexts.
                Some(Token::Term(text)) => {
                    self.advance();
                    QueryNode::Term(text)
                }
                Some(Token::Phrase(content)) => {
                    self.advance();
                    QueryNode::Term(quoted(&content))
                }
                Some(Token::LParen) => self.parse_group()?,
                _ => {
                    return Err(self.error_here(format!(
                        "expected a value after 'field:{field}:'"
                    )));
                }
            }
        };

        Ok(QueryNode::FieldScope {
            field,
            node: Box::new(node),
        })
    }

    /// Resolves the value of an `exact:`/`range:` operator.
    ///
    /// These contexts require a balanced value: an unterminated quote is
    /// an error rather than folded text.
    fn operator_value(
        &mut self,
        operator: &str,
        inline: Option<String>,
    ) -> Result<String, ParseError> {
        if let Some(value) = inline {
            return Ok(value);
        }

        match self.peek().cloned() {
            Some(Token::Phrase(content)) => {
                self.advance();
                Ok(content)
            }
            Some(Token::Term(text)) if text.starts_with('"') => Err(self.error_here(format!(
                "unterminated quote in '{operator}:' value"
            ))),
            _ => Err(self.error_here(format!("expected a value after '{operator}:'"))),
        }
    }

    /// Rejects a folded unterminated quote in a balanced-value context.
    fn reject_folded_quote(&mut self, context: &str) -> Result<(), ParseError> {
        if let Some(Token::Term(text)) = self.peek() {
            if text.starts_with('"') {
                return Err(self.error_here(format!(
                    "unterminated quote after {context}"
                )));
            }
        }
        Ok(())
    }

    /// Parses a parenthesized group, consuming the surrounding parentheses.
    fn parse_group(&mut self) -> Result<QueryNode, ParseError> {
        self.advance(); // consume (
        let inner = self.parse_adjacency()?;

        if !self.check(&Token::RParen) {
            return Err(self.error_here("expected closing parenthesis"));
        }
        self.advance(); // consume )

        Ok(inner)
    }

    /// Returns the current token without consuming it.
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.position)
    }

    /// Checks if the current token matches the given token kind.
    fn check(&self, token: &Token) -> bool {
        self.peek()
            .map(|t| mem::discriminant(t) == mem::discriminant(token))
            .unwrap_or(false)
    }

    /// Advances to the next token.
    fn advance(&mut self) {
        if self.position < self.tokens.len() {
            self.position += 1;
        }
    }

    /// Creates a syntax error at the current token position.
    fn error_here(&self, message: impl Into<String>) -> ParseError {
        ParseError::syntax(message, Some(self.position))
    }
}

/// Wraps phrase content back in its quote characters.
fn quoted(content: &str) -> String {
    format!("\"{content}\"")
}

/// Parses a query string into an AST.
///
/// Returns `Ok(None)` for blank input, `Ok(Some(node))` for valid
/// queries, or `Err(ParseError)` for invalid syntax. On error the caller
/// must fall back to treating the entire original string as one term,
/// never re-parsing a modified string.
pub fn parse(input: &str) -> Result<Option<QueryNode>, ParseError> {
    Parser::new(tokenize(input)).parse()
}
