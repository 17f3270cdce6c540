//! Query abstract syntax tree.
//!
//! Represents parsed search-box expressions before compilation to backend
//! queries.

use std::fmt;

/// Comparison operator for range filters.
///
/// Spelled the way backends spell their comparison keys, so the compiler
/// can pass the operator through unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RangeOp {
    /// Strictly less than.
    Lt,
    /// Less than or equal.
    Lte,
    /// Strictly greater than.
    Gt,
    /// Greater than or equal.
    Gte,
}

impl RangeOp {
    /// Parses a backend comparison key (`lt`, `lte`, `gt`, `gte`).
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "lt" => Some(Self::Lt),
            "lte" => Some(Self::Lte),
            "gt" => Some(Self::Gt),
            "gte" => Some(Self::Gte),
            _ => None,
        }
    }

    /// Returns the backend comparison key.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Lt => "lt",
            Self::Lte => "lte",
            Self::Gt => "gt",
            Self::Gte => "gte",
        }
    }
}

impl fmt::Display for RangeOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A parsed query expression.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryNode {
    /// A bare word or quoted phrase.
    ///
    /// Phrase-ness is encoded by the surrounding quote characters being
    /// preserved in the text, so downstream full-text queries see the
    /// quoting exactly as the user typed it.
    Term(String),

    /// Range filter: `range:field:op:value`.
    Range {
        /// Field name, validated only at compile time.
        field: String,
        /// Comparison operator.
        op: RangeOp,
        /// Raw comparison value.
        value: String,
    },

    /// Exact-value filter: `exact:field:value`.
    Exact {
        /// Field name, validated only at compile time.
        field: String,
        /// Value required to match exactly (quotes already stripped).
        value: String,
    },

    /// Field-scoped query: `field:name:...` restricts the inner
    /// expression to one field (or a remapped field list).
    FieldScope {
        /// Field name as typed.
        field: String,
        /// Expression evaluated within that field.
        node: Box<Self>,
    },

    /// Negation via the NOT keyword.
    Not(Box<Self>),

    /// Conjunction via the AND keyword.
    And(Vec<Self>),

    /// Disjunction via the OR keyword.
    Or(Vec<Self>),

    /// Implicit conjunction of space-separated expressions.
    ///
    /// Runs made up entirely of plain terms are collapsed back into a
    /// single multi-word term at compile time.
    Adjacency(Vec<Self>),
}

impl QueryNode {
    /// Creates a term node.
    pub fn term(text: impl Into<String>) -> Self {
        Self::Term(text.into())
    }

    /// Creates an And expression, flattening nested Ands.
    pub fn and(nodes: Vec<Self>) -> Self {
        let flattened: Vec<Self> = nodes
            .into_iter()
            .flat_map(|n| match n {
                Self::And(inner) => inner,
                other => vec![other],
            })
            .collect();

        match flattened.len() {
            1 => flattened.into_iter().next().unwrap(),
            _ => Self::And(flattened),
        }
    }

    /// Creates an Or expression, flattening nested Ors.
    pub fn or(nodes: Vec<Self>) -> Self {
        let flattened: Vec<Self> = nodes
            .into_iter()
            .flat_map(|n| match n {
                Self::Or(inner) => inner,
                other => vec![other],
            })
            .collect();

        match flattened.len() {
            1 => flattened.into_iter().next().unwrap(),
            _ => Self::Or(flattened),
        }
    }

    /// Creates an Adjacency expression, flattening nested Adjacencies.
    pub fn adjacency(nodes: Vec<Self>) -> Self {
        let flattened: Vec<Self> = nodes
            .into_iter()
            .flat_map(|n| match n {
                Self::Adjacency(inner) => inner,
                other => vec![other],
            })
            .collect();

        match flattened.len() {
            1 => flattened.into_iter().next().unwrap(),
            _ => Self::Adjacency(flattened),
        }
    }

    /// Reports whether this tree uses any structured syntax.
    ///
    /// A query is "advanced" when it contains a field scope, boolean
    /// connective, range or exact filter anywhere, or a quoted term.
    /// Plain bags of words are not advanced, and only those are eligible
    /// for the strict-matching policy applied downstream.
    pub fn is_advanced(&self) -> bool {
        match self {
            Self::Term(text) => text.contains('"'),
            Self::Adjacency(items) => items.iter().any(Self::is_advanced),
            Self::Range { .. }
            | Self::Exact { .. }
            | Self::FieldScope { .. }
            | Self::Not(_)
            | Self::And(_)
            | Self::Or(_) => true,
        }
    }

    /// Formats the expression as query-string text (human-readable form).
    fn fmt_query_string(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Term(text) => f.write_str(text),
            Self::Range { field, op, value } => write!(f, "range:{field}:{op}:{value}"),
            Self::Exact { field, value } => write!(f, "exact:{field}:{value}"),
            Self::FieldScope { field, node } => {
                write!(f, "field:{field}:(")?;
                node.fmt_query_string(f)?;
                f.write_str(")")
            }
            Self::Not(inner) => {
                f.write_str("NOT (")?;
                inner.fmt_query_string(f)?;
                f.write_str(")")
            }
            Self::And(nodes) => Self::fmt_joined(f, nodes, " AND "),
            Self::Or(nodes) => Self::fmt_joined(f, nodes, " OR "),
            Self::Adjacency(nodes) => Self::fmt_joined(f, nodes, " "),
        }
    }

    /// Writes child expressions separated by `sep`, parenthesized.
    fn fmt_joined(f: &mut fmt::Formatter<'_>, nodes: &[Self], sep: &str) -> fmt::Result {
        f.write_str("(")?;
        for (i, node) in nodes.iter().enumerate() {
            if i > 0 {
                f.write_str(sep)?;
            }
            node.fmt_query_string(f)?;
        }
        f.write_str(")")
    }
}

impl fmt::Display for QueryNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.fmt_query_string(f)
    }
}
