//! Search-box query parsing and AST for onebox.
//!
//! This crate turns the free-form text of a site search box into a typed
//! syntax tree:
//!
//! - **Terms**: `crash` - words to match
//! - **Phrases**: `"address bar"` - exact sequences, quotes preserved
//! - **Field scoping**: `field:title:firefox` - search one field
//! - **Exact filters**: `exact:category:help` - enumerated values
//! - **Range filters**: `range:updated:gte:2024-01-01`
//! - **Boolean operators**: `NOT a`, `a AND b`, `a OR b` - uppercase
//!   only; lowercase `and`/`or`/`not` are ordinary words
//! - **Grouping**: `(a OR b) c` - precedence control
//!
//! Parsing is pure and total: every input either yields a tree or a
//! [`ParseError`], and the caller then treats the whole original string
//! as a single literal term. No partial trees escape.
//!
//! # Example
//!
//! ```
//! use onebox_query::parse;
//!
//! let node = parse("field:title:guide (firefox OR fenix) NOT legacy").unwrap();
//! assert!(node.is_some());
//! ```

#![warn(missing_docs)]

mod ast;
mod error;
mod lexer;
mod parser;

pub use ast::{QueryNode, RangeOp};
pub use error::ParseError;
pub use lexer::{Token, tokenize};
pub use parser::parse;
