//! Query compilation and retrieval engine for onebox.
//!
//! This crate turns the parsed search-box language into backend queries
//! and executes them:
//!
//! - [`compile`]: AST to backend-neutral query, driven by a per-request
//!   [`CompilerContext`] (field remapping, range/exact allow-lists)
//! - [`SearchSpecification`]: one document type's searchable fields,
//!   base filters and result shaping
//! - [`SearchRunner`]: per-request execution with the parse-fallback
//!   retry and plain or fused (lexical + semantic) retrieval
//! - [`CompoundSearch`]: federation of several specifications into one
//!   result stream
//! - [`paginate`]: page-number access over execution windows
//!
//! Specifications and backends are shared immutably; every mutable bit
//! of state lives in the per-request [`SearchRunner`], so independent
//! requests can run concurrently without locking.

#![warn(missing_docs)]

mod compile;
mod compound;
mod context;
mod engine;
mod error;
mod hybrid;
mod page;
mod spec;
mod strict;
mod tuning;

pub use compile::compile;
pub use compound::CompoundSearch;
pub use context::{CompilerContext, ExactMapping};
pub use engine::{SearchRunner, Window};
pub use error::SearchError;
pub use page::{Page, paginate};
pub use spec::{QueryIntent, ResultRecord, SearchSpecification, excerpts_for};
pub use strict::{is_conversational, policy_text_query};
pub use tuning::{
    DEFAULT_MIN_FUSED_SCORE, DEFAULT_RANK_CONSTANT, DEFAULT_RANK_WINDOW_SIZE, SearchTuning,
};
