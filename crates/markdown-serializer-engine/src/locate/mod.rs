//! # Directive Location
//!
//! Scans raw document text for the directives this crate maintains.
//!
//! ## Modules
//!
//! - **`query`**: line-driven state machine for block queries (single and
//!   multi-line), with duplicate and unsupported-kind filtering
//! - **`inline`**: whole-text scan for inline expressions and their stored results
//! - **`raw`**: third-party notation (fenced query blocks, backtick
//!   expressions) awaiting conversion
//! - **`cursor`**, **`lines`**, **`span`**: byte-offset plumbing shared by the scanners
//!
//! ## Key Invariants
//!
//! - Located block queries never share a normalized query text
//! - Inline expressions are sorted by start offset and never share one
//! - Every span slices back to the exact source text

pub mod cursor;
pub mod inline;
pub mod lines;
pub mod query;
pub mod raw;
pub mod span;

pub use inline::{ExpressionKind, LocatedInlineExpression, locate_inline_expressions};
pub use query::{LocatedQuery, is_supported_query, locate_queries, normalize_query};
pub use raw::{
    RawBlockQuery, RawInlineExpression, locate_raw_block_queries, locate_raw_inline_expressions,
};
pub use span::Span;
