//! Folding serialization results back into document text.
//!
//! Only successful results are applied. A failed directive keeps its source
//! text exactly as found and its error travels back to the caller.

pub mod block;
pub mod inline;

use serde::{Deserialize, Serialize};

use crate::{
    error::QueryError,
    locate::{LocatedInlineExpression, LocatedQuery},
};

pub use block::{continuation_indent, directive_pattern, rewrite_query};
pub use inline::rewrite_expressions;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewriteOptions {
    /// Emit a blank line before the result end marker even for directives
    /// that are not indented. Some site generators need it around blocks.
    pub always_add_trailing_blank_line: bool,
}

/// A block query together with the outcome of serializing it.
#[derive(Debug, Clone)]
pub struct ResolvedQuery {
    pub located: LocatedQuery,
    pub result: Result<String, QueryError>,
}

/// An inline expression together with the outcome of serializing it.
#[derive(Debug, Clone)]
pub struct ResolvedExpression {
    pub located: LocatedInlineExpression,
    pub result: Result<String, QueryError>,
}

/// Every directive resolved during one pass over a document.
#[derive(Debug, Clone, Default)]
pub struct ResolvedDirectives {
    pub queries: Vec<ResolvedQuery>,
    pub expressions: Vec<ResolvedExpression>,
}

impl ResolvedDirectives {
    /// Failures in source order, block queries first.
    pub fn errors(&self) -> Vec<QueryError> {
        let queries = self.queries.iter().map(|q| &q.result);
        let expressions = self.expressions.iter().map(|e| &e.result);
        queries
            .chain(expressions)
            .filter_map(|r| r.as_ref().err().cloned())
            .collect()
    }
}

/// Applies block query results top to bottom.
pub fn rewrite_blocks(text: &str, queries: &[ResolvedQuery], options: &RewriteOptions) -> String {
    let mut out = text.to_string();
    for resolved in queries {
        let Ok(content) = &resolved.result else {
            continue;
        };
        if let Some(next) = rewrite_query(&out, &resolved.located, content, options) {
            out = next;
        } else {
            log::debug!("query unchanged: {}", resolved.located.query);
        }
    }
    out
}

/// Applies inline expression results located on `text`.
pub fn rewrite_inline(text: &str, expressions: &[ResolvedExpression]) -> String {
    rewrite_expressions(
        text,
        expressions
            .iter()
            .filter_map(|e| e.result.as_deref().ok().map(|value| (&e.located, value))),
    )
}

/// Rewrites `text` with every successful result in `resolved`.
///
/// All directives must have been located on `text` itself. Inline values go
/// in first since they are placed by offset; block results are placed by
/// matching their directive and do not depend on offsets.
pub fn rewrite_document(
    text: &str,
    resolved: &ResolvedDirectives,
    options: &RewriteOptions,
) -> String {
    let with_inline = rewrite_inline(text, &resolved.expressions);
    rewrite_blocks(&with_inline, &resolved.queries, options)
}
