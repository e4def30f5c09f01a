//! Turning third-party query notation into directives.
//!
//! Fenced `dataview` blocks become block query directives and backtick
//! `=`/`$=` expressions become inline directives, both empty so the next
//! processing pass fills them in.

use serde::Serialize;

use crate::{
    locate::{
        Span, is_supported_query, locate_raw_block_queries, locate_raw_inline_expressions,
    },
    markers::{CLOSING, INLINE_END, MarkerVariant, SyntaxFamily, UpdateMode, render_closing},
};

/// Outcome of a conversion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Conversion {
    pub text: String,
    /// Number of blocks and inline expressions replaced.
    pub converted: usize,
    /// Queries and expressions left alone, either because their kind cannot
    /// be serialized or because they contain comment markers.
    pub skipped: Vec<String>,
}

#[derive(Debug)]
struct Replacement {
    span: Span,
    text: String,
}

fn block_directive(indentation: &str, query: &str) -> String {
    let opening = SyntaxFamily::Legacy
        .auto_opening()
        .render(MarkerVariant::WithSpace);
    format!(
        "{indentation}{opening}{query}{}",
        render_closing(MarkerVariant::WithSpace)
    )
}

fn inline_directive(expression: &str) -> String {
    let opening = crate::markers::INLINE_OPENINGS
        .iter()
        .find(|m| m.mode == UpdateMode::Auto)
        .map_or("<!-- IQ:", |m| m.text);
    format!(
        "{opening} {expression}{}{INLINE_END}",
        render_closing(MarkerVariant::WithSpace)
    )
}

/// Text carrying `<!--` or `-->` cannot sit inside a directive comment.
fn breaks_comment(text: &str) -> bool {
    text.contains("<!--") || text.contains(CLOSING)
}

/// Collects replacements for every raw construct accepted by `keep`.
fn plan(text: &str, keep: impl Fn(Span) -> bool) -> (Vec<Replacement>, Vec<String>) {
    let mut replacements = vec![];
    let mut skipped = vec![];

    for block in locate_raw_block_queries(text) {
        if !keep(block.span) {
            continue;
        }
        if !is_supported_query(&block.query) {
            log::debug!("skipping unsupported query: {}", block.query);
            skipped.push(block.query);
        } else if breaks_comment(&block.query) {
            log::debug!("skipping query containing a comment marker: {}", block.query);
            skipped.push(block.query);
        } else {
            replacements.push(Replacement {
                span: block.span,
                text: block_directive(&block.indentation, &block.query),
            });
        }
    }

    for expr in locate_raw_inline_expressions(text) {
        if !keep(expr.span) {
            continue;
        }
        if breaks_comment(&expr.expression) {
            log::debug!("skipping expression containing a comment marker: {}", expr.expression);
            skipped.push(expr.expression);
            continue;
        }
        replacements.push(Replacement {
            span: expr.span,
            text: inline_directive(&expr.expression),
        });
    }

    (replacements, skipped)
}

fn apply(text: &str, mut replacements: Vec<Replacement>, skipped: Vec<String>) -> Conversion {
    replacements.sort_by_key(|r| std::cmp::Reverse(r.span.start));
    let mut out = text.to_string();
    for r in &replacements {
        out.replace_range(r.span.start..r.span.end, &r.text);
    }
    Conversion {
        text: out,
        converted: replacements.len(),
        skipped,
    }
}

/// Converts every fenced query block and inline expression in `text`.
pub fn convert_all(text: &str) -> Conversion {
    let (replacements, skipped) = plan(text, |_| true);
    apply(text, replacements, skipped)
}

/// Converts everything inside a selection. The selected text is treated as
/// a document of its own.
pub fn convert_in_selection(selected: &str) -> Conversion {
    convert_all(selected)
}

/// Converts the construct under the cursor, if any.
///
/// A cursor sitting right after a construct still selects it. When a fenced
/// block and an inline expression both touch the cursor, the block wins.
pub fn convert_at_cursor(text: &str, cursor: usize) -> Conversion {
    let (mut replacements, skipped) = plan(text, |span| span.touches(cursor));
    replacements.truncate(1);
    apply(text, replacements, skipped)
}
