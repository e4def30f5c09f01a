use serde::Serialize;

use crate::markers::{
    INLINE_END, INLINE_OPENINGS, INLINE_PREFIX, InlineMarker, MarkerVariant, UpdateMode,
    find_closing, render_closing,
};

use super::{cursor::Cursor, lines::line_start, span::Span};

/// Value prefix distinguishing query-language expressions from script ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ExpressionKind {
    /// `=expr`
    Query,
    /// `$=expr`
    Script,
}

impl ExpressionKind {
    pub const QUERY_PREFIX: &'static str = "=";
    pub const SCRIPT_PREFIX: &'static str = "$=";

    pub fn of(expression: &str) -> Self {
        if expression.starts_with(Self::SCRIPT_PREFIX) {
            ExpressionKind::Script
        } else {
            ExpressionKind::Query
        }
    }
}

/// An inline expression directive found in a document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LocatedInlineExpression {
    /// Expression text including its value prefix (`=` or `$=`).
    pub expression: String,
    pub kind: ExpressionKind,
    pub mode: UpdateMode,
    pub opening: MarkerVariant,
    pub closing: MarkerVariant,
    /// Whole matched span: directive, result and end marker when present.
    pub span: Span,
    /// Directive text from the opening marker through the closing marker.
    pub directive: String,
    /// Result currently stored after the directive. `Some("")` means the
    /// expression was serialized to nothing; `None` means never serialized.
    pub existing_result: Option<String>,
    /// True when the expression lives in a Markdown table row.
    pub is_table_cell: bool,
}

/// Locates every inline expression directive in `doc`, ordered by offset.
///
/// Each opening marker is scanned over the whole text, most specific first.
/// When two markers match at the same offset only the most specific one is
/// kept.
pub fn locate_inline_expressions(doc: &str) -> Vec<LocatedInlineExpression> {
    let mut found = vec![];
    for marker in INLINE_OPENINGS.iter() {
        for (at, _) in doc.match_indices(marker.text) {
            if let Some(expr) = parse_at(doc, at, marker) {
                found.push(expr);
            }
        }
    }
    // Stable sort keeps marker-table order among equal offsets.
    found.sort_by_key(|e| e.span.start);
    found.dedup_by_key(|e| e.span.start);
    found
}

fn parse_at(doc: &str, at: usize, marker: &InlineMarker) -> Option<LocatedInlineExpression> {
    let mut cur = Cursor::new(&doc[at..], at);
    cur.bump_n(marker.text.len());

    let opening = if cur.peek() == Some(b' ') {
        MarkerVariant::WithSpace
    } else {
        MarkerVariant::Trimmed
    };

    let (close_at, closing) = find_closing(cur.rest())?;
    let expression = cur.rest()[..close_at].trim().to_string();
    if expression.is_empty() {
        return None;
    }
    cur.bump_n(close_at + render_closing(closing).len());
    let directive_end = cur.pos();

    let (existing_result, end) = match cur.find(INLINE_END) {
        Some(rel) if !cur.rest()[..rel].contains(INLINE_PREFIX) => {
            let result = cur.rest()[..rel].to_string();
            (Some(result), directive_end + rel + INLINE_END.len())
        }
        _ => (None, directive_end),
    };

    let is_table_cell = doc[line_start(doc, at)..]
        .trim_start()
        .starts_with('|');

    Some(LocatedInlineExpression {
        kind: ExpressionKind::of(&expression),
        expression,
        mode: marker.mode,
        opening,
        closing,
        span: Span::new(at, end),
        directive: doc[at..directive_end].to_string(),
        existing_result,
        is_table_cell,
    })
}
