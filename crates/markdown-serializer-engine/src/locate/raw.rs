//! Discovery of query notation that has not been converted yet: fenced
//! `dataview` code blocks and backtick inline expressions such as
//! `` `= this.file.name` ``. Only the conversion utility uses this.

use pulldown_cmark::{CodeBlockKind, Event, Options, Parser, Tag, TagEnd};

use super::{
    inline::ExpressionKind,
    lines::line_start,
    query::normalize_query,
    span::Span,
};

/// Info-string tag of fenced blocks holding a query.
pub const QUERY_FENCE_TAG: &str = "dataview";

/// A fenced query block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawBlockQuery {
    /// From the start of the opening fence line to the end of the closing
    /// fence line (terminator excluded).
    pub span: Span,
    /// Text on the opening fence line before the fence itself.
    pub indentation: String,
    /// Normalized single-line query.
    pub query: String,
}

/// A backtick inline expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawInlineExpression {
    /// Span of the code span, backticks included.
    pub span: Span,
    /// Expression with its value prefix and no padding, e.g. `=this.file.name`.
    pub expression: String,
}

fn parser(doc: &str) -> Parser<'_> {
    Parser::new_ext(doc, Options::ENABLE_TABLES)
}

/// Finds fenced blocks tagged with [`QUERY_FENCE_TAG`].
pub fn locate_raw_block_queries(doc: &str) -> Vec<RawBlockQuery> {
    let mut out = vec![];
    let mut open: Option<(usize, usize, String)> = None;

    for (event, range) in parser(doc).into_offset_iter() {
        match event {
            Event::Start(Tag::CodeBlock(CodeBlockKind::Fenced(info)))
                if info.split_whitespace().next() == Some(QUERY_FENCE_TAG) =>
            {
                open = Some((range.start, range.end, String::new()));
            }
            Event::Text(text) => {
                if let Some((_, _, body)) = open.as_mut() {
                    body.push_str(&text);
                }
            }
            Event::End(TagEnd::CodeBlock) => {
                if let Some((start, end, body)) = open.take() {
                    let ls = line_start(doc, start);
                    out.push(RawBlockQuery {
                        span: Span::new(ls, trim_line_terminators(doc, start, end)),
                        indentation: doc[ls..start].to_string(),
                        query: normalize_query(&body),
                    });
                }
            }
            _ => {}
        }
    }
    out
}

/// Finds backtick code spans holding an `=` or `$=` expression.
pub fn locate_raw_inline_expressions(doc: &str) -> Vec<RawInlineExpression> {
    parser(doc)
        .into_offset_iter()
        .filter_map(|(event, range)| match event {
            Event::Code(code) => {
                raw_expression(&code).map(|expression| RawInlineExpression {
                    span: Span::new(range.start, range.end),
                    expression,
                })
            }
            _ => None,
        })
        .collect()
}

fn raw_expression(code: &str) -> Option<String> {
    let code = code.trim();
    let prefix = [ExpressionKind::SCRIPT_PREFIX, ExpressionKind::QUERY_PREFIX]
        .into_iter()
        .find(|p| code.starts_with(p))?;
    let body = code[prefix.len()..].trim();
    if body.is_empty() {
        return None;
    }
    Some(format!("{prefix}{body}"))
}

fn trim_line_terminators(doc: &str, start: usize, end: usize) -> usize {
    let bytes = doc.as_bytes();
    let mut e = end;
    while e > start && matches!(bytes[e - 1], b'\n' | b'\r') {
        e -= 1;
    }
    e
}
