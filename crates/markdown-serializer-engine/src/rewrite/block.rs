use regex::Regex;

use crate::{
    locate::{LocatedQuery, Span, lines::lines_with_spans},
    markers::{
        UpdateMode, block_opening, find_opening, is_result_end, is_result_start, render_closing,
        result_start_line,
    },
};

use super::RewriteOptions;

/// Builds the exact-match pattern for a located directive.
///
/// Single-line directives match indentation, opening marker variant, query
/// text and closing marker variant. The closing marker right after the query
/// keeps `LIST FROM #a` from matching `LIST FROM #a and #b`. Multi-line
/// directives match their verbatim source lines.
pub fn directive_pattern(query: &LocatedQuery) -> Result<Regex, regex::Error> {
    let head = match &query.original {
        Some(original) => original
            .split('\n')
            .map(regex::escape)
            .collect::<Vec<_>>()
            .join(r"\r?\n"),
        None => {
            let marker = block_opening(query.mode, query.family);
            format!(
                r"{}{}[ \t]*{}[ \t]*{}",
                regex::escape(&query.indentation),
                regex::escape(&marker.render(query.opening)),
                regex::escape(&query.query),
                regex::escape(render_closing(query.closing)),
            )
        }
    };
    Regex::new(&format!(r"(?m)^{head}[^\r\n]*(?:\r?\n|\z)"))
}

/// A result block directly following a directive.
#[derive(Debug)]
struct ResultBlock<'a> {
    span: Span,
    start_line: &'a str,
    body: &'a str,
}

/// Parses the result block starting at `pos`, if any.
///
/// The start line is recognised by its marker alone, whatever query text it
/// carries, so a block left behind by an edited query is still replaced.
/// A block that runs into another directive or result before its end marker
/// is treated as absent rather than swallowing the text in between.
fn result_block_at(text: &str, pos: usize) -> Option<ResultBlock<'_>> {
    let mut lines = lines_with_spans(&text[pos..]);
    let first = lines.next()?;
    if !is_result_start(strip_container(first.text)) {
        return None;
    }
    let body_start = pos + first.span.end;

    for line in lines {
        let trimmed = strip_container(line.text);
        if is_result_end(trimmed) {
            return Some(ResultBlock {
                span: Span::new(pos, pos + line.span.end),
                start_line: first.text,
                body: Span::new(body_start, pos + line.span.start).slice(text),
            });
        }
        if is_result_start(trimmed) || find_opening(line.text).is_some() {
            return None;
        }
    }
    None
}

fn strip_container(line: &str) -> &str {
    line.trim_start_matches([' ', '\t', '>'])
}

/// Prefix for lines belonging to a directive's result: blockquote markers and
/// whitespace are kept, list bullets and other text become spaces.
pub fn continuation_indent(indentation: &str) -> String {
    indentation
        .chars()
        .map(|c| if c == '>' || c.is_whitespace() { c } else { ' ' })
        .collect()
}

fn push_line(out: &mut String, indent: &str, line: &str, eol: &str) {
    if line.is_empty() {
        out.push_str(indent.trim_end());
    } else {
        out.push_str(indent);
        out.push_str(line);
    }
    out.push_str(eol);
}

/// Renders serialized content as indented lines, each ending with `eol`.
fn render_body(content: &str, first_indent: &str, indent: &str, eol: &str, trailing_blank: bool) -> String {
    let mut body = String::new();
    let content = content.trim_end_matches(['\r', '\n']);
    if !content.is_empty() {
        for (i, line) in content.lines().enumerate() {
            push_line(&mut body, if i == 0 { first_indent } else { indent }, line, eol);
        }
    }
    if trailing_blank {
        push_line(&mut body, indent, "", eol);
    }
    body
}

fn split_terminator(line: &str) -> (&str, &'static str) {
    if let Some(stripped) = line.strip_suffix("\r\n") {
        (stripped, "\r\n")
    } else if let Some(stripped) = line.strip_suffix('\n') {
        (stripped, "\n")
    } else {
        (line, "\n")
    }
}

/// Folds one serialized query into `text`.
///
/// Returns `None` when the directive is not found or when its stored result
/// already matches `content`, so callers keep the text untouched.
pub fn rewrite_query(
    text: &str,
    query: &LocatedQuery,
    content: &str,
    options: &RewriteOptions,
) -> Option<String> {
    let pattern = match directive_pattern(query) {
        Ok(pattern) => pattern,
        Err(err) => {
            log::warn!("could not build pattern for query {}: {err}", query.query);
            return None;
        }
    };
    let found = pattern.find(text)?;
    let (directive_line, eol) = split_terminator(found.as_str());
    let existing = result_block_at(text, found.end());
    let replace_end = existing.as_ref().map_or(found.end(), |block| block.span.end);
    let indent = continuation_indent(&query.indentation);

    let replacement = if query.mode == UpdateMode::OnceAndEject {
        render_body(content, &query.indentation, &indent, eol, false)
    } else {
        let trailing_blank =
            !query.indentation.is_empty() || options.always_add_trailing_blank_line;
        let body = render_body(content, &indent, &indent, eol, trailing_blank);
        let start_line = format!("{indent}{}", result_start_line(query.family, &query.query));

        if let Some(block) = &existing
            && block.start_line.trim() == start_line.trim()
            && block.body.trim() == body.trim()
        {
            return None;
        }

        format!(
            "{directive_line}{eol}{start_line}{eol}{body}{indent}{end}{eol}",
            end = query.family.result_markers().end,
        )
    };

    let mut out = String::with_capacity(text.len() + replacement.len());
    out.push_str(&text[..found.start()]);
    out.push_str(&replacement);
    out.push_str(&text[replace_end..]);
    Some(out)
}
