use std::collections::HashSet;

use serde::Serialize;

use crate::markers::{
    MarkerVariant, OpeningMarker, SyntaxFamily, UpdateMode, find_closing, find_opening,
    is_result_start,
};

use super::lines::{LineRef, lines_with_spans};

/// Query kinds the external engine can render to static Markdown.
const SUPPORTED_KINDS: [&str; 3] = ["LIST", "TABLE", "TASK"];

/// A block query directive found in a document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LocatedQuery {
    /// Normalized single-line query text.
    pub query: String,
    /// Everything on the opening line before the opening marker.
    pub indentation: String,
    pub mode: UpdateMode,
    pub family: SyntaxFamily,
    /// Opening marker variant exactly as found in the source.
    pub opening: MarkerVariant,
    /// Closing marker variant exactly as found in the source.
    pub closing: MarkerVariant,
    /// Verbatim source lines (opening through closing, joined with `\n`)
    /// for directives spanning several lines.
    pub original: Option<String>,
    /// True when a result block directly follows the directive.
    pub serialized: bool,
    /// Zero-based line of the opening marker.
    pub line: usize,
}

/// Locates every supported block query in `doc`, top to bottom.
///
/// Incomplete directives and unsupported query kinds are dropped silently;
/// a query text seen before is not emitted again.
pub fn locate_queries(doc: &str) -> Vec<LocatedQuery> {
    let mut collector = QueryCollector::new();
    for (idx, line) in lines_with_spans(doc).enumerate() {
        collector.push(idx, &line);
    }
    collector.finish()
}

/// Returns true when the query starts with a kind the engine can serialize.
pub fn is_supported_query(query: &str) -> bool {
    query
        .split_whitespace()
        .next()
        .map(|kind| {
            SUPPORTED_KINDS
                .iter()
                .any(|supported| kind.eq_ignore_ascii_case(supported))
        })
        .unwrap_or(false)
}

/// Collapses a possibly multi-line query body into one line: every line is
/// trimmed and runs of whitespace become a single space.
pub fn normalize_query(body: &str) -> String {
    body.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Removes up to `depth` leading `>` markers, with the whitespace before
/// each one.
fn strip_quote_prefix(line: &str, depth: usize) -> &str {
    let mut rest = line;
    for _ in 0..depth {
        match rest.trim_start().strip_prefix('>') {
            Some(inner) => rest = inner,
            None => break,
        }
    }
    rest
}

#[derive(Debug)]
enum CaptureState {
    Idle,
    Capturing {
        marker: OpeningMarker,
        opening: MarkerVariant,
        indentation: String,
        start_line: usize,
        lines: Vec<String>,
    },
}

/// Line-driven state machine behind [`locate_queries`].
///
/// `Idle` looks for an opening marker; a marker without a closing marker on
/// the same line switches to `Capturing` until a closing line arrives.
struct QueryCollector {
    state: CaptureState,
    seen: HashSet<String>,
    /// Index of the last emitted query, waiting to see whether the next line
    /// starts its result block.
    awaiting_result: Option<usize>,
    out: Vec<LocatedQuery>,
}

impl QueryCollector {
    fn new() -> Self {
        Self {
            state: CaptureState::Idle,
            seen: HashSet::new(),
            awaiting_result: None,
            out: vec![],
        }
    }

    fn push(&mut self, idx: usize, line: &LineRef<'_>) {
        if let Some(prev) = self.awaiting_result.take() {
            let trimmed = line.text.trim_start_matches([' ', '\t', '>']);
            self.out[prev].serialized = is_result_start(trimmed);
        }

        // A new opening marker ends an unterminated directive
        if let CaptureState::Capturing { start_line, .. } = &self.state
            && find_opening(line.text).is_some()
        {
            log::debug!("discarding unterminated query directive opened on line {start_line}");
            self.state = CaptureState::Idle;
        }

        match &mut self.state {
            CaptureState::Idle => self.scan_idle(idx, line.text),
            CaptureState::Capturing { lines, .. } => {
                lines.push(line.text.to_string());
                if find_closing(line.text).is_some() {
                    self.finish_capture();
                }
            }
        }
    }

    fn finish(self) -> Vec<LocatedQuery> {
        if let CaptureState::Capturing { start_line, .. } = self.state {
            log::debug!("discarding unterminated query directive opened on line {start_line}");
        }
        self.out
    }

    fn scan_idle(&mut self, idx: usize, text: &str) {
        let Some((marker, at, opening)) = find_opening(text) else {
            return;
        };
        let indentation = text[..at].to_string();
        let after = &text[at + marker.text.len()..];

        match find_closing(after) {
            Some((close_at, closing)) => {
                let query = after[..close_at].trim().to_string();
                self.emit(LocatedQuery {
                    query,
                    indentation,
                    mode: marker.mode,
                    family: marker.family,
                    opening,
                    closing,
                    original: None,
                    serialized: false,
                    line: idx,
                });
            }
            None => {
                self.state = CaptureState::Capturing {
                    marker,
                    opening,
                    indentation,
                    start_line: idx,
                    lines: vec![text.to_string()],
                };
            }
        }
    }

    fn finish_capture(&mut self) {
        let CaptureState::Capturing {
            marker,
            opening,
            indentation,
            start_line,
            lines,
        } = std::mem::replace(&mut self.state, CaptureState::Idle)
        else {
            return;
        };

        // Continuation lines repeat the blockquote prefix of the opening line.
        let depth = indentation.matches('>').count();
        let mut body = lines[0][indentation.len() + marker.text.len()..].to_string();
        for line in &lines[1..] {
            body.push('\n');
            body.push_str(strip_quote_prefix(line, depth));
        }
        let Some((close_at, closing)) = find_closing(&body) else {
            return;
        };

        self.emit(LocatedQuery {
            query: normalize_query(&body[..close_at]),
            indentation,
            mode: marker.mode,
            family: marker.family,
            opening,
            closing,
            original: Some(lines.join("\n")),
            serialized: false,
            line: start_line,
        });
    }

    fn emit(&mut self, query: LocatedQuery) {
        if query.query.contains("<!--") {
            log::debug!("skipping query with a nested comment on line {}: {}", query.line, query.query);
            return;
        }
        if !is_supported_query(&query.query) {
            log::debug!("skipping unsupported query on line {}: {}", query.line, query.query);
            return;
        }
        if !self.seen.insert(query.query.clone()) {
            log::debug!("skipping duplicate query on line {}: {}", query.line, query.query);
            return;
        }
        self.awaiting_result = Some(self.out.len());
        self.out.push(query);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[test]
    fn single_line_directive() {
        let doc = "# Notes\n<!-- QueryToSerialize: LIST FROM \"folder\" -->\n";
        let found = locate_queries(doc);

        assert_eq!(found.len(), 1);
        let q = &found[0];
        assert_eq!(q.query, "LIST FROM \"folder\"");
        assert_eq!(q.indentation, "");
        assert_eq!(q.mode, UpdateMode::Auto);
        assert_eq!(q.family, SyntaxFamily::Legacy);
        assert_eq!(q.opening, MarkerVariant::WithSpace);
        assert_eq!(q.closing, MarkerVariant::WithSpace);
        assert_eq!(q.original, None);
        assert!(!q.serialized);
        assert_eq!(q.line, 1);
    }

    #[test]
    fn indentation_is_text_before_marker() {
        let doc = "> - <!-- QueryToSerializeManual: TABLE file.mtime FROM #x -->";
        let found = locate_queries(doc);

        assert_eq!(found[0].indentation, "> - ");
        assert_eq!(found[0].mode, UpdateMode::Manual);
    }

    #[test]
    fn trimmed_closing_variant_is_kept() {
        let found = locate_queries("<!-- QueryToSerialize: LIST FROM #a-->");
        assert_eq!(found[0].closing, MarkerVariant::Trimmed);
        assert_eq!(found[0].query, "LIST FROM #a");
    }

    #[test]
    fn multi_line_directive_is_normalized() {
        let doc = "intro\n  <!-- QueryToSerialize: TABLE\n      file.name,   file.mtime\n  FROM #project\n  -->\nafter\n";
        let found = locate_queries(doc);

        assert_eq!(found.len(), 1);
        let q = &found[0];
        assert_eq!(q.query, "TABLE file.name, file.mtime FROM #project");
        assert_eq!(q.indentation, "  ");
        assert_eq!(q.closing, MarkerVariant::WithSpace);
        assert_eq!(
            q.original.as_deref(),
            Some(
                "  <!-- QueryToSerialize: TABLE\n      file.name,   file.mtime\n  FROM #project\n  -->"
            )
        );
        assert_eq!(q.line, 1);
    }

    #[test]
    fn unterminated_directive_is_discarded() {
        let doc = "<!-- QueryToSerialize: LIST FROM #a\nstill going\n";
        assert!(locate_queries(doc).is_empty());
    }

    #[test]
    fn new_opening_marker_abandons_unterminated_directive() {
        let doc = "<!-- QueryToSerialize: LIST FROM #a\n<!-- QueryToSerialize: LIST FROM #b -->\n";
        let found = locate_queries(doc);

        assert_eq!(found.len(), 1);
        assert_eq!(found[0].query, "LIST FROM #b");
        assert_eq!(found[0].original, None);
        assert_eq!(found[0].line, 1);
    }

    #[test]
    fn unterminated_directive_does_not_swallow_plain_comment() {
        let doc = "<!-- QueryToSerialize: LIST FROM #a\ntext\n<!-- comment -->\n";
        assert!(locate_queries(doc).is_empty());
    }

    #[test]
    fn blockquote_prefix_is_not_part_of_multi_line_query() {
        let doc = "> - <!-- QueryToSerialize: TABLE x\n>   FROM #a -->\n";
        let found = locate_queries(doc);

        assert_eq!(found.len(), 1);
        assert_eq!(found[0].query, "TABLE x FROM #a");
        assert_eq!(found[0].indentation, "> - ");
        assert_eq!(
            found[0].original.as_deref(),
            Some("> - <!-- QueryToSerialize: TABLE x\n>   FROM #a -->")
        );
    }

    #[rstest]
    #[case(">   FROM #a", 1, "   FROM #a")]
    #[case("> > WHERE x", 2, " WHERE x")]
    #[case("> > WHERE x", 1, " > WHERE x")]
    #[case("  FROM #a", 1, "  FROM #a")]
    #[case("> FROM #a", 0, "> FROM #a")]
    fn quote_prefix_stripping(#[case] line: &str, #[case] depth: usize, #[case] expected: &str) {
        assert_eq!(strip_quote_prefix(line, depth), expected);
    }

    #[test]
    fn unsupported_kind_is_filtered() {
        assert!(locate_queries("<!-- QueryToSerialize: CALENDAR FROM x -->").is_empty());
    }

    #[test]
    fn exact_duplicates_are_suppressed() {
        let doc = "<!-- QueryToSerialize: LIST FROM #a -->\n\n<!-- QueryToSerializeOnce: LIST FROM #a -->\n";
        let found = locate_queries(doc);

        assert_eq!(found.len(), 1);
        assert_eq!(found[0].mode, UpdateMode::Auto);
    }

    #[test]
    fn prefix_queries_are_not_duplicates() {
        let doc = "<!-- QueryToSerialize: LIST FROM #project -->\n<!-- QueryToSerialize: LIST FROM #project and #done -->\n";
        let found: Vec<_> = locate_queries(doc).into_iter().map(|q| q.query).collect();

        assert_eq!(found, vec!["LIST FROM #project", "LIST FROM #project and #done"]);
    }

    #[test]
    fn detects_existing_result_block() {
        let doc = "<!-- QueryToSerialize: LIST FROM #a -->\n<!-- SerializedQuery: LIST FROM #a -->\n- x\n<!-- SerializedQuery END -->\n<!-- QueryToSerialize: LIST FROM #b -->\n";
        let found = locate_queries(doc);

        assert!(found[0].serialized);
        assert!(!found[1].serialized);
    }

    #[test]
    fn detects_result_block_after_multi_line_directive() {
        let doc = "<!-- dataview-serializer-query-once: LIST\nFROM #a -->\n<!-- dataview-serializer-result: LIST FROM #a -->\n<!-- dataview-serializer-result-end -->\n";
        let found = locate_queries(doc);

        assert_eq!(found[0].family, SyntaxFamily::Alias);
        assert_eq!(found[0].mode, UpdateMode::Once);
        assert!(found[0].serialized);
    }

    #[test]
    fn result_markers_are_not_directives() {
        let doc = "<!-- SerializedQuery: LIST FROM #a -->\n- x\n<!-- SerializedQuery END -->\n";
        assert!(locate_queries(doc).is_empty());
    }

    #[rstest]
    #[case("LIST FROM #a", true)]
    #[case("list from #a", true)]
    #[case("TABLE file.name", true)]
    #[case("task from #todo", true)]
    #[case("CALENDAR file.day", false)]
    #[case("", false)]
    #[case("LISTING", false)]
    fn supported_kinds(#[case] query: &str, #[case] supported: bool) {
        assert_eq!(is_supported_query(query), supported);
    }

    #[test]
    fn normalize_collapses_whitespace() {
        assert_eq!(
            normalize_query("  LIST\n   FROM  #a\n\t WHERE x  "),
            "LIST FROM #a WHERE x"
        );
    }
}
