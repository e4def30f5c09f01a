use super::span::Span;

/// A reference to a single line of a document with its byte span.
#[derive(Debug, Clone, Copy)]
pub struct LineRef<'a> {
    /// Byte span of this line (includes the newline if present).
    pub span: Span,
    /// The line text without its line terminator (`\n` or `\r\n`).
    pub text: &'a str,
}

/// Returns an iterator over lines with their byte spans.
///
/// Newlines are kept inside each span so spans tile the whole document, which
/// keeps splicing arithmetic exact.
pub fn lines_with_spans(doc: &str) -> impl Iterator<Item = LineRef<'_>> + '_ {
    let mut offset = 0usize;
    doc.split_inclusive('\n').map(move |line| {
        let start = offset;
        offset += line.len();
        let text = line
            .strip_suffix('\n')
            .map(|l| l.strip_suffix('\r').unwrap_or(l))
            .unwrap_or(line);
        LineRef {
            span: Span { start, end: offset },
            text,
        }
    })
}

/// Returns the byte offset of the start of the line containing `offset`.
pub fn line_start(doc: &str, offset: usize) -> usize {
    doc[..offset].rfind('\n').map(|i| i + 1).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spans_tile_the_document() {
        let doc = "a\nbc\r\n\nd";
        let lines: Vec<_> = lines_with_spans(doc).collect();
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[0].text, "a");
        assert_eq!(lines[1].text, "bc");
        assert_eq!(lines[1].span.slice(doc), "bc\r\n");
        assert_eq!(lines[2].text, "");
        assert_eq!(lines[3].text, "d");
        assert_eq!(lines[3].span.end, doc.len());
    }

    #[test]
    fn empty_document_has_no_lines() {
        assert_eq!(lines_with_spans("").count(), 0);
    }

    #[test]
    fn line_start_bounds() {
        let doc = "first\nsecond line\nthird";
        assert_eq!(line_start(doc, 8), 6);
        assert_eq!(line_start(doc, 0), 0);
        assert_eq!(line_start(doc, 6), 6);
        assert_eq!(line_start(doc, doc.len()), 18);
    }
}
