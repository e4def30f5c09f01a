use serde::Serialize;

/// A byte range `[start, end)` into a document.
///
/// Located directives store spans rather than offsets pairs scattered across
/// fields, so slicing the document with a span always reproduces the exact
/// source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct Span {
    /// Inclusive start byte offset.
    pub start: usize,
    /// Exclusive end byte offset.
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// Returns the length in bytes. Uses saturating subtraction for safety.
    #[must_use]
    pub fn len(self) -> usize {
        self.end.saturating_sub(self.start)
    }

    /// Returns true if the span is empty (start >= end).
    #[must_use]
    pub fn is_empty(self) -> bool {
        self.len() == 0
    }

    /// Returns true if `offset` falls inside the span (end inclusive, so a
    /// cursor placed right after a construct still selects it).
    #[must_use]
    pub fn touches(self, offset: usize) -> bool {
        self.start <= offset && offset <= self.end
    }

    /// Slices `text` with this span.
    pub fn slice(self, text: &str) -> &str {
        &text[self.start..self.end]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn len_and_empty() {
        assert_eq!(Span::new(3, 7).len(), 4);
        assert!(Span::new(5, 5).is_empty());
        assert!(Span::new(6, 5).is_empty());
    }

    #[test]
    fn touches_is_end_inclusive() {
        let sp = Span::new(2, 4);
        assert!(!sp.touches(1));
        assert!(sp.touches(2));
        assert!(sp.touches(4));
        assert!(!sp.touches(5));
    }

    #[test]
    fn slice_reproduces_source() {
        let text = "hello world";
        assert_eq!(Span::new(6, 11).slice(text), "world");
    }
}
