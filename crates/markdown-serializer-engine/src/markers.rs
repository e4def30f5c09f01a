//! # Marker Vocabulary
//!
//! Every directive and result block is delimited by HTML comments, so the
//! markers stay invisible in rendered Markdown and survive any tooling that
//! leaves comments alone.
//!
//! Two syntax families are recognised for block queries:
//!
//! ```markdown
//! <!-- QueryToSerialize: LIST FROM #project -->
//! <!-- SerializedQuery: LIST FROM #project -->
//! - [[Note]]
//! <!-- SerializedQuery END -->
//!
//! <!-- dataview-serializer-query: LIST FROM #project -->
//! <!-- dataview-serializer-result: LIST FROM #project -->
//! - [[Note]]
//! <!-- dataview-serializer-result-end -->
//! ```
//!
//! Inline expressions carry their result between the directive and an end
//! marker: `<!-- IQ: =this.file.name -->Note<!-- /IQ -->`.
//!
//! All marker tables are ordered most-specific first. Lookups must walk them
//! in order so a short marker never shadows a longer one.

use serde::{Deserialize, Serialize};

/// Re-evaluation policy attached to a directive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UpdateMode {
    /// Re-evaluated on every pass.
    Auto,
    /// Only re-evaluated when the user explicitly triggers a pass.
    Manual,
    /// Evaluated until a result exists, then frozen.
    Once,
    /// Like `Once`, but the first result replaces the directive entirely.
    OnceAndEject,
}

/// One of the two interchangeable block-query vocabularies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SyntaxFamily {
    /// `QueryToSerialize` / `SerializedQuery`.
    Legacy,
    /// `dataview-serializer-query` / `dataview-serializer-result`.
    Alias,
}

/// Whether a marker occurrence carried its optional space.
///
/// Opening markers may be followed by a space (`<!-- QueryToSerialize: `),
/// closing markers may be preceded by one (` -->`). The exact variant is kept
/// so that rewrites can match the source byte for byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MarkerVariant {
    WithSpace,
    Trimmed,
}

pub const CLOSING: &str = "-->";

/// A block-query opening marker and what it means.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpeningMarker {
    /// Marker text without the optional trailing space.
    pub text: &'static str,
    pub mode: UpdateMode,
    pub family: SyntaxFamily,
}

impl OpeningMarker {
    /// Returns the marker text as it appears for the given variant.
    pub fn render(&self, variant: MarkerVariant) -> String {
        match variant {
            MarkerVariant::WithSpace => format!("{} ", self.text),
            MarkerVariant::Trimmed => self.text.to_string(),
        }
    }
}

/// Block opening markers, most specific first.
///
/// The alias family is listed before the legacy one and, within each family,
/// once-and-eject precedes manual, once and the plain marker.
pub const BLOCK_OPENINGS: [OpeningMarker; 8] = [
    OpeningMarker {
        text: "<!-- dataview-serializer-query-once-and-eject:",
        mode: UpdateMode::OnceAndEject,
        family: SyntaxFamily::Alias,
    },
    OpeningMarker {
        text: "<!-- dataview-serializer-query-manual:",
        mode: UpdateMode::Manual,
        family: SyntaxFamily::Alias,
    },
    OpeningMarker {
        text: "<!-- dataview-serializer-query-once:",
        mode: UpdateMode::Once,
        family: SyntaxFamily::Alias,
    },
    OpeningMarker {
        text: "<!-- dataview-serializer-query:",
        mode: UpdateMode::Auto,
        family: SyntaxFamily::Alias,
    },
    OpeningMarker {
        text: "<!-- QueryToSerializeOnceAndEject:",
        mode: UpdateMode::OnceAndEject,
        family: SyntaxFamily::Legacy,
    },
    OpeningMarker {
        text: "<!-- QueryToSerializeManual:",
        mode: UpdateMode::Manual,
        family: SyntaxFamily::Legacy,
    },
    OpeningMarker {
        text: "<!-- QueryToSerializeOnce:",
        mode: UpdateMode::Once,
        family: SyntaxFamily::Legacy,
    },
    OpeningMarker {
        text: "<!-- QueryToSerialize:",
        mode: UpdateMode::Auto,
        family: SyntaxFamily::Legacy,
    },
];

/// Result block delimiters for one syntax family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResultMarkers {
    /// Prefix of the result-start line; the query text and ` -->` follow.
    pub start: &'static str,
    pub end: &'static str,
}

pub const LEGACY_RESULT: ResultMarkers = ResultMarkers {
    start: "<!-- SerializedQuery:",
    end: "<!-- SerializedQuery END -->",
};

pub const ALIAS_RESULT: ResultMarkers = ResultMarkers {
    start: "<!-- dataview-serializer-result:",
    end: "<!-- dataview-serializer-result-end -->",
};

impl SyntaxFamily {
    pub fn result_markers(self) -> ResultMarkers {
        match self {
            SyntaxFamily::Legacy => LEGACY_RESULT,
            SyntaxFamily::Alias => ALIAS_RESULT,
        }
    }

    /// The auto-mode opening marker of this family.
    pub fn auto_opening(self) -> OpeningMarker {
        block_opening(UpdateMode::Auto, self)
    }
}

/// Builds the result-start line for a query, without indentation or newline.
pub fn result_start_line(family: SyntaxFamily, query: &str) -> String {
    format!("{} {} {}", family.result_markers().start, query, CLOSING)
}

/// Returns true when `trimmed_line` opens a result block of either family.
pub fn is_result_start(trimmed_line: &str) -> bool {
    [LEGACY_RESULT, ALIAS_RESULT]
        .iter()
        .any(|m| trimmed_line.starts_with(m.start))
}

/// Returns true when `trimmed_line` closes a result block of either family.
pub fn is_result_end(trimmed_line: &str) -> bool {
    let line = trimmed_line.trim_end();
    [LEGACY_RESULT, ALIAS_RESULT].iter().any(|m| line == m.end)
}

/// Looks up the opening marker for a mode and family.
pub fn block_opening(mode: UpdateMode, family: SyntaxFamily) -> OpeningMarker {
    // Every (mode, family) pair is present in the table.
    BLOCK_OPENINGS
        .iter()
        .copied()
        .find(|m| m.mode == mode && m.family == family)
        .unwrap_or(BLOCK_OPENINGS[7])
}

/// An inline-expression opening marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InlineMarker {
    pub text: &'static str,
    pub mode: UpdateMode,
}

/// Inline opening markers, most specific first.
pub const INLINE_OPENINGS: [InlineMarker; 4] = [
    InlineMarker {
        text: "<!-- IQOnceAndEject:",
        mode: UpdateMode::OnceAndEject,
    },
    InlineMarker {
        text: "<!-- IQManual:",
        mode: UpdateMode::Manual,
    },
    InlineMarker {
        text: "<!-- IQOnce:",
        mode: UpdateMode::Once,
    },
    InlineMarker {
        text: "<!-- IQ:",
        mode: UpdateMode::Auto,
    },
];

pub const INLINE_END: &str = "<!-- /IQ -->";

/// Prefix shared by all inline opening markers.
pub const INLINE_PREFIX: &str = "<!-- IQ";

/// Finds the most specific block opening marker contained in `line`.
///
/// Returns the marker, its byte offset in `line` and the variant found.
pub fn find_opening(line: &str) -> Option<(OpeningMarker, usize, MarkerVariant)> {
    BLOCK_OPENINGS.iter().find_map(|m| {
        line.find(m.text).map(|at| {
            let after = &line[at + m.text.len()..];
            let variant = if after.starts_with(' ') {
                MarkerVariant::WithSpace
            } else {
                MarkerVariant::Trimmed
            };
            (*m, at, variant)
        })
    })
}

/// Finds a closing marker in `haystack`, reporting whether it had a leading space.
///
/// Returns the byte offset where the variant begins.
pub fn find_closing(haystack: &str) -> Option<(usize, MarkerVariant)> {
    let at = haystack.find(CLOSING)?;
    if at > 0 && haystack.as_bytes()[at - 1] == b' ' {
        Some((at - 1, MarkerVariant::WithSpace))
    } else {
        Some((at, MarkerVariant::Trimmed))
    }
}

/// Renders a closing marker variant.
pub fn render_closing(variant: MarkerVariant) -> &'static str {
    match variant {
        MarkerVariant::WithSpace => " -->",
        MarkerVariant::Trimmed => CLOSING,
    }
}
