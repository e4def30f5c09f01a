pub mod convert;
pub mod error;
pub mod guard;
pub mod io;
pub mod locate;
pub mod markers;
pub mod policy;
pub mod process;
pub mod report;
pub mod rewrite;
pub mod serializer;

#[cfg(test)]
pub mod tests;

// Re-export key types for easier usage
pub use convert::{Conversion, convert_all, convert_at_cursor, convert_in_selection};
pub use error::{QueryError, SerializeError};
pub use guard::ReprocessGuard;
pub use io::*;
pub use locate::{
    ExpressionKind, LocatedInlineExpression, LocatedQuery, locate_inline_expressions,
    locate_queries,
};
pub use markers::{MarkerVariant, SyntaxFamily, UpdateMode};
pub use policy::{Trigger, should_skip};
pub use process::{
    FileProcessingResult, ProcessOptions, ProcessedDocument, process_document, process_file,
};
pub use report::{failure_count, summarize_failures};
pub use rewrite::{
    ResolvedDirectives, ResolvedExpression, ResolvedQuery, RewriteOptions, rewrite_document,
};
pub use serializer::{Origin, QuerySerializer};
