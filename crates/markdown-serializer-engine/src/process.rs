//! One processing pass over a document: locate, decide, serialize, fold.
//!
//! The new text is only assembled once every directive has been resolved,
//! so no caller ever observes a half-rewritten document.

use std::{future::Future, path::Path, time::Duration};

use log::Level;
use relative_path::{RelativePath, RelativePathBuf};

use crate::{
    error::{QueryError, SerializeError},
    io::{self, IoError},
    locate::{locate_inline_expressions, locate_queries},
    policy::{Trigger, should_skip},
    rewrite::{
        ResolvedExpression, ResolvedQuery, RewriteOptions, rewrite_blocks, rewrite_inline,
    },
    serializer::{Origin, QuerySerializer},
};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessOptions {
    /// Budget for a single serializer call.
    pub timeout: Duration,
    pub rewrite: RewriteOptions,
    /// Log per-directive decisions at info level instead of debug.
    pub debug: bool,
}

impl Default for ProcessOptions {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            rewrite: RewriteOptions::default(),
            debug: false,
        }
    }
}

impl ProcessOptions {
    fn decision_level(&self) -> Level {
        if self.debug { Level::Info } else { Level::Debug }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessedDocument {
    pub text: String,
    pub changed: bool,
    pub errors: Vec<QueryError>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileProcessingResult {
    pub file_path: RelativePathBuf,
    pub changed: bool,
    pub errors: Vec<QueryError>,
}

async fn bounded<F>(timeout: Duration, call: F) -> Result<String, SerializeError>
where
    F: Future<Output = Result<String, SerializeError>>,
{
    match tokio::time::timeout(timeout, call).await {
        Ok(result) => result,
        Err(_) => Err(SerializeError::Timeout(timeout)),
    }
}

/// Runs one pass over `text`.
///
/// Block queries are resolved top to bottom and folded first; inline
/// expressions are then located on the folded text. A failing or timed-out
/// directive is reported in `errors` and keeps its source text.
pub async fn process_document(
    text: &str,
    origin: &Origin,
    serializer: &dyn QuerySerializer,
    trigger: Trigger,
    options: &ProcessOptions,
) -> ProcessedDocument {
    let level = options.decision_level();
    let mut errors = vec![];

    let mut queries = vec![];
    for located in locate_queries(text) {
        if should_skip(located.mode, trigger, located.serialized) {
            log::log!(level, "{}: skipping {:?} query {}", origin.file_path, located.mode, located.query);
            continue;
        }
        log::log!(level, "{}: serializing query {}", origin.file_path, located.query);
        let result = bounded(options.timeout, serializer.serialize_query(&located.query, origin))
            .await
            .map_err(|err| QueryError::new(&err, &located.query));
        if let Err(err) = &result {
            log::warn!("{}: {err}", origin.file_path);
            errors.push(err.clone());
        }
        queries.push(ResolvedQuery { located, result });
    }
    let folded = rewrite_blocks(text, &queries, &options.rewrite);

    let mut expressions = vec![];
    for located in locate_inline_expressions(&folded) {
        if should_skip(located.mode, trigger, located.existing_result.is_some()) {
            log::log!(level, "{}: skipping {:?} expression {}", origin.file_path, located.mode, located.expression);
            continue;
        }
        let call = serializer.serialize_inline_expression(
            &located.expression,
            origin,
            located.is_table_cell,
        );
        let result = bounded(options.timeout, call)
            .await
            .map_err(|err| QueryError::new(&err, &located.expression));
        if let Err(err) = &result {
            log::warn!("{}: {err}", origin.file_path);
            errors.push(err.clone());
        }
        expressions.push(ResolvedExpression { located, result });
    }
    let folded = rewrite_inline(&folded, &expressions);

    ProcessedDocument {
        changed: folded != text,
        text: folded,
        errors,
    }
}

/// Processes one file under `notes_root`, writing it back only when the
/// pass changed it.
pub async fn process_file(
    notes_root: &Path,
    relative_path: &RelativePath,
    serializer: &dyn QuerySerializer,
    trigger: Trigger,
    options: &ProcessOptions,
) -> Result<FileProcessingResult, IoError> {
    let text = io::read_file(relative_path, notes_root)?;
    let origin = Origin::new(relative_path);
    let processed = process_document(&text, &origin, serializer, trigger, options).await;

    if processed.changed {
        io::write_file(relative_path, notes_root, &processed.text)?;
        log::info!("updated {relative_path}");
    }

    Ok(FileProcessingResult {
        file_path: relative_path.to_relative_path_buf(),
        changed: processed.changed,
        errors: processed.errors,
    })
}
