use async_trait::async_trait;
use relative_path::{RelativePath, RelativePathBuf};

use crate::error::SerializeError;

/// Where a query is evaluated from; the engine resolves relative links and
/// `this` against it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Origin {
    pub file_path: RelativePathBuf,
}

impl Origin {
    pub fn new(file_path: impl Into<RelativePathBuf>) -> Self {
        Self {
            file_path: file_path.into(),
        }
    }

    pub fn file_path(&self) -> &RelativePath {
        &self.file_path
    }
}

/// The external query engine.
///
/// Implementations turn one query into rendered Markdown, or one inline
/// expression into a short value. Calls may take arbitrarily long; the
/// processing pass bounds them with a timeout.
#[async_trait]
pub trait QuerySerializer: Send + Sync {
    async fn serialize_query(&self, query: &str, origin: &Origin) -> Result<String, SerializeError>;

    /// `is_table_cell` lets the engine escape pipes and newlines so the value
    /// stays inside its cell.
    async fn serialize_inline_expression(
        &self,
        expression: &str,
        origin: &Origin,
        is_table_cell: bool,
    ) -> Result<String, SerializeError>;
}
