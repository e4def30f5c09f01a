use std::{
    collections::HashSet,
    fs,
    path::PathBuf,
    sync::Mutex,
    time::Duration,
};

use async_trait::async_trait;
use tempfile::TempDir;

use crate::{
    error::SerializeError,
    serializer::{Origin, QuerySerializer},
};

/// Create a temporary notes directory for testing
pub fn create_test_notes_dir() -> TempDir {
    tempfile::tempdir().unwrap()
}

/// Create a test markdown file with content
pub fn create_test_file(notes_dir: &TempDir, filename: &str, content: &str) -> PathBuf {
    let file_path = notes_dir.path().join(filename);
    if let Some(parent) = file_path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(&file_path, content).unwrap();
    file_path
}

/// Serializer returning a fixed output, recording every call.
pub struct StubSerializer {
    output: String,
    failing: HashSet<String>,
    delay: Option<Duration>,
    calls: Mutex<Vec<String>>,
}

impl StubSerializer {
    pub fn returning(output: &str) -> Self {
        Self {
            output: output.to_string(),
            failing: HashSet::new(),
            delay: None,
            calls: Mutex::new(vec![]),
        }
    }

    pub fn failing_on(mut self, query: &str) -> Self {
        self.failing.insert(query.to_string());
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Queries and expressions seen so far; table-cell expressions are
    /// suffixed with ` (table cell)`.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    async fn respond(&self, key: String, text: &str) -> Result<String, SerializeError> {
        self.calls.lock().unwrap().push(key);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.failing.contains(text) {
            return Err(SerializeError::Failed(format!("cannot evaluate {text}")));
        }
        Ok(self.output.clone())
    }
}

#[async_trait]
impl QuerySerializer for StubSerializer {
    async fn serialize_query(&self, query: &str, _origin: &Origin) -> Result<String, SerializeError> {
        self.respond(query.to_string(), query).await
    }

    async fn serialize_inline_expression(
        &self,
        expression: &str,
        _origin: &Origin,
        is_table_cell: bool,
    ) -> Result<String, SerializeError> {
        let key = if is_table_cell {
            format!("{expression} (table cell)")
        } else {
            expression.to_string()
        };
        self.respond(key, expression).await
    }
}
