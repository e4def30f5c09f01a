use std::time::Duration;

use serde::Serialize;

/// Failure reported by a [`QuerySerializer`](crate::QuerySerializer).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SerializeError {
    #[error("{0}")]
    Failed(String),
    #[error("serialization timed out after {}ms", .0.as_millis())]
    Timeout(Duration),
}

/// A directive that could not be serialized during a pass.
///
/// The directive's source text is left untouched; the caller decides how to
/// surface the failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[error("{message} (query: {query})")]
pub struct QueryError {
    pub message: String,
    /// Offending query or inline expression text.
    pub query: String,
}

impl QueryError {
    pub fn new(source: &SerializeError, query: &str) -> Self {
        Self {
            message: source.to_string(),
            query: query.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeout_message_names_budget() {
        let err = SerializeError::Timeout(Duration::from_millis(1500));
        assert_eq!(err.to_string(), "serialization timed out after 1500ms");
    }

    #[test]
    fn query_error_display() {
        let err = QueryError::new(&SerializeError::Failed("bad field".into()), "LIST x");
        assert_eq!(err.to_string(), "bad field (query: LIST x)");
    }
}
