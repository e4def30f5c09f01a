use async_trait::async_trait;
use markdown_serializer_engine::{
    Origin, ProcessOptions, QuerySerializer, SerializeError, Trigger, process_document,
    process_file,
};
use pretty_assertions::assert_eq;
use relative_path::RelativePath;

/// Renders queries as a one-item list and expressions as `v:<expr>`.
struct EchoSerializer;

#[async_trait]
impl QuerySerializer for EchoSerializer {
    async fn serialize_query(&self, query: &str, _origin: &Origin) -> Result<String, SerializeError> {
        Ok(format!("- {}", query.to_lowercase()))
    }

    async fn serialize_inline_expression(
        &self,
        expression: &str,
        _origin: &Origin,
        is_table_cell: bool,
    ) -> Result<String, SerializeError> {
        let suffix = if is_table_cell { " (cell)" } else { "" };
        Ok(format!("v:{expression}{suffix}"))
    }
}

fn fixture(name: &str) -> String {
    std::fs::read_to_string(format!(
        "{}/tests/fixtures/{name}.md",
        env!("CARGO_MANIFEST_DIR")
    ))
    .unwrap()
}

async fn serialize(text: &str, trigger: Trigger) -> String {
    let origin = Origin::new("fixture.md");
    let processed =
        process_document(text, &origin, &EchoSerializer, trigger, &ProcessOptions::default()).await;
    assert!(processed.errors.is_empty());
    processed.text
}

#[tokio::test]
async fn fixture_mixed_directives() {
    assert_fixture("mixed").await;
}

#[tokio::test]
async fn fixture_once_and_eject() {
    assert_fixture("eject").await;
}

async fn assert_fixture(name: &str) {
    let input = fixture(name);
    let expected = fixture(&format!("{name}.expected"));

    let once = serialize(&input, Trigger::Automatic).await;
    assert_eq!(once, expected);

    // A second pass with the same results must not touch the note
    let twice = serialize(&once, Trigger::Automatic).await;
    assert_eq!(twice, once);
}

#[tokio::test]
async fn manual_trigger_fills_manual_directive() {
    let input = fixture("mixed");
    let out = serialize(&input, Trigger::Manual).await;

    assert!(out.contains(
        "<!-- QueryToSerializeManual: TASK FROM #todo -->\n<!-- SerializedQuery: TASK FROM #todo -->\n- task from #todo\n<!-- SerializedQuery END -->\n"
    ));
    assert!(out.contains("<!-- QueryToSerialize: CALENDAR file.day -->\n\n"));
}

#[tokio::test]
async fn crlf_note_round_trips_through_files() {
    // Given a note saved with Windows line endings
    let notes = tempfile::tempdir().unwrap();
    let path = notes.path().join("windows.md");
    std::fs::write(&path, "Title\r\n<!-- QueryToSerialize: LIST -->\r\nEnd\r\n").unwrap();

    // When processing it
    let result = process_file(
        notes.path(),
        RelativePath::new("windows.md"),
        &EchoSerializer,
        Trigger::Automatic,
        &ProcessOptions::default(),
    )
    .await
    .unwrap();

    // Then the inserted block uses the same line endings
    assert!(result.changed);
    assert_eq!(
        std::fs::read_to_string(&path).unwrap(),
        "Title\r\n<!-- QueryToSerialize: LIST -->\r\n<!-- SerializedQuery: LIST -->\r\n- list\r\n<!-- SerializedQuery END -->\r\nEnd\r\n"
    );
}
